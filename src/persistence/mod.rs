//! Persistence layer: optional PostgreSQL event log.
//!
//! Every [`crate::domain::ReservationEvent`] published on the bus can be
//! appended to an `events` table (JSONB payload) by a background writer.
//! The concrete implementation uses `sqlx::PgPool` for async PostgreSQL
//! access; schema changes live in `migrations/`.

pub mod event_log;
pub mod postgres;

pub use event_log::spawn_event_writer;
pub use postgres::PostgresPersistence;
