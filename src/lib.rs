//! # parking-gateway
//!
//! Reservation lifecycle, capacity ledger and tiered billing engine for
//! parking facilities, exposed over a REST API.
//!
//! A reservation moves `pendiente → activa → completada`, or
//! `pendiente → cancelada` on request or after the pending TTL. A spot is
//! taken from the facility when entry is authorized and given back when the
//! reservation completes. Every fare, whether projected, live or final,
//! comes from the same tiered formula.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── ReservationService, FacilityService (service/)
//!     ├── ExpirationSweeper (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── ReservationBook, CapacityLedger, TariffSchedule (domain/)
//!     │
//!     └── PostgreSQL event log (persistence/, optional)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
