//! Data Transfer Objects for REST request/response serialization.
//!
//! Dates travel as `YYYY-MM-DD`, times as `HH:MM[:SS]`, amounts as plain
//! JSON numbers in the facility's currency units.

pub mod facility_dto;
pub mod reservation_dto;

pub use facility_dto::*;
pub use reservation_dto::*;
