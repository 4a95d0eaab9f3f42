//! Parking facility record and its capacity invariant.
//!
//! The spot counters are private: `0 ≤ available ≤ total` is maintained by
//! the mutators below, which only the [`super::CapacityLedger`] calls.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::FacilityId;
use crate::error::ReservationError;

/// Geographic position of a facility.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, serde::Deserialize, ToSchema)]
pub struct GeoPoint {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

impl GeoPoint {
    /// Checks that the coordinates are finite and within range.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::InvalidRequest`] on out-of-range values.
    pub fn validate(&self) -> Result<(), ReservationError> {
        let lat_ok = self.latitude.is_finite() && (-90.0..=90.0).contains(&self.latitude);
        let lon_ok = self.longitude.is_finite() && (-180.0..=180.0).contains(&self.longitude);
        if lat_ok && lon_ok {
            Ok(())
        } else {
            Err(ReservationError::InvalidRequest(format!(
                "coordinates out of range: ({}, {})",
                self.latitude, self.longitude
            )))
        }
    }
}

/// Registration parameters for a new facility.
#[derive(Debug, Clone)]
pub struct NewFacility {
    /// Display name.
    pub name: String,
    /// Street address.
    pub address: String,
    /// Geographic position.
    pub location: GeoPoint,
    /// Number of physical spots.
    pub total_spots: u32,
}

/// A parking facility with its spot accounting.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Facility {
    /// Facility identifier.
    pub id: FacilityId,
    /// Display name.
    pub name: String,
    /// Street address.
    pub address: String,
    /// Geographic position.
    pub location: GeoPoint,
    total_spots: u32,
    available_spots: u32,
    /// Manual open/closed flag, independent of the spot counters.
    pub is_open: bool,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last mutation.
    pub updated_at: DateTime<Utc>,
}

impl Facility {
    /// Builds an open facility with every spot available.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::InvalidRequest`] on a blank name or
    /// address, or invalid coordinates.
    pub fn register(new: NewFacility, now: DateTime<Utc>) -> Result<Self, ReservationError> {
        let name = required(&new.name, "name")?;
        let address = required(&new.address, "address")?;
        new.location.validate()?;
        Ok(Self {
            id: FacilityId::new(),
            name,
            address,
            location: new.location,
            total_spots: new.total_spots,
            available_spots: new.total_spots,
            is_open: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Total number of spots.
    #[must_use]
    pub const fn total_spots(&self) -> u32 {
        self.total_spots
    }

    /// Number of free spots.
    #[must_use]
    pub const fn available_spots(&self) -> u32 {
        self.available_spots
    }

    /// Number of spots currently held by active reservations.
    #[must_use]
    pub const fn occupied_spots(&self) -> u32 {
        self.total_spots - self.available_spots
    }

    pub(super) fn take_spot(&mut self, now: DateTime<Utc>) -> Result<(), ReservationError> {
        if self.available_spots == 0 {
            return Err(ReservationError::CapacityExhausted(self.id));
        }
        self.available_spots -= 1;
        self.updated_at = now;
        Ok(())
    }

    pub(super) fn return_spot(&mut self, now: DateTime<Utc>) -> Result<(), ReservationError> {
        if self.available_spots >= self.total_spots {
            return Err(ReservationError::CapacityOverflow(self.id));
        }
        self.available_spots += 1;
        self.updated_at = now;
        Ok(())
    }

    pub(super) fn resize(
        &mut self,
        new_total: u32,
        now: DateTime<Utc>,
    ) -> Result<(), ReservationError> {
        let occupied = self.occupied_spots();
        if new_total < occupied {
            return Err(ReservationError::InvalidRequest(format!(
                "cannot shrink facility {} to {new_total} spots while {occupied} are occupied",
                self.id
            )));
        }
        self.total_spots = new_total;
        self.available_spots = new_total - occupied;
        self.updated_at = now;
        Ok(())
    }

    pub(super) fn set_open(&mut self, is_open: bool, now: DateTime<Utc>) {
        self.is_open = is_open;
        self.updated_at = now;
    }

    /// Replaces name and address. Both are checked before either is written.
    pub(super) fn update_details(
        &mut self,
        name: &str,
        address: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ReservationError> {
        let name = required(name, "name")?;
        let address = required(address, "address")?;
        self.name = name;
        self.address = address;
        self.updated_at = now;
        Ok(())
    }
}

fn required(value: &str, field: &str) -> Result<String, ReservationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ReservationError::InvalidRequest(format!(
            "facility {field} is required"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn facility(total: u32) -> Facility {
        let new = NewFacility {
            name: "Centro".to_string(),
            address: "Calle 10 # 5-20".to_string(),
            location: GeoPoint {
                latitude: 4.6,
                longitude: -74.08,
            },
            total_spots: total,
        };
        let Ok(facility) = Facility::register(new, Utc::now()) else {
            panic!("valid facility");
        };
        facility
    }

    #[test]
    fn register_starts_full_and_open() {
        let f = facility(12);
        assert_eq!(f.total_spots(), 12);
        assert_eq!(f.available_spots(), 12);
        assert!(f.is_open);
    }

    #[test]
    fn register_rejects_bad_coordinates() {
        let new = NewFacility {
            name: "Norte".to_string(),
            address: "Av 1".to_string(),
            location: GeoPoint {
                latitude: 120.0,
                longitude: 0.0,
            },
            total_spots: 3,
        };
        assert!(Facility::register(new, Utc::now()).is_err());
    }

    #[test]
    fn take_and_return_respect_bounds() {
        let mut f = facility(1);
        let now = Utc::now();
        assert!(f.take_spot(now).is_ok());
        assert_eq!(
            f.take_spot(now),
            Err(ReservationError::CapacityExhausted(f.id))
        );
        assert!(f.return_spot(now).is_ok());
        assert_eq!(
            f.return_spot(now),
            Err(ReservationError::CapacityOverflow(f.id))
        );
        assert_eq!(f.available_spots(), 1);
    }

    #[test]
    fn resize_keeps_occupancy() {
        let mut f = facility(5);
        let now = Utc::now();
        for _ in 0..3 {
            assert!(f.take_spot(now).is_ok());
        }
        assert!(f.resize(2, now).is_err());
        assert!(f.resize(8, now).is_ok());
        assert_eq!(f.available_spots(), 5);
        assert!(f.resize(3, now).is_ok());
        assert_eq!(f.available_spots(), 0);
    }

    #[test]
    fn update_details_trims_and_keeps_counters() {
        let mut f = facility(4);
        let now = Utc::now();
        assert!(f.take_spot(now).is_ok());
        assert!(f.update_details("  Centro Norte ", "Calle 100 # 15-20", now).is_ok());
        assert_eq!(f.name, "Centro Norte");
        assert_eq!(f.address, "Calle 100 # 15-20");
        assert_eq!(f.available_spots(), 3);
        assert_eq!(f.total_spots(), 4);
    }

    #[test]
    fn update_details_rejects_blank_fields_atomically() {
        let mut f = facility(2);
        let now = Utc::now();
        assert!(matches!(
            f.update_details("Otro", "   ", now),
            Err(ReservationError::InvalidRequest(_))
        ));
        assert!(f.update_details("", "Calle 1", now).is_err());
        assert_eq!(f.name, "Centro");
        assert_eq!(f.address, "Calle 10 # 5-20");
    }
}
