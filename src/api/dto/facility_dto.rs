//! Facility-related DTOs: registration, details, tariffs, availability, capacity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Facility, FacilityId, GeoPoint, NewFacility, TariffEntry, VehicleClass};
use crate::error::ReservationError;

/// Request body for `POST /facilities`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterFacilityRequest {
    /// Display name.
    pub name: String,
    /// Street address.
    pub address: String,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Number of physical spots.
    pub total_spots: u32,
}

impl From<RegisterFacilityRequest> for NewFacility {
    fn from(req: RegisterFacilityRequest) -> Self {
        Self {
            name: req.name,
            address: req.address,
            location: GeoPoint {
                latitude: req.latitude,
                longitude: req.longitude,
            },
            total_spots: req.total_spots,
        }
    }
}

/// Request body for `PUT /facilities/{id}`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateFacilityRequest {
    /// New display name.
    pub name: String,
    /// New street address.
    pub address: String,
}

/// Facility snapshot returned by every facility endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct FacilityDto {
    /// Facility identifier.
    pub facility_id: FacilityId,
    /// Display name.
    pub name: String,
    /// Street address.
    pub address: String,
    /// Geographic position.
    pub location: GeoPoint,
    /// Total spots.
    pub total_spots: u32,
    /// Free spots.
    pub available_spots: u32,
    /// Manual open/closed flag.
    pub is_open: bool,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<Facility> for FacilityDto {
    fn from(f: Facility) -> Self {
        Self {
            facility_id: f.id,
            total_spots: f.total_spots(),
            available_spots: f.available_spots(),
            name: f.name,
            address: f.address,
            location: f.location,
            is_open: f.is_open,
            created_at: f.created_at,
            updated_at: f.updated_at,
        }
    }
}

/// One tariff entry as submitted by an administrator.
///
/// Either both tier rates or a flat `hourly_rate` must be given; a missing
/// tier falls back to `hourly_rate`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TariffInput {
    /// Vehicle class (`"carro"`, `"moto"`, ...).
    pub vehicle_class: String,
    /// Rate for the first hour.
    #[serde(default)]
    pub first_hour_rate: Option<f64>,
    /// Rate for every additional hour.
    #[serde(default)]
    pub additional_hour_rate: Option<f64>,
    /// Flat hourly rate filling both tiers.
    #[serde(default)]
    pub hourly_rate: Option<f64>,
    /// Optional flat day rate.
    #[serde(default)]
    pub day_rate: Option<f64>,
    /// Optional flat night rate.
    #[serde(default)]
    pub night_rate: Option<f64>,
}

impl TryFrom<TariffInput> for TariffEntry {
    type Error = ReservationError;

    fn try_from(input: TariffInput) -> Result<Self, Self::Error> {
        let vehicle_class = VehicleClass::parse(&input.vehicle_class)
            .ok_or(ReservationError::MissingField("vehicle_class"))?;
        let first = input.first_hour_rate.or(input.hourly_rate);
        let additional = input.additional_hour_rate.or(input.hourly_rate);
        let (Some(first), Some(additional)) = (first, additional) else {
            return Err(ReservationError::InvalidRequest(format!(
                "tariff for '{vehicle_class}' needs first_hour_rate and additional_hour_rate, \
                 or hourly_rate"
            )));
        };
        let mut entry = Self::tiered(vehicle_class, first, additional);
        entry.day_rate = input.day_rate;
        entry.night_rate = input.night_rate;
        Ok(entry)
    }
}

/// Request body for `PUT /facilities/{id}/tariffs`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReplaceTariffsRequest {
    /// The complete new tariff set.
    pub tariffs: Vec<TariffInput>,
}

impl ReplaceTariffsRequest {
    /// Converts every input entry, failing on the first invalid one.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError`] for a blank class or missing rates.
    pub fn into_entries(self) -> Result<Vec<TariffEntry>, ReservationError> {
        self.tariffs.into_iter().map(TariffEntry::try_from).collect()
    }
}

/// Response body for tariff endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct TariffListResponse {
    /// Facility the tariffs belong to.
    pub facility_id: FacilityId,
    /// Tariff entries sorted by vehicle class.
    pub tariffs: Vec<TariffEntry>,
}

/// Request body for `PUT /facilities/{id}/availability`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AvailabilityRequest {
    /// New manual open/closed flag.
    pub is_open: bool,
}

/// Request body for `PUT /facilities/{id}/capacity`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ResizeCapacityRequest {
    /// New total spot count.
    pub total_spots: u32,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn input(json: &str) -> TariffInput {
        let Ok(input) = serde_json::from_str(json) else {
            panic!("invalid test json");
        };
        input
    }

    #[test]
    fn hourly_rate_fills_both_tiers() {
        let Ok(entry) = TariffEntry::try_from(input(r#"{"vehicle_class":"Moto","hourly_rate":800}"#))
        else {
            panic!("conversion failed");
        };
        assert_eq!(entry.vehicle_class.as_str(), "moto");
        assert!((entry.first_hour_rate - 800.0).abs() < f64::EPSILON);
        assert!((entry.additional_hour_rate - 800.0).abs() < f64::EPSILON);
    }

    #[test]
    fn explicit_tiers_win_over_hourly() {
        let Ok(entry) = TariffEntry::try_from(input(
            r#"{"vehicle_class":"carro","first_hour_rate":2000,"hourly_rate":900,"night_rate":15000}"#,
        )) else {
            panic!("conversion failed");
        };
        assert!((entry.first_hour_rate - 2000.0).abs() < f64::EPSILON);
        assert!((entry.additional_hour_rate - 900.0).abs() < f64::EPSILON);
        assert_eq!(entry.night_rate, Some(15000.0));
    }

    #[test]
    fn missing_rates_are_rejected() {
        assert!(matches!(
            TariffEntry::try_from(input(r#"{"vehicle_class":"carro","first_hour_rate":2000}"#)),
            Err(ReservationError::InvalidRequest(_))
        ));
    }
}
