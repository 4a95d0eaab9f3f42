//! Per-facility, per-vehicle-class pricing rules.
//!
//! [`TariffSchedule`] holds the whole tariff set of every facility. A set is
//! only ever replaced as a unit: [`TariffSchedule::replace`] swaps the
//! facility's map in one write, so a reader sees either the old set or the
//! new one, never a mix.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use utoipa::ToSchema;

use super::FacilityId;
use crate::error::ReservationError;

/// Vehicle category used to select a tariff (`"carro"`, `"moto"`, ...).
///
/// Normalized to trimmed lowercase so `"Carro "` and `"carro"` resolve to
/// the same tariff.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct VehicleClass(String);

impl VehicleClass {
    /// Parses a vehicle class, returning `None` for blank input.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    /// Returns the normalized class name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tiered pricing for one vehicle class at one facility.
///
/// Rates are in the facility's currency units. Day and night flat rates are
/// informational; billing always goes through the first-hour /
/// additional-hour tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TariffEntry {
    /// Vehicle class this entry prices.
    pub vehicle_class: VehicleClass,
    /// Rate for the first hour, billed proportionally below one hour.
    pub first_hour_rate: f64,
    /// Rate for every hour after the first, billed proportionally.
    pub additional_hour_rate: f64,
    /// Optional flat rate for a full day.
    pub day_rate: Option<f64>,
    /// Optional flat rate for an overnight stay.
    pub night_rate: Option<f64>,
}

impl TariffEntry {
    /// Creates a tiered entry without flat rates.
    #[must_use]
    pub const fn tiered(
        vehicle_class: VehicleClass,
        first_hour_rate: f64,
        additional_hour_rate: f64,
    ) -> Self {
        Self {
            vehicle_class,
            first_hour_rate,
            additional_hour_rate,
            day_rate: None,
            night_rate: None,
        }
    }

    /// Creates an entry for a flat hourly rate, the degenerate tiered case
    /// where both tiers are equal.
    #[must_use]
    pub const fn flat(vehicle_class: VehicleClass, hourly_rate: f64) -> Self {
        Self::tiered(vehicle_class, hourly_rate, hourly_rate)
    }

    /// Checks that every rate is finite and non-negative.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::InvalidRequest`] naming the first bad rate.
    pub fn validate(&self) -> Result<(), ReservationError> {
        let rates = [
            ("first_hour_rate", Some(self.first_hour_rate)),
            ("additional_hour_rate", Some(self.additional_hour_rate)),
            ("day_rate", self.day_rate),
            ("night_rate", self.night_rate),
        ];
        for (name, rate) in rates {
            if let Some(value) = rate
                && (!value.is_finite() || value < 0.0)
            {
                return Err(ReservationError::InvalidRequest(format!(
                    "{name} for '{}' must be a non-negative number",
                    self.vehicle_class
                )));
            }
        }
        Ok(())
    }
}

/// Tariff sets of all facilities.
#[derive(Debug, Default)]
pub struct TariffSchedule {
    sets: RwLock<HashMap<FacilityId, Arc<HashMap<VehicleClass, TariffEntry>>>>,
}

impl TariffSchedule {
    /// Creates an empty schedule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole tariff set of a facility.
    ///
    /// Entries for classes absent from `entries` are dropped. An empty
    /// `entries` clears the facility's tariffs.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::InvalidRequest`] if any rate is invalid or
    /// a vehicle class appears twice. Nothing is replaced in that case.
    pub async fn replace(
        &self,
        facility_id: FacilityId,
        entries: Vec<TariffEntry>,
    ) -> Result<usize, ReservationError> {
        let mut set = HashMap::with_capacity(entries.len());
        for entry in entries {
            entry.validate()?;
            let class = entry.vehicle_class.clone();
            if set.insert(class.clone(), entry).is_some() {
                return Err(ReservationError::InvalidRequest(format!(
                    "duplicate tariff for vehicle class '{class}'"
                )));
            }
        }
        let count = set.len();
        self.sets.write().await.insert(facility_id, Arc::new(set));
        Ok(count)
    }

    /// Resolves the tariff currently on file for a facility and class.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::RateNotFound`] if no entry exists.
    pub async fn resolve(
        &self,
        facility_id: FacilityId,
        vehicle_class: &VehicleClass,
    ) -> Result<TariffEntry, ReservationError> {
        let sets = self.sets.read().await;
        sets.get(&facility_id)
            .and_then(|set| set.get(vehicle_class))
            .cloned()
            .ok_or_else(|| ReservationError::RateNotFound {
                facility_id,
                vehicle_class: vehicle_class.clone(),
            })
    }

    /// Returns the facility's tariff set sorted by vehicle class.
    pub async fn list(&self, facility_id: FacilityId) -> Vec<TariffEntry> {
        let set = self.sets.read().await.get(&facility_id).map(Arc::clone);
        let mut entries: Vec<TariffEntry> = set
            .map(|set| set.values().cloned().collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| a.vehicle_class.as_str().cmp(b.vehicle_class.as_str()));
        entries
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn class(name: &str) -> VehicleClass {
        let Some(class) = VehicleClass::parse(name) else {
            panic!("valid class");
        };
        class
    }

    #[test]
    fn vehicle_class_is_normalized() {
        assert_eq!(class(" Carro "), class("carro"));
        assert!(VehicleClass::parse("   ").is_none());
    }

    #[test]
    fn negative_rate_is_rejected() {
        let entry = TariffEntry::tiered(class("moto"), -1.0, 500.0);
        assert!(matches!(
            entry.validate(),
            Err(ReservationError::InvalidRequest(_))
        ));
        let mut nan_night = TariffEntry::flat(class("moto"), 500.0);
        nan_night.night_rate = Some(f64::NAN);
        assert!(nan_night.validate().is_err());
    }

    #[tokio::test]
    async fn resolve_missing_returns_rate_not_found() {
        let schedule = TariffSchedule::new();
        let result = schedule.resolve(FacilityId::new(), &class("carro")).await;
        assert!(matches!(result, Err(ReservationError::RateNotFound { .. })));
    }

    #[tokio::test]
    async fn replace_supersedes_previous_set() {
        let schedule = TariffSchedule::new();
        let facility = FacilityId::new();
        let first = vec![
            TariffEntry::tiered(class("carro"), 2000.0, 1000.0),
            TariffEntry::tiered(class("moto"), 1000.0, 500.0),
        ];
        assert_eq!(schedule.replace(facility, first).await, Ok(2));

        let second = vec![TariffEntry::tiered(class("carro"), 2500.0, 1200.0)];
        assert_eq!(schedule.replace(facility, second).await, Ok(1));

        let Ok(carro) = schedule.resolve(facility, &class("carro")).await else {
            panic!("carro tariff should exist");
        };
        assert!((carro.first_hour_rate - 2500.0).abs() < f64::EPSILON);
        assert!(schedule.resolve(facility, &class("moto")).await.is_err());
    }

    #[tokio::test]
    async fn duplicate_class_leaves_old_set_in_place() {
        let schedule = TariffSchedule::new();
        let facility = FacilityId::new();
        let _ = schedule
            .replace(facility, vec![TariffEntry::flat(class("carro"), 1500.0)])
            .await;

        let dupes = vec![
            TariffEntry::flat(class("moto"), 800.0),
            TariffEntry::flat(class("MOTO"), 900.0),
        ];
        assert!(schedule.replace(facility, dupes).await.is_err());

        let listed = schedule.list(facility).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed.first().map(|e| e.vehicle_class.as_str()), Some("carro"));
    }
}
