//! Tiered fare computation.
//!
//! [`compute_fare`] is the only billing formula in the crate. Projected
//! fares at creation, final fares at completion, live quotes and
//! recomputations all go through it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::TariffEntry;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Computes the amount owed for `elapsed_hours` under `tariff`.
///
/// Up to one hour the first-hour rate is billed proportionally
/// (`elapsed × first`). Beyond one hour the first hour is billed in full and
/// the remainder at the additional-hour rate
/// (`first + (elapsed − 1) × additional`).
///
/// Negative or NaN durations are treated as zero.
#[must_use]
pub fn compute_fare(elapsed_hours: f64, tariff: &TariffEntry) -> f64 {
    let elapsed = elapsed_hours.max(0.0);
    if elapsed <= 1.0 {
        elapsed * tariff.first_hour_rate
    } else {
        tariff.first_hour_rate + (elapsed - 1.0) * tariff.additional_hour_rate
    }
}

/// Returns the whole seconds between `from` and `to`, expressed in hours.
///
/// Negative spans (clock skew) yield zero.
#[must_use]
pub fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let seconds = (to - from).num_seconds().max(0);
    #[allow(clippy::cast_precision_loss)]
    let hours = seconds as f64 / SECONDS_PER_HOUR;
    hours
}

/// Fare breakdown returned to callers before payment.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FareQuote {
    /// Billed or projected duration in hours.
    pub elapsed_hours: f64,
    /// First-hour rate of the tariff currently on file.
    pub first_hour_rate: f64,
    /// Additional-hour rate of the tariff currently on file.
    pub additional_hour_rate: f64,
    /// Amount owed for `elapsed_hours`.
    pub amount: f64,
}

impl FareQuote {
    /// Builds a quote by running the fare formula.
    #[must_use]
    pub fn compute(elapsed_hours: f64, tariff: &TariffEntry) -> Self {
        Self::with_amount(elapsed_hours, tariff, compute_fare(elapsed_hours, tariff))
    }

    /// Builds a quote around an amount that was already billed.
    #[must_use]
    pub const fn with_amount(elapsed_hours: f64, tariff: &TariffEntry, amount: f64) -> Self {
        Self {
            elapsed_hours,
            first_hour_rate: tariff.first_hour_rate,
            additional_hour_rate: tariff.additional_hour_rate,
            amount,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::VehicleClass;
    use chrono::Duration;

    fn tariff(first: f64, additional: f64) -> TariffEntry {
        let Some(class) = VehicleClass::parse("carro") else {
            panic!("valid class");
        };
        TariffEntry::tiered(class, first, additional)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn zero_elapsed_is_free() {
        assert!(close(compute_fare(0.0, &tariff(2000.0, 1000.0)), 0.0));
    }

    #[test]
    fn partial_first_hour_is_proportional() {
        assert!(close(compute_fare(0.5, &tariff(2000.0, 1000.0)), 1000.0));
    }

    #[test]
    fn exactly_one_hour_bills_first_rate() {
        assert!(close(compute_fare(1.0, &tariff(2000.0, 1000.0)), 2000.0));
    }

    #[test]
    fn additional_hours_use_second_tier() {
        assert!(close(compute_fare(2.5, &tariff(2000.0, 1000.0)), 3500.0));
        assert!(close(compute_fare(1.5, &tariff(2000.0, 1000.0)), 2500.0));
    }

    #[test]
    fn flat_rate_is_linear() {
        let Some(class) = VehicleClass::parse("bicicleta") else {
            panic!("valid class");
        };
        let flat = TariffEntry::flat(class, 300.0);
        assert!(close(compute_fare(3.0, &flat), 900.0));
        assert!(close(compute_fare(0.25, &flat), 75.0));
    }

    #[test]
    fn negative_and_nan_durations_bill_nothing() {
        let t = tariff(2000.0, 1000.0);
        assert!(close(compute_fare(-2.0, &t), 0.0));
        assert!(close(compute_fare(f64::NAN, &t), 0.0));
    }

    #[test]
    fn fare_is_monotonic_in_elapsed() {
        let t = tariff(2000.0, 1000.0);
        let mut previous = 0.0;
        for step in 0..40 {
            let fare = compute_fare(f64::from(step) * 0.125, &t);
            assert!(fare >= previous);
            previous = fare;
        }
    }

    #[test]
    fn hours_between_uses_whole_seconds() {
        let start = Utc::now();
        let end = start + Duration::minutes(130) + Duration::milliseconds(900);
        assert!(close(hours_between(start, end), 130.0 / 60.0));
        assert!(close(hours_between(end, start), 0.0));
    }

    #[test]
    fn quote_with_amount_keeps_billed_value() {
        let t = tariff(2000.0, 1000.0);
        let quote = FareQuote::with_amount(2.0, &t, 1234.0);
        assert!(close(quote.amount, 1234.0));
        assert!(close(FareQuote::compute(2.0, &t).amount, 3000.0));
    }
}
