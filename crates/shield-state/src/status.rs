//! Health classification for sensor readings.
//!
//! This module provides configurable per-type threshold bands for deriving
//! a sensor's health from its latest value and staleness.
//!
//! # Example
//!
//! ```
//! use shield_state::status::StatusRules;
//! use shield_types::{HealthStatus, SensorType};
//! use time::OffsetDateTime;
//!
//! let rules = StatusRules::default();
//! let now = OffsetDateTime::now_utc();
//!
//! // A fresh humidity reading of 85% is critical.
//! let status = rules.derive(SensorType::Humidity, Some(85.0), Some(now), now);
//! assert_eq!(status, HealthStatus::Critical);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use shield_types::{HealthStatus, SensorType};

/// Milliseconds after which a silent sensor counts as offline.
const DEFAULT_OFFLINE_AFTER: Duration = Duration::from_secs(300);

/// An inclusive value band `[min, max]`.
///
/// Use `f64::INFINITY` for an unbounded upper edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    /// Lower edge, inclusive.
    pub min: f64,
    /// Upper edge, inclusive.
    pub max: f64,
}

impl Band {
    /// Create a band.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether `value` lies inside the band (both edges inclusive).
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Warning and critical bands for one sensor type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeBands {
    /// Bands classified as critical.
    pub critical: Vec<Band>,
    /// Bands classified as warning.
    pub warning: Vec<Band>,
}

/// How to classify a value sitting exactly on a shared critical/warning edge
/// (e.g. humidity at exactly 20, where `[0,20]` critical meets `[20,30]`
/// warning).
///
/// The threshold table leaves the shared edge ambiguous, so the rule is
/// explicit configuration rather than a silent choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryRule {
    /// The critical band claims the shared edge.
    #[default]
    CriticalWins,
    /// The warning band claims the shared edge.
    WarningWins,
}

/// Threshold rules deriving a sensor's health classification.
///
/// Derivation is a pure, total function of
/// `(last_value, sensor_type, last_update, now)`; it holds no state and can
/// be re-evaluated on a clock tick with no new reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRules {
    /// Silence window after which a sensor is offline.
    pub offline_after: Duration,
    /// Shared-edge classification rule.
    pub boundary: BoundaryRule,
    /// Humidity bands (percent).
    pub humidity: TypeBands,
    /// Vibration bands (Hz).
    pub vibration: TypeBands,
    /// Stress bands (MPa).
    pub stress: TypeBands,
}

impl Default for StatusRules {
    fn default() -> Self {
        Self {
            offline_after: DEFAULT_OFFLINE_AFTER,
            boundary: BoundaryRule::default(),
            humidity: TypeBands {
                critical: vec![Band::new(0.0, 20.0), Band::new(80.0, 100.0)],
                warning: vec![Band::new(20.0, 30.0), Band::new(70.0, 80.0)],
            },
            vibration: TypeBands {
                critical: vec![Band::new(50.0, f64::INFINITY)],
                warning: vec![Band::new(20.0, 50.0)],
            },
            stress: TypeBands {
                critical: vec![Band::new(80.0, f64::INFINITY)],
                warning: vec![Band::new(60.0, 80.0)],
            },
        }
    }
}

impl StatusRules {
    /// Rules with a custom silence window.
    #[must_use]
    pub fn with_offline_after(offline_after: Duration) -> Self {
        Self {
            offline_after,
            ..Default::default()
        }
    }

    /// Rules with a custom shared-edge rule.
    #[must_use]
    pub fn with_boundary(boundary: BoundaryRule) -> Self {
        Self {
            boundary,
            ..Default::default()
        }
    }

    /// Bands for a sensor type, if the type is in the table.
    #[must_use]
    pub fn bands_for(&self, sensor_type: SensorType) -> Option<&TypeBands> {
        match sensor_type {
            SensorType::Humidity => Some(&self.humidity),
            SensorType::Vibration => Some(&self.vibration),
            SensorType::Stress => Some(&self.stress),
            SensorType::Other => None,
            _ => None,
        }
    }

    /// Classify a sanitized value against the bands for its type.
    ///
    /// Types absent from the table are always `Normal`. Away from shared
    /// edges, critical precedes warning; on a shared edge the configured
    /// [`BoundaryRule`] decides.
    #[must_use]
    pub fn classify(&self, sensor_type: SensorType, value: f64) -> HealthStatus {
        let Some(bands) = self.bands_for(sensor_type) else {
            return HealthStatus::Normal;
        };

        let in_critical = bands.critical.iter().any(|b| b.contains(value));
        let in_warning = bands.warning.iter().any(|b| b.contains(value));

        match (in_critical, in_warning) {
            (true, true) => match self.boundary {
                BoundaryRule::CriticalWins => HealthStatus::Critical,
                BoundaryRule::WarningWins => HealthStatus::Warning,
            },
            (true, false) => HealthStatus::Critical,
            (false, true) => HealthStatus::Warning,
            (false, false) => HealthStatus::Normal,
        }
    }

    /// Derive a sensor's health classification.
    ///
    /// Priority order:
    ///
    /// 1. no `last_update`, or older than the silence window → `Offline`
    /// 2. no sanitized value → `Offline`
    /// 3. band classification for the sensor type
    #[must_use]
    pub fn derive(
        &self,
        sensor_type: SensorType,
        last_value: Option<f64>,
        last_update: Option<OffsetDateTime>,
        now: OffsetDateTime,
    ) -> HealthStatus {
        let Some(updated) = last_update else {
            return HealthStatus::Offline;
        };
        let age_ms = (now - updated).whole_milliseconds();
        if age_ms > self.offline_after.as_millis() as i128 {
            return HealthStatus::Offline;
        }

        let Some(value) = last_value.filter(|v| v.is_finite()) else {
            return HealthStatus::Offline;
        };

        self.classify(sensor_type, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn now() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()
    }

    #[test]
    fn test_humidity_bands() {
        let r = StatusRules::default();
        assert_eq!(r.classify(SensorType::Humidity, 10.0), HealthStatus::Critical);
        assert_eq!(r.classify(SensorType::Humidity, 25.0), HealthStatus::Warning);
        assert_eq!(r.classify(SensorType::Humidity, 50.0), HealthStatus::Normal);
        assert_eq!(r.classify(SensorType::Humidity, 75.0), HealthStatus::Warning);
        assert_eq!(r.classify(SensorType::Humidity, 85.0), HealthStatus::Critical);
    }

    #[test]
    fn test_vibration_bands() {
        let r = StatusRules::default();
        assert_eq!(r.classify(SensorType::Vibration, 5.0), HealthStatus::Normal);
        assert_eq!(r.classify(SensorType::Vibration, 30.0), HealthStatus::Warning);
        assert_eq!(r.classify(SensorType::Vibration, 75.0), HealthStatus::Critical);
        assert_eq!(r.classify(SensorType::Vibration, 10_000.0), HealthStatus::Critical);
    }

    #[test]
    fn test_stress_bands() {
        let r = StatusRules::default();
        assert_eq!(r.classify(SensorType::Stress, 40.0), HealthStatus::Normal);
        assert_eq!(r.classify(SensorType::Stress, 70.0), HealthStatus::Warning);
        assert_eq!(r.classify(SensorType::Stress, 95.0), HealthStatus::Critical);
    }

    #[test]
    fn test_untabled_type_is_normal() {
        let r = StatusRules::default();
        assert_eq!(r.classify(SensorType::Other, 1e9), HealthStatus::Normal);
        assert_eq!(r.classify(SensorType::Other, -1e9), HealthStatus::Normal);
    }

    #[test]
    fn test_shared_edges_critical_wins() {
        let r = StatusRules::default();
        // Humidity 20 and 80 sit on a critical/warning edge.
        assert_eq!(r.classify(SensorType::Humidity, 20.0), HealthStatus::Critical);
        assert_eq!(r.classify(SensorType::Humidity, 80.0), HealthStatus::Critical);
        // Vibration 50 and stress 80 likewise.
        assert_eq!(r.classify(SensorType::Vibration, 50.0), HealthStatus::Critical);
        assert_eq!(r.classify(SensorType::Stress, 80.0), HealthStatus::Critical);
    }

    #[test]
    fn test_shared_edges_warning_wins() {
        let r = StatusRules::with_boundary(BoundaryRule::WarningWins);
        assert_eq!(r.classify(SensorType::Humidity, 20.0), HealthStatus::Warning);
        assert_eq!(r.classify(SensorType::Humidity, 80.0), HealthStatus::Warning);
        assert_eq!(r.classify(SensorType::Vibration, 50.0), HealthStatus::Warning);
        assert_eq!(r.classify(SensorType::Stress, 80.0), HealthStatus::Warning);
        // Interior values are unaffected by the edge rule.
        assert_eq!(r.classify(SensorType::Humidity, 10.0), HealthStatus::Critical);
        assert_eq!(r.classify(SensorType::Humidity, 25.0), HealthStatus::Warning);
    }

    #[test]
    fn test_warning_edges_not_shared_with_critical() {
        let r = StatusRules::default();
        // 30 and 70 touch only the warning bands.
        assert_eq!(r.classify(SensorType::Humidity, 30.0), HealthStatus::Warning);
        assert_eq!(r.classify(SensorType::Humidity, 70.0), HealthStatus::Warning);
    }

    #[test]
    fn test_derive_missing_update_is_offline() {
        let r = StatusRules::default();
        assert_eq!(
            r.derive(SensorType::Humidity, Some(50.0), None, now()),
            HealthStatus::Offline
        );
    }

    #[test]
    fn test_derive_stale_update_is_offline() {
        let r = StatusRules::default();
        let updated = now() - time::Duration::seconds(301);
        assert_eq!(
            r.derive(SensorType::Humidity, Some(50.0), Some(updated), now()),
            HealthStatus::Offline
        );
        // Exactly at the window edge is still alive.
        let updated = now() - time::Duration::seconds(300);
        assert_eq!(
            r.derive(SensorType::Humidity, Some(50.0), Some(updated), now()),
            HealthStatus::Normal
        );
    }

    #[test]
    fn test_derive_missing_value_is_offline() {
        let r = StatusRules::default();
        assert_eq!(
            r.derive(SensorType::Humidity, None, Some(now()), now()),
            HealthStatus::Offline
        );
    }

    #[test]
    fn test_derive_future_update_is_not_stale() {
        let r = StatusRules::default();
        let updated = now() + time::Duration::seconds(5);
        assert_eq!(
            r.derive(SensorType::Stress, Some(40.0), Some(updated), now()),
            HealthStatus::Normal
        );
    }

    proptest! {
        // Total: every (type, value, staleness) input maps to exactly one of
        // the four classes without panicking.
        #[test]
        fn prop_derive_is_total(
            type_idx in 0usize..4,
            value in proptest::option::of(-1e9f64..1e9),
            age_secs in proptest::option::of(0i64..100_000),
        ) {
            let sensor_type = [
                SensorType::Humidity,
                SensorType::Vibration,
                SensorType::Stress,
                SensorType::Other,
            ][type_idx];
            let r = StatusRules::default();
            let last_update = age_secs.map(|s| now() - time::Duration::seconds(s));
            let status = r.derive(sensor_type, value, last_update, now());
            prop_assert!(matches!(
                status,
                HealthStatus::Offline
                    | HealthStatus::Critical
                    | HealthStatus::Warning
                    | HealthStatus::Normal
            ));
        }

        // Critical precedes warning whenever both bands would match.
        #[test]
        fn prop_critical_precedes_warning(value in 0f64..100.0) {
            let r = StatusRules::default();
            let Some(bands) = r.bands_for(SensorType::Humidity) else {
                unreachable!()
            };
            let in_critical = bands.critical.iter().any(|b| b.contains(value));
            if in_critical {
                prop_assert_eq!(
                    r.classify(SensorType::Humidity, value),
                    HealthStatus::Critical
                );
            }
        }
    }
}
