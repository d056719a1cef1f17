//! Classification of a sensor value against a device's `[min, max]` band.

use serde::Serialize;
use utoipa::ToSchema;

use crate::db::models::{Band, Device};

/// Fraction of the band width, measured in from each bound, that counts as
/// the warning zone.
pub const WARNING_EDGE: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BandStatus {
    Normal,
    Warning,
    Alert,
    /// The band itself is unusable (`min >= max` or non-finite bounds).
    InvalidRange,
}

impl BandStatus {
    /// `true` for `Alert` and for an unusable band.
    pub fn is_alert(self) -> bool {
        matches!(self, BandStatus::Alert | BandStatus::InvalidRange)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Classification {
    pub status: BandStatus,
    /// Position of the clamped value inside the band, 0 at `min` and 100 at `max`.
    pub position_pct: f64,
}

/// Classify `value` against `[min, max]`.
///
/// - outside the band → `Alert`
/// - strictly within `WARNING_EDGE * (max - min)` of either bound → `Warning`
/// - otherwise → `Normal`
///
/// A band with `min >= max` yields `InvalidRange` at position 0 instead of
/// dividing by zero. A non-finite value is an `Alert` at position 0.
pub fn classify(value: f64, min: f64, max: f64) -> Classification {
    if !min.is_finite() || !max.is_finite() || min >= max {
        return Classification {
            status: BandStatus::InvalidRange,
            position_pct: 0.0,
        };
    }
    if !value.is_finite() {
        return Classification {
            status: BandStatus::Alert,
            position_pct: 0.0,
        };
    }

    let width = max - min;
    let position_pct = (value.clamp(min, max) - min) / width * 100.0;

    let status = if value < min || value > max {
        BandStatus::Alert
    } else {
        let edge = WARNING_EDGE * width;
        if value < min + edge || value > max - edge {
            BandStatus::Warning
        } else {
            BandStatus::Normal
        }
    };

    Classification {
        status,
        position_pct,
    }
}

/// [`classify`] against a validated [`Band`].
pub fn classify_band(value: f64, band: Band) -> Classification {
    classify(value, band.min, band.max)
}

/// Both readings of one sample classified against the owning device's bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Assessment {
    pub temperature: Classification,
    pub humidity: Classification,
}

impl Assessment {
    pub fn of(device: &Device, temperature: f64, humidity: f64) -> Self {
        Self {
            temperature: classify_band(temperature, device.temperature_band()),
            humidity: classify_band(humidity, device.humidity_band()),
        }
    }

    pub fn any_alert(&self) -> bool {
        self.temperature.status.is_alert() || self.humidity.status.is_alert()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn middle_of_band_is_normal() {
        let c = classify(25.0, 20.0, 30.0);
        assert_eq!(c.status, BandStatus::Normal);
        assert_eq!(c.position_pct, 50.0);
    }

    #[test]
    fn near_either_bound_is_warning() {
        // edge = 1.5 on a 20..30 band
        assert_eq!(classify(21.0, 20.0, 30.0).status, BandStatus::Warning);
        assert_eq!(classify(29.0, 20.0, 30.0).status, BandStatus::Warning);
        assert_eq!(classify(20.0, 20.0, 30.0).status, BandStatus::Warning);
        assert_eq!(classify(30.0, 20.0, 30.0).status, BandStatus::Warning);
        assert_eq!(classify(21.6, 20.0, 30.0).status, BandStatus::Normal);
        assert_eq!(classify(28.4, 20.0, 30.0).status, BandStatus::Normal);
    }

    #[test]
    fn exact_edge_is_normal() {
        assert_eq!(classify(21.5, 20.0, 30.0).status, BandStatus::Normal);
        assert_eq!(classify(28.5, 20.0, 30.0).status, BandStatus::Normal);
        assert_eq!(classify(21.4, 20.0, 30.0).status, BandStatus::Warning);
        assert_eq!(classify(28.6, 20.0, 30.0).status, BandStatus::Warning);
    }

    #[test]
    fn outside_band_is_alert_with_clamped_position() {
        let low = classify(10.0, 20.0, 30.0);
        assert_eq!(low.status, BandStatus::Alert);
        assert_eq!(low.position_pct, 0.0);

        let high = classify(45.0, 20.0, 30.0);
        assert_eq!(high.status, BandStatus::Alert);
        assert_eq!(high.position_pct, 100.0);
    }

    #[test]
    fn inverted_or_empty_band_degrades_to_invalid_range() {
        for (min, max) in [(30.0, 20.0), (25.0, 25.0), (f64::NAN, 30.0)] {
            let c = classify(25.0, min, max);
            assert_eq!(c.status, BandStatus::InvalidRange);
            assert_eq!(c.position_pct, 0.0);
            assert!(c.status.is_alert());
        }
    }

    #[test]
    fn non_finite_value_is_alert() {
        let c = classify(f64::NAN, 20.0, 30.0);
        assert_eq!(c.status, BandStatus::Alert);
        assert_eq!(c.position_pct, 0.0);
    }

    #[test]
    fn position_is_monotonic_and_bounded() {
        let mut last = -1.0;
        let mut v = 0.0;
        while v <= 100.0 {
            let c = classify(v, 40.0, 70.0);
            assert!((0.0..=100.0).contains(&c.position_pct));
            assert!(c.position_pct >= last);
            last = c.position_pct;
            v += 0.5;
        }
    }

    #[test]
    fn assessment_uses_device_bands() {
        let device = Device::new("dev-1", "owner", "dev-1", Utc::now());
        let a = Assessment::of(&device, 25.0, 80.0);
        assert_eq!(a.temperature.status, BandStatus::Normal);
        assert_eq!(a.humidity.status, BandStatus::Alert);
        assert!(a.any_alert());

        let ok = Assessment::of(&device, 25.0, 55.0);
        assert!(!ok.any_alert());
    }
}
