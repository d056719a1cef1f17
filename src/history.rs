//! Turns a requested look-back in (possibly fractional) hours into the unit
//! and amount used to bound a history query.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{Result, ServiceError};

pub const MIN_HOURS: f64 = 0.001;
pub const MAX_HOURS: f64 = 168.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
}

/// "The last `value` `unit`s". `value` is a whole number for seconds and
/// minutes; hours may be fractional.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct HistoryWindow {
    pub unit: TimeUnit,
    pub value: f64,
}

impl HistoryWindow {
    pub fn duration(&self) -> Duration {
        match self.unit {
            TimeUnit::Seconds => Duration::seconds(self.value as i64),
            TimeUnit::Minutes => Duration::minutes(self.value as i64),
            TimeUnit::Hours => Duration::milliseconds((self.value * 3_600_000.0).round() as i64),
        }
    }

    /// Inclusive lower bound of the window ending at `now`.
    pub fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.duration()
    }
}

/// Pick the coarsest unit that still represents `duration_hours` precisely:
///
/// | hours          | unit    | value                  |
/// |----------------|---------|------------------------|
/// | `< 0.1`        | seconds | `round(hours * 3600)`  |
/// | `0.1 ..< 1`    | minutes | `round(hours * 60)`    |
/// | `>= 1`         | hours   | `hours`                |
///
/// Anything outside `0.001 ..= 168` (or NaN) is `OutOfRange`.
pub fn plan(duration_hours: f64) -> Result<HistoryWindow> {
    if !(MIN_HOURS..=MAX_HOURS).contains(&duration_hours) {
        return Err(ServiceError::OutOfRange(duration_hours));
    }

    let window = if duration_hours < 0.1 {
        HistoryWindow {
            unit: TimeUnit::Seconds,
            value: (duration_hours * 3600.0).round(),
        }
    } else if duration_hours < 1.0 {
        HistoryWindow {
            unit: TimeUnit::Minutes,
            value: (duration_hours * 60.0).round(),
        }
    } else {
        HistoryWindow {
            unit: TimeUnit::Hours,
            value: duration_hours,
        }
    };

    Ok(window)
}
