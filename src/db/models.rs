use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ServiceError;

pub const DEFAULT_TEMP_MIN: f64 = 20.0;
pub const DEFAULT_TEMP_MAX: f64 = 30.0;
pub const DEFAULT_HUMIDITY_MIN: f64 = 40.0;
pub const DEFAULT_HUMIDITY_MAX: f64 = 70.0;

/// Mirrors the `relay_mode` Postgres enum.
///
/// `Auto`: the relay follows threshold breaches and direct status writes are refused.
/// `Manual`: the relay only changes through explicit status requests.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "relay_mode", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RelayMode {
    #[default]
    Auto,
    Manual,
}

impl fmt::Display for RelayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RelayMode::Auto => "auto",
            RelayMode::Manual => "manual",
        };
        f.write_str(s)
    }
}

impl FromStr for RelayMode {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            other => Err(ServiceError::InvalidMode(other.to_owned())),
        }
    }
}

/// A `[min, max]` range a sensor value is classified against.
///
/// Only constructed through [`Band::new`] / [`Band::humidity`], so `min < max`
/// holds for every instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    pub fn new(min: f64, max: f64) -> Result<Self, ServiceError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(ServiceError::InvalidRange(format!(
                "bounds must be finite numbers, got min={min} max={max}"
            )));
        }
        if min >= max {
            return Err(ServiceError::InvalidRange(format!(
                "minimum ({min}) must be less than maximum ({max})"
            )));
        }
        Ok(Self { min, max })
    }

    /// Like [`Band::new`], additionally requiring both bounds inside `[0, 100]`.
    pub fn humidity(min: f64, max: f64) -> Result<Self, ServiceError> {
        let band = Self::new(min, max)?;
        if band.min < 0.0 || band.max > 100.0 {
            return Err(ServiceError::InvalidRange(format!(
                "humidity bounds must be between 0% and 100%, got min={min} max={max}"
            )));
        }
        Ok(band)
    }
}

/// Validated threshold change. `None` leaves that band as stored.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ThresholdUpdate {
    pub temperature: Option<Band>,
    pub humidity: Option<Band>,
}

impl ThresholdUpdate {
    pub fn apply(&self, device: &mut Device) {
        if let Some(band) = self.temperature {
            device.temp_min = band.min;
            device.temp_max = band.max;
        }
        if let Some(band) = self.humidity {
            device.humidity_min = band.min;
            device.humidity_max = band.max;
        }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Device {
    pub device_id: String,
    pub owner: String,
    pub display_text: String,
    pub relay_status: bool,
    pub relay_mode: RelayMode,
    /// Degrees Celsius
    pub temp_min: f64,
    /// Degrees Celsius
    pub temp_max: f64,
    /// Relative humidity percentage
    pub humidity_min: f64,
    /// Relative humidity percentage
    pub humidity_max: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Device {
    /// A freshly registered device: relay off, auto mode, default bands.
    pub fn new(device_id: &str, owner: &str, display_text: &str, now: DateTime<Utc>) -> Self {
        Self {
            device_id: device_id.to_owned(),
            owner: owner.to_owned(),
            display_text: display_text.to_owned(),
            relay_status: false,
            relay_mode: RelayMode::Auto,
            temp_min: DEFAULT_TEMP_MIN,
            temp_max: DEFAULT_TEMP_MAX,
            humidity_min: DEFAULT_HUMIDITY_MIN,
            humidity_max: DEFAULT_HUMIDITY_MAX,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn temperature_band(&self) -> Band {
        Band {
            min: self.temp_min,
            max: self.temp_max,
        }
    }

    pub fn humidity_band(&self) -> Band {
        Band {
            min: self.humidity_min,
            max: self.humidity_max,
        }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Reading {
    pub id: Uuid,
    pub device_id: String,
    /// Degrees Celsius
    pub temperature: f64,
    /// Relative humidity percentage
    pub humidity: f64,
    /// Relay state reported with this sample, independent of the device's current state.
    pub relay_status: bool,
    pub recorded_at: DateTime<Utc>,
}

/// A reading before the store has assigned its id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub device_id: String,
    pub temperature: f64,
    pub humidity: f64,
    pub relay_status: bool,
}
