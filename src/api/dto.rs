use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    control::{parse_relay_status, relay_label},
    db::models::{Device, Reading, RelayMode},
    error::Result,
    history::TimeUnit,
    sensors::History,
    thresholds::Assessment,
};

/// Request body for `POST /devices`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub device_id: String,
    /// Defaults to the configured owner placeholder.
    pub owner: Option<String>,
    /// Defaults to `device_id`.
    pub display_text: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    /// `false` when the device already existed.
    pub created: bool,
    pub device: Device,
}

/// What device firmware needs to run its local control loop.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeviceConfigDto {
    pub device_id: String,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity_min: f64,
    pub humidity_max: f64,
    pub relay_status: bool,
    pub relay_mode: RelayMode,
}

impl From<Device> for DeviceConfigDto {
    fn from(d: Device) -> Self {
        Self {
            device_id: d.device_id,
            temp_min: d.temp_min,
            temp_max: d.temp_max,
            humidity_min: d.humidity_min,
            humidity_max: d.humidity_max,
            relay_status: d.relay_status,
            relay_mode: d.relay_mode,
        }
    }
}

/// Request body for `PUT /devices/{device_id}/relay/mode`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RelayModeRequest {
    /// `"auto"` or `"manual"`.
    #[serde(default)]
    pub mode: String,
}

/// A relay status as sent by the dashboard or firmware: a JSON boolean, or a
/// token such as `"ON"`, `"false"`, `1`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum RelayStatusInput {
    Flag(bool),
    Number(i64),
    Text(String),
}

impl RelayStatusInput {
    pub fn resolve(&self) -> Result<bool> {
        match self {
            RelayStatusInput::Flag(on) => Ok(*on),
            RelayStatusInput::Number(n) => parse_relay_status(&n.to_string()),
            RelayStatusInput::Text(s) => parse_relay_status(s),
        }
    }
}

/// Request body for `PUT /devices/{device_id}/relay/status`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RelayStatusRequest {
    pub status: RelayStatusInput,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RelayStateDto {
    pub device_id: String,
    pub mode: RelayMode,
    pub relay_status: bool,
    /// `"ON"` or `"OFF"`.
    pub status: String,
}

impl From<Device> for RelayStateDto {
    fn from(d: Device) -> Self {
        Self {
            status: relay_label(d.relay_status).to_owned(),
            device_id: d.device_id,
            mode: d.relay_mode,
            relay_status: d.relay_status,
        }
    }
}

/// Request body for `POST /readings`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct IngestRequest {
    #[serde(default)]
    pub device_id: String,
    /// Degrees Celsius
    pub temperature: Option<f64>,
    /// Relative humidity percentage
    pub humidity: Option<f64>,
    /// Relay state at sampling time. Defaults to off.
    pub relay_status: Option<RelayStatusInput>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IngestResponse {
    pub reading: Reading,
    /// Present only when the device is registered.
    pub assessment: Option<Assessment>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryResponse {
    /// Ordered by `recorded_at ASC`.
    pub data: Vec<Reading>,
    pub hours: f64,
    pub device_id: Option<String>,
    pub count: usize,
    pub time_unit: TimeUnit,
    pub time_value: f64,
}

impl HistoryResponse {
    pub fn new(hours: f64, device_id: Option<String>, history: History) -> Self {
        Self {
            count: history.readings.len(),
            data: history.readings,
            hours,
            device_id,
            time_unit: history.window.unit,
            time_value: history.window.value,
        }
    }
}
