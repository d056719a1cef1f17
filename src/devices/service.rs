use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    db::{
        models::{Band, Device, ThresholdUpdate},
        Store,
    },
    error::{Result, ServiceError},
};

/// Raw threshold bounds as supplied by a caller. A band is only touched when
/// both of its bounds are present.
#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema)]
pub struct ThresholdBounds {
    pub temp_min: Option<f64>,
    pub temp_max: Option<f64>,
    pub humidity_min: Option<f64>,
    pub humidity_max: Option<f64>,
}

impl TryFrom<ThresholdBounds> for ThresholdUpdate {
    type Error = ServiceError;

    fn try_from(b: ThresholdBounds) -> Result<Self> {
        let temperature = match (b.temp_min, b.temp_max) {
            (Some(min), Some(max)) => Some(Band::new(min, max).map_err(|_| {
                ServiceError::InvalidRange(format!(
                    "temperature minimum ({min}) must be less than maximum ({max})"
                ))
            })?),
            _ => None,
        };
        let humidity = match (b.humidity_min, b.humidity_max) {
            (Some(min), Some(max)) => Some(Band::humidity(min, max)?),
            _ => None,
        };

        if temperature.is_none() && humidity.is_none() {
            return Err(ServiceError::NoFieldsProvided);
        }
        Ok(Self {
            temperature,
            humidity,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub device: Device,
    /// `false` when the device already existed and was returned unchanged.
    pub created: bool,
}

/// Owns device identity, per-device thresholds and relay state.
#[derive(Clone)]
pub struct DeviceRegistry {
    store: Arc<dyn Store>,
    default_owner: String,
}

impl DeviceRegistry {
    pub fn new(store: Arc<dyn Store>, default_owner: impl Into<String>) -> Self {
        Self {
            store,
            default_owner: default_owner.into(),
        }
    }

    /// Idempotent: an existing `device_id` is returned as-is with
    /// `created = false`. Blank `owner`/`display_text` fall back to the
    /// configured owner placeholder and the device id.
    pub async fn register(
        &self,
        device_id: &str,
        owner: Option<&str>,
        display_text: Option<&str>,
    ) -> Result<Registration> {
        let device_id = device_id.trim();
        if device_id.is_empty() {
            return Err(ServiceError::MissingParameter("device_id"));
        }

        if let Some(device) = self.store.load_device(device_id).await? {
            info!(device_id = %device_id, "Device already registered");
            return Ok(Registration {
                device,
                created: false,
            });
        }

        let owner = non_blank(owner).unwrap_or(&self.default_owner);
        let display_text = non_blank(display_text).unwrap_or(device_id);
        let device = Device::new(device_id, owner, display_text, Utc::now());

        if self.store.insert_device(&device).await? {
            info!(device_id = %device_id, owner = %owner, "Device registered");
            return Ok(Registration {
                device,
                created: true,
            });
        }

        // Lost a race with a concurrent registration of the same id.
        let device = self.get(device_id).await?;
        Ok(Registration {
            device,
            created: false,
        })
    }

    pub async fn get(&self, device_id: &str) -> Result<Device> {
        self.store
            .load_device(device_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(device_id.to_owned()))
    }

    pub async fn list(&self) -> Result<Vec<Device>> {
        Ok(self.store.list_devices().await?)
    }

    /// Validates every supplied band before loading or writing anything.
    pub async fn update_thresholds(
        &self,
        device_id: &str,
        bounds: ThresholdBounds,
    ) -> Result<Device> {
        let update = ThresholdUpdate::try_from(bounds)?;

        let device = self
            .store
            .update_thresholds(device_id, &update, Utc::now())
            .await?
            .ok_or_else(|| ServiceError::NotFound(device_id.to_owned()))?;

        info!(
            device_id = %device_id,
            temperature = ?update.temperature,
            humidity = ?update.humidity,
            "Thresholds updated"
        );
        Ok(device)
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}
