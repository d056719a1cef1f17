use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::{
    db::{
        models::{Device, RelayMode},
        Store,
    },
    error::{Result, ServiceError},
};

use super::status::relay_label;

/// Per-device relay mode state machine.
///
/// `set_mode` is always allowed. `set_status` is only accepted in
/// `Manual` mode; it never switches the mode implicitly.
#[derive(Clone)]
pub struct RelayController {
    store: Arc<dyn Store>,
}

impl RelayController {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Switch `device_id` to `new_mode` (`"auto"` or `"manual"`).
    pub async fn set_mode(&self, device_id: &str, new_mode: &str) -> Result<Device> {
        let mode: RelayMode = new_mode.parse()?;

        let device = self
            .store
            .update_relay_mode(device_id, mode, Utc::now())
            .await?
            .ok_or_else(|| ServiceError::NotFound(device_id.to_owned()))?;

        info!(device_id = %device_id, mode = %mode, "Relay mode changed");
        Ok(device)
    }

    /// Set the relay of a device in manual mode, then read the stored value
    /// back and fail with `StorageFailure` unless it matches `desired`.
    ///
    /// The mode check is part of the store write, so a concurrent switch to
    /// `Auto` is never overwritten.
    pub async fn set_status(&self, device_id: &str, desired: bool) -> Result<Device> {
        let written = self
            .store
            .update_relay_status(device_id, desired, Utc::now())
            .await?;

        if written.is_none() {
            let device = self.load(device_id).await?;
            warn!(
                device_id = %device_id,
                mode = %device.relay_mode,
                requested = relay_label(desired),
                "Rejected manual relay change"
            );
            return Err(ServiceError::ModeConflict {
                current_mode: device.relay_mode,
            });
        }

        let stored = self.store.load_device(device_id).await?;
        match stored {
            Some(stored) if stored.relay_status == desired => {
                info!(
                    device_id = %device_id,
                    status = relay_label(desired),
                    "Relay status set"
                );
                Ok(stored)
            }
            other => {
                warn!(
                    device_id = %device_id,
                    requested = relay_label(desired),
                    stored = ?other.map(|d| d.relay_status),
                    "Relay status write not confirmed"
                );
                Err(ServiceError::StorageFailure(anyhow::anyhow!(
                    "relay status write for device {device_id} was not confirmed"
                )))
            }
        }
    }

    async fn load(&self, device_id: &str) -> Result<Device> {
        self.store
            .load_device(device_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(device_id.to_owned()))
    }
}
