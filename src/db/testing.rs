use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    models::{Device, NewReading, Reading, RelayMode, ThresholdUpdate},
    MemoryStore, Store,
};

/// `MemoryStore` with switchable faults and interleavings for service tests.
#[derive(Clone, Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    /// `load_device` fails as if the database were unreachable.
    pub fail_device_loads: bool,
    /// Relay status writes report success but change nothing.
    pub drop_status_writes: bool,
    /// Another client switches the mode just before a status write lands.
    pub mode_before_status_write: Option<RelayMode>,
    /// Another client switches the mode just after a status write lands.
    pub mode_after_status_write: Option<RelayMode>,
}

impl FaultyStore {
    pub async fn seed(&self, device_id: &str) {
        self.inner
            .insert_device(&Device::new(device_id, "owner", device_id, Utc::now()))
            .await
            .unwrap();
    }
}

#[async_trait]
impl Store for FaultyStore {
    async fn load_device(&self, device_id: &str) -> Result<Option<Device>> {
        if self.fail_device_loads {
            bail!("connection refused");
        }
        self.inner.load_device(device_id).await
    }

    async fn insert_device(&self, device: &Device) -> Result<bool> {
        self.inner.insert_device(device).await
    }

    async fn update_relay_mode(
        &self,
        device_id: &str,
        mode: RelayMode,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Device>> {
        self.inner.update_relay_mode(device_id, mode, updated_at).await
    }

    async fn update_relay_status(
        &self,
        device_id: &str,
        relay_status: bool,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Device>> {
        if let Some(mode) = self.mode_before_status_write {
            self.inner.update_relay_mode(device_id, mode, Utc::now()).await?;
        }

        let written = if self.drop_status_writes {
            self.inner
                .load_device(device_id)
                .await?
                .filter(|d| d.relay_mode == RelayMode::Manual)
        } else {
            self.inner
                .update_relay_status(device_id, relay_status, updated_at)
                .await?
        };

        if let Some(mode) = self.mode_after_status_write {
            self.inner.update_relay_mode(device_id, mode, Utc::now()).await?;
        }
        Ok(written)
    }

    async fn update_thresholds(
        &self,
        device_id: &str,
        update: &ThresholdUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Device>> {
        self.inner.update_thresholds(device_id, update, updated_at).await
    }

    async fn list_devices(&self) -> Result<Vec<Device>> {
        self.inner.list_devices().await
    }

    async fn insert_reading(&self, reading: &NewReading) -> Result<Reading> {
        self.inner.insert_reading(reading).await
    }

    async fn query_readings(
        &self,
        device_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Reading>> {
        self.inner.query_readings(device_id, since).await
    }

    async fn latest_reading(&self, device_id: Option<&str>) -> Result<Option<Reading>> {
        self.inner.latest_reading(device_id).await
    }

    async fn count_readings(&self) -> Result<i64> {
        self.inner.count_readings().await
    }

    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }
}
