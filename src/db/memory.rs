use std::{collections::BTreeMap, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    models::{Device, NewReading, Reading, RelayMode, ThresholdUpdate},
    Store,
};

/// Process-local `Store` used when no database is configured, and by tests.
///
/// Cloning shares the underlying data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    devices: BTreeMap<String, Device>,
    readings: Vec<Reading>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `f` to the stored device under the write lock. `f` returns
    /// `false` to reject the change, which then reports no matched row.
    async fn modify(
        &self,
        device_id: &str,
        f: impl FnOnce(&mut Device) -> bool + Send,
    ) -> Result<Option<Device>> {
        let mut inner = self.inner.write().await;
        Ok(inner.devices.get_mut(device_id).and_then(|d| {
            if f(&mut *d) {
                Some(d.clone())
            } else {
                None
            }
        }))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn load_device(&self, device_id: &str) -> Result<Option<Device>> {
        Ok(self.inner.read().await.devices.get(device_id).cloned())
    }

    async fn insert_device(&self, device: &Device) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if inner.devices.contains_key(&device.device_id) {
            return Ok(false);
        }
        inner
            .devices
            .insert(device.device_id.clone(), device.clone());
        Ok(true)
    }

    async fn update_relay_mode(
        &self,
        device_id: &str,
        mode: RelayMode,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Device>> {
        self.modify(device_id, |d| {
            d.relay_mode = mode;
            d.updated_at = updated_at;
            true
        })
        .await
    }

    async fn update_relay_status(
        &self,
        device_id: &str,
        relay_status: bool,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Device>> {
        self.modify(device_id, |d| {
            if d.relay_mode != RelayMode::Manual {
                return false;
            }
            d.relay_status = relay_status;
            d.updated_at = updated_at;
            true
        })
        .await
    }

    async fn update_thresholds(
        &self,
        device_id: &str,
        update: &ThresholdUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Device>> {
        self.modify(device_id, |d| {
            update.apply(d);
            d.updated_at = updated_at;
            true
        })
        .await
    }

    async fn list_devices(&self) -> Result<Vec<Device>> {
        Ok(self.inner.read().await.devices.values().cloned().collect())
    }

    async fn insert_reading(&self, reading: &NewReading) -> Result<Reading> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let recorded_at = match inner.readings.last() {
            Some(last) if last.recorded_at > now => last.recorded_at,
            _ => now,
        };

        let stored = Reading {
            id: Uuid::new_v4(),
            device_id: reading.device_id.clone(),
            temperature: reading.temperature,
            humidity: reading.humidity,
            relay_status: reading.relay_status,
            recorded_at,
        };
        inner.readings.push(stored.clone());
        Ok(stored)
    }

    async fn query_readings(
        &self,
        device_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Reading>> {
        // Insertion order is already ascending by recorded_at.
        Ok(self
            .inner
            .read()
            .await
            .readings
            .iter()
            .filter(|r| device_id.map_or(true, |id| r.device_id == id))
            .filter(|r| r.recorded_at >= since)
            .cloned()
            .collect())
    }

    async fn latest_reading(&self, device_id: Option<&str>) -> Result<Option<Reading>> {
        Ok(self
            .inner
            .read()
            .await
            .readings
            .iter()
            .rev()
            .find(|r| device_id.map_or(true, |id| r.device_id == id))
            .cloned())
    }

    async fn count_readings(&self) -> Result<i64> {
        Ok(self.inner.read().await.readings.len() as i64)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
