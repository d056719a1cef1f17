pub mod memory;
pub mod models;
pub mod postgres;
#[cfg(test)]
pub(crate) mod testing;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use self::models::{Device, NewReading, Reading, RelayMode, ThresholdUpdate};

pub use self::memory::MemoryStore;
pub use self::postgres::PgStore;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Persistence for device records and the append-only reading log.
///
/// Errors are plain `anyhow` errors; the services surface them as
/// `ServiceError::StorageFailure` without retrying.
#[async_trait]
pub trait Store: Send + Sync {
    async fn load_device(&self, device_id: &str) -> Result<Option<Device>>;

    /// Insert `device` unless its id already exists. Returns `false` when a
    /// record was already present, leaving it untouched.
    async fn insert_device(&self, device: &Device) -> Result<bool>;

    /// Set `relay_mode` and `updated_at` only. Returns the updated record,
    /// or `None` when the device does not exist.
    async fn update_relay_mode(
        &self,
        device_id: &str,
        mode: RelayMode,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Device>>;

    /// Set `relay_status` and `updated_at`, but only while the device is in
    /// `Manual` mode. Returns `None` when no row matched, either because the
    /// device does not exist or because it is in `Auto` mode.
    async fn update_relay_status(
        &self,
        device_id: &str,
        relay_status: bool,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Device>>;

    /// Overwrite the supplied bands and `updated_at`; other columns are left
    /// as stored. Returns `None` when the device does not exist.
    async fn update_thresholds(
        &self,
        device_id: &str,
        update: &ThresholdUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Device>>;

    /// All devices ordered by `device_id`.
    async fn list_devices(&self) -> Result<Vec<Device>>;

    /// Append a reading. The store assigns `id` and `recorded_at`, and
    /// `recorded_at` never decreases in insertion order, even under
    /// concurrent inserts.
    async fn insert_reading(&self, reading: &NewReading) -> Result<Reading>;

    /// Readings with `recorded_at >= since`, oldest first.
    async fn query_readings(
        &self,
        device_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Reading>>;

    async fn latest_reading(&self, device_id: Option<&str>) -> Result<Option<Reading>>;

    async fn count_readings(&self) -> Result<i64>;

    async fn ping(&self) -> Result<()>;
}
