use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{
    models::{Device, NewReading, Reading, RelayMode, ThresholdUpdate},
    Store,
};

const DEVICE_COLUMNS: &str = "device_id, owner, display_text, relay_status, relay_mode, \
     temp_min, temp_max, humidity_min, humidity_max, created_at, updated_at";

const READING_COLUMNS: &str = "id, device_id, temperature, humidity, relay_status, recorded_at";

/// Advisory lock key held while a reading is inserted.
const READINGS_LOCK_KEY: i64 = 0x7265_6164_696e_6773;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn load_device(&self, device_id: &str) -> Result<Option<Device>> {
        let sql = format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE device_id = $1");
        sqlx::query_as::<_, Device>(&sql)
            .bind(device_id)
            .fetch_optional(&self.pool)
            .await
            .context("load_device failed")
    }

    async fn insert_device(&self, device: &Device) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO devices (
                device_id, owner, display_text, relay_status, relay_mode,
                temp_min, temp_max, humidity_min, humidity_max,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (device_id) DO NOTHING
            "#,
        )
        .bind(&device.device_id)
        .bind(&device.owner)
        .bind(&device.display_text)
        .bind(device.relay_status)
        .bind(device.relay_mode)
        .bind(device.temp_min)
        .bind(device.temp_max)
        .bind(device.humidity_min)
        .bind(device.humidity_max)
        .bind(device.created_at)
        .bind(device.updated_at)
        .execute(&self.pool)
        .await
        .context("insert_device failed")?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_relay_mode(
        &self,
        device_id: &str,
        mode: RelayMode,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Device>> {
        let sql = format!(
            "UPDATE devices SET relay_mode = $2, updated_at = $3 \
             WHERE device_id = $1 \
             RETURNING {DEVICE_COLUMNS}"
        );
        sqlx::query_as::<_, Device>(&sql)
            .bind(device_id)
            .bind(mode)
            .bind(updated_at)
            .fetch_optional(&self.pool)
            .await
            .context("update_relay_mode failed")
    }

    async fn update_relay_status(
        &self,
        device_id: &str,
        relay_status: bool,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Device>> {
        // The mode check and the write are one statement, so a concurrent
        // switch to auto either lands first and blocks this write, or after it.
        let sql = format!(
            "UPDATE devices SET relay_status = $2, updated_at = $3 \
             WHERE device_id = $1 AND relay_mode = 'manual' \
             RETURNING {DEVICE_COLUMNS}"
        );
        sqlx::query_as::<_, Device>(&sql)
            .bind(device_id)
            .bind(relay_status)
            .bind(updated_at)
            .fetch_optional(&self.pool)
            .await
            .context("update_relay_status failed")
    }

    async fn update_thresholds(
        &self,
        device_id: &str,
        update: &ThresholdUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Device>> {
        let sql = format!(
            "UPDATE devices SET \
                 temp_min     = COALESCE($2, temp_min), \
                 temp_max     = COALESCE($3, temp_max), \
                 humidity_min = COALESCE($4, humidity_min), \
                 humidity_max = COALESCE($5, humidity_max), \
                 updated_at   = $6 \
             WHERE device_id = $1 \
             RETURNING {DEVICE_COLUMNS}"
        );
        sqlx::query_as::<_, Device>(&sql)
            .bind(device_id)
            .bind(update.temperature.map(|b| b.min))
            .bind(update.temperature.map(|b| b.max))
            .bind(update.humidity.map(|b| b.min))
            .bind(update.humidity.map(|b| b.max))
            .bind(updated_at)
            .fetch_optional(&self.pool)
            .await
            .context("update_thresholds failed")
    }

    async fn list_devices(&self) -> Result<Vec<Device>> {
        let sql = format!("SELECT {DEVICE_COLUMNS} FROM devices ORDER BY device_id");
        sqlx::query_as::<_, Device>(&sql)
            .fetch_all(&self.pool)
            .await
            .context("list_devices failed")
    }

    async fn insert_reading(&self, reading: &NewReading) -> Result<Reading> {
        let mut tx = self.pool.begin().await.context("insert_reading: begin failed")?;

        // Serialise inserts so recorded_at never goes backwards relative to seq.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(READINGS_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .context("insert_reading: lock failed")?;

        let sql = format!(
            "INSERT INTO sensor_readings (device_id, temperature, humidity, relay_status, recorded_at) \
             VALUES ($1, $2, $3, $4, GREATEST(clock_timestamp(), \
                 (SELECT COALESCE(MAX(recorded_at), '-infinity') FROM sensor_readings))) \
             RETURNING {READING_COLUMNS}"
        );
        let stored = sqlx::query_as::<_, Reading>(&sql)
            .bind(&reading.device_id)
            .bind(reading.temperature)
            .bind(reading.humidity)
            .bind(reading.relay_status)
            .fetch_one(&mut *tx)
            .await
            .context("insert_reading failed")?;

        tx.commit().await.context("insert_reading: commit failed")?;
        Ok(stored)
    }

    async fn query_readings(
        &self,
        device_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Reading>> {
        let sql = format!(
            "SELECT {READING_COLUMNS} FROM sensor_readings \
             WHERE ($1::text IS NULL OR device_id = $1) \
               AND recorded_at >= $2 \
             ORDER BY recorded_at ASC, seq ASC"
        );
        sqlx::query_as::<_, Reading>(&sql)
            .bind(device_id)
            .bind(since)
            .fetch_all(&self.pool)
            .await
            .context("query_readings failed")
    }

    async fn latest_reading(&self, device_id: Option<&str>) -> Result<Option<Reading>> {
        let sql = format!(
            "SELECT {READING_COLUMNS} FROM sensor_readings \
             WHERE ($1::text IS NULL OR device_id = $1) \
             ORDER BY recorded_at DESC, seq DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, Reading>(&sql)
            .bind(device_id)
            .fetch_optional(&self.pool)
            .await
            .context("latest_reading failed")
    }

    async fn count_readings(&self) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sensor_readings")
            .fetch_one(&self.pool)
            .await
            .context("count_readings failed")
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("database ping failed")?;
        Ok(())
    }
}

// These need a live Postgres: `DATABASE_URL=... cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use sqlx::PgPool;

    use super::*;
    use crate::db::models::Band;

    fn reading(device_id: &str, temperature: f64) -> NewReading {
        NewReading {
            device_id: device_id.to_owned(),
            temperature,
            humidity: 50.0,
            relay_status: false,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn insert_device_is_idempotent(pool: PgPool) {
        let store = PgStore::new(pool);
        let device = Device::new("dev1", "owner", "dev1", Utc::now());

        assert!(store.insert_device(&device).await.unwrap());
        assert!(!store.insert_device(&device).await.unwrap());
        assert_eq!(store.list_devices().await.unwrap().len(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn relay_status_write_is_conditional_on_manual_mode(pool: PgPool) {
        let store = PgStore::new(pool);
        store
            .insert_device(&Device::new("dev1", "owner", "dev1", Utc::now()))
            .await
            .unwrap();

        assert!(store
            .update_relay_status("dev1", true, Utc::now())
            .await
            .unwrap()
            .is_none());

        let d = store
            .update_relay_mode("dev1", RelayMode::Manual, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(d.relay_mode, RelayMode::Manual);

        let d = store
            .update_relay_status("dev1", true, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert!(d.relay_status);
        assert!(store
            .update_relay_mode("ghost", RelayMode::Auto, Utc::now())
            .await
            .unwrap()
            .is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn threshold_update_touches_only_supplied_band(pool: PgPool) {
        let store = PgStore::new(pool);
        store
            .insert_device(&Device::new("dev1", "owner", "dev1", Utc::now()))
            .await
            .unwrap();
        store
            .update_relay_mode("dev1", RelayMode::Manual, Utc::now())
            .await
            .unwrap();
        store.update_relay_status("dev1", true, Utc::now()).await.unwrap();

        let update = ThresholdUpdate {
            temperature: None,
            humidity: Some(Band::humidity(35.0, 65.0).unwrap()),
        };
        let d = store
            .update_thresholds("dev1", &update, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!((d.humidity_min, d.humidity_max), (35.0, 65.0));
        assert_eq!((d.temp_min, d.temp_max), (20.0, 30.0));
        assert!(d.relay_status);
        assert_eq!(d.relay_mode, RelayMode::Manual);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn concurrent_inserts_keep_timestamps_in_insertion_order(pool: PgPool) {
        let store = PgStore::new(pool.clone());
        let inserts = (0..20).map(|i| {
            let store = store.clone();
            tokio::spawn(async move { store.insert_reading(&reading("dev1", i as f64)).await })
        });
        for handle in inserts.collect::<Vec<_>>() {
            handle.await.unwrap().unwrap();
        }

        let stamps: Vec<DateTime<Utc>> =
            sqlx::query_scalar("SELECT recorded_at FROM sensor_readings ORDER BY seq")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(stamps.len(), 20);
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn query_readings_is_ascending_and_filtered(pool: PgPool) {
        let store = PgStore::new(pool);
        let since = Utc::now() - Duration::minutes(1);
        store.insert_reading(&reading("dev1", 20.0)).await.unwrap();
        store.insert_reading(&reading("dev2", 21.0)).await.unwrap();
        store.insert_reading(&reading("dev1", 22.0)).await.unwrap();

        let rows = store.query_readings(Some("dev1"), since).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].temperature, 20.0);
        assert_eq!(rows[1].temperature, 22.0);

        let all = store.query_readings(None, since).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(store.count_readings().await.unwrap(), 3);

        let latest = store.latest_reading(None).await.unwrap().unwrap();
        assert_eq!(latest.temperature, 22.0);
    }
}
