use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::{
    db::{
        models::{NewReading, Reading},
        Store,
    },
    error::{Result, ServiceError},
    history::{self, HistoryWindow},
    thresholds::Assessment,
};

/// A stored reading plus, for registered devices, how it compares to the
/// device's bands.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub reading: Reading,
    pub assessment: Option<Assessment>,
}

#[derive(Debug, Clone)]
pub struct History {
    pub window: HistoryWindow,
    pub readings: Vec<Reading>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SystemStatus {
    pub database_connected: bool,
    pub last_data_time: Option<DateTime<Utc>>,
    /// Seconds since `last_data_time`.
    pub data_age_secs: Option<i64>,
    pub total_records: i64,
    pub server_time: DateTime<Utc>,
}

/// Ingestion and read access for the append-only reading log.
#[derive(Clone)]
pub struct ReadingService {
    store: Arc<dyn Store>,
}

impl ReadingService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Append one sample. The device does not have to be registered; when it
    /// is, the sample is classified against its current bands.
    pub async fn ingest(
        &self,
        device_id: &str,
        temperature: f64,
        humidity: f64,
        relay_status: bool,
    ) -> Result<Ingested> {
        let device_id = device_id.trim();
        if device_id.is_empty() {
            return Err(ServiceError::MissingParameter("device_id"));
        }

        // Classify first so a failed lookup leaves nothing stored.
        let assessment = self
            .store
            .load_device(device_id)
            .await?
            .map(|device| Assessment::of(&device, temperature, humidity));

        let reading = self
            .store
            .insert_reading(&NewReading {
                device_id: device_id.to_owned(),
                temperature,
                humidity,
                relay_status,
            })
            .await?;

        match &assessment {
            Some(a) if a.any_alert() => warn!(
                device_id = %device_id,
                temperature,
                humidity,
                temperature_status = ?a.temperature.status,
                humidity_status = ?a.humidity.status,
                "Reading outside thresholds"
            ),
            Some(_) => info!(device_id = %device_id, temperature, humidity, "Reading stored"),
            None => info!(
                device_id = %device_id,
                temperature,
                humidity,
                "Reading stored for unregistered device"
            ),
        }

        Ok(Ingested {
            reading,
            assessment,
        })
    }

    pub async fn latest(&self, device_id: Option<&str>) -> Result<Reading> {
        self.store
            .latest_reading(device_id)
            .await?
            .ok_or(ServiceError::NoData)
    }

    /// Readings from the last `duration_hours`, oldest first.
    pub async fn history(&self, duration_hours: f64, device_id: Option<&str>) -> Result<History> {
        let window = history::plan(duration_hours)?;
        let since = window.since(Utc::now());
        info!(
            hours = duration_hours,
            unit = ?window.unit,
            value = window.value,
            device_id = ?device_id,
            "History query planned"
        );

        let readings = self.store.query_readings(device_id, since).await?;
        Ok(History { window, readings })
    }

    /// Never fails: an unreachable store is reported as
    /// `database_connected = false`.
    pub async fn status(&self) -> SystemStatus {
        let server_time = Utc::now();
        let mut status = SystemStatus {
            database_connected: false,
            last_data_time: None,
            data_age_secs: None,
            total_records: 0,
            server_time,
        };

        if let Err(e) = self.store.ping().await {
            warn!(error = %e, "Store unreachable");
            return status;
        }
        status.database_connected = true;

        match self.store.latest_reading(None).await {
            Ok(latest) => {
                status.last_data_time = latest.as_ref().map(|r| r.recorded_at);
                status.data_age_secs = latest.map(|r| (server_time - r.recorded_at).num_seconds());
            }
            Err(e) => warn!(error = %e, "Failed to fetch latest reading"),
        }
        match self.store.count_readings().await {
            Ok(n) => status.total_records = n,
            Err(e) => warn!(error = %e, "Failed to count readings"),
        }

        status
    }
}
