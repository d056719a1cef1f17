use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::OpenApi;

use super::{
    dto::{
        DeviceConfigDto, HistoryResponse, IngestRequest, IngestResponse, RegisterRequest,
        RegisterResponse, RelayModeRequest, RelayStateDto, RelayStatusInput, RelayStatusRequest,
    },
    errors::AppError,
    extract::ApiJson,
    AppState,
};
use crate::{
    db::models::{Device, Reading, RelayMode},
    devices::ThresholdBounds,
    error::ServiceError,
    history::TimeUnit,
    sensors::SystemStatus,
    thresholds::{Assessment, BandStatus, Classification},
};

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct DeviceFilterParams {
    pub device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub hours: Option<f64>,
    pub device_id: Option<String>,
}

/// An empty `device_id` query parameter means "all devices".
fn device_filter(device_id: Option<String>) -> Option<String> {
    device_id
        .map(|id| id.trim().to_owned())
        .filter(|id| !id.is_empty())
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

/// Register a device. Idempotent: an existing device is returned unchanged
/// with `created = false` and status 200.
#[utoipa::path(
    post,
    path = "/devices",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Device registered", body = RegisterResponse),
        (status = 200, description = "Device already registered", body = RegisterResponse),
        (status = 400, description = "Missing device_id"),
        (status = 500, description = "Storage failure"),
    ),
    tag = "devices"
)]
pub async fn register_device(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let reg = state
        .devices
        .register(&req.device_id, req.owner.as_deref(), req.display_text.as_deref())
        .await?;

    let status = if reg.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(RegisterResponse {
            created: reg.created,
            device: reg.device,
        }),
    ))
}

/// List all devices ordered by `device_id`.
#[utoipa::path(
    get,
    path = "/devices",
    responses(
        (status = 200, description = "All devices", body = Vec<Device>),
        (status = 500, description = "Storage failure"),
    ),
    tag = "devices"
)]
pub async fn list_devices(State(state): State<AppState>) -> Result<Json<Vec<Device>>, AppError> {
    Ok(Json(state.devices.list().await?))
}

#[utoipa::path(
    get,
    path = "/devices/{device_id}",
    params(("device_id" = String, Path, description = "Device ID")),
    responses(
        (status = 200, description = "Device", body = Device),
        (status = 404, description = "Device not found"),
        (status = 500, description = "Storage failure"),
    ),
    tag = "devices"
)]
pub async fn get_device(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<Device>, AppError> {
    Ok(Json(state.devices.get(&device_id).await?))
}

/// Thresholds and relay state, as polled by device firmware.
#[utoipa::path(
    get,
    path = "/devices/{device_id}/config",
    params(("device_id" = String, Path, description = "Device ID")),
    responses(
        (status = 200, description = "Device configuration", body = DeviceConfigDto),
        (status = 404, description = "Device not found"),
        (status = 500, description = "Storage failure"),
    ),
    tag = "devices"
)]
pub async fn get_device_config(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<DeviceConfigDto>, AppError> {
    Ok(Json(state.devices.get(&device_id).await?.into()))
}

/// Update one or both threshold bands. A band is only changed when both of
/// its bounds are supplied.
#[utoipa::path(
    put,
    path = "/devices/{device_id}/thresholds",
    params(("device_id" = String, Path, description = "Device ID")),
    request_body = ThresholdBounds,
    responses(
        (status = 200, description = "Updated device", body = Device),
        (status = 400, description = "Invalid range or no complete band supplied"),
        (status = 404, description = "Device not found"),
        (status = 500, description = "Storage failure"),
    ),
    tag = "devices"
)]
pub async fn update_thresholds(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    ApiJson(bounds): ApiJson<ThresholdBounds>,
) -> Result<Json<Device>, AppError> {
    Ok(Json(state.devices.update_thresholds(&device_id, bounds).await?))
}

// ---------------------------------------------------------------------------
// Relay
// ---------------------------------------------------------------------------

#[utoipa::path(
    put,
    path = "/devices/{device_id}/relay/mode",
    params(("device_id" = String, Path, description = "Device ID")),
    request_body = RelayModeRequest,
    responses(
        (status = 200, description = "Mode changed", body = RelayStateDto),
        (status = 400, description = "Invalid mode"),
        (status = 404, description = "Device not found"),
        (status = 500, description = "Storage failure"),
    ),
    tag = "relay"
)]
pub async fn set_relay_mode(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    ApiJson(req): ApiJson<RelayModeRequest>,
) -> Result<Json<RelayStateDto>, AppError> {
    Ok(Json(state.relay.set_mode(&device_id, &req.mode).await?.into()))
}

/// Switch the relay on or off. Only allowed in manual mode.
#[utoipa::path(
    put,
    path = "/devices/{device_id}/relay/status",
    params(("device_id" = String, Path, description = "Device ID")),
    request_body = RelayStatusRequest,
    responses(
        (status = 200, description = "Relay status stored and confirmed", body = RelayStateDto),
        (status = 400, description = "Invalid status token"),
        (status = 404, description = "Device not found"),
        (status = 409, description = "Device is in auto mode"),
        (status = 500, description = "Storage failure or unconfirmed write"),
    ),
    tag = "relay"
)]
pub async fn set_relay_status(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    ApiJson(req): ApiJson<RelayStatusRequest>,
) -> Result<Json<RelayStateDto>, AppError> {
    let desired = req.status.resolve()?;
    Ok(Json(state.relay.set_status(&device_id, desired).await?.into()))
}

// ---------------------------------------------------------------------------
// Readings
// ---------------------------------------------------------------------------

/// Store one sample reported by a device.
#[utoipa::path(
    post,
    path = "/readings",
    request_body = IngestRequest,
    responses(
        (status = 201, description = "Reading stored", body = IngestResponse),
        (status = 400, description = "Missing parameter or invalid relay status"),
        (status = 500, description = "Storage failure"),
    ),
    tag = "readings"
)]
pub async fn ingest_reading(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<IngestRequest>,
) -> Result<(StatusCode, Json<IngestResponse>), AppError> {
    if req.device_id.trim().is_empty() {
        return Err(ServiceError::MissingParameter("device_id").into());
    }
    let temperature = req
        .temperature
        .ok_or(ServiceError::MissingParameter("temperature"))?;
    let humidity = req
        .humidity
        .ok_or(ServiceError::MissingParameter("humidity"))?;
    let relay_status = req
        .relay_status
        .as_ref()
        .map(RelayStatusInput::resolve)
        .transpose()?
        .unwrap_or(false);

    let ingested = state
        .readings
        .ingest(&req.device_id, temperature, humidity, relay_status)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            reading: ingested.reading,
            assessment: ingested.assessment,
        }),
    ))
}

/// Fetch the newest reading overall, or for one device.
#[utoipa::path(
    get,
    path = "/readings/latest",
    params(("device_id" = Option<String>, Query, description = "Restrict to one device")),
    responses(
        (status = 200, description = "Latest reading", body = Reading),
        (status = 404, description = "No reading found"),
        (status = 500, description = "Storage failure"),
    ),
    tag = "readings"
)]
pub async fn get_latest_reading(
    State(state): State<AppState>,
    Query(params): Query<DeviceFilterParams>,
) -> Result<Json<Reading>, AppError> {
    let device_id = device_filter(params.device_id);
    Ok(Json(state.readings.latest(device_id.as_deref()).await?))
}

/// Readings from the last `hours` (0.001 to 168, default 1), ordered by
/// `recorded_at ASC`.
#[utoipa::path(
    get,
    path = "/readings/history",
    params(
        ("hours" = Option<f64>, Query, description = "Look-back in hours, fractions allowed"),
        ("device_id" = Option<String>, Query, description = "Restrict to one device"),
    ),
    responses(
        (status = 200, description = "Readings in range", body = HistoryResponse),
        (status = 400, description = "Hours out of range"),
        (status = 500, description = "Storage failure"),
    ),
    tag = "readings"
)]
pub async fn get_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, AppError> {
    let hours = params.hours.unwrap_or(1.0);
    let device_id = device_filter(params.device_id);
    let history = state.readings.history(hours, device_id.as_deref()).await?;
    Ok(Json(HistoryResponse::new(hours, device_id, history)))
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// Storage reachability and data freshness.
#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "System status", body = SystemStatus),
    ),
    tag = "system"
)]
pub async fn system_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(state.readings.status().await)
}

/// Returns `200 OK` with `{"status":"ok"}` when the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(
        register_device,
        list_devices,
        get_device,
        get_device_config,
        update_thresholds,
        set_relay_mode,
        set_relay_status,
        ingest_reading,
        get_latest_reading,
        get_history,
        system_status,
        health,
    ),
    components(schemas(
        Device,
        RelayMode,
        Reading,
        ThresholdBounds,
        RegisterRequest,
        RegisterResponse,
        DeviceConfigDto,
        RelayModeRequest,
        RelayStatusRequest,
        RelayStatusInput,
        RelayStateDto,
        IngestRequest,
        IngestResponse,
        Assessment,
        Classification,
        BandStatus,
        HistoryResponse,
        TimeUnit,
        SystemStatus,
    )),
    tags(
        (name = "devices",  description = "Device registry and thresholds"),
        (name = "relay",    description = "Relay mode and manual control"),
        (name = "readings", description = "Sensor reading ingestion and history"),
        (name = "system",   description = "System endpoints"),
    ),
    info(
        title = "Relay Monitor API",
        version = "0.1.0",
        description = "REST API for sensor devices reporting temperature/humidity and controlling a relay"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
