pub mod dto;
pub mod errors;
pub mod extract;
pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::{control::RelayController, db::Store, devices::DeviceRegistry, sensors::ReadingService};
use handlers::ApiDoc;

/// Services shared by every handler. All state lives in the store.
#[derive(Clone)]
pub struct AppState {
    pub devices: DeviceRegistry,
    pub relay: RelayController,
    pub readings: ReadingService,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, default_owner: impl Into<String>) -> Self {
        Self {
            devices: DeviceRegistry::new(store.clone(), default_owner),
            relay: RelayController::new(store.clone()),
            readings: ReadingService::new(store),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::system_status))
        .route(
            "/devices",
            post(handlers::register_device).get(handlers::list_devices),
        )
        .route("/devices/{device_id}", get(handlers::get_device))
        .route("/devices/{device_id}/config", get(handlers::get_device_config))
        .route(
            "/devices/{device_id}/thresholds",
            put(handlers::update_thresholds),
        )
        .route("/devices/{device_id}/relay/mode", put(handlers::set_relay_mode))
        .route(
            "/devices/{device_id}/relay/status",
            put(handlers::set_relay_status),
        )
        .route("/readings", post(handlers::ingest_reading))
        .route("/readings/latest", get(handlers::get_latest_reading))
        .route("/readings/history", get(handlers::get_history))
        .with_state(state)
        .split_for_parts();

    router.route(
        "/api-docs/openapi.json",
        get(move || async move { axum::Json(api) }),
    )
}
