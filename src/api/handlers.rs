use axum::{extract::State, http::StatusCode, Json};
use utoipa::OpenApi;

use super::{
    dto::{AccessoryDto, ActiveDto, RemoteKeyRequest},
    errors::AppError,
};
use crate::accessory::{Accessory, RemoteKey, SleepDiscoveryMode};

// ---------------------------------------------------------------------------
// Accessory
// ---------------------------------------------------------------------------

/// Identification metadata and the bridge's local power bookkeeping.
/// Does not contact the projector.
#[utoipa::path(
    get,
    path = "/accessory",
    responses(
        (status = 200, description = "Accessory information", body = AccessoryDto),
    ),
    tag = "accessory"
)]
pub async fn get_accessory(State(accessory): State<Accessory>) -> Json<AccessoryDto> {
    let power = accessory.power_bookkeeping().await;
    Json(AccessoryDto::new(accessory.information(), power))
}

/// Query the projector's power state.
#[utoipa::path(
    get,
    path = "/accessory/active",
    responses(
        (status = 200, description = "Current Active characteristic", body = ActiveDto),
        (status = 503, description = "Service communication failure"),
    ),
    tag = "accessory"
)]
pub async fn get_active(State(accessory): State<Accessory>) -> Result<Json<ActiveDto>, AppError> {
    let active = accessory.get_active().await?;
    Ok(Json(ActiveDto { active }))
}

/// Switch the projector on or off.
#[utoipa::path(
    put,
    path = "/accessory/active",
    request_body = ActiveDto,
    responses(
        (status = 204, description = "Command accepted by the projector"),
        (status = 503, description = "Service communication failure"),
    ),
    tag = "accessory"
)]
pub async fn set_active(
    State(accessory): State<Accessory>,
    Json(body): Json<ActiveDto>,
) -> Result<StatusCode, AppError> {
    accessory.set_active(body.active).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Accept a remote-control key press. Logged only.
#[utoipa::path(
    put,
    path = "/accessory/remote-key",
    request_body = RemoteKeyRequest,
    responses(
        (status = 204, description = "Key accepted"),
    ),
    tag = "accessory"
)]
pub async fn set_remote_key(
    State(accessory): State<Accessory>,
    Json(body): Json<RemoteKeyRequest>,
) -> StatusCode {
    accessory.remote_key(body.key);
    StatusCode::NO_CONTENT
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

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
    paths(get_accessory, get_active, set_active, set_remote_key, health),
    components(schemas(AccessoryDto, ActiveDto, RemoteKeyRequest, RemoteKey, SleepDiscoveryMode)),
    tags(
        (name = "accessory", description = "Projector accessory characteristics"),
        (name = "system",    description = "System endpoints"),
    ),
    info(
        title = "Projector Bridge API",
        version = "0.1.0",
        description = "Exposes an Epson projector as a smart-home accessory"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
