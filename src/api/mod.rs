pub mod dto;
pub mod errors;
pub mod handlers;

use axum::{
    routing::{get, put},
    Router,
};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use handlers::ApiDoc;

use crate::accessory::Accessory;

pub fn router(accessory: Accessory) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/accessory", get(handlers::get_accessory))
        .route(
            "/accessory/active",
            get(handlers::get_active).put(handlers::set_active),
        )
        .route("/accessory/remote-key", put(handlers::set_remote_key))
        .with_state(accessory)
        .split_for_parts();

    router
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
}
