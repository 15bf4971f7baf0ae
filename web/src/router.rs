use crate::controller::{health_check_controller, webhook_controller};
use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "CSAT Sync API"
        ),
        paths(
            health_check_controller::health_check,
            webhook_controller::intercom_webhook,
        ),
        tags(
            (name = "csat_sync", description = "Intercom conversation rating to HubSpot contact sync")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(webhook_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi2.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

/// Routes for external service webhooks (no session auth, validated by body signature)
fn webhook_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/webhook/intercom",
            post(webhook_controller::intercom_webhook),
        )
        .with_state(app_state)
}
