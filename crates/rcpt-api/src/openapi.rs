//! # OpenAPI Specification Assembly
//!
//! Collects the utoipa-documented routes into one OpenAPI document served
//! at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the receipt service.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Signed Receipt Service",
        version = "0.1.0",
        description = "Issues ES256-signed receipts over canonical JSON payloads, anchors their hashes on a ledger and verifies presented tokens.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        crate::routes::receipts::create_receipt,
        crate::routes::receipts::verify_receipt,
        crate::routes::keys::jwks,
        crate::healthz,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::receipts::CreateReceiptResponse,
        crate::routes::receipts::VerifyResponse,
        crate::HealthResponse,
    )),
    tags(
        (name = "receipts", description = "Receipt issuance and verification"),
        (name = "keys", description = "Public key publication"),
        (name = "health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
