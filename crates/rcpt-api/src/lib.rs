//! # rcpt-api: Signed Receipt Service
//!
//! Axum service that turns arbitrary JSON objects into verifiable
//! receipts: the payload is canonicalized, hashed and signed with ES256,
//! persisted, and its hash is anchored on an EVM ledger.
//!
//! ## API Surface
//!
//! | Route | Module | Purpose |
//! |---|---|---|
//! | `POST /receipts` | [`routes::receipts`] | Issue a receipt |
//! | `GET /verify` | [`routes::receipts`] | Verify a token against its receipt |
//! | `GET /jwks.json` | [`routes::keys`] | Public signing keys |
//! | `GET /healthz` | this module | Liveness |
//! | `GET /openapi.json` | [`openapi`] | Generated OpenAPI document |
//!
//! ## Middleware Stack
//!
//! ```text
//! TraceLayer → CorsLayer → body limit → Handler
//! ```
//!
//! ## Crate Policy
//!
//! - No business logic in route handlers; they delegate to [`service`].
//! - All errors map to structured HTTP responses via [`AppError`].

pub mod bootstrap;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod openapi;
pub mod qr;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::ToSchema;

pub use error::AppError;
pub use service::{ReceiptError, ReceiptService};
pub use state::AppState;

/// Liveness response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always `"healthy"`.
    pub status: String,
}

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .merge(routes::receipts::router())
        .merge(routes::keys::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /healthz: Liveness check. Touches no dependencies.
#[utoipa::path(
    get,
    path = "/healthz",
    responses((status = 200, description = "Service is running", body = HealthResponse)),
    tag = "health"
)]
pub(crate) async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}
