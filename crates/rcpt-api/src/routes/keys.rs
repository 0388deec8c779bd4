//! # Public Key Exposure
//!
//! `GET /jwks.json` publishes the public half of every key in the key set,
//! active key first, so third parties can verify tokens offline.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::error::AppError;
use crate::state::AppState;

/// Build the keys router.
pub fn router() -> Router<AppState> {
    Router::new().route("/jwks.json", get(jwks))
}

/// GET /jwks.json: Public signing keys as a JWKS document.
#[utoipa::path(
    get,
    path = "/jwks.json",
    responses(
        (status = 200, description = "JWKS with EC P-256 keys (kty, crv, kid, use, alg, x, y)",
            body = serde_json::Value),
    ),
    tag = "keys"
)]
pub(crate) async fn jwks(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let set = state.service.jwks()?;
    Ok((
        [(header::CACHE_CONTROL, "public, max-age=300")],
        Json(set),
    ))
}
