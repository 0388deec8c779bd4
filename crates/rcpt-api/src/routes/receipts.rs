//! # Receipt Issuance and Verification
//!
//! ## Endpoints
//!
//! - `POST /receipts`: sign, persist and anchor a JSON object payload.
//! - `GET /verify?rid=&jws=`: check a token against its stored receipt.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rcpt_core::{AnchorStatus, VerificationResult};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;
use crate::extractors::{extract_json, extract_query, required_param};
use crate::service::IssuedReceipt;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Response from receipt issuance.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReceiptResponse {
    /// Receipt identifier.
    pub rid: String,
    /// Compact ES256 token over the canonical payload.
    pub jws: String,
    /// Lowercase hex SHA-256 of the canonical payload.
    pub hash: String,
    /// Signing key id, as published in `/jwks.json`.
    pub kid: String,
    /// Anchoring status.
    #[schema(value_type = String, example = "ANCHORED")]
    pub status: AnchorStatus,
    /// Link that verifies this receipt.
    pub verify_url: String,
    /// Base64 PNG QR code of `verifyUrl`; null if it could not be rendered.
    pub qr_png: Option<String>,
    /// Ledger transaction reference; null unless anchored.
    pub anchor_tx: Option<String>,
    /// Why the ledger declined, when skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    /// Why the receipt is still pending, when anchoring did not complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_reason: Option<String>,
}

impl From<IssuedReceipt> for CreateReceiptResponse {
    fn from(issued: IssuedReceipt) -> Self {
        let receipt = issued.receipt;
        Self {
            rid: receipt.id.to_string(),
            jws: receipt.token,
            hash: receipt.hash,
            kid: receipt.key_id,
            status: receipt.status,
            verify_url: issued.verify_url.to_string(),
            qr_png: issued.qr_png.map(|png| STANDARD.encode(png)),
            anchor_tx: receipt.anchor_reference,
            skip_reason: receipt.skip_reason,
            pending_reason: issued.pending_reason,
        }
    }
}

/// Query parameters for verification. Both are required; they are
/// optional here so a missing one gets a structured 400.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerifyQuery {
    /// Receipt identifier.
    pub rid: Option<String>,
    /// Compact token issued with the receipt.
    pub jws: Option<String>,
}

/// Successful verification.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyResponse {
    /// Always true.
    pub ok: bool,
    /// Anchoring status at verification time.
    #[schema(value_type = String, example = "ANCHORED")]
    pub status: AnchorStatus,
    /// Key that signed the receipt.
    pub kid: String,
    /// Issuance time.
    pub ts: DateTime<Utc>,
}

impl From<VerificationResult> for VerifyResponse {
    fn from(result: VerificationResult) -> Self {
        Self {
            ok: result.ok,
            status: result.status,
            kid: result.key_id,
            ts: result.issued_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the receipts router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/receipts", post(create_receipt))
        .route("/verify", get(verify_receipt))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /receipts: Issue a signed receipt for a JSON object.
///
/// The payload is canonicalized (sorted keys, compact separators), hashed
/// and signed, persisted, then submitted for ledger anchoring. A ledger
/// failure does not fail the request: the receipt is returned `PENDING`
/// with `pendingReason` set.
#[utoipa::path(
    post,
    path = "/receipts",
    request_body(content = serde_json::Value, description = "Arbitrary JSON object to sign"),
    responses(
        (status = 201, description = "Receipt issued", body = CreateReceiptResponse),
        (status = 400, description = "Malformed body or payload not canonically encodable", body = crate::error::ErrorBody),
        (status = 500, description = "Signing or storage failure", body = crate::error::ErrorBody),
    ),
    tag = "receipts"
)]
pub(crate) async fn create_receipt(
    State(state): State<AppState>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateReceiptResponse>), AppError> {
    let payload = extract_json(body)?;
    if !payload.is_object() {
        return Err(AppError::BadRequest(
            "receipt payload must be a JSON object".to_string(),
        ));
    }

    let issued = state.service.create_receipt(&payload).await?;
    Ok((StatusCode::CREATED, Json(issued.into())))
}

/// GET /verify: Verify a receipt token against the stored record.
///
/// Both `rid` and `jws` are required. Distinct error codes separate an
/// unknown receipt (`NOT_FOUND`), a bad token (`INVALID_SIGNATURE`) and a
/// token issued for different content (`HASH_MISMATCH`).
#[utoipa::path(
    get,
    path = "/verify",
    params(VerifyQuery),
    responses(
        (status = 200, description = "Token is valid for this receipt", body = VerifyResponse),
        (status = 400, description = "Missing parameter, invalid signature or hash mismatch", body = crate::error::ErrorBody),
        (status = 404, description = "Receipt not found", body = crate::error::ErrorBody),
    ),
    tag = "receipts"
)]
pub(crate) async fn verify_receipt(
    State(state): State<AppState>,
    query: Result<Query<VerifyQuery>, QueryRejection>,
) -> Result<Json<VerifyResponse>, AppError> {
    let query = extract_query(query)?;
    let rid = required_param("rid", query.rid)?;
    let jws = required_param("jws", query.jws)?;

    let result = state.service.verify_receipt(&rid, &jws).await?;
    Ok(Json(result.into()))
}
