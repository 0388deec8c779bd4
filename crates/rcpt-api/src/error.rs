//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps receipt service errors to HTTP status codes and a JSON body of the
//! form `{"error": {"code", "message", "details"?}}`. Verification failures
//! each get their own code so clients can tell them apart.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::service::ReceiptError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "HASH_MISMATCH").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Machine-readable context: the missing `param`, or the `reason` a
    /// token failed verification. Absent for other errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed request: bad JSON, wrong body shape, missing parameters (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Payload cannot be canonically encoded (400).
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A required query parameter is absent or blank (400).
    #[error("missing required query parameter: {0}")]
    MissingParameter(String),

    /// Token failed signature checks (400). `reason` names the failure kind.
    #[error("invalid signature: {message}")]
    InvalidSignature {
        reason: &'static str,
        message: String,
    },

    /// Token hash differs from the stored receipt (400).
    #[error("hash mismatch: {0}")]
    HashMismatch(String),

    /// Receipt not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Signing key unusable (500). The reason is returned to the client.
    #[error("signing error: {0}")]
    Signing(String),

    /// Receipt store failed (500). The reason is returned to the client.
    #[error("storage error: {0}")]
    Storage(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) | Self::MissingParameter(_) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST")
            }
            Self::Encoding(_) => (StatusCode::BAD_REQUEST, "ENCODING_ERROR"),
            Self::InvalidSignature { .. } => (StatusCode::BAD_REQUEST, "INVALID_SIGNATURE"),
            Self::HashMismatch(_) => (StatusCode::BAD_REQUEST, "HASH_MISMATCH"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Signing(_) => (StatusCode::INTERNAL_SERVER_ERROR, "SIGNING_ERROR"),
            Self::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::MissingParameter(name) => Some(serde_json::json!({ "param": name })),
            Self::InvalidSignature { reason, .. } => {
                Some(serde_json::json!({ "reason": reason }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let details = self.details();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::Signing(_) | Self::Storage(_) => {
                tracing::error!(error = %self, "receipt issuance failed")
            }
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ReceiptError> for AppError {
    fn from(err: ReceiptError) -> Self {
        match &err {
            ReceiptError::Encoding(_) => Self::Encoding(err.to_string()),
            ReceiptError::Signing(e) => Self::Signing(e.to_string()),
            ReceiptError::Storage(e) => Self::Storage(e.to_string()),
            ReceiptError::InvalidSignature(e) => Self::InvalidSignature {
                reason: e.reason(),
                message: e.to_string(),
            },
            ReceiptError::HashMismatch(id) => {
                Self::HashMismatch(format!("token does not match receipt {id}"))
            }
            ReceiptError::NotFound(rid) => Self::NotFound(format!("receipt {rid}")),
            ReceiptError::Keys(_) => Self::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use rcpt_core::ReceiptId;
    use rcpt_crypto::JwsError;

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[test]
    fn client_error_codes() {
        let cases = [
            (AppError::BadRequest("x".into()), "BAD_REQUEST"),
            (AppError::Encoding("x".into()), "ENCODING_ERROR"),
            (AppError::MissingParameter("rid".into()), "BAD_REQUEST"),
            (
                AppError::InvalidSignature {
                    reason: "bad_signature",
                    message: "x".into(),
                },
                "INVALID_SIGNATURE",
            ),
            (AppError::HashMismatch("x".into()), "HASH_MISMATCH"),
        ];
        for (err, expected) in cases {
            let (status, code) = err.status_and_code();
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(code, expected);
        }
        assert_eq!(
            AppError::NotFound("x".into()).status_and_code(),
            (StatusCode::NOT_FOUND, "NOT_FOUND")
        );
    }

    #[tokio::test]
    async fn storage_error_includes_reason() {
        let (status, body) = response_parts(AppError::Storage("connection refused".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.code, "STORAGE_ERROR");
        assert!(body.error.message.contains("connection refused"));
    }

    #[tokio::test]
    async fn signing_error_includes_reason() {
        let (status, body) = response_parts(AppError::Signing("key unavailable".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.code, "SIGNING_ERROR");
        assert!(body.error.message.contains("key unavailable"));
    }

    #[tokio::test]
    async fn internal_hides_details() {
        let (status, body) = response_parts(AppError::Internal("point at infinity".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.code, "INTERNAL_ERROR");
        assert_eq!(body.error.message, "An internal error occurred");
        assert!(body.error.details.is_none());
    }

    #[test]
    fn receipt_errors_map_to_distinct_variants() {
        let id = ReceiptId::new();
        assert!(matches!(
            AppError::from(ReceiptError::HashMismatch(id)),
            AppError::HashMismatch(ref m) if m.contains(&id.to_string())
        ));
        assert!(matches!(
            AppError::from(ReceiptError::InvalidSignature(JwsError::BadSignature)),
            AppError::InvalidSignature { reason: "bad_signature", .. }
        ));
        assert!(matches!(
            AppError::from(ReceiptError::NotFound("abc".into())),
            AppError::NotFound(ref m) if m.contains("abc")
        ));
    }

    #[tokio::test]
    async fn missing_parameter_names_param_in_details() {
        let (status, body) = response_parts(AppError::MissingParameter("jws".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.code, "BAD_REQUEST");
        assert_eq!(body.error.details, Some(serde_json::json!({"param": "jws"})));
    }

    #[tokio::test]
    async fn invalid_signature_carries_reason() {
        let err =
            AppError::from(ReceiptError::InvalidSignature(JwsError::UnknownKey("old".into())));
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.code, "INVALID_SIGNATURE");
        assert_eq!(body.error.details, Some(serde_json::json!({"reason": "unknown_key"})));
        assert!(body.error.message.contains("old"));
    }

    #[tokio::test]
    async fn not_found_has_no_details() {
        let (_, body) = response_parts(AppError::NotFound("receipt x".into())).await;
        assert!(body.error.details.is_none());
    }

    #[test]
    fn error_body_omits_empty_details() {
        let body = ErrorBody {
            error: ErrorDetail {
                code: "NOT_FOUND".into(),
                message: "gone".into(),
                details: None,
            },
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("details"));
    }
}
