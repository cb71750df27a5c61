//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every engine outcome maps to a fixed status code and a JSON body of the
//! form `{"message": ..., "error": <code>}`, plus variant-specific keys.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use lectern_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("missing or invalid X-User-Id header")]
  Unauthenticated,

  #[error(transparent)]
  Engine(#[from] CoreError),
}

impl ApiError {
  /// Classify a backend error. Used as `.map_err(ApiError::store)`.
  pub fn store<E: Into<CoreError>>(e: E) -> Self { Self::Engine(e.into()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let engine = match self {
      ApiError::Unauthenticated => {
        return (
          StatusCode::UNAUTHORIZED,
          Json(json!({
            "message": "missing or invalid X-User-Id header",
            "error":   "unauthenticated",
          })),
        )
          .into_response();
      }
      ApiError::Engine(e) => e,
    };

    let message = engine.to_string();
    let (status, body) = match &engine {
      CoreError::InvalidScope(_) => (
        StatusCode::BAD_REQUEST,
        json!({ "message": "invalid scope", "error": "invalid_scope", "details": message }),
      ),
      CoreError::Validation(_) => (
        StatusCode::UNPROCESSABLE_ENTITY,
        json!({ "message": "validation failed", "error": "validation_failed", "details": message }),
      ),
      CoreError::DuplicateSubmission { existing_id } => (
        StatusCode::CONFLICT,
        json!({
          "message":     "proposal with this excel hash already exists",
          "error":       "duplicate_submission",
          "existing_id": existing_id,
        }),
      ),
      CoreError::ProposalNotFound(_) => (
        StatusCode::NOT_FOUND,
        json!({ "message": message, "error": "not_found" }),
      ),
      CoreError::AlreadyDecided(current) => (
        StatusCode::CONFLICT,
        json!({
          "message":        "already decided",
          "error":          "already_decided",
          "current_status": current,
        }),
      ),
      CoreError::DriftDetected => (
        StatusCode::CONFLICT,
        json!({
          "message": "data has changed since the snapshot was taken",
          "error":   "drift_detected",
        }),
      ),
      CoreError::BaselineUnavailable => (
        StatusCode::SERVICE_UNAVAILABLE,
        json!({
          "message": "baseline could not be recomputed; try again later",
          "error":   "baseline_unavailable",
        }),
      ),
      CoreError::ApplyFailed(apply) => (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({
          "message":   "failed to apply proposal changes",
          "error":     "apply_failed",
          "details":   apply.to_string(),
          "table":     apply.table(),
          "operation": apply.operation(),
          "id":        apply.record_id(),
        }),
      ),
      CoreError::Serialization(_) | CoreError::Storage(_) => {
        tracing::error!(error = %engine, "request failed with an internal error");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          json!({ "message": "internal server error", "error": "internal" }),
        )
      }
    };

    (status, Json(body)).into_response()
  }
}
