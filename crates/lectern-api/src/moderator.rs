//! Handlers for moderator endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/mod/baseline` | Body: `{"scope": {...}}`; returns the snapshot with an `ETag` |
//! | `POST` | `/mod/proposals` | Body: [`SubmitBody`]; returns 201 + `{id, status}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::State,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use lectern_core::{
  Error as CoreError,
  diff::Diff,
  proposal::{ExcelHash, NewProposal, ProposalId, ProposalStatus},
  scope::Scope,
  snapshot::{SnapshotData, WorkbookSnapshot},
  store::ProposalStore,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{actor::Actor, error::ApiError, etag::compute_etag};

// ─── Baseline ─────────────────────────────────────────────────────────────────

/// `POST /mod/baseline`, body: `{"scope": {"grade_id": 7, "tables": [...]}}`.
///
/// The body is taken as raw JSON so that every malformed scope is reported as
/// an invalid scope (400) rather than a generic decode failure.
pub async fn baseline<S>(
  State(store): State<Arc<S>>,
  _actor: Actor,
  Json(body): Json<Value>,
) -> Result<Response, ApiError>
where
  S: ProposalStore,
{
  let raw = body.get("scope").cloned().unwrap_or(Value::Null);
  let scope = Scope::from_value(raw)?;

  let snapshot = store.baseline(scope).await.map_err(ApiError::store)?;
  let etag = compute_etag(&snapshot).map_err(CoreError::from)?;

  let mut res = Json(snapshot).into_response();
  if let Ok(value) = HeaderValue::from_str(&etag) {
    res.headers_mut().insert(header::ETAG, value);
  }
  Ok(res)
}

// ─── Submit ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /mod/proposals`.
#[derive(Debug, Deserialize)]
pub struct SubmitBody {
  pub scope:          Scope,
  pub excel_hash:     ExcelHash,
  #[serde(default)]
  pub excel_path:     Option<String>,
  pub excel_snapshot: WorkbookSnapshot,
  pub db_snapshot:    SnapshotData,
  /// Accepted under its historical name `diff_json` or as `diff`.
  #[serde(alias = "diff")]
  pub diff_json:      Diff,
}

impl SubmitBody {
  fn into_new_proposal(self, actor: Actor) -> NewProposal {
    NewProposal {
      moderator_id:   actor.0,
      scope:          self.scope,
      excel_hash:     self.excel_hash,
      excel_path:     self.excel_path,
      excel_snapshot: self.excel_snapshot,
      db_snapshot:    self.db_snapshot,
      diff:           self.diff_json,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct Created {
  pub id:     ProposalId,
  pub status: ProposalStatus,
}

/// `POST /mod/proposals`, returns 201 + `{"id": .., "status": "pending"}`.
pub async fn submit<S>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ProposalStore,
{
  let body: SubmitBody = serde_json::from_value(body)
    .map_err(|e| CoreError::Validation(e.to_string()))?;

  let proposal = store
    .submit(body.into_new_proposal(actor))
    .await
    .map_err(ApiError::store)?;

  Ok((
    StatusCode::CREATED,
    Json(Created { id: proposal.id, status: proposal.status }),
  ))
}
