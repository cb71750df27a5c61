//! Handlers for admin review endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/admin/proposals` | `?status` (default `pending`), `?page`, `?per_page` |
//! | `GET`  | `/admin/proposals/{id}` | Full proposal with author and decider |
//! | `POST` | `/admin/proposals/{id}/decision` | Body: `{"action": "approve" \| "reject"}` |

use std::{str::FromStr as _, sync::Arc};

use axum::{
  Json,
  extract::{Path, Query, State},
};
use lectern_core::{
  Error as CoreError,
  proposal::{
    Decision, Page, ProposalDetail, ProposalId, ProposalQuery, ProposalStatus,
    ProposalSummary,
  },
  store::ProposalStore,
};
use serde::Deserialize;

use crate::{actor::Actor, error::ApiError, moderator::Created};

// ─── List ─────────────────────────────────────────────────────────────────────

/// Query string for `GET /admin/proposals`. Kept as strings so a bad value is
/// a 422 with a message instead of an extractor rejection.
#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status:   Option<String>,
  pub page:     Option<String>,
  pub per_page: Option<String>,
}

impl ListParams {
  fn into_query(self) -> Result<ProposalQuery, CoreError> {
    let status = self
      .status
      .map(|s| {
        ProposalStatus::from_str(&s)
          .map_err(|_| CoreError::Validation(format!("unknown status '{s}'")))
      })
      .transpose()?;
    let page = parse_number("page", self.page)?;
    let per_page = parse_number("per_page", self.per_page)?;
    ProposalQuery::new(status, page, per_page)
  }
}

fn parse_number(name: &str, value: Option<String>) -> Result<Option<u32>, CoreError> {
  value
    .map(|v| {
      v.parse::<u32>()
        .map_err(|_| CoreError::Validation(format!("{name} must be a positive integer")))
    })
    .transpose()
}

/// `GET /admin/proposals[?status=...][&page=...][&per_page=...]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  _actor: Actor,
  Query(params): Query<ListParams>,
) -> Result<Json<Page<ProposalSummary>>, ApiError>
where
  S: ProposalStore,
{
  let query = params.into_query()?;
  let page = store.list_proposals(query).await.map_err(ApiError::store)?;
  Ok(Json(page))
}

// ─── Show ─────────────────────────────────────────────────────────────────────

/// `GET /admin/proposals/{id}`
pub async fn show<S>(
  State(store): State<Arc<S>>,
  _actor: Actor,
  Path(id): Path<ProposalId>,
) -> Result<Json<ProposalDetail>, ApiError>
where
  S: ProposalStore,
{
  let detail = store
    .get_proposal(id)
    .await
    .map_err(ApiError::store)?
    .ok_or(CoreError::ProposalNotFound(id))?;
  Ok(Json(detail))
}

// ─── Decide ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DecisionBody {
  pub action: Decision,
}

/// `POST /admin/proposals/{id}/decision`, returns `{"id": .., "status": ..}`.
pub async fn decide<S>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Path(id): Path<ProposalId>,
  Json(body): Json<serde_json::Value>,
) -> Result<Json<Created>, ApiError>
where
  S: ProposalStore,
{
  let body: DecisionBody = serde_json::from_value(body)
    .map_err(|e| CoreError::Validation(e.to_string()))?;

  let proposal = store
    .decide(id, body.action, actor.0)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(Created { id: proposal.id, status: proposal.status }))
}
