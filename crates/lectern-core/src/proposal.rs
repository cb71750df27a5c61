//! Change proposals: the persisted, reviewable unit of a bulk edit.
//!
//! A proposal is created once in [`ProposalStatus::Pending`] and decided at
//! most once. Every decided status is terminal.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
  Error, Result,
  diff::{Diff, OpCounts},
  scope::{Scope, TableName},
  snapshot::{SnapshotData, WorkbookSnapshot},
};

pub type ProposalId = i64;
pub type UserId = i64;

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProposalStatus {
  #[default]
  Pending,
  /// Historical label kept so old rows decode; never written by this engine.
  Approved,
  Rejected,
  Applied,
  Failed,
}

impl ProposalStatus {
  pub fn is_pending(self) -> bool { matches!(self, Self::Pending) }
}

/// An admin's verdict on a pending proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Decision {
  Approve,
  Reject,
}

/// What the review service does when the drift-check baseline cannot be
/// recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftPolicy {
  /// Refuse the approval; the proposal stays `pending`.
  #[default]
  FailClosed,
  /// Treat the failure as "no drift" and apply anyway.
  FailOpen,
}

// ─── Workbook hash ───────────────────────────────────────────────────────────

/// Content address of the source workbook: 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExcelHash(String);

impl ExcelHash {
  pub const LEN: usize = 64;

  pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for ExcelHash {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> {
    let well_formed = s.len() == Self::LEN
      && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if !well_formed {
      return Err(Error::Validation(
        "excel_hash must be a 64-character lowercase hex string".to_owned(),
      ));
    }
    Ok(Self(s))
  }
}

impl From<ExcelHash> for String {
  fn from(h: ExcelHash) -> Self { h.0 }
}

impl std::fmt::Display for ExcelHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── Proposal ────────────────────────────────────────────────────────────────

/// A persisted change proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeProposal {
  pub id:             ProposalId,
  pub moderator_id:   UserId,
  pub scope:          Scope,
  pub excel_hash:     ExcelHash,
  pub excel_path:     Option<String>,
  pub excel_snapshot: WorkbookSnapshot,
  /// The baseline the diff was computed against; compared with the live data
  /// at approval time.
  pub db_snapshot:    SnapshotData,
  #[serde(rename = "diff_json")]
  pub diff:           Diff,
  pub status:         ProposalStatus,
  pub decided_by:     Option<UserId>,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

/// Input to [`crate::store::ProposalStore::submit`]. The id, status and
/// timestamps are always assigned by the store.
#[derive(Debug, Clone)]
pub struct NewProposal {
  pub moderator_id:   UserId,
  pub scope:          Scope,
  pub excel_hash:     ExcelHash,
  pub excel_path:     Option<String>,
  pub excel_snapshot: WorkbookSnapshot,
  pub db_snapshot:    SnapshotData,
  pub diff:           Diff,
}

impl NewProposal {
  /// Cross-field checks that the individual types cannot express.
  ///
  /// The baseline must cover exactly the scope's tables, and the diff may
  /// only touch tables inside the scope; anything else could never pass, or
  /// would escape, the drift check at approval time.
  pub fn validate(&self) -> Result<()> {
    let scoped: Vec<TableName> = self.scope.tables().collect();
    if self.db_snapshot.tables() != scoped {
      return Err(Error::Validation(format!(
        "db_snapshot must contain exactly the scope's tables ({})",
        join_tables(&scoped)
      )));
    }
    let outside: Vec<TableName> = self
      .diff
      .tables()
      .into_iter()
      .filter(|t| !self.scope.contains(*t))
      .collect();
    if !outside.is_empty() {
      return Err(Error::Validation(format!(
        "diff touches tables outside the scope: {}",
        join_tables(&outside)
      )));
    }
    Ok(())
  }
}

fn join_tables(tables: &[TableName]) -> String {
  tables.iter().map(AsRef::as_ref).collect::<Vec<&str>>().join(", ")
}

// ─── Read models ─────────────────────────────────────────────────────────────

/// A user as shown next to a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
  pub id:    UserId,
  pub name:  String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
}

/// A proposal with its author and decider resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalDetail {
  #[serde(flatten)]
  pub proposal:  ChangeProposal,
  pub moderator: UserRef,
  pub decider:   Option<UserRef>,
}

/// One line of the review queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalSummary {
  pub id:         ProposalId,
  pub moderator:  UserRef,
  pub created_at: DateTime<Utc>,
  pub status:     ProposalStatus,
  /// Per-table operation counts from the proposal's diff.
  pub summary:    BTreeMap<TableName, OpCounts>,
}

// ─── Listing ─────────────────────────────────────────────────────────────────

/// Parameters for [`crate::store::ProposalStore::list_proposals`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProposalQuery {
  pub status:   ProposalStatus,
  /// 1-based page number.
  pub page:     u32,
  pub per_page: u32,
}

impl ProposalQuery {
  pub const DEFAULT_PER_PAGE: u32 = 15;
  pub const MAX_PER_PAGE: u32 = 100;

  /// Build a query, applying defaults and rejecting out-of-range values.
  pub fn new(
    status: Option<ProposalStatus>,
    page: Option<u32>,
    per_page: Option<u32>,
  ) -> Result<Self> {
    let per_page = per_page.unwrap_or(Self::DEFAULT_PER_PAGE);
    if !(1..=Self::MAX_PER_PAGE).contains(&per_page) {
      return Err(Error::Validation(format!(
        "per_page must be between 1 and {}",
        Self::MAX_PER_PAGE
      )));
    }
    let page = page.unwrap_or(1);
    if page == 0 {
      return Err(Error::Validation("page must be at least 1".to_owned()));
    }
    Ok(Self { status: status.unwrap_or_default(), page, per_page })
  }

  pub fn offset(&self) -> u64 {
    u64::from(self.page - 1) * u64::from(self.per_page)
  }
}

impl Default for ProposalQuery {
  fn default() -> Self {
    Self {
      status:   ProposalStatus::Pending,
      page:     1,
      per_page: Self::DEFAULT_PER_PAGE,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
  pub current_page: u32,
  pub last_page:    u32,
  pub per_page:     u32,
  pub total:        u64,
}

impl PageMeta {
  pub fn new(query: &ProposalQuery, total: u64) -> Self {
    let per_page = u64::from(query.per_page);
    let last_page = total.div_ceil(per_page).max(1);
    Self {
      current_page: query.page,
      last_page:    u32::try_from(last_page).unwrap_or(u32::MAX),
      per_page:     query.per_page,
      total,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
  pub data: Vec<T>,
  pub meta: PageMeta,
}
