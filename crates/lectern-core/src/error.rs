//! Error types for `lectern-core`.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::{
  proposal::{ProposalId, ProposalStatus},
  scope::TableName,
};

#[derive(Debug, Error)]
pub enum Error {
  /// The scope named no tables, or a table outside the allowed set.
  #[error("invalid scope: {0}")]
  InvalidScope(String),

  /// A payload failed structural validation before reaching storage.
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("a proposal for this workbook already exists (id {existing_id})")]
  DuplicateSubmission { existing_id: ProposalId },

  #[error("proposal not found: {0}")]
  ProposalNotFound(ProposalId),

  #[error("proposal has already been decided ({0})")]
  AlreadyDecided(ProposalStatus),

  /// The live data no longer matches the proposal's baseline snapshot. The
  /// proposal stays `pending`.
  #[error("database has changed since the baseline snapshot was taken")]
  DriftDetected,

  /// The baseline could not be recomputed for the drift check and the store
  /// is configured to fail closed. The proposal stays `pending`.
  #[error("baseline could not be recomputed for the drift check")]
  BaselineUnavailable,

  /// The diff could not be applied; all data changes were rolled back and the
  /// proposal is now `failed`.
  #[error("failed to apply proposal: {0}")]
  ApplyFailed(#[from] ApplyError),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  /// An opaque backend failure. Never shown to API clients verbatim.
  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Diff application ────────────────────────────────────────────────────────

/// One of the three diff phases.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Operation {
  Create,
  Update,
  Delete,
}

/// Why a single record in a diff could not be applied.
///
/// Every variant names the table and operation; record-level variants also
/// carry the offending id. Raw storage errors are logged by the backend and
/// never embedded here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
  #[error("{table} {op} requires {fields}")]
  MissingRequired {
    table:  TableName,
    op:     Operation,
    fields: String,
  },

  #[error("{table} {op}: no row with id {id}")]
  RowNotFound {
    table: TableName,
    op:    Operation,
    id:    i64,
  },

  #[error("{table} {op}{}: referenced {parent} row {parent_id} does not exist", fmt_id(.id))]
  MissingParent {
    table:     TableName,
    op:        Operation,
    id:        Option<i64>,
    parent:    &'static str,
    parent_id: i64,
  },

  #[error("{table} {op}{}: the store rejected the write", fmt_id(.id))]
  Storage {
    table: TableName,
    op:    Operation,
    id:    Option<i64>,
  },
}

impl ApplyError {
  pub fn table(&self) -> TableName {
    match self {
      Self::MissingRequired { table, .. }
      | Self::RowNotFound { table, .. }
      | Self::MissingParent { table, .. }
      | Self::Storage { table, .. } => *table,
    }
  }

  pub fn operation(&self) -> Operation {
    match self {
      Self::MissingRequired { op, .. }
      | Self::RowNotFound { op, .. }
      | Self::MissingParent { op, .. }
      | Self::Storage { op, .. } => *op,
    }
  }

  /// The id of the offending record, when it has one (creates do not).
  pub fn record_id(&self) -> Option<i64> {
    match self {
      Self::MissingRequired { .. } => None,
      Self::RowNotFound { id, .. } => Some(*id),
      Self::MissingParent { id, .. } | Self::Storage { id, .. } => *id,
    }
  }
}

fn fmt_id(id: &Option<i64>) -> String {
  id.map(|id| format!(" (id {id})")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn apply_error_messages_name_table_operation_and_id() {
    let err = ApplyError::RowNotFound {
      table: TableName::Lessons,
      op:    Operation::Update,
      id:    42,
    };
    assert_eq!(err.to_string(), "lessons update: no row with id 42");

    let err = ApplyError::MissingParent {
      table:     TableName::Chapters,
      op:        Operation::Create,
      id:        None,
      parent:    "subjects",
      parent_id: 9,
    };
    assert_eq!(
      err.to_string(),
      "chapters create: referenced subjects row 9 does not exist"
    );
    assert_eq!(err.record_id(), None);

    let err = ApplyError::Storage {
      table: TableName::Subjects,
      op:    Operation::Delete,
      id:    Some(3),
    };
    assert_eq!(
      err.to_string(),
      "subjects delete (id 3): the store rejected the write"
    );
  }
}
