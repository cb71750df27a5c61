//! Snapshots: the deterministic serialisation of a scope's current data.

use serde::{Deserialize, Serialize};

use crate::{
  diff::{ChapterFields, Draft, LessonFields, SubjectFields},
  record::{ChapterRow, LessonRow, SubjectRow, UserRow},
  scope::{Scope, TableName},
};

/// Rows per table. A table is `Some` exactly when it was part of the scope
/// that produced the snapshot, so an empty table (`Some(vec![])`) and an
/// unrequested one (`None`) compare unequal.
///
/// Drift detection is `PartialEq` on this type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotData {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub subjects: Option<Vec<SubjectRow>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub chapters: Option<Vec<ChapterRow>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub lessons:  Option<Vec<LessonRow>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub users:    Option<Vec<UserRow>>,
}

impl SnapshotData {
  /// The tables present in this snapshot, in canonical order.
  pub fn tables(&self) -> Vec<TableName> {
    [
      (TableName::Subjects, self.subjects.is_some()),
      (TableName::Chapters, self.chapters.is_some()),
      (TableName::Lessons, self.lessons.is_some()),
      (TableName::Users, self.users.is_some()),
    ]
    .into_iter()
    .filter_map(|(table, present)| present.then_some(table))
    .collect()
  }
}

/// A baseline: the scope together with the rows it selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
  pub scope: Scope,
  #[serde(rename = "snapshot")]
  pub data:  SnapshotData,
}

/// The target-state projection read from the moderator's edited workbook.
///
/// Rows mirror the writable fields of each table; `id` is absent for rows the
/// moderator added. Stored for review only; never applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkbookSnapshot {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub subjects: Option<Vec<Draft<SubjectFields>>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub chapters: Option<Vec<Draft<ChapterFields>>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub lessons:  Option<Vec<Draft<LessonFields>>>,
}
