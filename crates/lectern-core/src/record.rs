//! Snapshot row projections.
//!
//! Each struct is the fixed, business-fields-only projection of one table as
//! it appears in a baseline snapshot. Field declaration order is the
//! serialised order, so two snapshots of the same rows are byte-identical.
//! Timestamps and foreign ids other than the documented parent columns are
//! never part of a projection.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRow {
  pub id:            i64,
  pub title:         String,
  pub grade_id:      i64,
  pub instructor_id: Option<i64>,
  pub description:   Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRow {
  pub id:         i64,
  pub subject_id: i64,
  pub title:      String,
  pub order:      i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonRow {
  pub id:         i64,
  pub chapter_id: i64,
  pub title:      String,
  pub content:    String,
  pub order:      i64,
  pub version:    i64,
}

/// An instructor referenced by the subjects in scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRow {
  pub id:    i64,
  pub name:  String,
  pub email: String,
  pub role:  String,
}
