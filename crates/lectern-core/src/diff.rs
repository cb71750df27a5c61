//! Diffs: per-table create/update/delete lists describing a requested change.
//!
//! The whitelist of persistable fields is the field set of each `*Fields`
//! struct. Unknown keys in a payload (including a client-supplied `id` on a
//! create, or timestamps) are dropped by deserialisation and can never reach
//! storage. The set of tables is closed: [`Diff`] rejects any table other than
//! `subjects`, `chapters` and `lessons`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::scope::TableName;

// ─── Field values ────────────────────────────────────────────────────────────

/// A single column value headed for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
  Integer(i64),
  Text(String),
}

/// A whitelisted, writable projection of one table's columns.
///
/// Implemented by each `*Fields` struct; the applier is written once against
/// this trait.
pub trait WritableRecord {
  /// The table these fields belong to.
  const TABLE: TableName;

  /// Columns that must be present on create.
  const REQUIRED: &'static [&'static str];

  /// The columns this record sets, in a fixed order. Absent fields are left
  /// out rather than written as `NULL`.
  fn columns(&self) -> Vec<(&'static str, FieldValue)>;

  /// Rows this record points at, as `(table, id)` pairs, which must exist
  /// before the record is written.
  fn references(&self) -> Vec<(&'static str, i64)>;

  /// Required columns missing from this record.
  fn missing_required(&self) -> Vec<&'static str> {
    let columns = self.columns();
    Self::REQUIRED
      .iter()
      .copied()
      .filter(|required| !columns.iter().any(|(name, _)| name == required))
      .collect()
  }
}

fn push_text(
  out: &mut Vec<(&'static str, FieldValue)>,
  name: &'static str,
  value: &Option<String>,
) {
  if let Some(v) = value {
    out.push((name, FieldValue::Text(v.clone())));
  }
}

fn push_int(
  out: &mut Vec<(&'static str, FieldValue)>,
  name: &'static str,
  value: Option<i64>,
) {
  if let Some(v) = value {
    out.push((name, FieldValue::Integer(v)));
  }
}

// ─── Per-table whitelists ────────────────────────────────────────────────────

/// Writable subject fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectFields {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title:         Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub instructor_id: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub grade_id:      Option<i64>,
}

impl WritableRecord for SubjectFields {
  const TABLE: TableName = TableName::Subjects;
  const REQUIRED: &'static [&'static str] = &["title", "grade_id"];

  fn columns(&self) -> Vec<(&'static str, FieldValue)> {
    let mut out = Vec::with_capacity(4);
    push_text(&mut out, "title", &self.title);
    push_text(&mut out, "description", &self.description);
    push_int(&mut out, "instructor_id", self.instructor_id);
    push_int(&mut out, "grade_id", self.grade_id);
    out
  }

  fn references(&self) -> Vec<(&'static str, i64)> {
    let mut out = Vec::new();
    if let Some(id) = self.grade_id {
      out.push(("grades", id));
    }
    if let Some(id) = self.instructor_id {
      out.push(("users", id));
    }
    out
  }
}

/// Writable chapter fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterFields {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title:      Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub order:      Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub subject_id: Option<i64>,
}

impl WritableRecord for ChapterFields {
  const TABLE: TableName = TableName::Chapters;
  const REQUIRED: &'static [&'static str] = &["title", "subject_id"];

  fn columns(&self) -> Vec<(&'static str, FieldValue)> {
    let mut out = Vec::with_capacity(3);
    push_text(&mut out, "title", &self.title);
    push_int(&mut out, "order", self.order);
    push_int(&mut out, "subject_id", self.subject_id);
    out
  }

  fn references(&self) -> Vec<(&'static str, i64)> {
    self.subject_id.map(|id| ("subjects", id)).into_iter().collect()
  }
}

/// Writable lesson fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonFields {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title:      Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub content:    Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub order:      Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub chapter_id: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version:    Option<i64>,
}

impl WritableRecord for LessonFields {
  const TABLE: TableName = TableName::Lessons;
  const REQUIRED: &'static [&'static str] = &["title", "chapter_id"];

  fn columns(&self) -> Vec<(&'static str, FieldValue)> {
    let mut out = Vec::with_capacity(5);
    push_text(&mut out, "title", &self.title);
    push_text(&mut out, "content", &self.content);
    push_int(&mut out, "order", self.order);
    push_int(&mut out, "chapter_id", self.chapter_id);
    push_int(&mut out, "version", self.version);
    out
  }

  fn references(&self) -> Vec<(&'static str, i64)> {
    self.chapter_id.map(|id| ("chapters", id)).into_iter().collect()
  }
}

// ─── Record envelopes ────────────────────────────────────────────────────────

/// An update: the target row's id plus the fields to overwrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyed<F> {
  pub id:     i64,
  #[serde(flatten)]
  pub fields: F,
}

/// A workbook row: fields plus the id of the row it came from, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft<F> {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id:     Option<i64>,
  #[serde(flatten)]
  pub fields: F,
}

/// A delete: only the id is read; everything else is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordId {
  pub id: i64,
}

// ─── Diff ────────────────────────────────────────────────────────────────────

/// Operations against one table. Each list may be omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDiff<F> {
  #[serde(default)]
  pub create: Vec<F>,
  #[serde(default)]
  pub update: Vec<Keyed<F>>,
  #[serde(default)]
  pub delete: Vec<RecordId>,
}

impl<F> Default for TableDiff<F> {
  fn default() -> Self {
    Self { create: Vec::new(), update: Vec::new(), delete: Vec::new() }
  }
}

impl<F> TableDiff<F> {
  pub fn counts(&self) -> OpCounts {
    OpCounts {
      create: self.create.len(),
      update: self.update.len(),
      delete: self.delete.len(),
    }
  }
}

/// A complete diff. There is one slot per writable table, so the order in
/// which a client listed tables can never influence processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Diff {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub subjects: Option<TableDiff<SubjectFields>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub chapters: Option<TableDiff<ChapterFields>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub lessons:  Option<TableDiff<LessonFields>>,
}

/// Number of records per operation for one table.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
pub struct OpCounts {
  pub create: usize,
  pub update: usize,
  pub delete: usize,
}

impl OpCounts {
  pub fn total(&self) -> usize { self.create + self.update + self.delete }
}

impl Diff {
  /// Per-table operation counts for every table the diff names.
  pub fn summary(&self) -> BTreeMap<TableName, OpCounts> {
    let mut out = BTreeMap::new();
    if let Some(t) = &self.subjects {
      out.insert(TableName::Subjects, t.counts());
    }
    if let Some(t) = &self.chapters {
      out.insert(TableName::Chapters, t.counts());
    }
    if let Some(t) = &self.lessons {
      out.insert(TableName::Lessons, t.counts());
    }
    out
  }

  /// Tables the diff names, in canonical order.
  pub fn tables(&self) -> Vec<TableName> {
    self.summary().into_keys().collect()
  }

  /// Whether the diff contains no operations at all.
  pub fn is_empty(&self) -> bool {
    self.summary().values().all(|counts| counts.total() == 0)
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn create_drops_unknown_fields_and_client_ids() {
    let diff: Diff = serde_json::from_value(json!({
      "subjects": {
        "create": [{
          "id": 999,
          "title": "Physics",
          "grade_id": 7,
          "created_at": "2020-01-01",
          "colour": "red"
        }]
      }
    }))
    .unwrap();

    let create = &diff.subjects.as_ref().unwrap().create[0];
    assert_eq!(
      create.columns(),
      [
        ("title", FieldValue::Text("Physics".into())),
        ("grade_id", FieldValue::Integer(7)),
      ]
    );
    assert!(create.missing_required().is_empty());
  }

  #[test]
  fn update_requires_an_id() {
    let err = serde_json::from_value::<Diff>(json!({
      "lessons": { "update": [{ "title": "No id" }] }
    }));
    assert!(err.is_err());

    let ok: Diff = serde_json::from_value(json!({
      "lessons": { "update": [{ "id": 4, "title": "Renamed", "bogus": true }] }
    }))
    .unwrap();
    let update = &ok.lessons.unwrap().update[0];
    assert_eq!(update.id, 4);
    assert_eq!(update.fields.title.as_deref(), Some("Renamed"));
  }

  #[test]
  fn unknown_and_read_only_tables_are_rejected() {
    assert!(serde_json::from_value::<Diff>(json!({ "users": {} })).is_err());
    assert!(serde_json::from_value::<Diff>(json!({ "quizzes": {} })).is_err());
  }

  #[test]
  fn wrong_field_types_are_rejected_not_coerced() {
    let err = serde_json::from_value::<Diff>(json!({
      "chapters": { "create": [{ "title": "Optics", "subject_id": "three" }] }
    }));
    assert!(err.is_err());
  }

  #[test]
  fn missing_required_fields_are_reported() {
    let chapter = ChapterFields { title: Some("Optics".into()), ..Default::default() };
    assert_eq!(chapter.missing_required(), ["subject_id"]);
  }

  #[test]
  fn summary_counts_each_operation() {
    let diff: Diff = serde_json::from_value(json!({
      "chapters": {
        "create": [{ "title": "A", "subject_id": 1 }, { "title": "B", "subject_id": 1 }],
        "delete": [{ "id": 3 }]
      },
      "subjects": {}
    }))
    .unwrap();

    let summary = diff.summary();
    assert_eq!(
      summary[&TableName::Chapters],
      OpCounts { create: 2, update: 0, delete: 1 }
    );
    assert_eq!(summary[&TableName::Subjects], OpCounts::default());
    assert_eq!(diff.tables(), [TableName::Subjects, TableName::Chapters]);
    assert!(!diff.is_empty());
    assert!(Diff::default().is_empty());
  }
}
