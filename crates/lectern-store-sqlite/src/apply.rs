//! Diff applier.
//!
//! Applies a [`Diff`] inside a transaction owned by the caller. The applier
//! never commits or rolls back; on error the caller drops the transaction and
//! every write made so far is undone.
//!
//! Processing order is fixed and independent of the payload:
//!
//! 1. creates: subjects, chapters, lessons
//! 2. updates: subjects, chapters, lessons
//! 3. deletes: lessons, chapters, subjects
//!
//! Parents are written before children and deleted after them, so a delete
//! listing both a chapter and its subject never trips over the cascade.
//! Foreign keys on creates and updates must point at rows that already exist;
//! this is checked explicitly before each write.

use chrono::Utc;
use lectern_core::{
  ApplyError, Operation,
  diff::{Diff, Keyed, RecordId, TableDiff, WritableRecord},
  scope::TableName,
};
use rusqlite::{OptionalExtension as _, Transaction, params, params_from_iter};

use crate::encode::{encode_dt, sql_value};

/// Number of rows touched per operation, for logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ApplyReport {
  pub created: usize,
  pub updated: usize,
  pub deleted: usize,
}

/// Apply every operation in `diff`, stopping at the first failure.
pub fn apply_diff(tx: &Transaction<'_>, diff: &Diff) -> Result<ApplyReport, ApplyError> {
  let mut report = ApplyReport::default();

  report.created += create_all(tx, diff.subjects.as_ref())?;
  report.created += create_all(tx, diff.chapters.as_ref())?;
  report.created += create_all(tx, diff.lessons.as_ref())?;

  report.updated += update_all(tx, diff.subjects.as_ref())?;
  report.updated += update_all(tx, diff.chapters.as_ref())?;
  report.updated += update_all(tx, diff.lessons.as_ref())?;

  report.deleted += delete_all(tx, diff.lessons.as_ref())?;
  report.deleted += delete_all(tx, diff.chapters.as_ref())?;
  report.deleted += delete_all(tx, diff.subjects.as_ref())?;

  Ok(report)
}

// ─── Phases ──────────────────────────────────────────────────────────────────

fn create_all<F: WritableRecord>(
  tx: &Transaction<'_>,
  ops: Option<&TableDiff<F>>,
) -> Result<usize, ApplyError> {
  let Some(ops) = ops else { return Ok(0) };
  for record in &ops.create {
    create(tx, record)?;
  }
  Ok(ops.create.len())
}

fn update_all<F: WritableRecord>(
  tx: &Transaction<'_>,
  ops: Option<&TableDiff<F>>,
) -> Result<usize, ApplyError> {
  let Some(ops) = ops else { return Ok(0) };
  for record in &ops.update {
    update(tx, record)?;
  }
  Ok(ops.update.len())
}

fn delete_all<F: WritableRecord>(
  tx: &Transaction<'_>,
  ops: Option<&TableDiff<F>>,
) -> Result<usize, ApplyError> {
  let Some(ops) = ops else { return Ok(0) };
  for record in &ops.delete {
    delete(tx, F::TABLE, *record)?;
  }
  Ok(ops.delete.len())
}

// ─── Records ─────────────────────────────────────────────────────────────────

fn create<F: WritableRecord>(tx: &Transaction<'_>, record: &F) -> Result<i64, ApplyError> {
  let table = F::TABLE;
  let op = Operation::Create;

  let missing = record.missing_required();
  if !missing.is_empty() {
    return Err(ApplyError::MissingRequired {
      table,
      op,
      fields: missing.join(" and "),
    });
  }
  check_references(tx, record, op, None)?;

  let columns = record.columns();
  let names = columns
    .iter()
    .map(|(name, _)| format!("\"{name}\""))
    .collect::<Vec<_>>()
    .join(", ");
  let placeholders = (1..=columns.len())
    .map(|i| format!("?{i}"))
    .collect::<Vec<_>>()
    .join(", ");
  let sql = format!("INSERT INTO {table} ({names}) VALUES ({placeholders})");

  tx.execute(&sql, params_from_iter(columns.into_iter().map(|(_, v)| sql_value(v))))
    .map_err(storage(table, op, None))?;
  Ok(tx.last_insert_rowid())
}

fn update<F: WritableRecord>(tx: &Transaction<'_>, record: &Keyed<F>) -> Result<(), ApplyError> {
  let table = F::TABLE;
  let op = Operation::Update;
  let id = record.id;

  ensure_exists(tx, table, op, id)?;
  check_references(tx, &record.fields, op, Some(id))?;

  let columns = record.fields.columns();
  if columns.is_empty() {
    return Ok(());
  }

  let assignments = columns
    .iter()
    .enumerate()
    .map(|(i, (name, _))| format!("\"{name}\" = ?{}", i + 1))
    .collect::<Vec<_>>()
    .join(", ");
  let n = columns.len();
  let sql = format!(
    "UPDATE {table} SET {assignments}, updated_at = ?{} WHERE id = ?{}",
    n + 1,
    n + 2
  );

  let mut values: Vec<rusqlite::types::Value> =
    columns.into_iter().map(|(_, v)| sql_value(v)).collect();
  values.push(encode_dt(Utc::now()).into());
  values.push(id.into());

  tx.execute(&sql, params_from_iter(values))
    .map_err(storage(table, op, Some(id)))?;
  Ok(())
}

fn delete(tx: &Transaction<'_>, table: TableName, record: RecordId) -> Result<(), ApplyError> {
  let op = Operation::Delete;
  let id = record.id;

  ensure_exists(tx, table, op, id)?;
  tx.execute(&format!("DELETE FROM {table} WHERE id = ?1"), params![id])
    .map_err(storage(table, op, Some(id)))?;
  Ok(())
}

// ─── Checks ──────────────────────────────────────────────────────────────────

fn row_exists(tx: &Transaction<'_>, table: &str, id: i64) -> rusqlite::Result<bool> {
  Ok(
    tx.query_row(&format!("SELECT 1 FROM {table} WHERE id = ?1"), params![id], |_| Ok(()))
      .optional()?
      .is_some(),
  )
}

fn ensure_exists(
  tx: &Transaction<'_>,
  table: TableName,
  op: Operation,
  id: i64,
) -> Result<(), ApplyError> {
  let found = row_exists(tx, table.as_ref(), id).map_err(storage(table, op, Some(id)))?;
  if found { Ok(()) } else { Err(ApplyError::RowNotFound { table, op, id }) }
}

fn check_references<F: WritableRecord>(
  tx: &Transaction<'_>,
  fields: &F,
  op: Operation,
  id: Option<i64>,
) -> Result<(), ApplyError> {
  let table = F::TABLE;
  for (parent, parent_id) in fields.references() {
    if !row_exists(tx, parent, parent_id).map_err(storage(table, op, id))? {
      return Err(ApplyError::MissingParent { table, op, id, parent, parent_id });
    }
  }
  Ok(())
}

/// Log the raw storage error and replace it with one that names only the
/// table, operation and id.
fn storage(
  table: TableName,
  op: Operation,
  id: Option<i64>,
) -> impl FnOnce(rusqlite::Error) -> ApplyError {
  move |error| {
    tracing::warn!(%table, %op, ?id, %error, "storage rejected diff operation");
    ApplyError::Storage { table, op, id }
  }
}
