//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings with microsecond precision,
//! so they sort lexically. Structured fields (scope, snapshots, diff) are
//! stored as compact JSON. Statuses are stored as their lowercase label.

use std::str::FromStr as _;

use chrono::{DateTime, SecondsFormat, Utc};
use lectern_core::{
  diff::{Diff, FieldValue},
  proposal::{ChangeProposal, ExcelHash, ProposalStatus, ProposalSummary, UserRef},
};
use rusqlite::{Row, types::Value};
use serde::{Serialize, de::DeserializeOwned};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── ProposalStatus ──────────────────────────────────────────────────────────

pub fn encode_status(status: ProposalStatus) -> String { status.to_string() }

pub fn decode_status(s: &str) -> Result<ProposalStatus> {
  ProposalStatus::from_str(s).map_err(|_| Error::UnknownStatus(s.to_owned()))
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_json<T: Serialize>(value: &T) -> Result<String> {
  Ok(serde_json::to_string(value)?)
}

pub fn decode_json<T: DeserializeOwned>(s: &str) -> Result<T> {
  Ok(serde_json::from_str(s)?)
}

// ─── Diff field values ───────────────────────────────────────────────────────

pub fn sql_value(value: FieldValue) -> Value {
  match value {
    FieldValue::Integer(i) => Value::Integer(i),
    FieldValue::Text(s) => Value::Text(s),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawProposal::from_row`].
pub const PROPOSAL_COLUMNS: &str = "id, moderator_id, scope, excel_hash, excel_path, \
   excel_snapshot, db_snapshot, diff_json, status, decided_by, created_at, updated_at";

/// Raw values read directly from a `change_proposals` row.
pub struct RawProposal {
  pub id:             i64,
  pub moderator_id:   i64,
  pub scope:          String,
  pub excel_hash:     String,
  pub excel_path:     Option<String>,
  pub excel_snapshot: String,
  pub db_snapshot:    String,
  pub diff_json:      String,
  pub status:         String,
  pub decided_by:     Option<i64>,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawProposal {
  /// Read a row selected with [`PROPOSAL_COLUMNS`].
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      moderator_id:   row.get(1)?,
      scope:          row.get(2)?,
      excel_hash:     row.get(3)?,
      excel_path:     row.get(4)?,
      excel_snapshot: row.get(5)?,
      db_snapshot:    row.get(6)?,
      diff_json:      row.get(7)?,
      status:         row.get(8)?,
      decided_by:     row.get(9)?,
      created_at:     row.get(10)?,
      updated_at:     row.get(11)?,
    })
  }

  pub fn into_proposal(self) -> Result<ChangeProposal> {
    Ok(ChangeProposal {
      id:             self.id,
      moderator_id:   self.moderator_id,
      scope:          decode_json(&self.scope)?,
      excel_hash:     ExcelHash::try_from(self.excel_hash)?,
      excel_path:     self.excel_path,
      excel_snapshot: decode_json(&self.excel_snapshot)?,
      db_snapshot:    decode_json(&self.db_snapshot)?,
      diff:           decode_json(&self.diff_json)?,
      status:         decode_status(&self.status)?,
      decided_by:     self.decided_by,
      created_at:     decode_dt(&self.created_at)?,
      updated_at:     decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values for one review-queue line.
pub struct RawSummary {
  pub id:             i64,
  pub moderator_id:   i64,
  pub moderator_name: String,
  pub created_at:     String,
  pub status:         String,
  pub diff_json:      String,
}

impl RawSummary {
  pub fn into_summary(self) -> Result<ProposalSummary> {
    let diff: Diff = decode_json(&self.diff_json)?;
    Ok(ProposalSummary {
      id:         self.id,
      moderator:  UserRef {
        id:    self.moderator_id,
        name:  self.moderator_name,
        email: None,
      },
      created_at: decode_dt(&self.created_at)?,
      status:     decode_status(&self.status)?,
      summary:    diff.summary(),
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  #[test]
  fn timestamps_have_fixed_width() {
    let whole = Utc.with_ymd_and_hms(2025, 9, 11, 11, 14, 6).unwrap();
    let encoded = encode_dt(whole);
    assert_eq!(encoded, "2025-09-11T11:14:06.000000Z");
    assert_eq!(decode_dt(&encoded).unwrap(), whole);
  }

  #[test]
  fn unknown_status_is_an_error() {
    assert!(matches!(decode_status("archived"), Err(Error::UnknownStatus(_))));
    assert_eq!(decode_status("failed").unwrap(), ProposalStatus::Failed);
  }
}
