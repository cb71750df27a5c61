//! Scope: the grade/table selector that bounds a baseline and a proposal.

use std::{collections::BTreeSet, str::FromStr};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result};

// ─── Table names ─────────────────────────────────────────────────────────────

/// A table that may appear in a scope.
///
/// The declaration order is the canonical order: parents before children,
/// with the read-only `users` table last. `Ord` follows it, so a
/// `BTreeSet<TableName>` always iterates and serialises in this order.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TableName {
  Subjects,
  Chapters,
  Lessons,
  Users,
}

impl TableName {
  /// Whether a diff may write to this table. `users` is baseline-only.
  pub fn is_writable(self) -> bool { !matches!(self, Self::Users) }
}

// ─── Scope ───────────────────────────────────────────────────────────────────

/// Which tables a snapshot covers, optionally narrowed to one grade.
///
/// A `Scope` can only be built through [`Scope::new`] or deserialisation, both
/// of which reject an empty table set; an unknown table name never gets this
/// far because [`TableName`] is closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawScope")]
pub struct Scope {
  #[serde(skip_serializing_if = "Option::is_none")]
  grade_id: Option<i64>,
  tables:   BTreeSet<TableName>,
}

impl Scope {
  pub fn new(
    grade_id: Option<i64>,
    tables: impl IntoIterator<Item = TableName>,
  ) -> Result<Self> {
    let tables: BTreeSet<_> = tables.into_iter().collect();
    if tables.is_empty() {
      return Err(Error::InvalidScope(
        "scope must name at least one table".to_owned(),
      ));
    }
    Ok(Self { grade_id, tables })
  }

  pub fn grade_id(&self) -> Option<i64> { self.grade_id }

  /// The requested tables in canonical order.
  pub fn tables(&self) -> impl Iterator<Item = TableName> + '_ {
    self.tables.iter().copied()
  }

  pub fn contains(&self, table: TableName) -> bool {
    self.tables.contains(&table)
  }

  /// Decode a scope from an untyped request body, reporting every problem as
  /// [`Error::InvalidScope`].
  pub fn from_value(value: serde_json::Value) -> Result<Self> {
    let raw: RawScope = serde_json::from_value(value)
      .map_err(|e| Error::InvalidScope(e.to_string()))?;
    Self::try_from(raw)
  }
}

/// The wire shape before validation. Table names stay strings here so an
/// unknown name produces a scope error rather than a generic decode error.
#[derive(Deserialize)]
struct RawScope {
  #[serde(default)]
  grade_id: Option<i64>,
  tables:   Option<Vec<String>>,
}

impl TryFrom<RawScope> for Scope {
  type Error = Error;

  fn try_from(raw: RawScope) -> Result<Self> {
    let names = raw.tables.ok_or_else(|| {
      Error::InvalidScope("scope must contain a tables array".to_owned())
    })?;
    let tables = names
      .iter()
      .map(|name| {
        TableName::from_str(name).map_err(|_| {
          Error::InvalidScope(format!("table '{name}' is not allowed"))
        })
      })
      .collect::<Result<Vec<_>>>()?;
    Self::new(raw.grade_id, tables)
  }
}
