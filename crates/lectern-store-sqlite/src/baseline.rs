//! Baseline serializer.
//!
//! Produces the deterministic [`Snapshot`] for a [`Scope`]. Every query orders
//! by primary key and maps into a fixed projection, so unchanged data always
//! yields an equal snapshot. Called once to hand a moderator a baseline and
//! again, inside the approval transaction, to check for drift.

use lectern_core::{
  Error as CoreError,
  record::{ChapterRow, LessonRow, SubjectRow, UserRow},
  scope::{Scope, TableName},
  snapshot::{Snapshot, SnapshotData},
};
use rusqlite::{Connection, OptionalExtension as _, Row, params};

use crate::Result;

/// The baseline handed to a moderator. Unlike [`serialize`], an unknown
/// `grade_id` is refused instead of yielding empty tables.
pub fn fetch(conn: &Connection, scope: &Scope) -> Result<Snapshot> {
  if let Some(grade_id) = scope.grade_id()
    && !grade_exists(conn, grade_id)?
  {
    return Err(CoreError::InvalidScope(format!("unknown grade {grade_id}")).into());
  }
  Ok(serialize(conn, scope)?)
}

pub fn grade_exists(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row("SELECT 1 FROM grades WHERE id = ?1", params![id], |_| Ok(()))
      .optional()?
      .is_some(),
  )
}

/// Serialise the rows selected by `scope`. Read-only.
pub fn serialize(conn: &Connection, scope: &Scope) -> rusqlite::Result<Snapshot> {
  let grade_id = scope.grade_id();
  let mut data = SnapshotData::default();

  for table in scope.tables() {
    match table {
      TableName::Subjects => data.subjects = Some(subjects(conn, grade_id)?),
      TableName::Chapters => data.chapters = Some(chapters(conn, grade_id)?),
      TableName::Lessons => data.lessons = Some(lessons(conn, grade_id)?),
      TableName::Users => data.users = Some(users(conn, grade_id)?),
    }
  }

  Ok(Snapshot { scope: scope.clone(), data })
}

fn query_rows<T>(
  conn: &Connection,
  sql: &str,
  grade_id: Option<i64>,
  map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Vec<T>> {
  let mut stmt = conn.prepare_cached(sql)?;
  stmt
    .query_map(params![grade_id], map)?
    .collect::<rusqlite::Result<Vec<_>>>()
}

fn subjects(conn: &Connection, grade_id: Option<i64>) -> rusqlite::Result<Vec<SubjectRow>> {
  query_rows(
    conn,
    "SELECT id, title, grade_id, instructor_id, description
     FROM subjects
     WHERE ?1 IS NULL OR grade_id = ?1
     ORDER BY id",
    grade_id,
    |row| {
      Ok(SubjectRow {
        id:            row.get(0)?,
        title:         row.get(1)?,
        grade_id:      row.get(2)?,
        instructor_id: row.get(3)?,
        description:   row.get(4)?,
      })
    },
  )
}

/// Chapters are scoped through their subject's grade.
fn chapters(conn: &Connection, grade_id: Option<i64>) -> rusqlite::Result<Vec<ChapterRow>> {
  query_rows(
    conn,
    "SELECT c.id, c.subject_id, c.title, c.\"order\"
     FROM chapters c
     JOIN subjects s ON s.id = c.subject_id
     WHERE ?1 IS NULL OR s.grade_id = ?1
     ORDER BY c.id",
    grade_id,
    |row| {
      Ok(ChapterRow {
        id:         row.get(0)?,
        subject_id: row.get(1)?,
        title:      row.get(2)?,
        order:      row.get(3)?,
      })
    },
  )
}

/// Lessons are scoped through chapter → subject → grade.
fn lessons(conn: &Connection, grade_id: Option<i64>) -> rusqlite::Result<Vec<LessonRow>> {
  query_rows(
    conn,
    "SELECT l.id, l.chapter_id, l.title, l.content, l.\"order\", l.version
     FROM lessons l
     JOIN chapters c ON c.id = l.chapter_id
     JOIN subjects s ON s.id = c.subject_id
     WHERE ?1 IS NULL OR s.grade_id = ?1
     ORDER BY l.id",
    grade_id,
    |row| {
      Ok(LessonRow {
        id:         row.get(0)?,
        chapter_id: row.get(1)?,
        title:      row.get(2)?,
        content:    row.get(3)?,
        order:      row.get(4)?,
        version:    row.get(5)?,
      })
    },
  )
}

/// Instructors teaching a subject in the grade. Without a grade there is
/// nothing to anchor the selection, so the table is present but empty.
fn users(conn: &Connection, grade_id: Option<i64>) -> rusqlite::Result<Vec<UserRow>> {
  if grade_id.is_none() {
    return Ok(Vec::new());
  }
  query_rows(
    conn,
    "SELECT id, name, email, role
     FROM users
     WHERE role = 'Instructor'
       AND id IN (SELECT instructor_id FROM subjects WHERE grade_id = ?1)
     ORDER BY id",
    grade_id,
    |row| {
      Ok(UserRow {
        id:    row.get(0)?,
        name:  row.get(1)?,
        email: row.get(2)?,
        role:  row.get(3)?,
      })
    },
  )
}
