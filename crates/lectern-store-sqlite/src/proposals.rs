//! Proposal rows: submission, lookups, listing and conditional status writes.
//!
//! These functions run on the store's database thread against a borrowed
//! connection or transaction.

use chrono::Utc;
use lectern_core::{
  Error as CoreError,
  proposal::{
    ChangeProposal, NewProposal, Page, PageMeta, ProposalDetail, ProposalId,
    ProposalQuery, ProposalStatus, ProposalSummary, UserId, UserRef,
  },
};
use rusqlite::{Connection, ErrorCode, OptionalExtension as _, TransactionBehavior, params};

use crate::{
  Result, baseline,
  encode::{PROPOSAL_COLUMNS, RawProposal, RawSummary, encode_dt, encode_json, encode_status},
};

// ─── Submission ──────────────────────────────────────────────────────────────

/// Insert a new pending proposal unless its workbook hash is already known.
pub fn submit(conn: &mut Connection, input: NewProposal) -> Result<ChangeProposal> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  if let Some(existing_id) = find_by_hash(&tx, input.excel_hash.as_str())? {
    return Err(CoreError::DuplicateSubmission { existing_id }.into());
  }
  if !user_exists(&tx, input.moderator_id)? {
    return Err(
      CoreError::Validation(format!("unknown moderator {}", input.moderator_id)).into(),
    );
  }
  if let Some(grade_id) = input.scope.grade_id()
    && !baseline::grade_exists(&tx, grade_id)?
  {
    return Err(CoreError::Validation(format!("unknown grade {grade_id}")).into());
  }

  let now = Utc::now();
  let inserted = tx.execute(
    "INSERT INTO change_proposals (
       moderator_id, scope, excel_hash, excel_path,
       excel_snapshot, db_snapshot, diff_json,
       status, decided_by, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, ?9, ?9)",
    params![
      input.moderator_id,
      encode_json(&input.scope)?,
      input.excel_hash.as_str(),
      input.excel_path,
      encode_json(&input.excel_snapshot)?,
      encode_json(&input.db_snapshot)?,
      encode_json(&input.diff)?,
      encode_status(ProposalStatus::Pending),
      encode_dt(now),
    ],
  );

  match inserted {
    Ok(_) => {}
    // The UNIQUE constraint is the final arbiter of the dedup rule.
    Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
      if let Some(existing_id) = find_by_hash(&tx, input.excel_hash.as_str())? {
        return Err(CoreError::DuplicateSubmission { existing_id }.into());
      }
      return Err(rusqlite::Error::SqliteFailure(e, None).into());
    }
    Err(e) => return Err(e.into()),
  }

  let id = tx.last_insert_rowid();
  tx.commit()?;

  Ok(ChangeProposal {
    id,
    moderator_id: input.moderator_id,
    scope: input.scope,
    excel_hash: input.excel_hash,
    excel_path: input.excel_path,
    excel_snapshot: input.excel_snapshot,
    db_snapshot: input.db_snapshot,
    diff: input.diff,
    status: ProposalStatus::Pending,
    decided_by: None,
    created_at: now,
    updated_at: now,
  })
}

fn find_by_hash(conn: &Connection, hash: &str) -> rusqlite::Result<Option<ProposalId>> {
  conn
    .query_row(
      "SELECT id FROM change_proposals WHERE excel_hash = ?1",
      params![hash],
      |row| row.get(0),
    )
    .optional()
}

pub fn user_exists(conn: &Connection, id: UserId) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row("SELECT 1 FROM users WHERE id = ?1", params![id], |_| Ok(()))
      .optional()?
      .is_some(),
  )
}

fn user_ref(conn: &Connection, id: UserId, with_email: bool) -> rusqlite::Result<Option<UserRef>> {
  conn
    .query_row("SELECT id, name, email FROM users WHERE id = ?1", params![id], |row| {
      Ok(UserRef {
        id:    row.get(0)?,
        name:  row.get(1)?,
        email: if with_email { Some(row.get(2)?) } else { None },
      })
    })
    .optional()
}

// ─── Reads ───────────────────────────────────────────────────────────────────

pub fn load(conn: &Connection, id: ProposalId) -> Result<Option<ChangeProposal>> {
  let raw = conn
    .query_row(
      &format!("SELECT {PROPOSAL_COLUMNS} FROM change_proposals WHERE id = ?1"),
      params![id],
      RawProposal::from_row,
    )
    .optional()?;
  raw.map(RawProposal::into_proposal).transpose()
}

pub fn detail(conn: &Connection, id: ProposalId) -> Result<Option<ProposalDetail>> {
  let Some(proposal) = load(conn, id)? else { return Ok(None) };

  // The moderator foreign key cascades, so a proposal always has its author.
  let moderator = user_ref(conn, proposal.moderator_id, true)?
    .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
  let decider = proposal
    .decided_by
    .map(|uid| user_ref(conn, uid, false))
    .transpose()?
    .flatten();

  Ok(Some(ProposalDetail { proposal, moderator, decider }))
}

pub fn list(conn: &Connection, query: ProposalQuery) -> Result<Page<ProposalSummary>> {
  let status = encode_status(query.status);

  let total: i64 = conn.query_row(
    "SELECT COUNT(*) FROM change_proposals WHERE status = ?1",
    params![status],
    |row| row.get(0),
  )?;

  let mut stmt = conn.prepare_cached(
    "SELECT p.id, p.moderator_id, u.name, p.created_at, p.status, p.diff_json
     FROM change_proposals p
     JOIN users u ON u.id = p.moderator_id
     WHERE p.status = ?1
     ORDER BY p.created_at DESC, p.id DESC
     LIMIT ?2 OFFSET ?3",
  )?;
  let raws = stmt
    .query_map(
      params![status, i64::from(query.per_page), query.offset() as i64],
      |row| {
        Ok(RawSummary {
          id:             row.get(0)?,
          moderator_id:   row.get(1)?,
          moderator_name: row.get(2)?,
          created_at:     row.get(3)?,
          status:         row.get(4)?,
          diff_json:      row.get(5)?,
        })
      },
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let data = raws
    .into_iter()
    .map(RawSummary::into_summary)
    .collect::<Result<Vec<_>>>()?;

  Ok(Page { data, meta: PageMeta::new(&query, total.max(0) as u64) })
}

// ─── Status writes ───────────────────────────────────────────────────────────

/// Move a pending proposal to `to`.
///
/// The write is a compare-and-swap on `status = 'pending'`. If another
/// decision got there first, nothing is written and the winner's status is
/// reported as [`CoreError::AlreadyDecided`].
pub fn transition(
  conn: &Connection,
  id: ProposalId,
  to: ProposalStatus,
  decided_by: Option<UserId>,
) -> Result<()> {
  let changed = conn.execute(
    "UPDATE change_proposals
     SET status = ?1, decided_by = COALESCE(?2, decided_by), updated_at = ?3
     WHERE id = ?4 AND status = 'pending'",
    params![encode_status(to), decided_by, encode_dt(Utc::now()), id],
  )?;
  if changed == 1 {
    return Ok(());
  }

  match load(conn, id)? {
    Some(current) => Err(CoreError::AlreadyDecided(current.status).into()),
    None => Err(CoreError::ProposalNotFound(id).into()),
  }
}
