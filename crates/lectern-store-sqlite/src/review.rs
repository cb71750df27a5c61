//! Proposal review: the decision state machine.
//!
//! A rejection is a single conditional status write. An approval runs the
//! drift check, the diff and the `applied` write in one immediate
//! transaction. When the diff fails, that transaction is rolled back and the
//! `failed` marker is written afterwards on its own, so it survives.

use lectern_core::{
  Error as CoreError,
  proposal::{ChangeProposal, Decision, DriftPolicy, ProposalId, ProposalStatus, UserId},
};
use rusqlite::{Connection, TransactionBehavior};

use crate::{Result, apply::apply_diff, baseline, proposals};

pub fn decide(
  conn: &mut Connection,
  id: ProposalId,
  decision: Decision,
  actor: UserId,
  policy: DriftPolicy,
) -> Result<ChangeProposal> {
  let current = proposals::load(conn, id)?.ok_or(CoreError::ProposalNotFound(id))?;
  if !current.status.is_pending() {
    return Err(CoreError::AlreadyDecided(current.status).into());
  }
  if !proposals::user_exists(conn, actor)? {
    return Err(CoreError::Validation(format!("unknown actor {actor}")).into());
  }

  match decision {
    Decision::Reject => {
      proposals::transition(conn, id, ProposalStatus::Rejected, Some(actor))?;
      tracing::info!(proposal_id = id, actor, status = %ProposalStatus::Rejected, "proposal decided");
    }
    Decision::Approve => approve(conn, id, actor, policy)?,
  }

  proposals::load(conn, id)?.ok_or_else(|| CoreError::ProposalNotFound(id).into())
}

fn approve(
  conn: &mut Connection,
  id: ProposalId,
  actor: UserId,
  policy: DriftPolicy,
) -> Result<()> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let proposal = proposals::load(&tx, id)?.ok_or(CoreError::ProposalNotFound(id))?;
  if !proposal.status.is_pending() {
    return Err(CoreError::AlreadyDecided(proposal.status).into());
  }

  match baseline::serialize(&tx, &proposal.scope) {
    Ok(current) if current.data != proposal.db_snapshot => {
      tracing::info!(proposal_id = id, "drift detected; proposal left pending");
      return Err(CoreError::DriftDetected.into());
    }
    Ok(_) => {}
    Err(error) => match policy {
      DriftPolicy::FailClosed => {
        tracing::error!(proposal_id = id, %error, "baseline unavailable; approval refused");
        return Err(CoreError::BaselineUnavailable.into());
      }
      DriftPolicy::FailOpen => {
        tracing::warn!(proposal_id = id, %error, "baseline unavailable; applying without drift check");
      }
    },
  }

  match apply_diff(&tx, &proposal.diff) {
    Ok(report) => {
      proposals::transition(&tx, id, ProposalStatus::Applied, Some(actor))?;
      tx.commit()?;
      tracing::info!(
        proposal_id = id,
        actor,
        status = %ProposalStatus::Applied,
        created = report.created,
        updated = report.updated,
        deleted = report.deleted,
        "proposal decided"
      );
      Ok(())
    }
    Err(apply_error) => {
      tx.rollback()?;
      proposals::transition(conn, id, ProposalStatus::Failed, None)?;
      tracing::warn!(
        proposal_id = id,
        actor,
        status = %ProposalStatus::Failed,
        table = %apply_error.table(),
        op = %apply_error.operation(),
        record_id = ?apply_error.record_id(),
        "diff application failed; data changes rolled back"
      );
      Err(CoreError::ApplyFailed(apply_error).into())
    }
  }
}
