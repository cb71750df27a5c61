//! The `ProposalStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `lectern-store-sqlite`).
//! Higher layers (`lectern-api`, `lectern-server`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use crate::{
  proposal::{
    ChangeProposal, Decision, NewProposal, Page, ProposalDetail, ProposalId,
    ProposalQuery, ProposalSummary, UserId,
  },
  scope::Scope,
  snapshot::Snapshot,
};

/// Abstraction over a proposal engine backend.
///
/// Backend errors convert into [`crate::Error`] so callers can tell domain
/// outcomes (duplicate, drift, already decided, ...) apart from storage
/// failures without knowing the backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait ProposalStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  // ── Baseline ──────────────────────────────────────────────────────────

  /// Serialise the current data selected by `scope`.
  ///
  /// Read-only and deterministic: for unchanged data, two calls return equal
  /// snapshots that serialise to identical bytes.
  fn baseline(
    &self,
    scope: Scope,
  ) -> impl Future<Output = Result<Snapshot, Self::Error>> + Send + '_;

  // ── Submission ────────────────────────────────────────────────────────

  /// Persist a new `pending` proposal.
  ///
  /// Fails with [`crate::Error::DuplicateSubmission`] if any proposal, in any
  /// status, already carries the same `excel_hash`.
  fn submit(
    &self,
    input: NewProposal,
  ) -> impl Future<Output = Result<ChangeProposal, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Retrieve a proposal with its author and decider. `None` if not found.
  fn get_proposal(
    &self,
    id: ProposalId,
  ) -> impl Future<Output = Result<Option<ProposalDetail>, Self::Error>> + Send + '_;

  /// List proposals in one status, newest first.
  fn list_proposals(
    &self,
    query: ProposalQuery,
  ) -> impl Future<Output = Result<Page<ProposalSummary>, Self::Error>> + Send + '_;

  // ── Review ────────────────────────────────────────────────────────────

  /// Decide a pending proposal and return it in its new status.
  ///
  /// Rejecting only records the verdict. Approving re-serialises the
  /// proposal's scope, fails with [`crate::Error::DriftDetected`] if it no
  /// longer matches the stored baseline, and otherwise applies the diff in
  /// one transaction. An apply failure rolls back every data change, marks
  /// the proposal `failed`, and returns [`crate::Error::ApplyFailed`].
  ///
  /// A proposal that is no longer pending yields
  /// [`crate::Error::AlreadyDecided`] and is never touched again.
  fn decide(
    &self,
    id: ProposalId,
    decision: Decision,
    actor: UserId,
  ) -> impl Future<Output = Result<ChangeProposal, Self::Error>> + Send + '_;
}
