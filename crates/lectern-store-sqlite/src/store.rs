//! [`SqliteStore`], the SQLite implementation of [`ProposalStore`].

use std::{path::Path, time::Duration};

use lectern_core::{
  proposal::{
    ChangeProposal, Decision, DriftPolicy, NewProposal, Page, ProposalDetail, ProposalId,
    ProposalQuery, ProposalSummary, UserId,
  },
  scope::Scope,
  snapshot::Snapshot,
  store::ProposalStore,
};

use crate::{Error, Result, baseline, proposals, review, schema::SCHEMA};

// ─── Options ─────────────────────────────────────────────────────────────────

/// Runtime knobs for a [`SqliteStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
  /// What an approval does when the live baseline cannot be recomputed.
  pub drift_policy: DriftPolicy,
  /// How long a write waits on a lock held by another connection.
  pub busy_timeout: Duration,
}

impl Default for StoreOptions {
  fn default() -> Self {
    Self {
      drift_policy: DriftPolicy::FailClosed,
      busy_timeout: Duration::from_millis(5000),
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Lectern proposal engine backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  options: StoreOptions,
}

impl SqliteStore {
  /// Open (or create) a store at `path` with default options.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with(path, StoreOptions::default()).await
  }

  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open_with(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, options };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    Self::open_in_memory_with(StoreOptions::default()).await
  }

  pub async fn open_in_memory_with(options: StoreOptions) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, options };
    store.init_schema().await?;
    Ok(store)
  }

  pub fn options(&self) -> StoreOptions { self.options }

  async fn init_schema(&self) -> Result<()> {
    let busy_timeout = self.options.busy_timeout;
    self
      .conn
      .call(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `sql` as a batch on the store's connection. Used to seed content
  /// tables, which this engine does not otherwise write outside a diff.
  pub async fn execute_batch(&self, sql: impl Into<String>) -> Result<()> {
    let sql = sql.into();
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── ProposalStore impl ──────────────────────────────────────────────────────

impl ProposalStore for SqliteStore {
  type Error = Error;

  async fn baseline(&self, scope: Scope) -> Result<Snapshot> {
    self
      .conn
      .call(move |conn| Ok(baseline::fetch(conn, &scope)))
      .await?
  }

  async fn submit(&self, input: NewProposal) -> Result<ChangeProposal> {
    input.validate()?;
    let hash = input.excel_hash.clone();

    let result = self
      .conn
      .call(move |conn| Ok(proposals::submit(conn, input)))
      .await?;

    match &result {
      Ok(proposal) => {
        tracing::info!(proposal_id = proposal.id, excel_hash = %hash, "proposal submitted");
      }
      Err(Error::Core(lectern_core::Error::DuplicateSubmission { existing_id })) => {
        tracing::info!(existing_id, excel_hash = %hash, "duplicate submission rejected");
      }
      Err(_) => {}
    }
    result
  }

  async fn get_proposal(&self, id: ProposalId) -> Result<Option<ProposalDetail>> {
    self
      .conn
      .call(move |conn| Ok(proposals::detail(conn, id)))
      .await?
  }

  async fn list_proposals(&self, query: ProposalQuery) -> Result<Page<ProposalSummary>> {
    self
      .conn
      .call(move |conn| Ok(proposals::list(conn, query)))
      .await?
  }

  async fn decide(
    &self,
    id: ProposalId,
    decision: Decision,
    actor: UserId,
  ) -> Result<ChangeProposal> {
    let policy = self.options.drift_policy;
    self
      .conn
      .call(move |conn| Ok(review::decide(conn, id, decision, actor, policy)))
      .await?
  }
}
