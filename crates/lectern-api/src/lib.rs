//! JSON REST API for the Lectern proposal engine.
//!
//! Exposes an axum [`Router`] backed by any
//! [`lectern_core::store::ProposalStore`]. Authentication and role checks are
//! the caller's responsibility; the upstream auth layer passes the acting user
//! in the `X-User-Id` header (see [`actor`]).
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", lectern_api::api_router(store.clone()))
//! ```

pub mod actor;
pub mod admin;
pub mod error;
pub mod etag;
pub mod moderator;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use lectern_core::store::ProposalStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: ProposalStore + 'static,
{
  Router::new()
    // Moderator
    .route("/mod/baseline", post(moderator::baseline::<S>))
    .route("/mod/proposals", post(moderator::submit::<S>))
    // Admin
    .route("/admin/proposals", get(admin::list::<S>))
    .route("/admin/proposals/{id}", get(admin::show::<S>))
    .route("/admin/proposals/{id}/decision", post(admin::decide::<S>))
    .with_state(store)
}

#[cfg(test)]
mod tests;
