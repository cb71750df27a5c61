//! HTTP server assembly for Lectern.
//!
//! Holds the server configuration and mounts the JSON API under `/api` with
//! request tracing. The binary in `main.rs` only loads configuration, opens
//! the store and serves [`app`].

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::Router;
use lectern_core::{proposal::DriftPolicy, store::ProposalStore};
use lectern_store_sqlite::StoreOptions;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `LECTERN_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:            String,
  #[serde(default = "default_port")]
  pub port:            u16,
  pub store_path:      PathBuf,
  #[serde(default)]
  pub drift_policy:    DriftPolicy,
  #[serde(default = "default_busy_timeout_ms")]
  pub busy_timeout_ms: u64,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_busy_timeout_ms() -> u64 { 5000 }

impl ServerConfig {
  pub fn store_options(&self) -> StoreOptions {
    StoreOptions {
      drift_policy: self.drift_policy,
      busy_timeout: Duration::from_millis(self.busy_timeout_ms),
    }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the application router for `store`.
pub fn app<S>(store: Arc<S>) -> Router
where
  S: ProposalStore + 'static,
{
  Router::new()
    .nest("/api", lectern_api::api_router(store))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use lectern_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  fn config(source: &str) -> ServerConfig {
    serde_json::from_str(source).unwrap()
  }

  #[test]
  fn defaults_fill_everything_but_the_store_path() {
    let cfg = config(r#"{ "store_path": "~/lectern.db" }"#);
    assert_eq!(cfg.address(), "127.0.0.1:8080");
    assert_eq!(cfg.drift_policy, DriftPolicy::FailClosed);
    assert_eq!(cfg.store_options(), StoreOptions::default());
  }

  #[test]
  fn drift_policy_and_timeout_are_configurable() {
    let cfg = config(
      r#"{ "store_path": "x.db", "drift_policy": "fail_open", "busy_timeout_ms": 250 }"#,
    );
    let options = cfg.store_options();
    assert_eq!(options.drift_policy, DriftPolicy::FailOpen);
    assert_eq!(options.busy_timeout, Duration::from_millis(250));
  }

  #[tokio::test]
  async fn api_is_mounted_under_prefix() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let app = app(Arc::new(store));

    let req = Request::builder()
      .uri("/api/admin/proposals")
      .header("x-user-id", "1")
      .body(Body::empty())
      .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let req = Request::builder()
      .uri("/admin/proposals")
      .body(Body::empty())
      .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
