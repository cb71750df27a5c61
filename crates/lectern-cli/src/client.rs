//! Async HTTP client wrapping the Lectern JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use lectern_core::{
  proposal::{
    Decision, Page, ProposalDetail, ProposalId, ProposalStatus, ProposalSummary, UserId,
  },
  snapshot::Snapshot,
};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};

/// Connection settings for the Lectern API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub user_id:  Option<UserId>,
}

/// `{id, status}` as returned by submission and decision endpoints.
#[derive(Debug, Deserialize)]
pub struct StatusLine {
  pub id:     ProposalId,
  pub status: ProposalStatus,
}

/// A fetched baseline together with the server's `ETag` for it.
#[derive(Debug)]
pub struct Baseline {
  pub snapshot: Snapshot,
  pub etag:     Option<String>,
}

/// Async HTTP client for the Lectern JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(60))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn actor(&self, req: RequestBuilder) -> RequestBuilder {
    match self.config.user_id {
      Some(id) => req.header("X-User-Id", id.to_string()),
      None => req,
    }
  }

  async fn send(&self, req: RequestBuilder, what: &str) -> Result<Response> {
    tracing::debug!(what, "sending request");
    let resp = self.actor(req).send().await.with_context(|| format!("{what} failed"))?;
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(anyhow!("{what} → {status}: {body}"))
  }

  async fn json<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T> {
    let resp = self.send(req, what).await?;
    resp.json().await.with_context(|| format!("deserialising {what} response"))
  }

  // ── Moderator ─────────────────────────────────────────────────────────────

  /// `POST /api/mod/baseline`
  pub async fn baseline(&self, scope: Value) -> Result<Baseline> {
    let req = self.client.post(self.url("/mod/baseline")).json(&json!({ "scope": scope }));
    let resp = self.send(req, "POST /mod/baseline").await?;
    let etag = resp
      .headers()
      .get(reqwest::header::ETAG)
      .and_then(|v| v.to_str().ok())
      .map(str::to_owned);
    let snapshot = resp.json().await.context("deserialising baseline")?;
    Ok(Baseline { snapshot, etag })
  }

  /// `POST /api/mod/proposals`
  pub async fn submit(&self, body: &Value) -> Result<StatusLine> {
    let req = self.client.post(self.url("/mod/proposals")).json(body);
    self.json(req, "POST /mod/proposals").await
  }

  // ── Admin ─────────────────────────────────────────────────────────────────

  /// `GET /api/admin/proposals[?status=..][&page=..][&per_page=..]`
  pub async fn list(
    &self,
    status: Option<&str>,
    page: Option<u32>,
    per_page: Option<u32>,
  ) -> Result<Page<ProposalSummary>> {
    let mut query: Vec<(&str, String)> = Vec::new();
    if let Some(s) = status {
      query.push(("status", s.to_owned()));
    }
    if let Some(p) = page {
      query.push(("page", p.to_string()));
    }
    if let Some(n) = per_page {
      query.push(("per_page", n.to_string()));
    }
    let req = self.client.get(self.url("/admin/proposals")).query(&query);
    self.json(req, "GET /admin/proposals").await
  }

  /// `GET /api/admin/proposals/{id}`
  pub async fn show(&self, id: ProposalId) -> Result<ProposalDetail> {
    let req = self.client.get(self.url(&format!("/admin/proposals/{id}")));
    self.json(req, "GET /admin/proposals/{id}").await
  }

  /// `POST /api/admin/proposals/{id}/decision`
  pub async fn decide(&self, id: ProposalId, action: Decision) -> Result<StatusLine> {
    let req = self
      .client
      .post(self.url(&format!("/admin/proposals/{id}/decision")))
      .json(&json!({ "action": action }));
    self.json(req, "POST /admin/proposals/{id}/decision").await
  }
}
