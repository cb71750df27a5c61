//! `lectern`: command-line client for the Lectern proposal API.
//!
//! # Usage
//!
//! ```
//! lectern --user-id 3 baseline --grade-id 7 --tables subjects,chapters -o baseline.json
//! lectern --user-id 3 submit --workbook grade7.xlsx --payload proposal.json
//! lectern --user-id 1 list --status pending
//! lectern --user-id 1 approve 12
//! ```

mod client;
mod hash;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use lectern_core::proposal::{Decision, ExcelHash, ProposalId, UserId};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "lectern", about = "Client for the Lectern change-proposal API")]
struct Args {
  /// Path to a TOML config file (url, user_id).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the Lectern server (default: http://localhost:8080).
  #[arg(long, env = "LECTERN_URL")]
  url: Option<String>,

  /// Acting user id, sent as `X-User-Id`.
  #[arg(long, env = "LECTERN_USER_ID")]
  user_id: Option<UserId>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Fetch a baseline snapshot for a scope.
  Baseline {
    #[arg(long)]
    grade_id: Option<i64>,
    /// Comma-separated table names.
    #[arg(long, value_delimiter = ',', required = true)]
    tables:   Vec<String>,
    /// Write the snapshot here instead of stdout.
    #[arg(short, long)]
    output:   Option<PathBuf>,
  },
  /// Submit a proposal built from a workbook and a JSON payload.
  Submit {
    /// The edited workbook; its SHA-256 becomes the proposal's `excel_hash`.
    #[arg(long)]
    workbook:   PathBuf,
    /// JSON file with `scope`, `excel_snapshot`, `db_snapshot` and `diff_json`.
    #[arg(long)]
    payload:    PathBuf,
    /// Stored as `excel_path`; defaults to the workbook path.
    #[arg(long)]
    excel_path: Option<String>,
  },
  /// List proposals.
  List {
    #[arg(long)]
    status:   Option<String>,
    #[arg(long)]
    page:     Option<u32>,
    #[arg(long)]
    per_page: Option<u32>,
  },
  /// Show one proposal in full.
  Show { id: ProposalId },
  /// Approve a pending proposal and apply its diff.
  Approve { id: ProposalId },
  /// Reject a pending proposal.
  Reject { id: ProposalId },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:     String,
  #[serde(default)]
  user_id: Option<UserId>,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| "http://localhost:8080".to_string()),
    user_id:  args.user_id.or(file_cfg.user_id),
  };

  let client = ApiClient::new(api_config)?;
  run(&client, args.command).await
}

async fn run(client: &ApiClient, command: Command) -> Result<()> {
  match command {
    Command::Baseline { grade_id, tables, output } => {
      let scope = json!({ "grade_id": grade_id, "tables": tables });
      let baseline = client.baseline(scope).await?;
      let rendered = serde_json::to_string_pretty(&baseline.snapshot)?;
      match output {
        Some(path) => {
          std::fs::write(&path, rendered)
            .with_context(|| format!("writing {}", path.display()))?;
          eprintln!(
            "baseline written to {} (etag {})",
            path.display(),
            baseline.etag.as_deref().unwrap_or("-")
          );
        }
        None => println!("{rendered}"),
      }
    }

    Command::Submit { workbook, payload, excel_path } => {
      let excel_hash = hash::hash_file(&workbook)?;
      let payload = read_json(&payload)?;
      let excel_path = excel_path.unwrap_or_else(|| workbook.display().to_string());
      let body = submission(payload, &excel_hash, excel_path)?;

      let created = client.submit(&body).await?;
      println!("proposal {} {} (excel_hash {excel_hash})", created.id, created.status);
    }

    Command::List { status, page, per_page } => {
      let page = client.list(status.as_deref(), page, per_page).await?;
      for p in &page.data {
        let summary = p
          .summary
          .iter()
          .map(|(table, c)| format!("{table} +{}/~{}/-{}", c.create, c.update, c.delete))
          .collect::<Vec<_>>()
          .join(", ");
        println!(
          "{:>6}  {:<8}  {}  {:<20}  {summary}",
          p.id,
          p.status,
          p.created_at.format("%Y-%m-%d %H:%M"),
          p.moderator.name,
        );
      }
      println!(
        "page {}/{} ({} total)",
        page.meta.current_page, page.meta.last_page, page.meta.total
      );
    }

    Command::Show { id } => {
      let detail = client.show(id).await?;
      println!("{}", serde_json::to_string_pretty(&detail)?);
    }

    Command::Approve { id } => {
      let line = client.decide(id, Decision::Approve).await?;
      println!("proposal {} {}", line.id, line.status);
    }

    Command::Reject { id } => {
      let line = client.decide(id, Decision::Reject).await?;
      println!("proposal {} {}", line.id, line.status);
    }
  }
  Ok(())
}

fn read_json(path: &Path) -> Result<Value> {
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("reading {}", path.display()))?;
  serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// Complete a payload file into a submission body. Any `excel_hash` or
/// `excel_path` already in the payload is replaced.
fn submission(payload: Value, excel_hash: &ExcelHash, excel_path: String) -> Result<Value> {
  let Value::Object(mut body) = payload else {
    bail!("payload must be a JSON object");
  };
  for key in ["scope", "excel_snapshot", "db_snapshot"] {
    if !body.contains_key(key) {
      bail!("payload is missing `{key}`");
    }
  }
  if !body.contains_key("diff_json") && !body.contains_key("diff") {
    bail!("payload is missing `diff_json`");
  }
  body.insert("excel_hash".to_owned(), Value::String(excel_hash.to_string()));
  body.insert("excel_path".to_owned(), Value::String(excel_path));
  Ok(Value::Object(body))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn hash() -> ExcelHash { hash::workbook_hash(b"workbook").unwrap() }

  #[test]
  fn submission_adds_hash_and_path() {
    let payload = json!({
      "scope": { "tables": ["subjects"] },
      "excel_snapshot": { "subjects": [] },
      "db_snapshot": { "subjects": [] },
      "diff": {},
      "excel_hash": "stale",
    });
    let body = submission(payload, &hash(), "grade7.xlsx".to_owned()).unwrap();
    assert_eq!(body["excel_hash"], hash().as_str());
    assert_eq!(body["excel_path"], "grade7.xlsx");
    assert_eq!(body["diff"], json!({}));
  }

  #[test]
  fn submission_requires_core_keys() {
    let missing_diff = json!({ "scope": {}, "excel_snapshot": {}, "db_snapshot": {} });
    assert!(submission(missing_diff, &hash(), String::new()).is_err());
    let missing_workbook = json!({ "scope": {}, "db_snapshot": {}, "diff": {} });
    assert!(submission(missing_workbook, &hash(), String::new()).is_err());
    assert!(submission(json!([1, 2]), &hash(), String::new()).is_err());
  }
}
