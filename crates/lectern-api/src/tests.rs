//! Router tests against an in-memory SQLite store.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use lectern_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{actor::USER_ID_HEADER, api_router};

const SEED: &str = "
INSERT INTO grades (id, name, level) VALUES (7, 'Grade 7', 7);
INSERT INTO users (id, email, name, role) VALUES
  (1, 'mona@example.com', 'Mona Moderator',  'Moderator'),
  (2, 'adam@example.com', 'Adam Admin',      'Admin'),
  (5, 'ines@example.com', 'Ines Instructor', 'Instructor');
INSERT INTO subjects (id, grade_id, instructor_id, title) VALUES (10, 7, 5, 'Algebra');
";

const MODERATOR: &str = "1";
const ADMIN: &str = "2";

async fn app() -> Router {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  store.execute_batch(SEED).await.expect("seed");
  api_router(Arc::new(store))
}

async fn send(
  app: &Router,
  method: &str,
  uri: &str,
  user: Option<&str>,
  body: Option<Value>,
) -> (StatusCode, header::HeaderMap, Value) {
  let mut req = Request::builder().method(method).uri(uri);
  if let Some(user) = user {
    req = req.header(USER_ID_HEADER, user);
  }
  let req = match body {
    Some(body) => req
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap(),
    None => req.body(Body::empty()).unwrap(),
  };

  let resp = app.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let headers = resp.headers().clone();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let json = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, headers, json)
}

fn hash(c: char) -> String { c.to_string().repeat(64) }

/// Fetch a baseline for grade 7 subjects and wrap it in a submission body.
async fn submission(app: &Router, hash: &str, diff: Value) -> Value {
  let scope = json!({ "grade_id": 7, "tables": ["subjects"] });
  let (status, _, baseline) = send(
    app,
    "POST",
    "/mod/baseline",
    Some(MODERATOR),
    Some(json!({ "scope": scope })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  json!({
    "scope":          scope,
    "excel_hash":     hash,
    "excel_path":     "uploads/grade7.xlsx",
    "excel_snapshot": { "subjects": [{ "id": 10, "title": "Algebra", "grade_id": 7 }] },
    "db_snapshot":    baseline["snapshot"],
    "diff_json":      diff,
  })
}

fn physics() -> Value {
  json!({
    "subjects": {
      "create": [
        { "title": "Physics", "grade_id": 7, "instructor_id": 5, "description": "Intro" }
      ]
    }
  })
}

// ─── Baseline ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn baseline_returns_snapshot_with_stable_etag() {
  let app = app().await;
  let body = json!({ "scope": { "grade_id": 7, "tables": ["users", "subjects"] } });

  let (status, headers, snap) =
    send(&app, "POST", "/mod/baseline", Some(MODERATOR), Some(body.clone())).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(snap["scope"]["tables"], json!(["subjects", "users"]));
  assert_eq!(snap["snapshot"]["subjects"][0]["title"], "Algebra");
  assert_eq!(snap["snapshot"]["users"][0]["id"], 5);

  let (_, again, _) =
    send(&app, "POST", "/mod/baseline", Some(MODERATOR), Some(body)).await;
  assert!(headers.get(header::ETAG).is_some());
  assert_eq!(headers.get(header::ETAG), again.get(header::ETAG));
}

#[tokio::test]
async fn baseline_rejects_invalid_scope() {
  let app = app().await;
  for scope in [
    json!({ "grade_id": 7 }),
    json!({ "tables": [] }),
    json!({ "tables": ["quizzes"] }),
    json!({ "grade_id": 9, "tables": ["subjects"] }),
  ] {
    let (status, _, body) = send(
      &app,
      "POST",
      "/mod/baseline",
      Some(MODERATOR),
      Some(json!({ "scope": scope })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "scope {scope}");
    assert_eq!(body["error"], "invalid_scope");
  }
}

#[tokio::test]
async fn requests_without_actor_are_unauthorized() {
  let app = app().await;
  let body = json!({ "scope": { "tables": ["subjects"] } });
  let (status, _, json) = send(&app, "POST", "/mod/baseline", None, Some(body)).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(json["error"], "unauthenticated");

  let (status, _, _) = send(&app, "GET", "/admin/proposals", Some("abc"), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ─── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn submit_approve_then_decide_again() {
  let app = app().await;
  let body = submission(&app, &hash('a'), physics()).await;

  let (status, _, created) =
    send(&app, "POST", "/mod/proposals", Some(MODERATOR), Some(body)).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(created["status"], "pending");
  let id = created["id"].as_i64().unwrap();

  let uri = format!("/admin/proposals/{id}/decision");
  let (status, _, decided) = send(
    &app,
    "POST",
    &uri,
    Some(ADMIN),
    Some(json!({ "action": "approve" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(decided, json!({ "id": id, "status": "applied" }));

  let (_, _, snap) = send(
    &app,
    "POST",
    "/mod/baseline",
    Some(MODERATOR),
    Some(json!({ "scope": { "grade_id": 7, "tables": ["subjects"] } })),
  )
  .await;
  let subjects = snap["snapshot"]["subjects"].as_array().unwrap();
  assert_eq!(subjects.len(), 2);
  assert_eq!(subjects[1]["title"], "Physics");
  assert_eq!(subjects[1]["instructor_id"], 5);
  assert_eq!(subjects[1]["description"], "Intro");

  let (status, _, body) = send(
    &app,
    "POST",
    &uri,
    Some(ADMIN),
    Some(json!({ "action": "reject" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["message"], "already decided");
  assert_eq!(body["current_status"], "applied");
}

#[tokio::test]
async fn duplicate_hash_reports_existing_id() {
  let app = app().await;
  let first = submission(&app, &hash('b'), physics()).await;
  let (_, _, created) =
    send(&app, "POST", "/mod/proposals", Some(MODERATOR), Some(first)).await;

  let second = submission(&app, &hash('b'), json!({ "subjects": { "delete": [{ "id": 10 }] } })).await;
  let (status, _, body) =
    send(&app, "POST", "/mod/proposals", Some(MODERATOR), Some(second)).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["existing_id"], created["id"]);

  let (_, _, page) = send(&app, "GET", "/admin/proposals", Some(ADMIN), None).await;
  assert_eq!(page["meta"]["total"], 1);
}

#[tokio::test]
async fn drift_is_a_conflict_and_keeps_proposal_pending() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  store.execute_batch(SEED).await.unwrap();
  let store = Arc::new(store);
  let app = api_router(store.clone());

  let body = submission(&app, &hash('c'), physics()).await;
  let (_, _, created) =
    send(&app, "POST", "/mod/proposals", Some(MODERATOR), Some(body)).await;
  let id = created["id"].as_i64().unwrap();

  store
    .execute_batch("UPDATE subjects SET title = 'Algebra I' WHERE id = 10")
    .await
    .unwrap();

  let (status, _, body) = send(
    &app,
    "POST",
    &format!("/admin/proposals/{id}/decision"),
    Some(ADMIN),
    Some(json!({ "action": "approve" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["error"], "drift_detected");

  let (_, _, shown) =
    send(&app, "GET", &format!("/admin/proposals/{id}"), Some(ADMIN), None).await;
  assert_eq!(shown["status"], "pending");
}

#[tokio::test]
async fn failed_apply_is_a_server_error_naming_the_record() {
  let app = app().await;
  let diff = json!({ "subjects": { "update": [{ "id": 999, "title": "Ghost" }] } });
  let body = submission(&app, &hash('d'), diff).await;
  let (_, _, created) =
    send(&app, "POST", "/mod/proposals", Some(MODERATOR), Some(body)).await;
  let id = created["id"].as_i64().unwrap();

  let (status, _, body) = send(
    &app,
    "POST",
    &format!("/admin/proposals/{id}/decision"),
    Some(ADMIN),
    Some(json!({ "action": "approve" })),
  )
  .await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body["error"], "apply_failed");
  assert_eq!(body["table"], "subjects");
  assert_eq!(body["operation"], "update");
  assert_eq!(body["id"], 999);

  let (_, _, shown) =
    send(&app, "GET", &format!("/admin/proposals/{id}"), Some(ADMIN), None).await;
  assert_eq!(shown["status"], "failed");
}

// ─── Validation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn submit_accepts_diff_alias_and_rejects_bad_payloads() {
  let app = app().await;

  let mut aliased = submission(&app, &hash('e'), physics()).await;
  let diff = aliased["diff_json"].take();
  aliased.as_object_mut().unwrap().remove("diff_json");
  aliased["diff"] = diff;
  let (status, _, _) =
    send(&app, "POST", "/mod/proposals", Some(MODERATOR), Some(aliased)).await;
  assert_eq!(status, StatusCode::CREATED);

  let mut bad_hash = submission(&app, "ABC", physics()).await;
  let (status, _, body) =
    send(&app, "POST", "/mod/proposals", Some(MODERATOR), Some(bad_hash.take())).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["error"], "validation_failed");

  let mut no_workbook = submission(&app, &hash('9'), physics()).await;
  no_workbook.as_object_mut().unwrap().remove("excel_snapshot");
  let (status, _, body) =
    send(&app, "POST", "/mod/proposals", Some(MODERATOR), Some(no_workbook)).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["error"], "validation_failed");

  let mut unknown_grade = submission(&app, &hash('8'), physics()).await;
  unknown_grade["scope"]["grade_id"] = json!(9);
  let (status, _, _) =
    send(&app, "POST", "/mod/proposals", Some(MODERATOR), Some(unknown_grade)).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

  let bad_table = submission(&app, &hash('f'), json!({ "quizzes": { "delete": [{ "id": 1 }] } })).await;
  let (status, _, _) =
    send(&app, "POST", "/mod/proposals", Some(MODERATOR), Some(bad_table)).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// ─── Admin reads ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_and_show() {
  let app = app().await;
  let body = submission(&app, &hash('1'), physics()).await;
  let (_, _, created) =
    send(&app, "POST", "/mod/proposals", Some(MODERATOR), Some(body)).await;
  let id = created["id"].as_i64().unwrap();

  let (status, _, page) = send(&app, "GET", "/admin/proposals", Some(ADMIN), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(page["data"][0]["id"], id);
  assert_eq!(page["data"][0]["moderator"]["name"], "Mona Moderator");
  assert_eq!(page["data"][0]["summary"]["subjects"]["create"], 1);
  assert_eq!(page["meta"]["per_page"], 15);

  let (status, _, shown) =
    send(&app, "GET", &format!("/admin/proposals/{id}"), Some(ADMIN), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(shown["excel_path"], "uploads/grade7.xlsx");
  assert_eq!(shown["moderator"]["email"], "mona@example.com");
  assert_eq!(shown["diff_json"]["subjects"]["create"][0]["title"], "Physics");
  assert_eq!(shown["decider"], Value::Null);

  let (status, _, _) = send(&app, "GET", "/admin/proposals/9999", Some(ADMIN), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  for query in ["status=done", "per_page=0", "per_page=101", "page=x"] {
    let (status, _, _) =
      send(&app, "GET", &format!("/admin/proposals?{query}"), Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "query {query}");
  }
}

#[tokio::test]
async fn decide_unknown_proposal_is_not_found() {
  let app = app().await;
  let (status, _, body) = send(
    &app,
    "POST",
    "/admin/proposals/4242/decision",
    Some(ADMIN),
    Some(json!({ "action": "reject" })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["error"], "not_found");

  let (status, _, _) = send(
    &app,
    "POST",
    "/admin/proposals/4242/decision",
    Some(ADMIN),
    Some(json!({ "action": "maybe" })),
  )
  .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
