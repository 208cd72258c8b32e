//! HTTP behavior of the shared app, driven in-process with `oneshot`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use mockrest::{build_app, App, Settings};
use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    app: App,
    db_path: PathBuf,
    _dir: TempDir,
}

async fn start(doc: Value, tweak: impl FnOnce(&mut Settings)) -> anyhow::Result<TestApp> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("db.json");
    tokio::fs::write(&db_path, serde_json::to_vec_pretty(&doc)?).await?;
    let mut settings = Settings {
        db_path: db_path.clone(),
        ..Settings::default()
    };
    tweak(&mut settings);
    let app = build_app(&settings).await?;
    Ok(TestApp { app, db_path, _dir: dir })
}

async fn tasks_app() -> anyhow::Result<TestApp> {
    start(json!({ "tasks": [], "profile": { "name": "mock" } }), |_| {}).await
}

impl TestApp {
    async fn call(&self, method: &str, uri: &str, body: Option<&str>) -> anyhow::Result<(StatusCode, Value)> {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(b) => {
                req = req.header("content-type", "application/json");
                Body::from(b.to_string())
            }
            None => Body::empty(),
        };
        let res = self.app.clone().oneshot(req.body(body)?).await?;
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await?;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, json))
    }

    async fn on_disk(&self) -> anyhow::Result<Value> {
        Ok(serde_json::from_slice(&tokio::fs::read(&self.db_path).await?)?)
    }
}

#[tokio::test]
async fn create_get_delete_through_api_prefix() -> anyhow::Result<()> {
    let t = tasks_app().await?;

    let (status, created) = t.call("POST", "/api/tasks", Some(r#"{"title":"A"}"#)).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created, json!({"id": 1, "title": "A"}));

    let (status, fetched) = t.call("GET", "/api/tasks/1", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (status, body) = t.call("DELETE", "/api/tasks/1", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (status, body) = t.call("GET", "/api/tasks/1", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
    Ok(())
}

#[tokio::test]
async fn list_returns_records_in_creation_order() -> anyhow::Result<()> {
    let t = tasks_app().await?;
    for title in ["first", "second", "third"] {
        let (status, _) = t.call("POST", "/tasks", Some(&json!({"title": title}).to_string())).await?;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, list) = t.call("GET", "/tasks", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        list,
        json!([
            {"id": 1, "title": "first"},
            {"id": 2, "title": "second"},
            {"id": 3, "title": "third"}
        ])
    );
    assert_eq!(t.on_disk().await?["tasks"], list);
    Ok(())
}

#[tokio::test]
async fn prefixed_and_plain_paths_behave_the_same() -> anyhow::Result<()> {
    let t = start(json!({ "tasks": [{"id": 1, "title": "A"}] }), |_| {}).await?;
    for (plain, prefixed) in [("/tasks", "/api/tasks"), ("/tasks/1", "/api/tasks/1"), ("/tasks/9", "/api/tasks/9")] {
        assert_eq!(t.call("GET", plain, None).await?, t.call("GET", prefixed, None).await?);
    }
    let (status, _) = t.call("PATCH", "/api/tasks/1?ignored=yes", Some(r#"{"done":true}"#)).await?;
    assert_eq!(status, StatusCode::OK);
    let (_, record) = t.call("GET", "/tasks/1", None).await?;
    assert_eq!(record, json!({"id": 1, "title": "A", "done": true}));
    Ok(())
}

#[tokio::test]
async fn update_of_missing_id_is_not_found_and_leaves_store_alone() -> anyhow::Result<()> {
    let t = start(json!({ "tasks": [{"id": 1, "title": "A"}] }), |_| {}).await?;
    let before_mem = t.call("GET", "/db", None).await?.1;
    let before_disk = t.on_disk().await?;

    for method in ["PUT", "PATCH"] {
        let (status, _) = t.call(method, "/api/tasks/2", Some(r#"{"title":"B"}"#)).await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
    let (status, _) = t.call("DELETE", "/api/tasks/2", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(t.call("GET", "/db", None).await?.1, before_mem);
    assert_eq!(t.on_disk().await?, before_disk);
    Ok(())
}

#[tokio::test]
async fn put_replaces_and_patch_merges() -> anyhow::Result<()> {
    let t = start(json!({ "tasks": [{"id": "a", "title": "A", "done": false}] }), |_| {}).await?;

    let (status, merged) = t.call("PATCH", "/tasks/a", Some(r#"{"done":true}"#)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(merged, json!({"id": "a", "title": "A", "done": true}));

    let (status, replaced) = t.call("PUT", "/tasks/a", Some(r#"{"id":"z","title":"B"}"#)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replaced, json!({"id": "a", "title": "B"}));
    assert_eq!(t.on_disk().await?["tasks"], json!([replaced]));
    Ok(())
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() -> anyhow::Result<()> {
    let t = tasks_app().await?;
    let (status, body) = t.call("POST", "/tasks", Some("{not json")).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");

    let (status, _) = t.call("POST", "/tasks", Some("[1,2]")).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(t.call("GET", "/tasks", None).await?.1, json!([]));
    Ok(())
}

#[tokio::test]
async fn duplicate_id_is_a_conflict() -> anyhow::Result<()> {
    let t = start(json!({ "tasks": [{"id": 1}] }), |_| {}).await?;
    let (status, _) = t.call("POST", "/tasks", Some(r#"{"id":1}"#)).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, created) = t.call("POST", "/tasks", Some(r#"{"id":"custom"}"#)).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created, json!({"id": "custom"}));
    Ok(())
}

#[tokio::test]
async fn unknown_resources_and_paths_are_not_found() -> anyhow::Result<()> {
    let t = tasks_app().await?;
    assert_eq!(t.call("GET", "/api/users", None).await?.0, StatusCode::NOT_FOUND);
    assert_eq!(t.call("POST", "/api/users", Some("{}")).await?.0, StatusCode::NOT_FOUND);
    assert_eq!(t.call("GET", "/api/tasks/1/extra", None).await?.0, StatusCode::NOT_FOUND);
    assert_eq!(t.call("GET", "/", None).await?.0, StatusCode::NOT_FOUND);
    // Plural routes have no collection-level PUT or DELETE.
    assert_eq!(t.call("PUT", "/tasks", Some("{}")).await?.0, StatusCode::NOT_FOUND);
    let (status, body) = t.call("DELETE", "/tasks", None).await?;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"]["code"], "method_not_allowed");
    Ok(())
}

#[tokio::test]
async fn singular_resource_reads_and_writes() -> anyhow::Result<()> {
    let t = tasks_app().await?;
    assert_eq!(t.call("GET", "/api/profile", None).await?, (StatusCode::OK, json!({"name": "mock"})));

    let (status, merged) = t.call("PATCH", "/api/profile", Some(r#"{"age":3}"#)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(merged, json!({"name": "mock", "age": 3}));

    let (status, replaced) = t.call("PUT", "/api/profile", Some(r#"{"name":"new"}"#)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replaced, json!({"name": "new"}));

    let (status, posted) = t.call("POST", "/api/profile", Some(r#"{"name":"posted"}"#)).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(posted, json!({"name": "posted"}));

    assert_eq!(t.call("GET", "/api/profile/1", None).await?.0, StatusCode::NOT_FOUND);
    assert_eq!(t.on_disk().await?["profile"], posted);
    Ok(())
}

#[tokio::test]
async fn auxiliary_routes() -> anyhow::Result<()> {
    let t = tasks_app().await?;
    assert_eq!(t.call("GET", "/health", None).await?, (StatusCode::OK, json!({"status": "ok"})));
    assert_eq!(
        t.call("GET", "/ready", None).await?,
        (StatusCode::OK, json!({"status": "ok", "store": "ok"}))
    );
    let (status, version) = t.call("GET", "/version", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(version["name"], "mockrest");
    let (status, db) = t.call("GET", "/api/db", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(db, json!({ "tasks": [], "profile": { "name": "mock" } }));

    tokio::fs::remove_file(&t.db_path).await?;
    assert_eq!(t.call("GET", "/ready", None).await?.0, StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}

#[tokio::test]
async fn read_only_mode_rejects_writes() -> anyhow::Result<()> {
    let t = start(json!({ "tasks": [{"id": 1}] }), |s| s.read_only = true).await?;
    let (status, body) = t.call("POST", "/api/tasks", Some("{}")).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "forbidden");
    assert_eq!(t.call("DELETE", "/tasks/1", None).await?.0, StatusCode::FORBIDDEN);
    assert_eq!(t.call("GET", "/tasks/1", None).await?, (StatusCode::OK, json!({"id": 1})));
    Ok(())
}

#[tokio::test]
async fn without_persistence_the_file_is_untouched() -> anyhow::Result<()> {
    let t = tasks_app_with(|s| s.persist = false).await?;
    let before = t.on_disk().await?;
    let (status, _) = t.call("POST", "/tasks", Some(r#"{"title":"A"}"#)).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(t.call("GET", "/tasks", None).await?.1, json!([{"id": 1, "title": "A"}]));
    assert_eq!(t.on_disk().await?, before);
    Ok(())
}

async fn tasks_app_with(tweak: impl FnOnce(&mut Settings)) -> anyhow::Result<TestApp> {
    start(json!({ "tasks": [] }), tweak).await
}

#[tokio::test]
async fn custom_id_field() -> anyhow::Result<()> {
    let t = start(json!({ "users": [{"_id": 5, "name": "a"}] }), |s| s.id_field = "_id".into()).await?;
    let (status, created) = t.call("POST", "/users", Some(r#"{"name":"b"}"#)).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created, json!({"_id": 6, "name": "b"}));
    assert_eq!(t.call("GET", "/users/6", None).await?.1, created);
    Ok(())
}

#[tokio::test]
async fn oversized_bodies_are_rejected() -> anyhow::Result<()> {
    let t = tasks_app_with(|s| s.body_limit = 16).await?;
    let big = json!({ "title": "x".repeat(64) }).to_string();
    let (status, body) = t.call("POST", "/tasks", Some(&big)).await?;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], "payload_too_large");

    let req = Request::builder()
        .method("POST")
        .uri("/tasks")
        .header("content-type", "application/json")
        .header("content-length", big.len())
        .body(Body::from(big.clone()))?;
    let res = t.app.clone().oneshot(req).await?;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await?;
    let body: Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body["error"]["code"], "payload_too_large");
    assert_eq!(t.call("GET", "/tasks", None).await?.1, json!([]));
    Ok(())
}

#[tokio::test]
async fn custom_rewrite_table_replaces_default() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let routes = dir.path().join("routes.json");
    tokio::fs::write(&routes, r#"{ "/v1/*": "/$1", "/todo/:id": "/tasks/:id" }"#).await?;
    let t = start(json!({ "tasks": [{"id": 1}] }), |s| s.routes_path = Some(routes.clone())).await?;

    assert_eq!(t.call("GET", "/v1/tasks/1", None).await?.0, StatusCode::OK);
    assert_eq!(t.call("GET", "/todo/1", None).await?, (StatusCode::OK, json!({"id": 1})));
    assert_eq!(t.call("GET", "/api/tasks", None).await?.0, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn invalid_documents_fail_at_startup() -> anyhow::Result<()> {
    assert!(start(json!({ "tasks": [{"id": 1}, {"id": 1}] }), |_| {}).await.is_err());
    assert!(start(json!({ "db": [] }), |_| {}).await.is_err());
    assert!(start(json!([1, 2]), |_| {}).await.is_err());
    Ok(())
}

#[tokio::test]
async fn cors_headers_are_sent_by_default() -> anyhow::Result<()> {
    let t = tasks_app().await?;
    let req = Request::builder()
        .method("GET")
        .uri("/tasks")
        .header("origin", "http://example.test")
        .body(Body::empty())?;
    let res = t.app.clone().oneshot(req).await?;
    assert_eq!(res.headers()["access-control-allow-origin"], "http://example.test");
    Ok(())
}

#[tokio::test]
async fn generated_ids_never_repeat_at_the_integer_ceiling() -> anyhow::Result<()> {
    let t = start(json!({ "tasks": [{"id": i64::MAX}] }), |_| {}).await?;
    let (status, created) = t.call("POST", "/tasks", Some(r#"{"title":"A"}"#)).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["id"].is_string());

    let (_, listed) = t.call("GET", "/tasks", None).await?;
    let ids: Vec<_> = listed.as_array().into_iter().flatten().map(|r| r["id"].clone()).collect();
    assert_eq!(ids, vec![json!(i64::MAX), created["id"].clone()]);
    Ok(())
}

#[tokio::test]
async fn failed_persist_is_a_server_error_and_changes_nothing() -> anyhow::Result<()> {
    let t = tasks_app().await?;
    tokio::fs::remove_file(&t.db_path).await?;
    tokio::fs::create_dir(&t.db_path).await?;
    tokio::fs::write(t.db_path.join("keep"), "x").await?;

    let (status, body) = t.call("POST", "/tasks", Some(r#"{"title":"A"}"#)).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "persistence_error");
    assert_eq!(t.call("GET", "/tasks", None).await?, (StatusCode::OK, json!([])));

    let mut tmp = t.db_path.clone().into_os_string();
    tmp.push(".tmp");
    assert!(!PathBuf::from(tmp).exists());
    Ok(())
}
