mod helpers;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::Engine;
use serde_json::{json, Value};
use tower::ServiceExt;

use helpers::{
    test_app, test_app_with, zip_bytes, FailingMailer, TestApp, ADMIN_PASS, ADMIN_USER, API_TOKEN,
};
use liam::server::router;

const BOUNDARY: &str = "liam-test-boundary";

fn app(test: &TestApp) -> Router {
    router(test.state.clone())
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-API-Key", API_TOKEN)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_authed(uri: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::AUTHORIZATION, format!("Bearer {API_TOKEN}"))
        .body(Body::empty())
        .unwrap()
}

fn multipart_upload(uri: &str, file_name: &str, bytes: &[u8], agent: Option<&str>) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/zip\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");
    if let Some(agent) = agent {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"agent\"\r\n\r\n{agent}\r\n")
                .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::post(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .header("X-API-Key", API_TOKEN)
        .body(Body::from(body))
        .unwrap()
}

fn post_authed(uri: &str, content_type: &str, body: impl Into<Body>) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, content_type)
        .header("X-API-Key", API_TOKEN)
        .body(body.into())
        .unwrap()
}

fn admin_post(uri: &str, token: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn basic(user: &str, pass: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{pass}"));
    format!("Basic {encoded}")
}

async fn admin_token(test: &TestApp) -> String {
    let request = Request::post("/admin/login")
        .header(header::AUTHORIZATION, basic(ADMIN_USER, ADMIN_PASS))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(test), request).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn public_routes_need_no_token() {
    let test = test_app();

    let (status, body) = send(app(&test), Request::get("/").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().unwrap().starts_with("Liam is live"));

    let (status, body) = send(app(&test), Request::get("/ping").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));

    let (status, body) = send(app(&test), Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["apiToken"], "configured");
    assert_eq!(body["checks"]["memoryIndex"], "missing");
}

#[tokio::test]
async fn protected_routes_reject_missing_or_wrong_token() {
    let test = test_app();

    let request = Request::post("/prompt")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"prompt":"hi"}"#))
        .unwrap();
    let (status, body) = send(app(&test), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let request = Request::get("/memories")
        .header("X-API-Key", "wrong")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app(&test), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_locked_when_no_token_configured() {
    let test = test_app_with(|c| c.auth.api_token = None);
    let (status, _) = send(app(&test), post_json("/prompt", json!({"prompt": "hi"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn ask_liam_completes_resolves_and_mails() {
    let test = test_app();

    let (status, body) = send(
        app(&test),
        post_json("/ask-liam", json!({"prompt": "Plan my week", "sendTo": "alice"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["to"], "alice@example.com");
    assert_eq!(body["sent"], true);
    assert_eq!(body["response"], "Reply to: Plan my week");

    let sent = test.mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "alice@example.com");
    assert_eq!(sent[0].subject, "Liam's GPT Email Delivery");
    assert_eq!(sent[0].body, "Reply to: Plan my week");
}

#[tokio::test]
async fn ask_liam_validates_and_reports_unknown_recipient() {
    let test = test_app();

    let (status, body) = send(app(&test), post_json("/ask-liam", json!({"prompt": "hi"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing prompt or sendTo");

    let (status, body) = send(
        app(&test),
        post_json("/ask-liam", json!({"prompt": "hi", "sendTo": "Carol"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Recipient not found in contacts sheet.");

    // Bob is in the sheet without an address.
    let (status, _) = send(
        app(&test),
        post_json("/ask-liam", json!({"prompt": "hi", "sendTo": "Bob"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(test.mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn completion_failure_is_internal_error_and_logged() {
    let mut test = test_app();
    test.state.chat = std::sync::Arc::new(helpers::FakeChat { fail: true });

    let (status, body) = send(app(&test), post_json("/prompt", json!({"prompt": "hi"}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("HTTP 500"));

    let entries = test.state.activity.snapshot();
    assert!(entries.iter().any(|e| e.message.starts_with("prompt:")));
}

#[tokio::test]
async fn mail_failure_is_internal_error_and_logged() {
    let mut test = test_app();
    test.state.mailer = std::sync::Arc::new(FailingMailer);

    let (status, body) = send(
        app(&test),
        post_json("/ask-liam", json!({"prompt": "Plan my week", "sendTo": "Alice"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("535"));

    let entries = test.state.activity.snapshot();
    assert!(entries
        .iter()
        .any(|e| e.message.starts_with("ask-liam:") && e.message.contains("SMTP")));
}

#[tokio::test]
async fn malformed_requests_get_json_errors() {
    let test = test_app();

    let request = post_authed("/prompt", "application/json", "{not json");
    let (status, body) = send(app(&test), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{body}");

    let request = post_authed("/prompt", "text/plain", r#"{"prompt":"hi"}"#);
    let (status, body) = send(app(&test), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{body}");

    let form = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"agent\"\r\n\r\nnova\r\n--{BOUNDARY}--\r\n"
    );
    let request = post_authed(
        "/upload-memory",
        &format!("multipart/form-data; boundary={BOUNDARY}"),
        form,
    );
    let (status, body) = send(app(&test), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "field 'file' is required");

    let (status, body) = send(app(&test), get_authed("/drive/files?folder=a&folder=b")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{body}");
}

#[tokio::test]
async fn oversized_bodies_get_413_json() {
    let test = test_app_with(|c| c.server.max_upload_bytes = 64);

    let prompt = "x".repeat(500);
    let (status, body) = send(app(&test), post_json("/prompt", json!({ "prompt": prompt }))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].is_string(), "{body}");

    let text = "alpha ".repeat(100);
    let zip = zip_bytes(&[("a.txt", text.as_str())]);
    let (status, body) = send(app(&test), multipart_upload("/upload-memory", "a.zip", &zip, None)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].is_string(), "{body}");
    assert!(test.state.store.load_log().unwrap().archives.is_empty());
}

#[tokio::test]
async fn send_email_accepts_address_or_contact_name() {
    let test = test_app();

    let (status, body) = send(
        app(&test),
        post_json("/send-email", json!({"to": "dave@example.org", "subject": "Hi", "body": "Hello"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["to"], "dave@example.org");

    let (status, body) = send(
        app(&test),
        post_json("/send-email", json!({"sendTo": "ALICE", "text": "Hello again"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["to"], "alice@example.com");

    let sent = test.mailer.sent.lock().unwrap();
    assert_eq!(sent[0].subject, "Hi");
    assert_eq!(sent[1].subject, "Liam's GPT Email Delivery");
}

#[tokio::test]
async fn upload_then_recall_over_http() {
    let test = test_app();
    let zip = zip_bytes(&[
        ("trips/paris.txt", "Paris trip: visited the Louvre and ate croissants."),
        ("work.txt", "Quarterly budget review meeting on Thursday."),
    ]);

    let (status, body) = send(app(&test), multipart_upload("/upload-memory", "memories.zip", &zip, Some("nova"))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["name"], "memories.zip");
    assert_eq!(body["agent"], "nova");
    assert_eq!(body["files"], 2);

    let (status, body) = send(app(&test), multipart_upload("/upload-memory", "memories.zip", &zip, None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already been ingested"));

    let (status, body) = send(
        app(&test),
        post_json("/recall", json!({"query": "Louvre croissants Paris", "topK": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0]["source"].as_str().unwrap().ends_with("trips/paris.txt"));
    assert!(results[0]["text"].as_str().unwrap().contains("Louvre"));

    let (status, body) = send(app(&test), get_authed("/memories")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["archives"][0]["agent"], "nova");
}

#[tokio::test]
async fn recall_top_k_is_clamped() {
    let test = test_app_with(|c| c.retrieval.max_top_k = 2);
    let zip = zip_bytes(&[
        ("a.txt", "red apples"),
        ("b.txt", "green pears"),
        ("c.txt", "yellow bananas"),
    ]);
    let (status, body) = send(app(&test), multipart_upload("/upload-memory", "fruit.zip", &zip, None)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = send(app(&test), post_json("/recall", json!({"query": "apples", "topK": 0}))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["results"].as_array().unwrap().len(), 1);

    let (status, body) = send(app(&test), post_json("/recall", json!({"query": "apples", "topK": 99}))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn upload_rejects_non_zip_and_recall_needs_index() {
    let test = test_app();

    let (status, _) = send(app(&test), multipart_upload("/upload-memory", "notes.txt", b"plain", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(app(&test), post_json("/recall", json!({"query": "   "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(app(&test), post_json("/recall", json!({"query": "anything"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("memory index not found"));
}

#[tokio::test]
async fn drive_routes_use_drive_store() {
    let test = test_app();

    let (status, body) = send(
        app(&test),
        post_json("/drive/docs", json!({"title": "Minutes", "content": "Agenda", "folder": "f1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["name"], "Minutes");
    assert_eq!(body["mimeType"], "application/vnd.google-apps.document");

    let (status, _) = send(app(&test), post_json("/drive/docs", json!({"content": "x"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(app(&test), get_authed("/drive/files?folder=f1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["files"].as_array().unwrap().len(), 1);

    let uploads = test.drive.uploads.lock().unwrap();
    assert_eq!(uploads[0].bytes, b"Agenda");
    assert_eq!(uploads[0].parent.as_deref(), Some("f1"));
}

#[tokio::test]
async fn sync_route_pushes_uploaded_archives() {
    let test = test_app();
    std::fs::write(
        test.state.store.sync_log_path(),
        r#"{"agents":{"nova":{"archivesFolderId":"nova-archives"}},"archives":[]}"#,
    )
    .unwrap();
    let zip = zip_bytes(&[("a.txt", "alpha notes")]);
    let (status, _) = send(app(&test), multipart_upload("/upload-memory", "a.zip", &zip, Some("nova"))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(app(&test), post_authed("/sync", "application/json", Body::empty())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["synced"].as_array().unwrap().len(), 1);
    assert_eq!(body["synced"][0]["name"], "a.zip");
    assert!(body["failed"].as_array().unwrap().is_empty());

    let uploads = test.drive.uploads.lock().unwrap();
    assert_eq!(uploads[0].parent.as_deref(), Some("nova-archives"));
    assert_eq!(uploads[0].bytes, zip);
    drop(uploads);

    let (_, body) = send(app(&test), get_authed("/memories")).await;
    assert_eq!(body["archives"][0]["driveFileId"], "drive-1");
}

#[tokio::test]
async fn dashboard_serves_static_files() {
    let site = tempfile::TempDir::new().unwrap();
    std::fs::write(site.path().join("index.html"), "<h1>Liam dashboard</h1>").unwrap();
    let dir = site.path().to_string_lossy().into_owned();
    let test = test_app_with(move |c| c.server.dashboard_dir = Some(dir));

    let request = Request::get("/dashboard/index.html").body(Body::empty()).unwrap();
    let (status, body) = send(app(&test), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<h1>Liam dashboard</h1>");

    let request = Request::get("/dashboard/missing.html").body(Body::empty()).unwrap();
    let (status, _) = send(app(&test), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let without = test_app();
    let request = Request::get("/dashboard/index.html").body(Body::empty()).unwrap();
    let (status, _) = send(app(&without), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_login_and_jwt_gate() {
    let test = test_app();

    let bad = Request::post("/admin/login")
        .header(header::AUTHORIZATION, basic(ADMIN_USER, "wrong"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app(&test), bad).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The API token is not an admin credential.
    let (status, _) = send(app(&test), get_authed("/admin/logs")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = admin_token(&test).await;
    let request = Request::get("/admin/logs")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(&test), request).await;
    assert_eq!(status, StatusCode::OK);
    let messages: Vec<&str> = body["entries"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["message"].as_str())
        .collect();
    assert!(messages.iter().any(|m| m.contains("admin login failed")));
    assert!(messages.iter().any(|m| m.contains("admin login: admin")));
}

#[tokio::test]
async fn admin_reset_wipes_memories() {
    let test = test_app();
    let zip = zip_bytes(&[("a.txt", "alpha")]);
    let (status, _) = send(app(&test), multipart_upload("/upload-memory", "a.zip", &zip, None)).await;
    assert_eq!(status, StatusCode::CREATED);

    let token = admin_token(&test).await;
    let (status, body) = send(app(&test), admin_post("/admin/reset", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 1);

    let (_, body) = send(app(&test), get_authed("/memories")).await;
    assert_eq!(body["count"], 0);
    assert!(!test.dir.path().join("memory-index.json").exists());
}

#[tokio::test]
async fn admin_reindex_rebuilds_index() {
    let test = test_app();
    let zip = zip_bytes(&[("a.txt", "alpha notes"), ("b.txt", "beta notes")]);
    let (status, upload) = send(app(&test), multipart_upload("/upload-memory", "ab.zip", &zip, None)).await;
    assert_eq!(status, StatusCode::CREATED);
    std::fs::remove_file(test.state.store.index_path()).unwrap();

    let (status, _) = send(app(&test), post_authed("/admin/reindex", "application/json", Body::empty())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = admin_token(&test).await;
    let (status, body) = send(app(&test), admin_post("/admin/reindex", &token)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["fragments"], upload["fragments"]);

    let (status, body) = send(app(&test), post_json("/recall", json!({"query": "alpha"}))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["results"][0]["source"].as_str().unwrap().ends_with("a.txt"));
}
