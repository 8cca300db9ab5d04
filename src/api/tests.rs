use super::mock::MockBackend;
use super::*;
use crate::auth::{Session, SessionEvent, SessionStore};
use crate::config::Config;
use crate::model::{LogQuery, LogStatus, NewShellTask};
use serde_json::json;
use tempfile::TempDir;

fn store(dir: &TempDir) -> SessionStore {
    SessionStore::at(dir.path().join("session.json"))
}

fn client_for(backend: &MockBackend, dir: &TempDir) -> ApiClient {
    let config = Config {
        base_url: backend.base_url.clone(),
        ..Config::default()
    };
    ApiClient::new(&config, store(dir)).unwrap()
}

fn ok(data: serde_json::Value) -> (u16, String) {
    (200, MockBackend::envelope(200, "success", data))
}

#[tokio::test]
async fn test_login_without_credential_sends_no_auth_header() {
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::start(vec![ok(json!({"token": "abc"}))]);
    let client = client_for(&backend, &dir);

    let token = client.login("alice", "secret").await.unwrap();
    assert_eq!(token, "abc");

    let requests = backend.finish();
    assert_eq!(requests.len(), 1);
    let req = &requests[0];
    assert_eq!(req.method, "POST");
    assert_eq!(req.url, "/api/v1/auth/login");
    assert!(req.header("Authorization").is_none());
    assert_eq!(req.header("Content-Type"), Some("application/json"));
    assert_eq!(req.json(), json!({"username": "alice", "password": "secret"}));
}

#[tokio::test]
async fn test_installed_credential_is_attached() {
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::start(vec![ok(json!({"tasks": []}))]);
    let client = client_for(&backend, &dir);

    client.set_credential(Some("abc")).unwrap();
    client.list_tasks().await.unwrap();

    let requests = backend.finish();
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].url, "/api/v1/tasks/list");
    assert_eq!(requests[0].header("Authorization"), Some("Bearer abc"));
}

#[tokio::test]
async fn test_credential_loaded_from_store_on_first_use() {
    let dir = TempDir::new().unwrap();
    store(&dir)
        .save(&Session {
            username: "alice".into(),
            token: "persisted".into(),
        })
        .unwrap();

    let backend = MockBackend::start(vec![ok(json!({"files": ["a.sh"]}))]);
    let client = client_for(&backend, &dir);

    let files = client.list_files().await.unwrap();
    assert_eq!(files, vec!["a.sh"]);
    assert_eq!(
        backend.finish()[0].header("Authorization"),
        Some("Bearer persisted")
    );
}

#[test]
fn test_set_credential_round_trip_across_reload() {
    let dir = TempDir::new().unwrap();
    let config = Config::default();

    let client = ApiClient::new(&config, store(&dir)).unwrap();
    client.set_credential(Some("t-1")).unwrap();
    assert_eq!(client.credential().unwrap().as_deref(), Some("t-1"));

    // A new client over the same store models a reload.
    let reloaded = ApiClient::new(&config, store(&dir)).unwrap();
    assert_eq!(reloaded.credential().unwrap().as_deref(), Some("t-1"));

    reloaded.set_credential(None).unwrap();
    assert!(reloaded.credential().unwrap().is_none());

    let reloaded_again = ApiClient::new(&config, store(&dir)).unwrap();
    assert!(reloaded_again.credential().unwrap().is_none());
}

#[tokio::test]
async fn test_null_task_list_is_empty() {
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::start(vec![
        ok(json!({"tasks": null})),
        ok(serde_json::Value::Null),
    ]);
    let client = client_for(&backend, &dir);

    assert!(client.list_tasks().await.unwrap().is_empty());
    assert!(client.list_tasks().await.unwrap().is_empty());
    backend.finish();
}

#[tokio::test]
async fn test_envelope_401_clears_credential() {
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::start(vec![
        (200, MockBackend::envelope(401, "token expired", json!(null))),
        ok(json!({"files": []})),
    ]);
    let mut client = client_for(&backend, &dir);
    let mut events = client.subscribe();

    store(&dir)
        .save(&Session {
            username: "alice".into(),
            token: "abc".into(),
        })
        .unwrap();
    client.set_credential(Some("abc")).unwrap();

    let err = client.list_tasks().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.to_string(), "Unauthorized");
    assert!(client.credential().unwrap().is_none());
    assert!(store(&dir).restore().unwrap().is_none());
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Unauthenticated);
    assert!(events.try_recv().is_err());

    // Next request goes out unauthenticated.
    client.list_files().await.unwrap();
    let requests = backend.finish();
    assert_eq!(requests[0].header("Authorization"), Some("Bearer abc"));
    assert!(requests[1].header("Authorization").is_none());
}

#[tokio::test]
async fn test_transport_401_without_envelope() {
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::start(vec![(401, "unauthorized".to_string())]);
    let client = client_for(&backend, &dir);
    client.set_credential(Some("abc")).unwrap();

    let err = client.list_files().await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized));
    assert!(client.credential().unwrap().is_none());
    backend.finish();
}

#[tokio::test]
async fn test_failure_message_is_verbatim() {
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::start(vec![
        (200, MockBackend::envelope(500, "task not found", json!(null))),
        (500, MockBackend::envelope(200, "looks fine", json!(null))),
        (200, MockBackend::envelope(400, "", json!(null))),
        (502, "<html>bad gateway</html>".to_string()),
    ]);
    let client = client_for(&backend, &dir);
    client.set_credential(Some("abc")).unwrap();

    let err = client.run_task("t-1").await.unwrap_err();
    assert!(matches!(&err, Error::RequestFailed(msg) if msg == "task not found"));

    // A non-2xx transport status fails even with code 200.
    let err = client.run_task("t-1").await.unwrap_err();
    assert!(matches!(&err, Error::RequestFailed(msg) if msg == "looks fine"));

    let err = client.run_task("t-1").await.unwrap_err();
    assert_eq!(err.to_string(), "Request failed (code 400)");

    let err = client.run_task("t-1").await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP 502 Bad Gateway");

    // None of these touch the credential.
    assert_eq!(client.credential().unwrap().as_deref(), Some("abc"));
    assert_eq!(backend.finish().len(), 4);
}

#[tokio::test]
async fn test_add_task_body() {
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::start(vec![ok(json!({"task_id": "t-9"}))]);
    let client = client_for(&backend, &dir);

    let task = NewShellTask {
        task_name: "ping".into(),
        description: "check host".into(),
        command: "ping".into(),
        args: NewShellTask::split_args("-c 1 example.com"),
        ..NewShellTask::default()
    };
    let added = client.add_task(&task).await.unwrap();
    assert_eq!(added.task_id, "t-9");

    let req = &backend.finish()[0];
    assert_eq!(req.url, "/api/v1/tasks/add_shell_task");
    assert_eq!(
        req.json(),
        json!({
            "task_name": "ping",
            "description": "check host",
            "command": "ping",
            "args": ["-c", "1", "example.com"],
            "scheduled_time": "0 * * * * *",
            "timeout": 300,
            "use_shell": true
        })
    );
}

#[tokio::test]
async fn test_invalid_task_never_sent() {
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::start(vec![]);
    let client = client_for(&backend, &dir);

    let err = client.add_task(&NewShellTask::default()).await.unwrap_err();
    assert!(err.is_validation());
    assert!(backend.finish().is_empty());
}

#[tokio::test]
async fn test_run_and_delete_task() {
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::start(vec![ok(json!(null)), ok(json!(null))]);
    let client = client_for(&backend, &dir);

    client.run_task("t-1").await.unwrap();
    client.delete_task("t-1", Some("alice")).await.unwrap();

    let requests = backend.finish();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].url, "/api/v1/tasks/run");
    assert_eq!(requests[0].json(), json!({"task_id": "t-1"}));
    assert_eq!(requests[1].method, "DELETE");
    assert_eq!(requests[1].url, "/api/v1/tasks/delete");
    assert_eq!(
        requests[1].json(),
        json!({"task_id": "t-1", "user_name": "alice"})
    );
}

#[tokio::test]
async fn test_upload_is_multipart() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("backup.sh");
    std::fs::write(&script, "#!/bin/sh\necho backing up\n").unwrap();

    let backend = MockBackend::start(vec![ok(json!({"file_name": "backup.sh"}))]);
    let client = client_for(&backend, &dir);
    client.set_credential(Some("abc")).unwrap();

    let uploaded = client.upload_file(&script).await.unwrap();
    assert_eq!(uploaded.file_name, "backup.sh");

    let req = &backend.finish()[0];
    assert_eq!(req.url, "/api/v1/tasks/upload_file");
    assert_eq!(req.header("Authorization"), Some("Bearer abc"));
    let content_type = req.header("Content-Type").unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    let body = req.body_text();
    assert!(body.contains("name=\"file\""));
    assert!(body.contains("filename=\"backup.sh\""));
    assert!(body.contains("echo backing up"));
}

#[tokio::test]
async fn test_oversized_upload_rejected_locally() {
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::start(vec![]);
    let config = Config {
        base_url: backend.base_url.clone(),
        max_upload_bytes: 8,
        ..Config::default()
    };
    let client = ApiClient::new(&config, store(&dir)).unwrap();

    let script = dir.path().join("big.sh");
    std::fs::write(&script, "0123456789").unwrap();

    let err = client.upload_file(&script).await.unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("too large"));
    assert!(backend.finish().is_empty());
}

#[tokio::test]
async fn test_delete_file_body() {
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::start(vec![ok(json!(null))]);
    let client = client_for(&backend, &dir);

    client.delete_file("old.sh").await.unwrap();
    let req = &backend.finish()[0];
    assert_eq!(req.method, "DELETE");
    assert_eq!(req.url, "/api/v1/tasks/delete_file");
    assert_eq!(req.json(), json!({"file_name": "old.sh"}));
}

#[tokio::test]
async fn test_task_logs_query_and_decode() {
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::start(vec![ok(json!({
        "list": [{
            "ID": 3,
            "TaskId": "t-1",
            "Name": "backup",
            "Content": "{\"command\":\"tar\"}",
            "Output": "",
            "ErrOutput": "disk full",
            "StartTime": "2024-01-01T00:00:00Z",
            "EndTime": "2024-01-01T00:00:01Z"
        }],
        "total": 11
    }))]);
    let client = client_for(&backend, &dir);

    let page = client
        .task_logs(&LogQuery {
            page: 2,
            page_size: 10,
            user_name: Some("alice".into()),
        })
        .await
        .unwrap();
    assert_eq!(page.total, 11);
    assert_eq!(page.total_pages(10), 2);
    assert_eq!(page.list[0].status(), LogStatus::Error);

    let req = &backend.finish()[0];
    assert_eq!(req.method, "GET");
    assert_eq!(req.url, "/api/v1/tasks/logs?page=2&page_size=10&user_name=alice");
}

#[tokio::test]
async fn test_undecodable_success_body() {
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::start(vec![(200, "plain text".to_string())]);
    let client = client_for(&backend, &dir);

    let err = client.list_files().await.unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
    backend.finish();
}
