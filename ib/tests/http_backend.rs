use ideabot::backend::{Backend, BackendError, HttpBackend};
use ideabot::config::{BackendConfig, BackendMode};
use ideabot::domain::{TaskStatus, UserId};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend(server: &MockServer) -> HttpBackend {
    let config = BackendConfig {
        mode: BackendMode::Http,
        base_url: format!("{}/", server.uri()),
        timeout_ms: 2_000,
        connect_timeout_ms: 1_000,
    };
    HttpBackend::from_config(&config).expect("client")
}

#[tokio::test]
async fn register_sends_string_tg_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/register"))
        .and(body_json(json!({ "tg_id": "42", "name": "Ann", "email": "ann@example.com" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    backend(&server)
        .register_or_update(UserId(42), "Ann", "ann@example.com")
        .await
        .expect("register ok");
}

#[tokio::test]
async fn projects_are_decoded_with_tasks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/42/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "projects": [{
                "id": 3,
                "title": "Notes app",
                "description": "Sync notes",
                "tasks": [
                    { "id": 8, "title": "Ship", "order": 1, "status": "in_progress" },
                    { "id": 7, "title": "Build", "order": 0, "status": "done" }
                ]
            }]
        })))
        .mount(&server)
        .await;

    let projects = backend(&server).get_projects(UserId(42)).await.expect("projects");
    assert_eq!(projects.len(), 1);
    let sorted = projects[0].sorted_tasks();
    assert_eq!(sorted[0].title, "Build");
    assert_eq!(sorted[1].status, TaskStatus::InProgress);
}

#[tokio::test]
async fn unknown_user_maps_to_not_found_with_detail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/9/projects"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "User not found" })))
        .mount(&server)
        .await;

    let err = backend(&server).get_projects(UserId(9)).await.unwrap_err();
    match err {
        BackendError::NotFound(detail) => assert_eq!(detail, "User not found"),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn create_from_idea_returns_created_project() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/projects/idea"))
        .and(body_json(json!({ "tg_id": "42", "idea": "A shared grocery list" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "project_id": 5,
            "description": "Shared lists for households",
            "tasks": ["Define MVP", "Build it"]
        })))
        .mount(&server)
        .await;

    let created = backend(&server)
        .create_from_idea(UserId(42), "A shared grocery list")
        .await
        .expect("created");
    assert_eq!(created.project_id, 5);
    assert_eq!(created.tasks, vec!["Define MVP".to_string(), "Build it".to_string()]);
}

#[tokio::test]
async fn set_status_uses_query_parameter() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/tasks/31"))
        .and(query_param("status", "in_progress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    backend(&server)
        .set_status(31, TaskStatus::InProgress)
        .await
        .expect("status ok");
}

#[tokio::test]
async fn server_error_and_bad_body_are_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ai/report/1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ai/report/2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let backend = backend(&server);
    match backend.get_progress(UserId(1)).await.unwrap_err() {
        BackendError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("expected Api, got {other:?}"),
    }
    assert!(matches!(
        backend.get_progress(UserId(2)).await,
        Err(BackendError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn report_is_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ai/report/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "percent": 62.5, "comment": "Keep going" })))
        .mount(&server)
        .await;

    let report = backend(&server).get_progress(UserId(42)).await.expect("report");
    assert_eq!(report.percent, 62.5);
    assert_eq!(report.comment, "Keep going");
}
