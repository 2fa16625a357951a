// ============================
// crates/backend-lib/tests/support/mod.rs
// ============================
//! Shared helpers for the integration tests.
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use backend_lib::config::{AttendeeSeed, EventSeed, Settings, StaffCredential};
use backend_lib::http::create_router;
use backend_lib::storage::FlatFileStorage;
use backend_lib::AppState;
use eventdesk_common::{EventId, Role};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const MANAGER_TOKEN: &str = "manager-token";
pub const ADMIN_TOKEN: &str = "admin-token";
pub const PRESENTER_TOKEN: &str = "presenter-token";

/// Settings with one active event, two attendees and one credential per
/// staff role.
pub fn test_settings(data_dir: &std::path::Path) -> Settings {
    Settings {
        data_dir: data_dir.to_path_buf(),
        staff: vec![
            StaffCredential {
                token: MANAGER_TOKEN.to_string(),
                role: Role::Manager,
            },
            StaffCredential {
                token: ADMIN_TOKEN.to_string(),
                role: Role::Admin,
            },
            StaffCredential {
                token: PRESENTER_TOKEN.to_string(),
                role: Role::Presenter,
            },
        ],
        events: vec![EventSeed {
            name: "Launch Day".to_string(),
            event_date: None,
            qa_active: true,
        }],
        attendees: vec![
            AttendeeSeed {
                event: "Launch Day".to_string(),
                email: "ada@example.com".to_string(),
                registration_id: "REG-001".to_string(),
                name: "Ada Lovelace".to_string(),
            },
            AttendeeSeed {
                event: "Launch Day".to_string(),
                email: "grace@example.com".to_string(),
                registration_id: "REG-002".to_string(),
                name: "Grace Hopper".to_string(),
            },
        ],
        ..Settings::default()
    }
}

/// Router + state + the seeded active event id.
pub async fn setup() -> (Router, Arc<AppState<FlatFileStorage>>, EventId, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let settings = test_settings(temp_dir.path());
    let storage = FlatFileStorage::new(temp_dir.path()).unwrap();
    let state = Arc::new(AppState::new(storage, &settings).await.unwrap());
    let event_id = state.registry.active_event().unwrap().id;
    let app = create_router(state.clone());
    (app, state, event_id, temp_dir)
}

/// POST a JSON body, optionally with a bearer token.
pub async fn post_json(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    decode(response).await
}

/// GET, optionally with a bearer token.
pub async fn get_json(
    app: &Router,
    uri: &str,
    token: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = builder.body(Body::empty()).unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    decode(response).await
}

async fn decode(response: axum::response::Response) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, value)
}

/// Submit a question as Ada and return its id.
pub async fn submit_question(app: &Router, text: &str) -> uuid::Uuid {
    let (status, body) = post_json(
        app,
        "/qa/submit-question",
        None,
        serde_json::json!({
            "user_email": "ada@example.com",
            "user_name": "Ada Lovelace",
            "registration_id": "REG-001",
            "question": text,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "submit failed: {body}");
    body["id"].as_str().unwrap().parse().unwrap()
}
