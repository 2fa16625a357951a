// ============================
// crates/backend-lib/tests/push_channel.rs
// ============================
//! Push-channel round trips against a running server.
mod support;

use backend_lib::store::NewQuestion;
use eventdesk_common::{ModerationAction, PushMessage, Role};
use futures_util::StreamExt;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

async fn spawn_server() -> (
    std::net::SocketAddr,
    std::sync::Arc<backend_lib::AppState<backend_lib::storage::FlatFileStorage>>,
    uuid::Uuid,
    tempfile::TempDir,
) {
    let (app, state, event_id, tmp) = support::setup().await;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state, event_id, tmp)
}

async fn next_push(
    ws: &mut (impl StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin),
) -> PushMessage {
    loop {
        let frame = timeout(WAIT, ws.next())
            .await
            .expect("push message timed out")
            .expect("stream ended")
            .expect("ws error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).expect("malformed push message");
        }
    }
}

fn submission(text: &str) -> NewQuestion {
    NewQuestion {
        submitter_email: "ada@example.com".to_string(),
        submitter_name: "Ada Lovelace".to_string(),
        registration_id: "REG-001".to_string(),
        text: text.to_string(),
    }
}

#[tokio::test]
async fn subscriber_gets_greeting_then_hints() {
    let (addr, state, event_id, _tmp) = spawn_server().await;
    let url = format!("ws://{addr}/qa/events/{event_id}/ws?scope=all");

    let (mut ws, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("Failed to connect");

    assert_eq!(next_push(&mut ws).await, PushMessage::Connected { event_id });

    let event = state.registry.get(event_id).unwrap();
    let question = state
        .dispatcher
        .submit(&event, submission("What is the keynote time?"))
        .await
        .unwrap();

    assert_eq!(
        next_push(&mut ws).await,
        PushMessage::NewQuestion {
            question_id: question.id
        }
    );

    state
        .dispatcher
        .apply_action(question.id, Role::Manager, ModerationAction::Approve, None, None)
        .await
        .unwrap();
    assert_eq!(
        next_push(&mut ws).await,
        PushMessage::QuestionApproved {
            question_id: question.id
        }
    );
}

#[tokio::test]
async fn scoped_subscriber_sees_only_its_hints() {
    let (addr, state, event_id, _tmp) = spawn_server().await;
    let url = format!("ws://{addr}/qa/events/{event_id}/ws?scope=manager");

    let (mut ws, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("Failed to connect");
    assert_eq!(next_push(&mut ws).await, PushMessage::Connected { event_id });

    let event = state.registry.get(event_id).unwrap();
    let first = state
        .dispatcher
        .submit(&event, submission("First"))
        .await
        .unwrap();
    state
        .dispatcher
        .apply_action(first.id, Role::Manager, ModerationAction::Approve, None, None)
        .await
        .unwrap();
    let second = state
        .dispatcher
        .submit(&event, submission("Second"))
        .await
        .unwrap();

    // The manager scope sees both submissions but not the approval
    assert_eq!(
        next_push(&mut ws).await,
        PushMessage::NewQuestion {
            question_id: first.id
        }
    );
    assert_eq!(
        next_push(&mut ws).await,
        PushMessage::NewQuestion {
            question_id: second.id
        }
    );
}

#[tokio::test]
async fn reconnecting_subscriber_resyncs_from_the_snapshot() {
    let (addr, state, event_id, _tmp) = spawn_server().await;
    let url = format!("ws://{addr}/qa/events/{event_id}/ws?scope=all");

    let (mut ws, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("Failed to connect");
    assert_eq!(next_push(&mut ws).await, PushMessage::Connected { event_id });

    // Connection drops; moderation continues while this client is away
    drop(ws);

    let event = state.registry.get(event_id).unwrap();
    let question = state
        .dispatcher
        .submit(&event, submission("Missed while away"))
        .await
        .unwrap();
    state
        .dispatcher
        .apply_action(question.id, Role::Manager, ModerationAction::Approve, None, None)
        .await
        .unwrap();

    // Reconnect: hints sent while away are gone for good, so the client
    // re-fetches the role-scoped snapshot, which matches the store.
    let (mut ws, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("Failed to reconnect");
    assert_eq!(next_push(&mut ws).await, PushMessage::Connected { event_id });

    let snapshot = state.store.list(event_id, eventdesk_common::RoleScope::Admin);
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, question.id);
    assert_eq!(
        snapshot[0].status,
        eventdesk_common::QuestionStatus::ManagerApproved
    );

    // And the channel is live again for subsequent transitions
    state
        .dispatcher
        .apply_action(
            question.id,
            Role::Admin,
            ModerationAction::Answer,
            Some("3 PM".to_string()),
            None,
        )
        .await
        .unwrap();
    assert_eq!(
        next_push(&mut ws).await,
        PushMessage::QuestionAnswered {
            question_id: question.id
        }
    );
}

#[tokio::test]
async fn unknown_event_refuses_the_upgrade() {
    let (addr, _state, _event_id, _tmp) = spawn_server().await;
    let url = format!(
        "ws://{addr}/qa/events/{}/ws?scope=all",
        uuid::Uuid::new_v4()
    );

    let result = tokio_tungstenite::connect_async(&url).await;
    assert!(result.is_err(), "upgrade should be refused");
}
