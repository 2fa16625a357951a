// ============================
// crates/backend-lib/src/ws_router.rs
// ============================
//! Push channel: one WebSocket topic per event.
//!
//! Subscribers receive a greeting and then hint messages only; consumers
//! must re-fetch a role-scoped snapshot after subscribing, after any
//! reconnect and on any channel error. Client frames are ignored apart
//! from close.
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::IntoResponse,
};
use eventdesk_common::{EventId, PushMessage, RoleScope};
use futures_util::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use serde::Deserialize;
use std::sync::Arc;

use crate::broker::ChannelSignal;
use crate::error::AppError;
use crate::metrics::{WS_ACTIVE, WS_CONNECTION};
use crate::storage::Storage;
use crate::AppState;

#[derive(Deserialize, Default)]
pub struct SubscribeQuery {
    scope: Option<RoleScope>,
}

/// Handler for `GET /qa/events/{event_id}/ws`
pub async fn ws_handler<S: Storage + Send + Sync + Clone + 'static>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState<S>>>,
    Path(event_id): Path<EventId>,
    Query(query): Query<SubscribeQuery>,
) -> Result<impl IntoResponse, AppError> {
    if state.registry.get(event_id).is_none() {
        return Err(AppError::EventNotFound);
    }
    let scope = query.scope.unwrap_or(RoleScope::All);

    counter!(WS_CONNECTION).increment(1);
    Ok(ws.on_upgrade(move |socket| handle_connection(socket, state, event_id, scope)))
}

async fn handle_connection<S: Storage + Send + Sync + Clone + 'static>(
    socket: WebSocket,
    state: Arc<AppState<S>>,
    event_id: EventId,
    scope: RoleScope,
) {
    gauge!(WS_ACTIVE).increment(1.0);
    let (mut tx, mut rx) = socket.split();

    // Subscribe before greeting so no hint published in between is lost
    let mut topic = state.broker.subscribe(event_id, scope);

    let greeting = PushMessage::Connected { event_id };
    if send_json(&mut tx, &greeting).await.is_err() {
        gauge!(WS_ACTIVE).decrement(1.0);
        return;
    }

    loop {
        tokio::select! {
            signal = topic.next_signal() => match signal {
                Some(ChannelSignal::Hint(message)) => {
                    if send_json(&mut tx, &message).await.is_err() {
                        break;
                    }
                },
                // The receiver fell behind; hints are only hints, the
                // client's snapshot logic covers the gap
                Some(ChannelSignal::Lagged(missed)) => {
                    tracing::debug!(%event_id, missed, "push subscriber lagged");
                },
                None => break,
            },
            frame = rx.next() => match frame {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Ignore other client frames; the channel is one-way
                Some(Ok(_)) => {},
            },
        }
    }

    // Disconnecting is immediate and has no side effects on question
    // state: dropping the receiver detaches it from the topic.
    gauge!(WS_ACTIVE).decrement(1.0);
    tracing::debug!(%event_id, scope = scope.as_str(), "push subscriber disconnected");
}

async fn send_json(
    tx: &mut (impl SinkExt<Message> + Unpin),
    message: &PushMessage,
) -> Result<(), AppError> {
    let json = serde_json::to_string(message)?;
    tx.send(Message::Text(json.into()))
        .await
        .map_err(|_| AppError::ChannelUnavailable)
}
