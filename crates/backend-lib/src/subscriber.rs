// ============================
// crates/backend-lib/src/subscriber.rs
// ============================
//! Supervised subscriptions: one task owning both transports.
//!
//! Instead of layering ad-hoc refetch timers over a push connection, each
//! subscription is a single task that owns the push listener and a
//! backoff-governed poll timer, and exposes one unified feed of
//! "question set changed" events. Callers never see which transport
//! produced a refresh.
//!
//! A subscriber refreshes from the authoritative snapshot on: initial
//! subscribe, every push hint, every poll tick while the channel is down,
//! and on any push lag (missed hints). Channel loss flips to polling and
//! is reported through the injected notifier; it is never fatal.
use async_trait::async_trait;
use eventdesk_common::{EventId, QuestionView, RoleScope};
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::broker::{ChannelSignal, FanoutBroker, TopicReceiver};
use crate::error::AppError;
use crate::metrics::POLL_FALLBACK_ENGAGED;
use crate::notify::{NoticeLevel, Notifier};
use crate::store::QuestionStore;

/// Longest reconnect backoff, in poll intervals
const MAX_BACKOFF_INTERVALS: u32 = 8;

/// Authoritative snapshot seam
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn snapshot(
        &self,
        event_id: EventId,
        scope: RoleScope,
    ) -> Result<Vec<QuestionView>, AppError>;
}

#[async_trait]
impl SnapshotSource for QuestionStore {
    async fn snapshot(
        &self,
        event_id: EventId,
        scope: RoleScope,
    ) -> Result<Vec<QuestionView>, AppError> {
        Ok(self.list(event_id, scope))
    }
}

/// Push-channel establishment seam; lets tests fail the channel
pub trait PushConnector: Send + Sync {
    fn connect(&self, event_id: EventId, scope: RoleScope) -> Result<TopicReceiver, AppError>;
}

impl PushConnector for FanoutBroker {
    fn connect(&self, event_id: EventId, scope: RoleScope) -> Result<TopicReceiver, AppError> {
        Ok(self.subscribe(event_id, scope))
    }
}

/// Unified feed of a supervised subscription
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// The question set (possibly) changed; here is the fresh snapshot
    Refreshed(Vec<QuestionView>),
    /// Push channel lost; refreshes now come from the poll timer
    ChannelDown,
    /// Push channel re-established
    ChannelRestored,
}

/// Handle to a supervised subscription. Dropping it cancels the task
/// immediately; cancellation has no effect on question state.
pub struct SubscriptionHandle {
    pub feed: mpsc::Receiver<FeedEvent>,
    task: JoinHandle<()>,
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn one supervised subscription for (event, scope).
pub fn spawn_subscription(
    connector: Arc<dyn PushConnector>,
    source: Arc<dyn SnapshotSource>,
    notifier: Arc<dyn Notifier>,
    event_id: EventId,
    scope: RoleScope,
    poll_interval: Duration,
) -> SubscriptionHandle {
    let (feed_tx, feed_rx) = mpsc::channel(32);

    let task = tokio::spawn(async move {
        run_subscription(
            connector,
            source,
            notifier,
            event_id,
            scope,
            poll_interval,
            feed_tx,
        )
        .await;
    });

    SubscriptionHandle {
        feed: feed_rx,
        task,
    }
}

async fn run_subscription(
    connector: Arc<dyn PushConnector>,
    source: Arc<dyn SnapshotSource>,
    notifier: Arc<dyn Notifier>,
    event_id: EventId,
    scope: RoleScope,
    poll_interval: Duration,
    feed: mpsc::Sender<FeedEvent>,
) {
    let mut channel = match connector.connect(event_id, scope) {
        Ok(rx) => Some(rx),
        Err(err) => {
            engage_fallback(&notifier, &err);
            if feed.send(FeedEvent::ChannelDown).await.is_err() {
                return;
            }
            None
        },
    };

    // Initial snapshot before trusting any incremental hint
    if !refresh(&source, &feed, event_id, scope).await {
        return;
    }

    let mut backoff_intervals: u32 = 1;
    let mut ticks_until_reconnect: u32 = 0;

    loop {
        // Push mode: block on the listener, refresh on every signal.
        let signal = match channel.as_mut() {
            Some(rx) => rx.next_signal().await,
            None => {
                // Poll mode: fixed-interval snapshots, reconnect attempts
                // spaced out by the backoff counter.
                tokio::time::sleep(poll_interval).await;
                if !refresh(&source, &feed, event_id, scope).await {
                    return;
                }

                if ticks_until_reconnect > 0 {
                    ticks_until_reconnect -= 1;
                    continue;
                }
                match connector.connect(event_id, scope) {
                    Ok(rx) => {
                        channel = Some(rx);
                        backoff_intervals = 1;
                        notifier.notify(NoticeLevel::Info, "push channel restored");
                        if feed.send(FeedEvent::ChannelRestored).await.is_err() {
                            return;
                        }
                        // The channel may have missed hints while down
                        if !refresh(&source, &feed, event_id, scope).await {
                            return;
                        }
                    },
                    Err(_) => {
                        backoff_intervals = (backoff_intervals * 2).min(MAX_BACKOFF_INTERVALS);
                        ticks_until_reconnect = backoff_intervals;
                    },
                }
                continue;
            },
        };

        match signal {
            // A hint or a lag notice both mean: re-fetch the snapshot
            Some(ChannelSignal::Hint(_)) | Some(ChannelSignal::Lagged(_)) => {
                if !refresh(&source, &feed, event_id, scope).await {
                    return;
                }
            },
            None => {
                engage_fallback(&notifier, &AppError::ChannelUnavailable);
                channel = None;
                backoff_intervals = 1;
                ticks_until_reconnect = 0;
                if feed.send(FeedEvent::ChannelDown).await.is_err() {
                    return;
                }
            },
        }
    }
}

/// Fetch and emit a snapshot; false when the feed consumer is gone.
async fn refresh(
    source: &Arc<dyn SnapshotSource>,
    feed: &mpsc::Sender<FeedEvent>,
    event_id: EventId,
    scope: RoleScope,
) -> bool {
    match source.snapshot(event_id, scope).await {
        Ok(views) => feed.send(FeedEvent::Refreshed(views)).await.is_ok(),
        Err(err) => {
            tracing::warn!(%event_id, scope = scope.as_str(), %err, "snapshot fetch failed");
            // Keep the subscription alive; the next hint or tick retries
            true
        },
    }
}

fn engage_fallback(notifier: &Arc<dyn Notifier>, err: &AppError) {
    counter!(POLL_FALLBACK_ENGAGED).increment(1);
    tracing::warn!(%err, "push channel unavailable, polling snapshots");
    notifier.notify(
        NoticeLevel::Warning,
        "live updates interrupted, refreshing periodically",
    );
}
