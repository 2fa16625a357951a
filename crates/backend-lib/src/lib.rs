// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core library for the `Eventdesk` live Q&A backend.
//!
//! The pipeline: attendees validate against the roster and submit
//! questions while the event's gate is open; managers triage pending
//! items; admins answer, skip or reject approved ones; presenters clear
//! answered items from their live view. Every committed transition fans
//! out one push hint per event topic, and every consumer resyncs from
//! role-scoped snapshots.

pub mod broker;
pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod http;
pub mod identity;
pub mod metrics;
pub mod middleware;
pub mod notify;
pub mod roster;
pub mod session;
pub mod staff;
pub mod storage;
pub mod store;
pub mod subscriber;
pub mod validation;
pub mod ws_router;

use std::sync::Arc;
use std::time::Duration;

use crate::bridge::WindowBridge;
use crate::broker::FanoutBroker;
use crate::config::Settings;
use crate::dispatch::ModerationDispatcher;
use crate::events::EventRegistry;
use crate::middleware::RateLimiter;
use crate::roster::{AttendeeRecord, AttendeeRoster, InMemoryRoster};
use crate::session::SessionManager;
use crate::staff::StaffDirectory;
use crate::store::QuestionStore;

/// How often expired sessions and abandoned window tokens are pruned
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Application state shared across all handlers
pub struct AppState<S> {
    /// Settings manager
    pub settings: Arc<Settings>,
    /// Event registry and activation gate
    pub registry: Arc<EventRegistry>,
    /// Attendee roster lookup (external collaborator)
    pub roster: Arc<dyn AttendeeRoster>,
    /// Pre-issued staff bearer credentials
    pub staff: Arc<StaffDirectory>,
    /// Authoritative question store
    pub store: Arc<QuestionStore>,
    /// Per-event push topics
    pub broker: Arc<FanoutBroker>,
    /// Attendee sessions and the guard
    pub sessions: Arc<SessionManager>,
    /// Cross-window handoff tokens
    pub bridge: Arc<WindowBridge>,
    /// The single write path into the store
    pub dispatcher: Arc<ModerationDispatcher<S>>,
    /// Submission rate limiter
    pub rate_limiter: Arc<RateLimiter>,
    /// Audit-log backend
    pub storage: S,
}

impl<S: Clone> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            settings: Arc::clone(&self.settings),
            registry: Arc::clone(&self.registry),
            roster: Arc::clone(&self.roster),
            staff: Arc::clone(&self.staff),
            store: Arc::clone(&self.store),
            broker: Arc::clone(&self.broker),
            sessions: Arc::clone(&self.sessions),
            bridge: Arc::clone(&self.bridge),
            dispatcher: Arc::clone(&self.dispatcher),
            rate_limiter: Arc::clone(&self.rate_limiter),
            storage: self.storage.clone(),
        }
    }
}

impl<S: storage::Storage + Clone + Send + Sync + 'static> AppState<S> {
    /// Create a new application state, seed it from the settings and
    /// spawn the background pruning tasks.
    pub async fn new(storage: S, settings: &Settings) -> anyhow::Result<Self> {
        let registry = Arc::new(EventRegistry::new());
        let roster = Arc::new(InMemoryRoster::new());
        seed(&registry, &roster, settings)?;

        let staff = Arc::new(StaffDirectory::from_credentials(&settings.staff));
        let store = Arc::new(QuestionStore::new());
        let broker = Arc::new(FanoutBroker::new(settings.topic_capacity));
        let sessions = Arc::new(SessionManager::new(
            settings.session_ttl(),
            settings.guard_interval(),
            settings.stale_after_intervals,
        ));
        let bridge = Arc::new(WindowBridge::new(settings.window_token_ttl()));
        let dispatcher = Arc::new(ModerationDispatcher::new(
            Arc::clone(&store),
            Arc::clone(&broker),
            storage.clone(),
        ));
        let rate_limiter = Arc::new(RateLimiter::new(
            Duration::from_secs(settings.rate_limit.window_secs),
            settings.rate_limit.max_requests,
        ));

        sessions.spawn_cleanup(CLEANUP_INTERVAL);
        bridge.spawn_prune(CLEANUP_INTERVAL);

        Ok(Self {
            settings: Arc::new(settings.clone()),
            registry,
            roster,
            staff,
            store,
            broker,
            sessions,
            bridge,
            dispatcher,
            rate_limiter,
            storage,
        })
    }
}

/// Seed events and the roster from configuration. Event CRUD and
/// registration belong to the wider product; this only mirrors what they
/// provisioned.
fn seed(
    registry: &EventRegistry,
    roster: &InMemoryRoster,
    settings: &Settings,
) -> anyhow::Result<()> {
    let mut ids = std::collections::HashMap::new();
    for event in &settings.events {
        let id = registry.register(&event.name, event.event_date);
        ids.insert(event.name.clone(), id);
        if event.qa_active {
            registry.set_active(id, true)?;
        }
    }

    for attendee in &settings.attendees {
        let Some(&event_id) = ids.get(&attendee.event) else {
            anyhow::bail!("attendee {} references unknown event {}", attendee.email, attendee.event);
        };
        roster.insert(AttendeeRecord {
            event_id,
            email: attendee.email.clone(),
            registration_id: attendee.registration_id.clone(),
            name: attendee.name.clone(),
        });
    }

    Ok(())
}
