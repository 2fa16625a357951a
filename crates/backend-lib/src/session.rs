// ============================
// crates/backend-lib/src/session.rs
// ============================
//! Attendee session tracking and the session guard.
//!
//! Sessions are ephemeral: created on successful identity validation,
//! held only in process memory, re-checked on a fixed interval by
//! long-lived clients and discarded on window close, TTL expiry or
//! validation failure. Nothing here survives a restart, by contract.
use eventdesk_common::EventId;
use metrics::{counter, gauge};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::events::EventRegistry;
use crate::metrics::{SESSION_ACTIVE, SESSION_CREATED, SESSION_EXPIRED};
use crate::roster::AttendeeRoster;

/// A validated attendee session
#[derive(Debug, Clone)]
pub struct QaSession {
    pub token: String,
    pub event_id: EventId,
    pub email: String,
    pub registration_id: String,
    pub attendee_name: String,
    pub created_at: Instant,
    pub last_verified: Instant,
    pub expires_at: Instant,
}

/// Outcome of a guard check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardVerdict {
    Valid,
    /// The session (or its prerequisites) no longer hold; the client must
    /// re-validate before submitting again
    Revalidate { reason: String },
}

/// Session manager: issuance, lookup, guard checks, expiry.
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, QaSession>>>,
    ttl: Duration,
    guard_interval: Duration,
    stale_after_intervals: u32,
}

impl SessionManager {
    pub fn new(ttl: Duration, guard_interval: Duration, stale_after_intervals: u32) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            guard_interval,
            stale_after_intervals,
        }
    }

    /// Create a session for a validated attendee and return its token.
    pub async fn create(
        &self,
        event_id: EventId,
        email: &str,
        registration_id: &str,
        attendee_name: &str,
    ) -> QaSession {
        let now = Instant::now();
        let session = QaSession {
            token: Uuid::new_v4().to_string(),
            event_id,
            email: email.to_lowercase(),
            registration_id: registration_id.to_string(),
            attendee_name: attendee_name.to_string(),
            created_at: now,
            last_verified: now,
            expires_at: now + self.ttl,
        };

        let mut sessions = self.sessions.write().await;
        sessions.insert(session.token.clone(), session.clone());

        counter!(SESSION_CREATED).increment(1);
        gauge!(SESSION_ACTIVE).set(sessions.len() as f64);

        session
    }

    pub async fn get(&self, token: &str) -> Option<QaSession> {
        let sessions = self.sessions.read().await;
        sessions
            .get(token)
            .filter(|s| Instant::now() < s.expires_at)
            .cloned()
    }

    /// End a session (window closed, validation failed). Idempotent.
    pub async fn revoke(&self, token: &str) {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(token).is_some() {
            gauge!(SESSION_ACTIVE).set(sessions.len() as f64);
        }
    }

    /// The session guard: re-run the gate and roster checks for the
    /// attendee identified by (email, registration code).
    ///
    /// Invoked by long-lived clients on a fixed interval. A session whose
    /// last verification is further back than `stale_after_intervals`
    /// guard intervals (a clock-suspended tab that missed its ticks) is
    /// told to re-validate rather than treated as an error. A failed
    /// check revokes any matching session; moderation state already
    /// applied is unaffected.
    pub async fn check(
        &self,
        registry: &EventRegistry,
        roster: &dyn AttendeeRoster,
        email: &str,
        registration_id: &str,
    ) -> GuardVerdict {
        let Some(event) = registry.active_event() else {
            self.revoke_matching(email, registration_id).await;
            return GuardVerdict::Revalidate {
                reason: "No active Q/A session".to_string(),
            };
        };

        if roster
            .lookup(event.id, email, registration_id)
            .await
            .is_none()
        {
            self.revoke_matching(email, registration_id).await;
            return GuardVerdict::Revalidate {
                reason: "Invalid credentials".to_string(),
            };
        }

        let stale_cutoff = self.guard_interval * self.stale_after_intervals;
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        let found = sessions.values_mut().find(|s| {
            s.event_id == event.id
                && s.email == email.to_lowercase()
                && s.registration_id == registration_id
        });

        match found {
            Some(session) if now >= session.expires_at => {
                GuardVerdict::Revalidate {
                    reason: "Session expired".to_string(),
                }
            },
            Some(session) if now.duration_since(session.last_verified) > stale_cutoff => {
                GuardVerdict::Revalidate {
                    reason: "Session went stale, please re-validate".to_string(),
                }
            },
            Some(session) => {
                session.last_verified = now;
                GuardVerdict::Valid
            },
            // Gate and roster both pass but no session is held here; the
            // client can simply re-validate to get one
            None => GuardVerdict::Revalidate {
                reason: "Session not found".to_string(),
            },
        }
    }

    async fn revoke_matching(&self, email: &str, registration_id: &str) {
        let email = email.to_lowercase();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !(s.email == email && s.registration_id == registration_id));
        if sessions.len() != before {
            gauge!(SESSION_ACTIVE).set(sessions.len() as f64);
        }
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Spawn the periodic cleanup task that prunes expired sessions.
    pub fn spawn_cleanup(self: &Arc<Self>, interval: Duration) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;

                let mut sessions = manager.sessions.write().await;
                let now = Instant::now();
                let before = sessions.len();
                sessions.retain(|_, s| now < s.expires_at);

                let removed = before - sessions.len();
                if removed > 0 {
                    counter!(SESSION_EXPIRED).increment(removed as u64);
                    gauge!(SESSION_ACTIVE).set(sessions.len() as f64);
                    tracing::debug!(removed, "expired sessions pruned");
                }
            }
        });
    }
}
