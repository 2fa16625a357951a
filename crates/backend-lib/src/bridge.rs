// ============================
// crates/backend-lib/src/bridge.rs
// ============================
//! Cross-window session bridge.
//!
//! Hands a validated session from the attendee's entry surface to a
//! dedicated conversation window without sharing process objects: the
//! entry surface gets a short-lived, single-use window token; the new
//! window claims the session by token. When window creation is blocked
//! the same session is used inline — the fallback renders the identical
//! session, just in place.
use dashmap::DashMap;
use metrics::counter;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::error::AppError;
use crate::metrics::{HANDOFF_ABANDONED, HANDOFF_CLAIMED, HANDOFF_ISSUED};
use crate::session::{QaSession, SessionManager};

/// Where the conversation ended up after a launch attempt
#[derive(Debug, Clone)]
pub enum ConversationSurface {
    /// A dedicated window opened; it holds the token to claim with
    Dedicated { window_token: String },
    /// Window creation was blocked; the entry surface renders inline
    /// with the very same session
    Inline { session: QaSession },
}

/// The window-creation seam. The real implementation lives in the client
/// shell; servers and tests inject outcomes.
pub trait WindowOpener: Send + Sync {
    /// Attempt to open the dedicated conversation window, handing it the
    /// claim token. `Err(PopupBlocked)` triggers the inline fallback.
    fn open(&self, window_token: &str) -> Result<(), AppError>;
}

struct Handoff {
    session_token: String,
    issued_at: Instant,
}

/// Issues and redeems single-use window tokens
pub struct WindowBridge {
    pending: DashMap<String, Handoff>,
    ttl: Duration,
}

impl WindowBridge {
    pub fn new(ttl: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            ttl,
        }
    }

    /// Issue a single-use window token bound to a session.
    pub fn issue(&self, session_token: &str) -> String {
        let window_token = Uuid::new_v4().to_string();
        self.pending.insert(
            window_token.clone(),
            Handoff {
                session_token: session_token.to_string(),
                issued_at: Instant::now(),
            },
        );
        counter!(HANDOFF_ISSUED).increment(1);
        window_token
    }

    /// Redeem a window token for its session. Single-use: a second claim
    /// of the same token fails, as does an expired one. The failure is
    /// the same generic credential error either way.
    pub async fn claim(
        &self,
        sessions: &SessionManager,
        window_token: &str,
    ) -> Result<QaSession, AppError> {
        let (_, handoff) = self
            .pending
            .remove(window_token)
            .ok_or(AppError::InvalidCredentials)?;

        if handoff.issued_at.elapsed() > self.ttl {
            counter!(HANDOFF_ABANDONED).increment(1);
            return Err(AppError::InvalidCredentials);
        }

        let session = sessions
            .get(&handoff.session_token)
            .await
            .ok_or(AppError::InvalidCredentials)?;

        counter!(HANDOFF_CLAIMED).increment(1);
        Ok(session)
    }

    /// Try to open the dedicated window; fall back to inline rendering
    /// with the identical session when blocked. Only a blocked popup is
    /// absorbed — other failures propagate.
    pub async fn launch(
        &self,
        sessions: &SessionManager,
        session: &QaSession,
        opener: &dyn WindowOpener,
    ) -> Result<ConversationSurface, AppError> {
        let window_token = self.issue(&session.token);

        match opener.open(&window_token) {
            Ok(()) => Ok(ConversationSurface::Dedicated { window_token }),
            Err(AppError::PopupBlocked) => {
                // The unclaimed token must not stay redeemable
                self.pending.remove(&window_token);
                tracing::info!("dedicated window blocked, rendering inline");
                let session = sessions
                    .get(&session.token)
                    .await
                    .ok_or(AppError::InvalidCredentials)?;
                Ok(ConversationSurface::Inline { session })
            },
            Err(other) => Err(other),
        }
    }

    /// Closing the conversation window ends the session; the origin
    /// window returns to its pre-session state. No server-side cleanup
    /// beyond the session map.
    pub async fn close_conversation(&self, sessions: &SessionManager, session_token: &str) {
        sessions.revoke(session_token).await;
    }

    /// Drop expired, never-claimed tokens (abandoned handoffs).
    pub fn prune(&self) {
        let before = self.pending.len();
        self.pending.retain(|_, h| h.issued_at.elapsed() <= self.ttl);
        let removed = before - self.pending.len();
        if removed > 0 {
            counter!(HANDOFF_ABANDONED).increment(removed as u64);
        }
    }

    /// Spawn the periodic prune task.
    pub fn spawn_prune(self: &std::sync::Arc<Self>, interval: Duration) {
        let bridge = std::sync::Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                bridge.prune();
            }
        });
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
