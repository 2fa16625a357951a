// ============================
// crates/backend-lib/src/roster.rs
// ============================
//! Attendee roster lookup.
//!
//! The roster itself is owned by the registration system (an external
//! collaborator); this module only defines the lookup seam the identity
//! validator and session guard need, plus an in-memory implementation
//! seeded from configuration.
use async_trait::async_trait;
use dashmap::DashMap;
use eventdesk_common::EventId;

/// A registered attendee as the roster reports it
#[derive(Debug, Clone)]
pub struct AttendeeRecord {
    pub event_id: EventId,
    pub email: String,
    pub registration_id: String,
    pub name: String,
}

/// Lookup seam against the registered-attendee set
#[async_trait]
pub trait AttendeeRoster: Send + Sync {
    /// Find an attendee by (event, email, registration code). Returns
    /// `None` for any mismatch; callers must not distinguish which field
    /// failed.
    async fn lookup(
        &self,
        event_id: EventId,
        email: &str,
        registration_id: &str,
    ) -> Option<AttendeeRecord>;
}

/// In-memory roster keyed by (event, lowercased email)
#[derive(Default)]
pub struct InMemoryRoster {
    attendees: DashMap<(EventId, String), AttendeeRecord>,
}

impl InMemoryRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: AttendeeRecord) {
        let key = (record.event_id, record.email.to_lowercase());
        self.attendees.insert(key, record);
    }

    pub fn remove(&self, event_id: EventId, email: &str) {
        self.attendees.remove(&(event_id, email.to_lowercase()));
    }

    pub fn len(&self) -> usize {
        self.attendees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attendees.is_empty()
    }
}

#[async_trait]
impl AttendeeRoster for InMemoryRoster {
    async fn lookup(
        &self,
        event_id: EventId,
        email: &str,
        registration_id: &str,
    ) -> Option<AttendeeRecord> {
        let key = (event_id, email.to_lowercase());
        self.attendees
            .get(&key)
            .filter(|record| record.registration_id == registration_id)
            .map(|record| record.clone())
    }
}
