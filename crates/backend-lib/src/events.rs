// ============================
// crates/backend-lib/src/events.rs
// ============================
//! Event registry and the per-event activation gate.
//!
//! The gate is the only piece of event state this pipeline owns; event
//! CRUD lives in the wider product. At most one event has an open gate at
//! a time: enabling one closes every other first.
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use eventdesk_common::EventId;
use metrics::counter;
use uuid::Uuid;

use crate::error::AppError;
use crate::metrics::GATE_TOGGLED;

/// Event as the gate sees it
#[derive(Debug, Clone)]
pub struct EventInfo {
    pub id: EventId,
    pub name: String,
    pub event_date: Option<DateTime<Utc>>,
    pub qa_active: bool,
}

/// Registry of known events and their gates
#[derive(Default)]
pub struct EventRegistry {
    events: DashMap<EventId, EventInfo>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event with a closed gate.
    pub fn register(&self, name: &str, event_date: Option<DateTime<Utc>>) -> EventId {
        let id = Uuid::new_v4();
        self.events.insert(
            id,
            EventInfo {
                id,
                name: name.to_string(),
                event_date,
                qa_active: false,
            },
        );
        id
    }

    pub fn get(&self, event_id: EventId) -> Option<EventInfo> {
        self.events.get(&event_id).map(|e| e.clone())
    }

    /// Flip the activation gate. Enabling an event closes every other
    /// gate first; deactivating touches only the named event. Existing
    /// questions are unaffected either way.
    pub fn set_active(&self, event_id: EventId, active: bool) -> Result<EventInfo, AppError> {
        if !self.events.contains_key(&event_id) {
            return Err(AppError::EventNotFound);
        }

        if active {
            for mut entry in self.events.iter_mut() {
                entry.qa_active = entry.id == event_id;
            }
        } else if let Some(mut entry) = self.events.get_mut(&event_id) {
            entry.qa_active = false;
        }

        counter!(GATE_TOGGLED).increment(1);
        tracing::info!(%event_id, active, "activation gate toggled");

        self.get(event_id).ok_or(AppError::EventNotFound)
    }

    pub fn is_active(&self, event_id: EventId) -> bool {
        self.events
            .get(&event_id)
            .map(|e| e.qa_active)
            .unwrap_or(false)
    }

    /// The single event with an open gate, if any.
    pub fn active_event(&self) -> Option<EventInfo> {
        self.events
            .iter()
            .find(|e| e.qa_active)
            .map(|e| e.clone())
    }

    pub fn all(&self) -> Vec<EventInfo> {
        self.events.iter().map(|e| e.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabling_one_event_closes_the_others() {
        let registry = EventRegistry::new();
        let a = registry.register("Event A", None);
        let b = registry.register("Event B", None);

        registry.set_active(a, true).unwrap();
        assert!(registry.is_active(a));

        registry.set_active(b, true).unwrap();
        assert!(!registry.is_active(a));
        assert!(registry.is_active(b));
        assert_eq!(registry.active_event().unwrap().id, b);
    }

    #[test]
    fn deactivation_leaves_no_active_event() {
        let registry = EventRegistry::new();
        let a = registry.register("Event A", None);

        registry.set_active(a, true).unwrap();
        registry.set_active(a, false).unwrap();

        assert!(!registry.is_active(a));
        assert!(registry.active_event().is_none());
    }

    #[test]
    fn unknown_event_is_rejected() {
        let registry = EventRegistry::new();
        let err = registry.set_active(Uuid::new_v4(), true).unwrap_err();
        assert!(matches!(err, AppError::EventNotFound));
        assert!(!registry.is_active(Uuid::new_v4()));
    }
}
