// ============================
// crates/backend-lib/src/identity.rs
// ============================
//! Identity Validator: (email, registration code) against the roster.
//!
//! Stateless per call. The failure mode is deliberately flat: every
//! mismatch — unknown email, wrong code, wrong event — reports the same
//! `InvalidCredentials`, so roster membership cannot be probed.
use eventdesk_common::EventId;

use crate::error::AppError;
use crate::events::{EventInfo, EventRegistry};
use crate::roster::{AttendeeRecord, AttendeeRoster};
use crate::validation;

/// A successful validation: who, for which event
#[derive(Debug, Clone)]
pub struct ValidatedAttendee {
    pub attendee: AttendeeRecord,
    pub event: EventInfo,
}

pub struct IdentityValidator<'a> {
    registry: &'a EventRegistry,
    roster: &'a dyn AttendeeRoster,
}

impl<'a> IdentityValidator<'a> {
    pub fn new(registry: &'a EventRegistry, roster: &'a dyn AttendeeRoster) -> Self {
        Self { registry, roster }
    }

    /// Validate an attendee against the roster for the active event (or
    /// an explicitly named one). Input shape is checked before the roster
    /// is consulted so malformed requests never reach it.
    pub async fn validate(
        &self,
        event_id: Option<EventId>,
        email: &str,
        registration_id: &str,
    ) -> Result<ValidatedAttendee, AppError> {
        validation::validate_email(email)?;
        validation::validate_registration_id(registration_id)?;

        let event = match event_id {
            Some(id) => self.registry.get(id).ok_or(AppError::InactiveEvent)?,
            None => self.registry.active_event().ok_or(AppError::InactiveEvent)?,
        };
        if !event.qa_active {
            return Err(AppError::InactiveEvent);
        }

        let attendee = self
            .roster
            .lookup(event.id, email, registration_id)
            .await
            .ok_or(AppError::InvalidCredentials)?;

        tracing::debug!(event_id = %event.id, "attendee validated");

        Ok(ValidatedAttendee { attendee, event })
    }
}
