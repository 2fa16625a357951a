// ================
// crates/common/src/lib.rs
// ================
//! Common types and structures
//! shared between the `Eventdesk` Q&A backend and its clients.
//! This module defines the question lifecycle vocabulary, the push-channel
//! protocol messages and the REST payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque event identifier
pub type EventId = Uuid;

/// Opaque question identifier
pub type QuestionId = Uuid;

/// Lifecycle status of a question.
///
/// Transitions only ever follow the moderation graph:
/// `pending -> manager_approved -> {answered, skipped, rejected}`,
/// `pending -> rejected`, `answered -> cleared`. There are no backward
/// edges.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    /// Initial status on submission
    Pending,
    /// Manager approved a pending item
    ManagerApproved,
    /// Admin set a response (terminal for moderation, visible to presenter)
    Answered,
    /// Terminal: rejected by manager or admin
    Rejected,
    /// Terminal: admin skipped without answering
    Skipped,
    /// Terminal: presenter dismissed an answered item from their view
    Cleared,
}

impl QuestionStatus {
    /// Wire name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionStatus::Pending => "pending",
            QuestionStatus::ManagerApproved => "manager_approved",
            QuestionStatus::Answered => "answered",
            QuestionStatus::Rejected => "rejected",
            QuestionStatus::Skipped => "skipped",
            QuestionStatus::Cleared => "cleared",
        }
    }
}

impl std::fmt::Display for QuestionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acting role for a moderation request
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Attendee,
    Manager,
    Admin,
    Presenter,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Attendee => "attendee",
            Role::Manager => "manager",
            Role::Admin => "admin",
            Role::Presenter => "presenter",
        };
        f.write_str(s)
    }
}

/// Moderation action requested against a question.
///
/// The answer text travels separately in the request payload; the variant
/// set stays closed so the transition table can match exhaustively.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    Approve,
    Reject,
    Answer,
    Skip,
    Clear,
}

impl std::fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ModerationAction::Approve => "approve",
            ModerationAction::Reject => "reject",
            ModerationAction::Answer => "answer",
            ModerationAction::Skip => "skip",
            ModerationAction::Clear => "clear",
        };
        f.write_str(s)
    }
}

/// Admin action as it appears on the wire (`/qa/admin-action`)
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdminActionKind {
    Answered,
    Skipped,
    Rejected,
}

impl From<AdminActionKind> for ModerationAction {
    fn from(kind: AdminActionKind) -> Self {
        match kind {
            AdminActionKind::Answered => ModerationAction::Answer,
            AdminActionKind::Skipped => ModerationAction::Skip,
            AdminActionKind::Rejected => ModerationAction::Reject,
        }
    }
}

/// Which slice of the question set a subscriber cares about
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoleScope {
    /// Manager dashboards: pending items
    Manager,
    /// Admin dashboards: manager-approved items
    Admin,
    /// Presenter view: answered, not yet cleared
    Presenter,
    /// Everything (attendee chat windows, monitoring)
    All,
}

impl RoleScope {
    pub fn as_str(self) -> &'static str {
        match self {
            RoleScope::Manager => "manager",
            RoleScope::Admin => "admin",
            RoleScope::Presenter => "presenter",
            RoleScope::All => "all",
        }
    }
}

/// Messages pushed over the per-event topic.
///
/// Payloads are refresh hints only: consumers re-fetch an authoritative
/// snapshot rather than applying these incrementally.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushMessage {
    /// Greeting sent once after a successful subscribe
    Connected { event_id: EventId },
    /// An attendee submitted a question
    NewQuestion { question_id: QuestionId },
    /// A manager approved a question
    QuestionApproved { question_id: QuestionId },
    /// An admin answered, skipped or rejected a question
    QuestionAnswered { question_id: QuestionId },
    /// A presenter cleared a question from the live view
    QuestionCleared { question_id: QuestionId },
    /// The event activation gate flipped
    QaToggled { event_id: EventId, active: bool },
}

impl PushMessage {
    /// Scopes a hint concerns. `RoleScope::All` receives every hint.
    pub fn concerns(&self, scope: RoleScope) -> bool {
        match scope {
            RoleScope::All => true,
            RoleScope::Manager => matches!(
                self,
                PushMessage::Connected { .. }
                    | PushMessage::NewQuestion { .. }
                    | PushMessage::QaToggled { .. }
            ),
            RoleScope::Admin => matches!(
                self,
                PushMessage::Connected { .. }
                    | PushMessage::QuestionApproved { .. }
                    | PushMessage::QaToggled { .. }
            ),
            RoleScope::Presenter => matches!(
                self,
                PushMessage::Connected { .. }
                    | PushMessage::QuestionAnswered { .. }
                    | PushMessage::QuestionCleared { .. }
                    | PushMessage::QaToggled { .. }
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// REST payloads
// ---------------------------------------------------------------------------

/// `POST /qa/validate-user` request
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ValidateUserRequest {
    pub email: String,
    pub registration_id: String,
}

/// `POST /qa/validate-user` response
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ValidateUserResponse {
    pub user_name: String,
    pub user_email: String,
    pub event_id: EventId,
    pub event_name: String,
    /// Session token for subsequent calls
    pub session_token: String,
    /// Single-use handoff token for the dedicated conversation window
    pub window_token: String,
}

/// `GET /qa/active-event` response
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ActiveEventResponse {
    pub id: EventId,
    pub name: String,
    pub event_date: Option<DateTime<Utc>>,
}

/// `POST /qa/submit-question` request
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SubmitQuestionRequest {
    pub user_email: String,
    pub user_name: String,
    pub registration_id: String,
    pub question: String,
}

/// `POST /qa/submit-question` response
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SubmitQuestionResponse {
    pub id: QuestionId,
    pub status: QuestionStatus,
}

/// `POST /qa/admin-action` request
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AdminActionRequest {
    pub question_id: QuestionId,
    pub action: AdminActionKind,
    pub response: Option<String>,
    pub expected_version: Option<u64>,
}

/// `POST /qa/presenter-clear` request
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PresenterClearRequest {
    pub question_id: QuestionId,
}

/// `POST /qa/toggle-event` request
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ToggleEventRequest {
    pub event_id: EventId,
    pub active: bool,
}

/// `POST /qa/check-session` response
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CheckSessionResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
}

/// `POST /qa/claim-window` request
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClaimWindowRequest {
    pub window_token: String,
}

/// `POST /qa/claim-window` response: the validated session, handed to the
/// dedicated conversation window.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClaimWindowResponse {
    pub session_token: String,
    pub user_name: String,
    pub user_email: String,
    pub event_id: EventId,
    pub event_name: String,
}

/// Outcome of a committed (or idempotently absorbed) transition
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ModerationOutcome {
    pub question_id: QuestionId,
    pub new_status: QuestionStatus,
    pub version: u64,
}

/// One row of a role-scoped snapshot
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    pub id: QuestionId,
    pub event_id: EventId,
    pub user_name: String,
    pub user_email: String,
    pub question: String,
    pub status: QuestionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_approved_at: Option<DateTime<Utc>>,
}

/// One row of `GET /qa/question-stats/{event_id}`: approved-question counts
/// per submitter.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SubmitterStats {
    pub user_name: String,
    pub user_email: String,
    pub approved_questions: u64,
}
