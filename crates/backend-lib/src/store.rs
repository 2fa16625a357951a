// ============================
// crates/backend-lib/src/store.rs
// ============================
//! Question Store: the authoritative lifecycle state machine.
//!
//! All status mutation happens here, under the per-question entry lock,
//! so each question observes a single authoritative order of transitions.
//! Everything else reads derived views or goes through the moderation
//! dispatcher, which is the only caller of [`QuestionStore::apply`].
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use eventdesk_common::{
    EventId, ModerationAction, QuestionId, QuestionStatus, QuestionView, Role, RoleScope,
    SubmitterStats,
};
use metrics::counter;
use uuid::Uuid;

use crate::error::AppError;
use crate::events::EventInfo;
use crate::metrics::{
    QUESTION_SUBMITTED, TRANSITION_COMMITTED, TRANSITION_REJECTED, TRANSITION_STALE,
};

/// A stored question with its full moderation history markers
#[derive(Debug, Clone)]
pub struct Question {
    pub id: QuestionId,
    pub event_id: EventId,
    pub submitter_email: String,
    pub submitter_name: String,
    pub registration_id: String,
    pub text: String,
    pub status: QuestionStatus,
    pub response_text: Option<String>,
    /// Bumped on every committed transition; the optimistic-check token
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub manager_approved_at: Option<DateTime<Utc>>,
    pub moderated_at: Option<DateTime<Utc>>,
}

impl Question {
    pub fn view(&self) -> QuestionView {
        QuestionView {
            id: self.id,
            event_id: self.event_id,
            user_name: self.submitter_name.clone(),
            user_email: self.submitter_email.clone(),
            question: self.text.clone(),
            status: self.status,
            response: self.response_text.clone(),
            version: self.version,
            created_at: self.created_at,
            manager_approved_at: self.manager_approved_at,
        }
    }
}

/// A new submission, before it enters the store
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub submitter_email: String,
    pub submitter_name: String,
    pub registration_id: String,
    pub text: String,
}

/// Result of a successful `apply` call
#[derive(Debug, Clone)]
pub struct TransitionCommit {
    /// Post-transition snapshot
    pub question: Question,
    pub previous: QuestionStatus,
    /// False when an idempotent presenter clear was absorbed without a
    /// version bump
    pub changed: bool,
}

/// The moderation graph. Exhaustive over (role, action); any combination
/// not listed, or listed with the wrong source status, is rejected.
pub fn transition_target(
    role: Role,
    action: ModerationAction,
    from: QuestionStatus,
) -> Option<QuestionStatus> {
    match (role, action) {
        (Role::Manager, ModerationAction::Approve) if from == QuestionStatus::Pending => {
            Some(QuestionStatus::ManagerApproved)
        },
        (Role::Manager, ModerationAction::Reject) if from == QuestionStatus::Pending => {
            Some(QuestionStatus::Rejected)
        },
        (Role::Admin, ModerationAction::Answer) if from == QuestionStatus::ManagerApproved => {
            Some(QuestionStatus::Answered)
        },
        (Role::Admin, ModerationAction::Skip) if from == QuestionStatus::ManagerApproved => {
            Some(QuestionStatus::Skipped)
        },
        (Role::Admin, ModerationAction::Reject) if from == QuestionStatus::ManagerApproved => {
            Some(QuestionStatus::Rejected)
        },
        (Role::Presenter, ModerationAction::Clear) if from == QuestionStatus::Answered => {
            Some(QuestionStatus::Cleared)
        },
        _ => None,
    }
}

/// Authoritative in-memory question set
#[derive(Default)]
pub struct QuestionStore {
    questions: DashMap<QuestionId, Question>,
    by_event: DashMap<EventId, Vec<QuestionId>>,
}

impl QuestionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a question. The owning event's gate must be open at creation
    /// time; a closed gate rejects the submission before anything enters
    /// the store. Later deactivation leaves stored questions untouched.
    pub fn create(&self, event: &EventInfo, new: NewQuestion) -> Result<Question, AppError> {
        if !event.qa_active {
            return Err(AppError::InactiveEvent);
        }

        let question = Question {
            id: Uuid::new_v4(),
            event_id: event.id,
            submitter_email: new.submitter_email,
            submitter_name: new.submitter_name,
            registration_id: new.registration_id,
            text: new.text,
            status: QuestionStatus::Pending,
            response_text: None,
            version: 0,
            created_at: Utc::now(),
            manager_approved_at: None,
            moderated_at: None,
        };

        self.by_event
            .entry(event.id)
            .or_default()
            .push(question.id);
        self.questions.insert(question.id, question.clone());

        counter!(QUESTION_SUBMITTED).increment(1);
        tracing::debug!(question_id = %question.id, event_id = %event.id, "question stored");

        Ok(question)
    }

    pub fn get(&self, question_id: QuestionId) -> Option<Question> {
        self.questions.get(&question_id).map(|q| q.clone())
    }

    /// Apply a moderation transition under the entry lock.
    ///
    /// `expected_version` is the optimistic check: when present, the
    /// current version is re-read immediately before committing and a
    /// mismatch fails with `StaleState`, mutating nothing. Presenter
    /// clear on an already-cleared question is absorbed idempotently.
    pub fn apply(
        &self,
        question_id: QuestionId,
        role: Role,
        action: ModerationAction,
        response: Option<String>,
        expected_version: Option<u64>,
    ) -> Result<TransitionCommit, AppError> {
        let mut entry = self
            .questions
            .get_mut(&question_id)
            .ok_or(AppError::QuestionNotFound)?;

        // Idempotent terminal-view action: never errors, never re-commits.
        if role == Role::Presenter
            && action == ModerationAction::Clear
            && entry.status == QuestionStatus::Cleared
        {
            return Ok(TransitionCommit {
                question: entry.clone(),
                previous: QuestionStatus::Cleared,
                changed: false,
            });
        }

        if let Some(expected) = expected_version {
            if entry.version != expected {
                counter!(TRANSITION_STALE).increment(1);
                return Err(AppError::StaleState { question_id });
            }
        }

        let from = entry.status;
        let Some(target) = transition_target(role, action, from) else {
            counter!(TRANSITION_REJECTED).increment(1);
            return Err(AppError::InvalidTransition {
                status: from,
                action,
                role,
            });
        };

        let now = Utc::now();
        entry.status = target;
        entry.version += 1;
        entry.moderated_at = Some(now);
        if target == QuestionStatus::ManagerApproved {
            entry.manager_approved_at = Some(now);
        }
        if action == ModerationAction::Answer {
            entry.response_text = Some(response.unwrap_or_default());
        }

        counter!(TRANSITION_COMMITTED).increment(1);
        tracing::debug!(
            question_id = %question_id,
            from = %from,
            to = %target,
            %role,
            "transition committed"
        );

        Ok(TransitionCommit {
            question: entry.clone(),
            previous: from,
            changed: true,
        })
    }

    /// Role-scoped snapshot, the authoritative answer a subscriber
    /// re-fetches after any gap in notifications.
    pub fn list(&self, event_id: EventId, scope: RoleScope) -> Vec<QuestionView> {
        let mut views: Vec<QuestionView> = self
            .event_questions(event_id)
            .filter(|q| match scope {
                RoleScope::Manager => q.status == QuestionStatus::Pending,
                RoleScope::Admin => q.status == QuestionStatus::ManagerApproved,
                // Cleared rows stay in the store but are invisible here
                RoleScope::Presenter => q.status == QuestionStatus::Answered,
                RoleScope::All => true,
            })
            .map(|q| q.view())
            .collect();

        match scope {
            RoleScope::Admin => {
                views.sort_by(|a, b| b.manager_approved_at.cmp(&a.manager_approved_at));
            },
            _ => views.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }
        views
    }

    /// An attendee's own questions, newest first, with any responses.
    pub fn list_by_submitter(&self, event_id: EventId, email: &str) -> Vec<QuestionView> {
        let email = email.to_lowercase();
        let mut views: Vec<QuestionView> = self
            .event_questions(event_id)
            .filter(|q| q.submitter_email.to_lowercase() == email)
            .map(|q| q.view())
            .collect();
        views.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        views
    }

    /// Approved-question counts per submitter, highest first.
    pub fn submitter_stats(&self, event_id: EventId, limit: usize) -> Vec<SubmitterStats> {
        let mut counts: std::collections::HashMap<String, SubmitterStats> =
            std::collections::HashMap::new();

        for question in self.event_questions(event_id) {
            // Anything past the manager counts as approved, whatever the
            // admin did with it afterwards.
            let approved = !matches!(
                question.status,
                QuestionStatus::Pending | QuestionStatus::Rejected
            ) || question.manager_approved_at.is_some();
            if !approved {
                continue;
            }
            let entry = counts
                .entry(question.submitter_email.to_lowercase())
                .or_insert_with(|| SubmitterStats {
                    user_name: question.submitter_name.clone(),
                    user_email: question.submitter_email.clone(),
                    approved_questions: 0,
                });
            entry.approved_questions += 1;
        }

        let mut stats: Vec<SubmitterStats> = counts.into_values().collect();
        stats.sort_by(|a, b| b.approved_questions.cmp(&a.approved_questions));
        stats.truncate(limit);
        stats
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    fn event_questions(&self, event_id: EventId) -> impl Iterator<Item = Question> + '_ {
        let ids = self
            .by_event
            .get(&event_id)
            .map(|ids| ids.clone())
            .unwrap_or_default();
        ids.into_iter()
            .filter_map(move |id| self.questions.get(&id).map(|q| q.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_event() -> EventInfo {
        EventInfo {
            id: Uuid::new_v4(),
            name: "Launch Day".to_string(),
            event_date: None,
            qa_active: true,
        }
    }

    fn submission(email: &str) -> NewQuestion {
        NewQuestion {
            submitter_email: email.to_string(),
            submitter_name: "Ada Lovelace".to_string(),
            registration_id: "REG-001".to_string(),
            text: "What is the keynote time?".to_string(),
        }
    }

    #[test]
    fn closed_gate_rejects_submission_and_stores_nothing() {
        let store = QuestionStore::new();
        let mut event = open_event();
        event.qa_active = false;

        let err = store.create(&event, submission("ada@example.com")).unwrap_err();
        assert!(matches!(err, AppError::InactiveEvent));
        assert!(store.is_empty());
        assert!(store.list(event.id, RoleScope::All).is_empty());
    }

    #[test]
    fn full_lifecycle_follows_the_graph() {
        let store = QuestionStore::new();
        let event = open_event();
        let q = store.create(&event, submission("ada@example.com")).unwrap();
        assert_eq!(q.status, QuestionStatus::Pending);
        assert_eq!(q.version, 0);

        let approved = store
            .apply(q.id, Role::Manager, ModerationAction::Approve, None, None)
            .unwrap();
        assert_eq!(approved.question.status, QuestionStatus::ManagerApproved);
        assert_eq!(approved.previous, QuestionStatus::Pending);
        assert!(approved.question.manager_approved_at.is_some());

        let answered = store
            .apply(
                q.id,
                Role::Admin,
                ModerationAction::Answer,
                Some("3 PM".to_string()),
                None,
            )
            .unwrap();
        assert_eq!(answered.question.status, QuestionStatus::Answered);
        assert_eq!(answered.question.response_text.as_deref(), Some("3 PM"));

        let cleared = store
            .apply(q.id, Role::Presenter, ModerationAction::Clear, None, None)
            .unwrap();
        assert_eq!(cleared.question.status, QuestionStatus::Cleared);
        assert_eq!(cleared.question.version, 3);
    }

    #[test]
    fn approve_outside_pending_fails_without_mutation() {
        let store = QuestionStore::new();
        let event = open_event();
        let q = store.create(&event, submission("ada@example.com")).unwrap();

        store
            .apply(q.id, Role::Manager, ModerationAction::Approve, None, None)
            .unwrap();

        let err = store
            .apply(q.id, Role::Manager, ModerationAction::Approve, None, None)
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidTransition {
                status: QuestionStatus::ManagerApproved,
                action: ModerationAction::Approve,
                role: Role::Manager,
            }
        ));

        let current = store.get(q.id).unwrap();
        assert_eq!(current.status, QuestionStatus::ManagerApproved);
        assert_eq!(current.version, 1);
    }

    #[test]
    fn repeat_answer_fails() {
        let store = QuestionStore::new();
        let event = open_event();
        let q = store.create(&event, submission("ada@example.com")).unwrap();
        store
            .apply(q.id, Role::Manager, ModerationAction::Approve, None, None)
            .unwrap();
        store
            .apply(
                q.id,
                Role::Admin,
                ModerationAction::Answer,
                Some("3 PM".to_string()),
                None,
            )
            .unwrap();

        let err = store
            .apply(
                q.id,
                Role::Admin,
                ModerationAction::Answer,
                Some("4 PM".to_string()),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
        assert_eq!(
            store.get(q.id).unwrap().response_text.as_deref(),
            Some("3 PM")
        );
    }

    #[test]
    fn wrong_role_cannot_use_another_roles_edge() {
        let store = QuestionStore::new();
        let event = open_event();
        let q = store.create(&event, submission("ada@example.com")).unwrap();

        // A presenter cannot approve, an admin cannot clear, an attendee
        // cannot moderate at all.
        for (role, action) in [
            (Role::Presenter, ModerationAction::Approve),
            (Role::Admin, ModerationAction::Approve),
            (Role::Attendee, ModerationAction::Reject),
        ] {
            let err = store.apply(q.id, role, action, None, None).unwrap_err();
            assert!(matches!(err, AppError::InvalidTransition { .. }));
        }
        assert_eq!(store.get(q.id).unwrap().status, QuestionStatus::Pending);
    }

    #[test]
    fn presenter_clear_is_idempotent() {
        let store = QuestionStore::new();
        let event = open_event();
        let q = store.create(&event, submission("ada@example.com")).unwrap();
        store
            .apply(q.id, Role::Manager, ModerationAction::Approve, None, None)
            .unwrap();
        store
            .apply(q.id, Role::Admin, ModerationAction::Answer, None, None)
            .unwrap();

        let first = store
            .apply(q.id, Role::Presenter, ModerationAction::Clear, None, None)
            .unwrap();
        assert!(first.changed);
        let version_after_clear = first.question.version;

        let second = store
            .apply(q.id, Role::Presenter, ModerationAction::Clear, None, None)
            .unwrap();
        assert!(!second.changed);
        assert_eq!(second.question.status, QuestionStatus::Cleared);
        assert_eq!(second.question.version, version_after_clear);
    }

    #[test]
    fn stale_version_fails_exactly_one_of_two_racers() {
        let store = QuestionStore::new();
        let event = open_event();
        let q = store.create(&event, submission("ada@example.com")).unwrap();
        store
            .apply(q.id, Role::Manager, ModerationAction::Approve, None, None)
            .unwrap();

        // Both actors read version 1, then race.
        let observed = store.get(q.id).unwrap().version;

        let first = store.apply(
            q.id,
            Role::Admin,
            ModerationAction::Answer,
            Some("3 PM".to_string()),
            Some(observed),
        );
        let second = store.apply(
            q.id,
            Role::Admin,
            ModerationAction::Skip,
            None,
            Some(observed),
        );

        assert!(first.is_ok());
        assert!(matches!(second, Err(AppError::StaleState { .. })));
        assert_eq!(store.get(q.id).unwrap().status, QuestionStatus::Answered);
    }

    #[test]
    fn scoped_listings_slice_by_status() {
        let store = QuestionStore::new();
        let event = open_event();
        let pending = store.create(&event, submission("a@example.com")).unwrap();
        let approved = store.create(&event, submission("b@example.com")).unwrap();
        let answered = store.create(&event, submission("c@example.com")).unwrap();

        store
            .apply(approved.id, Role::Manager, ModerationAction::Approve, None, None)
            .unwrap();
        store
            .apply(answered.id, Role::Manager, ModerationAction::Approve, None, None)
            .unwrap();
        store
            .apply(answered.id, Role::Admin, ModerationAction::Answer, None, None)
            .unwrap();

        let manager_view = store.list(event.id, RoleScope::Manager);
        assert_eq!(manager_view.len(), 1);
        assert_eq!(manager_view[0].id, pending.id);

        let admin_view = store.list(event.id, RoleScope::Admin);
        assert_eq!(admin_view.len(), 1);
        assert_eq!(admin_view[0].id, approved.id);

        let presenter_view = store.list(event.id, RoleScope::Presenter);
        assert_eq!(presenter_view.len(), 1);
        assert_eq!(presenter_view[0].id, answered.id);

        // Clearing removes it from the presenter view but not the store
        store
            .apply(answered.id, Role::Presenter, ModerationAction::Clear, None, None)
            .unwrap();
        assert!(store.list(event.id, RoleScope::Presenter).is_empty());
        assert_eq!(store.list(event.id, RoleScope::All).len(), 3);
    }

    #[test]
    fn submitter_listing_and_stats() {
        let store = QuestionStore::new();
        let event = open_event();
        let first = store.create(&event, submission("ada@example.com")).unwrap();
        store.create(&event, submission("ada@example.com")).unwrap();
        store.create(&event, submission("grace@example.com")).unwrap();

        assert_eq!(
            store.list_by_submitter(event.id, "ADA@example.com").len(),
            2
        );

        store
            .apply(first.id, Role::Manager, ModerationAction::Approve, None, None)
            .unwrap();
        let stats = store.submitter_stats(event.id, 10);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].user_email, "ada@example.com");
        assert_eq!(stats[0].approved_questions, 1);
    }
}
