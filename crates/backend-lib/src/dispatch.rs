// ============================
// crates/backend-lib/src/dispatch.rs
// ============================
//! Moderation Dispatcher: the single write path into the question store.
//!
//! Maps an authenticated role + action onto the transition table, commits
//! through the store, appends the audit line and publishes exactly one
//! fan-out notification per successful transition. Failures publish
//! nothing and mutate nothing.
use chrono::Utc;
use eventdesk_common::{
    ModerationAction, ModerationOutcome, PushMessage, QuestionId, QuestionStatus, Role,
};
use std::sync::Arc;

use crate::broker::FanoutBroker;
use crate::error::AppError;
use crate::events::EventInfo;
use crate::storage::{AuditRecord, Storage};
use crate::store::{NewQuestion, Question, QuestionStore, TransitionCommit};

pub struct ModerationDispatcher<S> {
    store: Arc<QuestionStore>,
    broker: Arc<FanoutBroker>,
    storage: S,
}

impl<S: Storage + Clone> ModerationDispatcher<S> {
    pub fn new(store: Arc<QuestionStore>, broker: Arc<FanoutBroker>, storage: S) -> Self {
        Self {
            store,
            broker,
            storage,
        }
    }

    /// Accept an attendee submission. The gate is checked by the store at
    /// creation time; a closed gate means nothing is stored, audited or
    /// published.
    pub async fn submit(
        &self,
        event: &EventInfo,
        new: NewQuestion,
    ) -> Result<Question, AppError> {
        let question = self.store.create(event, new)?;

        self.append_audit(&question, None, Role::Attendee, None).await;
        self.broker.publish(
            event.id,
            PushMessage::NewQuestion {
                question_id: question.id,
            },
        );

        Ok(question)
    }

    /// Apply a moderation action for a role.
    ///
    /// `expected_version` carries the optimistic check from the client; an
    /// idempotent presenter clear on an already-cleared question succeeds
    /// without re-publishing.
    pub async fn apply_action(
        &self,
        question_id: QuestionId,
        role: Role,
        action: ModerationAction,
        response: Option<String>,
        expected_version: Option<u64>,
    ) -> Result<ModerationOutcome, AppError> {
        let commit = self
            .store
            .apply(question_id, role, action, response, expected_version)?;

        if commit.changed {
            self.append_audit(&commit.question, Some(commit.previous), role, Some(action))
                .await;
            self.broker
                .publish(commit.question.event_id, hint_for(&commit));
        }

        Ok(ModerationOutcome {
            question_id: commit.question.id,
            new_status: commit.question.status,
            version: commit.question.version,
        })
    }

    /// Audit append is best-effort: the transition has already committed,
    /// so a storage failure is logged rather than unwound.
    async fn append_audit(
        &self,
        question: &Question,
        from: Option<QuestionStatus>,
        role: Role,
        action: Option<ModerationAction>,
    ) {
        let record = AuditRecord {
            question_id: question.id,
            event_id: question.event_id,
            from,
            to: question.status,
            role,
            action,
            submitter_email: question.submitter_email.clone(),
            at: Utc::now(),
        };

        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(question_id = %question.id, %err, "audit record serialization failed");
                return;
            },
        };

        if let Err(err) = self.storage.append_audit(question.event_id, &line).await {
            tracing::warn!(question_id = %question.id, %err, "audit append failed");
        }
    }
}

/// One hint per committed transition, named for what happened.
fn hint_for(commit: &TransitionCommit) -> PushMessage {
    let question_id = commit.question.id;
    match commit.question.status {
        QuestionStatus::Pending => PushMessage::NewQuestion { question_id },
        QuestionStatus::ManagerApproved => PushMessage::QuestionApproved { question_id },
        // Admin disposal and manager rejection both end moderation
        QuestionStatus::Answered
        | QuestionStatus::Skipped
        | QuestionStatus::Rejected => PushMessage::QuestionAnswered { question_id },
        QuestionStatus::Cleared => PushMessage::QuestionCleared { question_id },
    }
}
