// ============================
// crates/backend-lib/src/http.rs
// ============================
//! REST surface: `/qa/*` plus health probes.
//!
//! Staff endpoints authenticate with a pre-issued bearer token resolved
//! against the staff directory; attendee endpoints authenticate with the
//! (email, registration code) pair. All moderation goes through the
//! dispatcher — no handler touches question status directly.
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use eventdesk_common::{
    ActiveEventResponse, AdminActionRequest, CheckSessionResponse, ClaimWindowRequest,
    ClaimWindowResponse, EventId, ModerationAction, ModerationOutcome, PresenterClearRequest,
    QuestionId, QuestionView, Role, RoleScope, SubmitQuestionRequest, SubmitQuestionResponse,
    SubmitterStats, ToggleEventRequest, ValidateUserRequest, ValidateUserResponse,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::AppError;
use crate::identity::IdentityValidator;
use crate::session::GuardVerdict;
use crate::storage::Storage;
use crate::store::NewQuestion;
use crate::ws_router;
use crate::AppState;

/// How many submitters the stats endpoint reports
const STATS_LIMIT: usize = 10;

/// Build the full application router (REST + push channel).
pub fn create_router<S: Storage + Send + Sync + Clone + 'static>(
    state: Arc<AppState<S>>,
) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/qa/active-event", get(active_event))
        .route("/qa/validate-user", post(validate_user))
        .route("/qa/submit-question", post(submit_question))
        .route("/qa/user-questions", get(user_questions))
        .route("/qa/check-session", post(check_session))
        .route("/qa/claim-window", post(claim_window))
        .route("/qa/manager-questions/{event_id}", get(manager_questions))
        .route("/qa/admin-questions/{event_id}", get(admin_questions))
        .route(
            "/qa/presenter-questions/{event_id}",
            get(presenter_questions),
        )
        .route("/qa/question-stats/{event_id}", get(question_stats))
        .route("/qa/manager-approve/{question_id}", post(manager_approve))
        .route("/qa/manager-reject/{question_id}", post(manager_reject))
        .route("/qa/admin-action", post(admin_action))
        .route("/qa/presenter-clear", post(presenter_clear))
        .route("/qa/toggle-event", post(toggle_event))
        .route("/qa/events/{event_id}/ws", get(ws_router::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Pull the bearer token out of the Authorization header
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Resolve the caller's staff role and require it to be one of `allowed`.
fn require_staff<S>(
    state: &AppState<S>,
    headers: &HeaderMap,
    allowed: &[Role],
) -> Result<Role, AppError> {
    let token = bearer_token(headers).ok_or(AppError::InvalidCredentials)?;
    let role = state
        .staff
        .role_for(token)
        .ok_or(AppError::InvalidCredentials)?;
    if !allowed.contains(&role) {
        return Err(AppError::Forbidden);
    }
    Ok(role)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "healthy"}))
}

/// `GET /qa/active-event`: the attendee entry point's gate lookup.
async fn active_event<S: Storage + Send + Sync + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<ActiveEventResponse>, AppError> {
    let event = state.registry.active_event().ok_or(AppError::InactiveEvent)?;
    Ok(Json(ActiveEventResponse {
        id: event.id,
        name: event.name,
        event_date: event.event_date,
    }))
}

/// `POST /qa/validate-user`: identity check, session issuance and the
/// window handoff token in one round trip.
async fn validate_user<S: Storage + Send + Sync + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(payload): Json<ValidateUserRequest>,
) -> Result<Json<ValidateUserResponse>, AppError> {
    let validator = IdentityValidator::new(&state.registry, state.roster.as_ref());
    let validated = validator
        .validate(None, &payload.email, &payload.registration_id)
        .await?;

    let session = state
        .sessions
        .create(
            validated.event.id,
            &validated.attendee.email,
            &validated.attendee.registration_id,
            &validated.attendee.name,
        )
        .await;
    let window_token = state.bridge.issue(&session.token);

    Ok(Json(ValidateUserResponse {
        user_name: validated.attendee.name,
        user_email: validated.attendee.email,
        event_id: validated.event.id,
        event_name: validated.event.name,
        session_token: session.token,
        window_token,
    }))
}

/// `POST /qa/submit-question`
async fn submit_question<S: Storage + Send + Sync + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(payload): Json<SubmitQuestionRequest>,
) -> Result<Json<SubmitQuestionResponse>, AppError> {
    crate::validation::validate_question_text(&payload.question)?;
    state.rate_limiter.check(&payload.user_email.to_lowercase())?;

    let validator = IdentityValidator::new(&state.registry, state.roster.as_ref());
    let validated = validator
        .validate(None, &payload.user_email, &payload.registration_id)
        .await?;

    let question = state
        .dispatcher
        .submit(
            &validated.event,
            NewQuestion {
                submitter_email: validated.attendee.email,
                // The roster name is authoritative over whatever the
                // client typed
                submitter_name: validated.attendee.name,
                registration_id: validated.attendee.registration_id,
                text: payload.question.trim().to_string(),
            },
        )
        .await?;

    Ok(Json(SubmitQuestionResponse {
        id: question.id,
        status: question.status,
    }))
}

#[derive(Deserialize)]
struct UserQuestionsQuery {
    email: String,
    registration_id: String,
}

/// `GET /qa/user-questions`: an attendee's own submissions and responses.
async fn user_questions<S: Storage + Send + Sync + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<UserQuestionsQuery>,
) -> Result<Json<Vec<QuestionView>>, AppError> {
    let validator = IdentityValidator::new(&state.registry, state.roster.as_ref());
    let validated = validator
        .validate(None, &query.email, &query.registration_id)
        .await?;

    Ok(Json(state.store.list_by_submitter(
        validated.event.id,
        &validated.attendee.email,
    )))
}

/// `POST /qa/check-session`: the session guard's wire surface.
async fn check_session<S: Storage + Send + Sync + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(payload): Json<ValidateUserRequest>,
) -> Json<CheckSessionResponse> {
    let verdict = state
        .sessions
        .check(
            &state.registry,
            state.roster.as_ref(),
            &payload.email,
            &payload.registration_id,
        )
        .await;

    match verdict {
        GuardVerdict::Valid => {
            // Both checked inside the guard an instant ago
            let event = state.registry.active_event();
            let name = match &event {
                Some(event) => state
                    .roster
                    .lookup(event.id, &payload.email, &payload.registration_id)
                    .await
                    .map(|a| a.name),
                None => None,
            };
            Json(CheckSessionResponse {
                valid: true,
                message: None,
                user_name: name,
                event_id: event.as_ref().map(|e| e.id),
                event_name: event.map(|e| e.name),
            })
        },
        GuardVerdict::Revalidate { reason } => Json(CheckSessionResponse {
            valid: false,
            message: Some(reason),
            user_name: None,
            event_id: None,
            event_name: None,
        }),
    }
}

/// `POST /qa/claim-window`: redeem a window handoff token.
async fn claim_window<S: Storage + Send + Sync + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(payload): Json<ClaimWindowRequest>,
) -> Result<Json<ClaimWindowResponse>, AppError> {
    let session = state
        .bridge
        .claim(&state.sessions, &payload.window_token)
        .await?;
    let event = state
        .registry
        .get(session.event_id)
        .ok_or(AppError::EventNotFound)?;

    Ok(Json(ClaimWindowResponse {
        session_token: session.token,
        user_name: session.attendee_name,
        user_email: session.email,
        event_id: session.event_id,
        event_name: event.name,
    }))
}

async fn manager_questions<S: Storage + Send + Sync + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(event_id): Path<EventId>,
) -> Result<Json<Vec<QuestionView>>, AppError> {
    require_staff(&state, &headers, &[Role::Manager, Role::Admin])?;
    Ok(Json(state.store.list(event_id, RoleScope::Manager)))
}

async fn admin_questions<S: Storage + Send + Sync + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(event_id): Path<EventId>,
) -> Result<Json<Vec<QuestionView>>, AppError> {
    require_staff(&state, &headers, &[Role::Admin, Role::Presenter])?;
    Ok(Json(state.store.list(event_id, RoleScope::Admin)))
}

async fn presenter_questions<S: Storage + Send + Sync + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(event_id): Path<EventId>,
) -> Result<Json<Vec<QuestionView>>, AppError> {
    require_staff(&state, &headers, &[Role::Presenter, Role::Admin])?;
    Ok(Json(state.store.list(event_id, RoleScope::Presenter)))
}

async fn question_stats<S: Storage + Send + Sync + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(event_id): Path<EventId>,
) -> Result<Json<Vec<SubmitterStats>>, AppError> {
    require_staff(&state, &headers, &[Role::Admin, Role::Manager])?;
    Ok(Json(state.store.submitter_stats(event_id, STATS_LIMIT)))
}

#[derive(Deserialize, Default)]
struct ModerateQuery {
    /// Version the client observed when rendering the item; a concurrent
    /// transition fails the request with `stale_state`
    expected_version: Option<u64>,
}

/// `POST /qa/manager-approve/{question_id}`
async fn manager_approve<S: Storage + Send + Sync + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(question_id): Path<QuestionId>,
    Query(query): Query<ModerateQuery>,
) -> Result<Json<ModerationOutcome>, AppError> {
    // Admins may triage too, but the edge taken is the manager's
    require_staff(&state, &headers, &[Role::Manager, Role::Admin])?;
    let outcome = state
        .dispatcher
        .apply_action(
            question_id,
            Role::Manager,
            ModerationAction::Approve,
            None,
            query.expected_version,
        )
        .await?;
    Ok(Json(outcome))
}

/// `POST /qa/manager-reject/{question_id}`
async fn manager_reject<S: Storage + Send + Sync + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(question_id): Path<QuestionId>,
    Query(query): Query<ModerateQuery>,
) -> Result<Json<ModerationOutcome>, AppError> {
    require_staff(&state, &headers, &[Role::Manager, Role::Admin])?;
    let outcome = state
        .dispatcher
        .apply_action(
            question_id,
            Role::Manager,
            ModerationAction::Reject,
            None,
            query.expected_version,
        )
        .await?;
    Ok(Json(outcome))
}

/// `POST /qa/admin-action`
async fn admin_action<S: Storage + Send + Sync + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(payload): Json<AdminActionRequest>,
) -> Result<Json<ModerationOutcome>, AppError> {
    require_staff(&state, &headers, &[Role::Admin])?;
    let outcome = state
        .dispatcher
        .apply_action(
            payload.question_id,
            Role::Admin,
            payload.action.into(),
            payload.response,
            payload.expected_version,
        )
        .await?;
    Ok(Json(outcome))
}

/// `POST /qa/presenter-clear`
async fn presenter_clear<S: Storage + Send + Sync + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(payload): Json<PresenterClearRequest>,
) -> Result<Json<ModerationOutcome>, AppError> {
    require_staff(&state, &headers, &[Role::Presenter])?;
    let outcome = state
        .dispatcher
        .apply_action(
            payload.question_id,
            Role::Presenter,
            ModerationAction::Clear,
            None,
            None,
        )
        .await?;
    Ok(Json(outcome))
}

/// `POST /qa/toggle-event`: flip the activation gate (admin only).
async fn toggle_event<S: Storage + Send + Sync + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(payload): Json<ToggleEventRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_staff(&state, &headers, &[Role::Admin])?;
    let event = state.registry.set_active(payload.event_id, payload.active)?;

    state.broker.publish(
        event.id,
        eventdesk_common::PushMessage::QaToggled {
            event_id: event.id,
            active: payload.active,
        },
    );

    let verb = if payload.active { "enabled" } else { "disabled" };
    Ok(Json(serde_json::json!({
        "message": format!("Q/A {verb} for event {}", event.name)
    })))
}
