use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::activity_log::{ActivityFilter, ActivityLogService};
use crate::app::businesses::{BusinessService, RegisterBusiness};
use crate::app::edits::{EditService, ResolutionSummary, SubmissionOutcome};
use crate::app::messages::{MessageService, SendOutcome};
use crate::app::notifications::NotificationService;
use crate::domain::activity::{ActionType, ActivityLogEntry, ActorType};
use crate::domain::business::{Business, BusinessField, FieldKind};
use crate::domain::edits::{FieldDecision, PendingEdit};
use crate::domain::message::{Conversation, Message};
use crate::domain::notification::Notification;
use crate::domain::spam::{Severity, SpamCheckResult, SpamKeyword, SpamPattern};
use crate::http::{ActorId, AdminToken, AppError};
use crate::AppState;

const MAX_MESSAGE_LENGTH: usize = 5000;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

#[derive(Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

fn parse_cursor(cursor: Option<String>) -> Result<Option<(OffsetDateTime, Uuid)>, AppError> {
    let Some(cursor) = cursor else {
        return Ok(None);
    };

    let mut parts = cursor.splitn(2, '/');
    let timestamp = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;
    let id = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;

    let timestamp = OffsetDateTime::parse(timestamp, &Rfc3339)
        .map_err(|_| AppError::bad_request("invalid cursor"))?;
    let id = Uuid::parse_str(id).map_err(|_| AppError::bad_request("invalid cursor"))?;

    Ok(Some((timestamp, id)))
}

fn encode_cursor(cursor: Option<(OffsetDateTime, Uuid)>) -> Option<String> {
    let (timestamp, id) = cursor?;
    let timestamp = timestamp.format(&Rfc3339).ok()?;
    Some(format!("{}/{}", timestamp, id))
}

fn effective_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(20).clamp(1, 100)
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.db.ping().await.is_ok() {
        "ok"
    } else {
        "degraded"
    };
    Json(HealthResponse { status })
}

// ---------------------------------------------------------------------------
// Businesses
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreateBusinessRequest {
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub description: Option<String>,
    pub website_url: Option<String>,
}

pub async fn create_business(
    State(state): State<AppState>,
    ActorId(actor_id): ActorId,
    Json(payload): Json<CreateBusinessRequest>,
) -> Result<Json<Business>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::bad_request("name is required"));
    }

    let service = BusinessService::new(state.db.clone());
    let business = service
        .register(
            actor_id,
            RegisterBusiness {
                name: payload.name,
                address: payload.address,
                city: payload.city,
                state: payload.state,
                postal_code: payload.postal_code,
                categories: payload.categories,
                phone: payload.phone,
                email: payload.email,
                description: payload.description,
                website_url: payload.website_url,
            },
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to register business");
            AppError::internal("failed to register business")
        })?;

    Ok(Json(business))
}

pub async fn get_business(
    State(state): State<AppState>,
    Path(business_id): Path<Uuid>,
) -> Result<Json<Business>, AppError> {
    let service = BusinessService::new(state.db.clone());
    let business = service.get(business_id).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to load business");
        AppError::internal("failed to load business")
    })?;

    business
        .map(Json)
        .ok_or_else(|| AppError::not_found("business not found"))
}

async fn load_owned_business(
    state: &AppState,
    business_id: Uuid,
    actor_id: Uuid,
) -> Result<Business, AppError> {
    let service = BusinessService::new(state.db.clone());
    let business = service
        .get(business_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to load business");
            AppError::internal("failed to load business")
        })?
        .ok_or_else(|| AppError::not_found("business not found"))?;

    if business.owner_id != actor_id {
        return Err(AppError::forbidden("not the business owner"));
    }
    Ok(business)
}

// ---------------------------------------------------------------------------
// Edit submission & pending edits
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct SubmitEditsRequest {
    pub changes: serde_json::Map<String, Value>,
    #[serde(default)]
    pub current_values: serde_json::Map<String, Value>,
}

pub async fn submit_edits(
    State(state): State<AppState>,
    ActorId(actor_id): ActorId,
    Path(business_id): Path<Uuid>,
    Json(payload): Json<SubmitEditsRequest>,
) -> Result<Json<SubmissionOutcome>, AppError> {
    if payload.changes.is_empty() {
        return Err(AppError::bad_request("changes must not be empty"));
    }

    // Unknown fields are rejected outright rather than falling through to
    // the instant path.
    let mut changes = Vec::with_capacity(payload.changes.len());
    for (name, value) in &payload.changes {
        if let FieldKind::Unknown = FieldKind::classify(name) {
            return Err(AppError::bad_request(format!("unknown field: {}", name)));
        }
        let field = BusinessField::parse(name)
            .ok_or_else(|| AppError::bad_request(format!("unknown field: {}", name)))?;
        if value.is_null() {
            return Err(AppError::bad_request(format!(
                "field {} must not be null",
                name
            )));
        }
        if !field.accepts(value) {
            return Err(AppError::bad_request(format!(
                "invalid value for field {}",
                name
            )));
        }
        changes.push((field, value.clone()));
    }

    let mut current_values = HashMap::new();
    for (name, value) in &payload.current_values {
        if let Some(field) = BusinessField::parse(name) {
            current_values.insert(field, value.clone());
        }
    }

    load_owned_business(&state, business_id, actor_id).await?;

    let service = EditService::new(state.db.clone());
    let outcome = service
        .submit(business_id, actor_id, changes, &current_values)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, business_id = %business_id, "failed to submit edits");
            AppError::internal("failed to submit edits")
        })?
        .ok_or_else(|| AppError::not_found("business not found"))?;

    Ok(Json(outcome))
}

pub async fn get_pending_edit(
    State(state): State<AppState>,
    ActorId(actor_id): ActorId,
    Path(business_id): Path<Uuid>,
) -> Result<Json<PendingEdit>, AppError> {
    load_owned_business(&state, business_id, actor_id).await?;

    let service = EditService::new(state.db.clone());
    let pending = service.get_pending(business_id).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to load pending edit");
        AppError::internal("failed to load pending edit")
    })?;

    pending
        .map(Json)
        .ok_or_else(|| AppError::not_found("no pending edit"))
}

pub async fn list_business_activity(
    State(state): State<AppState>,
    ActorId(actor_id): ActorId,
    Path(business_id): Path<Uuid>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<ActivityLogEntry>>, AppError> {
    load_owned_business(&state, business_id, actor_id).await?;

    let cursor = parse_cursor(query.cursor)?;
    let limit = effective_limit(query.limit);

    let service = ActivityLogService::new(state.db.clone());
    let items = service
        .list_for_business(business_id, cursor, limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to list activity");
            AppError::internal("failed to list activity")
        })?;

    let next_cursor = if items.len() as i64 == limit {
        encode_cursor(items.last().map(|entry| (entry.created_at, entry.id)))
    } else {
        None
    };

    Ok(Json(ListResponse { items, next_cursor }))
}

// ---------------------------------------------------------------------------
// Messaging
// ---------------------------------------------------------------------------

pub async fn open_conversation(
    State(state): State<AppState>,
    ActorId(actor_id): ActorId,
    Path(business_id): Path<Uuid>,
) -> Result<Json<Conversation>, AppError> {
    let service = MessageService::new(state.db.clone(), state.spam.clone());
    let conversation = service
        .open_conversation(business_id, actor_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to open conversation");
            AppError::internal("failed to open conversation")
        })?;

    conversation
        .map(Json)
        .ok_or_else(|| AppError::not_found("business not found"))
}

async fn authorize_conversation(
    state: &AppState,
    conversation_id: Uuid,
    actor_id: Uuid,
) -> Result<Conversation, AppError> {
    let service = MessageService::new(state.db.clone(), state.spam.clone());
    let conversation = service
        .get_conversation(conversation_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to load conversation");
            AppError::internal("failed to load conversation")
        })?
        .ok_or_else(|| AppError::not_found("conversation not found"))?;

    if conversation.customer_id == actor_id {
        return Ok(conversation);
    }

    let businesses = BusinessService::new(state.db.clone());
    let business = businesses
        .get(conversation.business_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to load business");
            AppError::internal("failed to load business")
        })?
        .ok_or_else(|| AppError::not_found("business not found"))?;

    if business.owner_id != actor_id {
        return Err(AppError::forbidden("not a conversation participant"));
    }
    Ok(conversation)
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Serialize)]
pub struct SendMessageResponse {
    pub message: Message,
    pub spam: SpamCheckResult,
}

pub async fn send_message(
    State(state): State<AppState>,
    ActorId(actor_id): ActorId,
    Path(conversation_id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, AppError> {
    if payload.content.trim().is_empty() {
        return Err(AppError::bad_request("content is required"));
    }
    if payload.content.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(AppError::bad_request("message is too long"));
    }

    authorize_conversation(&state, conversation_id, actor_id).await?;

    let service = MessageService::new(state.db.clone(), state.spam.clone());
    let outcome = service
        .send(conversation_id, actor_id, payload.content)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to send message");
            AppError::internal("failed to send message")
        })?
        .ok_or_else(|| AppError::not_found("conversation not found"))?;

    match outcome {
        SendOutcome::Sent { message, spam } => Ok(Json(SendMessageResponse { message, spam })),
        SendOutcome::RateLimited(verdict) => {
            let reason = verdict
                .reason
                .unwrap_or_else(|| "rate limit exceeded".to_string());
            Err(AppError::rate_limited(reason, verdict.retry_after_seconds))
        }
    }
}

pub async fn list_messages(
    State(state): State<AppState>,
    ActorId(actor_id): ActorId,
    Path(conversation_id): Path<Uuid>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<Message>>, AppError> {
    authorize_conversation(&state, conversation_id, actor_id).await?;

    let cursor = parse_cursor(query.cursor)?;
    let limit = effective_limit(query.limit);

    let service = MessageService::new(state.db.clone(), state.spam.clone());
    let items = service
        .list(conversation_id, cursor, limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to list messages");
            AppError::internal("failed to list messages")
        })?;

    let next_cursor = if items.len() as i64 == limit {
        encode_cursor(items.last().map(|message| (message.created_at, message.id)))
    } else {
        None
    };

    Ok(Json(ListResponse { items, next_cursor }))
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

pub async fn list_notifications(
    State(state): State<AppState>,
    ActorId(actor_id): ActorId,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<Notification>>, AppError> {
    let cursor = parse_cursor(query.cursor)?;
    let limit = effective_limit(query.limit);

    let service = NotificationService::new(state.db.clone());
    let items = service.list(actor_id, cursor, limit).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to list notifications");
        AppError::internal("failed to list notifications")
    })?;

    let next_cursor = if items.len() as i64 == limit {
        encode_cursor(items.last().map(|n| (n.created_at, n.id)))
    } else {
        None
    };

    Ok(Json(ListResponse { items, next_cursor }))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    ActorId(actor_id): ActorId,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let service = NotificationService::new(state.db.clone());
    let updated = service
        .mark_read(notification_id, actor_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to mark notification read");
            AppError::internal("failed to mark notification read")
        })?;

    if updated {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("notification not found"))
    }
}

// ---------------------------------------------------------------------------
// Admin: pending edits & resolutions
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct AdminListQuery {
    pub limit: Option<i64>,
}

pub async fn admin_list_pending_edits(
    State(state): State<AppState>,
    _admin: AdminToken,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<Vec<PendingEdit>>, AppError> {
    let service = EditService::new(state.db.clone());
    let pending = service
        .list_pending(effective_limit(query.limit))
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to list pending edits");
            AppError::internal("failed to list pending edits")
        })?;
    Ok(Json(pending))
}

pub async fn admin_get_pending_edit(
    State(state): State<AppState>,
    _admin: AdminToken,
    Path(business_id): Path<Uuid>,
) -> Result<Json<PendingEdit>, AppError> {
    let service = EditService::new(state.db.clone());
    let pending = service.get_pending(business_id).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to load pending edit");
        AppError::internal("failed to load pending edit")
    })?;

    pending
        .map(Json)
        .ok_or_else(|| AppError::not_found("no pending edit"))
}

pub async fn admin_approve_edits(
    State(state): State<AppState>,
    _admin: AdminToken,
    ActorId(admin_id): ActorId,
    Path(business_id): Path<Uuid>,
) -> Result<Json<ResolutionSummary>, AppError> {
    let service = EditService::new(state.db.clone());
    let summary = service
        .approve_all(business_id, admin_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, business_id = %business_id, "failed to approve edits");
            AppError::internal("failed to approve edits")
        })?
        .ok_or_else(|| AppError::not_found("no pending edit"))?;

    Ok(Json(summary))
}

#[derive(Deserialize)]
pub struct RejectEditsRequest {
    pub reason: String,
}

pub async fn admin_reject_edits(
    State(state): State<AppState>,
    _admin: AdminToken,
    ActorId(admin_id): ActorId,
    Path(business_id): Path<Uuid>,
    Json(payload): Json<RejectEditsRequest>,
) -> Result<Json<ResolutionSummary>, AppError> {
    if payload.reason.trim().is_empty() {
        return Err(AppError::bad_request("reason is required"));
    }

    let service = EditService::new(state.db.clone());
    let summary = service
        .reject_all(business_id, admin_id, payload.reason)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, business_id = %business_id, "failed to reject edits");
            AppError::internal("failed to reject edits")
        })?
        .ok_or_else(|| AppError::not_found("no pending edit"))?;

    Ok(Json(summary))
}

#[derive(Deserialize)]
pub struct FieldDecisionRequest {
    pub field: String,
    pub approved: bool,
}

#[derive(Deserialize)]
pub struct ResolveEditsRequest {
    pub decisions: Vec<FieldDecisionRequest>,
    pub reason: Option<String>,
}

pub async fn admin_resolve_edits(
    State(state): State<AppState>,
    _admin: AdminToken,
    ActorId(admin_id): ActorId,
    Path(business_id): Path<Uuid>,
    Json(payload): Json<ResolveEditsRequest>,
) -> Result<Json<ResolutionSummary>, AppError> {
    if payload.decisions.is_empty() {
        return Err(AppError::bad_request("decisions must not be empty"));
    }

    let mut decisions = Vec::with_capacity(payload.decisions.len());
    for decision in &payload.decisions {
        let field = BusinessField::parse(&decision.field).ok_or_else(|| {
            AppError::bad_request(format!("unknown field: {}", decision.field))
        })?;
        if field.kind() != FieldKind::Sensitive {
            return Err(AppError::bad_request(format!(
                "field {} is not subject to review",
                decision.field
            )));
        }
        decisions.push(FieldDecision {
            field,
            approved: decision.approved,
        });
    }

    let service = EditService::new(state.db.clone());
    let summary = service
        .resolve_partial(business_id, admin_id, &decisions, payload.reason)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, business_id = %business_id, "failed to resolve edits");
            AppError::internal("failed to resolve edits")
        })?
        .ok_or_else(|| AppError::not_found("no pending edit"))?;

    Ok(Json(summary))
}

// ---------------------------------------------------------------------------
// Admin: registration review
// ---------------------------------------------------------------------------

pub async fn admin_approve_business(
    State(state): State<AppState>,
    _admin: AdminToken,
    ActorId(admin_id): ActorId,
    Path(business_id): Path<Uuid>,
) -> Result<Json<Business>, AppError> {
    let service = BusinessService::new(state.db.clone());
    let business = service
        .approve_registration(business_id, admin_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to approve registration");
            AppError::internal("failed to approve registration")
        })?
        .ok_or_else(|| AppError::not_found("no pending registration"))?;

    Ok(Json(business))
}

#[derive(Deserialize)]
pub struct RejectBusinessRequest {
    pub reason: String,
}

pub async fn admin_reject_business(
    State(state): State<AppState>,
    _admin: AdminToken,
    ActorId(admin_id): ActorId,
    Path(business_id): Path<Uuid>,
    Json(payload): Json<RejectBusinessRequest>,
) -> Result<Json<Business>, AppError> {
    if payload.reason.trim().is_empty() {
        return Err(AppError::bad_request("reason is required"));
    }

    let service = BusinessService::new(state.db.clone());
    let business = service
        .reject_registration(business_id, admin_id, payload.reason)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to reject registration");
            AppError::internal("failed to reject registration")
        })?
        .ok_or_else(|| AppError::not_found("no pending registration"))?;

    Ok(Json(business))
}

// ---------------------------------------------------------------------------
// Admin: activity log
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct AdminActivityQuery {
    pub business_id: Option<Uuid>,
    pub action_type: Option<String>,
    pub actor_type: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

pub async fn admin_list_activity(
    State(state): State<AppState>,
    _admin: AdminToken,
    Query(query): Query<AdminActivityQuery>,
) -> Result<Json<ListResponse<ActivityLogEntry>>, AppError> {
    let action_type = query
        .action_type
        .as_deref()
        .map(|value| {
            ActionType::from_db(value)
                .ok_or_else(|| AppError::bad_request(format!("unknown action_type: {}", value)))
        })
        .transpose()?;
    let actor_type = query
        .actor_type
        .as_deref()
        .map(|value| {
            ActorType::from_db(value)
                .ok_or_else(|| AppError::bad_request(format!("unknown actor_type: {}", value)))
        })
        .transpose()?;
    let from = query
        .from
        .as_deref()
        .map(|value| {
            OffsetDateTime::parse(value, &Rfc3339)
                .map_err(|_| AppError::bad_request("invalid from timestamp"))
        })
        .transpose()?;
    let to = query
        .to
        .as_deref()
        .map(|value| {
            OffsetDateTime::parse(value, &Rfc3339)
                .map_err(|_| AppError::bad_request("invalid to timestamp"))
        })
        .transpose()?;

    let filter = ActivityFilter {
        business_id: query.business_id,
        action_type,
        actor_type,
        from,
        to,
        search: query.search,
    };
    let cursor = parse_cursor(query.cursor)?;
    let limit = effective_limit(query.limit);

    let service = ActivityLogService::new(state.db.clone());
    let items = service
        .list_admin(&filter, cursor, limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to query activity log");
            AppError::internal("failed to query activity log")
        })?;

    let next_cursor = if items.len() as i64 == limit {
        encode_cursor(items.last().map(|entry| (entry.created_at, entry.id)))
    } else {
        None
    };

    Ok(Json(ListResponse { items, next_cursor }))
}

// ---------------------------------------------------------------------------
// Admin: spam configuration
// ---------------------------------------------------------------------------

pub async fn admin_list_spam_keywords(
    State(state): State<AppState>,
    _admin: AdminToken,
) -> Result<Json<Vec<SpamKeyword>>, AppError> {
    let keywords = state.spam.list_keywords().await.map_err(|err| {
        tracing::error!(error = ?err, "failed to list spam keywords");
        AppError::internal("failed to list spam keywords")
    })?;
    Ok(Json(keywords))
}

#[derive(Deserialize)]
pub struct AddKeywordRequest {
    pub keyword: String,
    pub severity: Severity,
}

pub async fn admin_add_spam_keyword(
    State(state): State<AppState>,
    _admin: AdminToken,
    Json(payload): Json<AddKeywordRequest>,
) -> Result<Json<SpamKeyword>, AppError> {
    if payload.keyword.trim().is_empty() {
        return Err(AppError::bad_request("keyword is required"));
    }

    let keyword = state
        .spam
        .add_keyword(payload.keyword, payload.severity)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to add spam keyword");
            AppError::internal("failed to add spam keyword")
        })?;
    Ok(Json(keyword))
}

pub async fn admin_deactivate_spam_keyword(
    State(state): State<AppState>,
    _admin: AdminToken,
    Path(keyword_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deactivated = state
        .spam
        .deactivate_keyword(keyword_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to deactivate spam keyword");
            AppError::internal("failed to deactivate spam keyword")
        })?;

    if deactivated {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("keyword not found"))
    }
}

pub async fn admin_list_spam_patterns(
    State(state): State<AppState>,
    _admin: AdminToken,
) -> Result<Json<Vec<SpamPattern>>, AppError> {
    let patterns = state.spam.list_patterns().await.map_err(|err| {
        tracing::error!(error = ?err, "failed to list spam patterns");
        AppError::internal("failed to list spam patterns")
    })?;
    Ok(Json(patterns))
}

#[derive(Deserialize)]
pub struct AddPatternRequest {
    pub name: String,
    pub pattern: String,
    pub severity: Severity,
}

pub async fn admin_add_spam_pattern(
    State(state): State<AppState>,
    _admin: AdminToken,
    Json(payload): Json<AddPatternRequest>,
) -> Result<Json<SpamPattern>, AppError> {
    if payload.name.trim().is_empty() || payload.pattern.trim().is_empty() {
        return Err(AppError::bad_request("name and pattern are required"));
    }

    let pattern = state
        .spam
        .add_pattern(payload.name, payload.pattern, payload.severity)
        .await
        .map_err(|err| {
            tracing::warn!(error = ?err, "failed to add spam pattern");
            AppError::bad_request("invalid spam pattern")
        })?;
    Ok(Json(pattern))
}

pub async fn admin_deactivate_spam_pattern(
    State(state): State<AppState>,
    _admin: AdminToken,
    Path(pattern_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deactivated = state
        .spam
        .deactivate_pattern(pattern_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to deactivate spam pattern");
            AppError::internal("failed to deactivate spam pattern")
        })?;

    if deactivated {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("pattern not found"))
    }
}

pub async fn admin_refresh_spam_config(
    State(state): State<AppState>,
    _admin: AdminToken,
) -> StatusCode {
    state.spam.invalidate_config();
    StatusCode::NO_CONTENT
}
