use axum::{routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn businesses() -> Router<AppState> {
    Router::new()
        .route("/v1/businesses", post(handlers::create_business))
        .route("/v1/businesses/:id", get(handlers::get_business))
        .route("/v1/businesses/:id/edits", post(handlers::submit_edits))
        .route(
            "/v1/businesses/:id/pending-edits",
            get(handlers::get_pending_edit),
        )
        .route(
            "/v1/businesses/:id/activity",
            get(handlers::list_business_activity),
        )
}

pub fn messaging() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/businesses/:id/conversations",
            post(handlers::open_conversation),
        )
        .route(
            "/v1/conversations/:id/messages",
            post(handlers::send_message),
        )
        .route(
            "/v1/conversations/:id/messages",
            get(handlers::list_messages),
        )
}

pub fn notifications() -> Router<AppState> {
    Router::new()
        .route("/v1/notifications", get(handlers::list_notifications))
        .route(
            "/v1/notifications/:id/read",
            post(handlers::mark_notification_read),
        )
}

pub fn admin() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/admin/pending-edits",
            get(handlers::admin_list_pending_edits),
        )
        .route(
            "/v1/admin/pending-edits/:business_id",
            get(handlers::admin_get_pending_edit),
        )
        .route(
            "/v1/admin/businesses/:id/edits/approve",
            post(handlers::admin_approve_edits),
        )
        .route(
            "/v1/admin/businesses/:id/edits/reject",
            post(handlers::admin_reject_edits),
        )
        .route(
            "/v1/admin/businesses/:id/edits/resolve",
            post(handlers::admin_resolve_edits),
        )
        .route(
            "/v1/admin/businesses/:id/approve",
            post(handlers::admin_approve_business),
        )
        .route(
            "/v1/admin/businesses/:id/reject",
            post(handlers::admin_reject_business),
        )
        .route("/v1/admin/activity", get(handlers::admin_list_activity))
        .route(
            "/v1/admin/spam/keywords",
            get(handlers::admin_list_spam_keywords).post(handlers::admin_add_spam_keyword),
        )
        .route(
            "/v1/admin/spam/keywords/:id/deactivate",
            post(handlers::admin_deactivate_spam_keyword),
        )
        .route(
            "/v1/admin/spam/patterns",
            get(handlers::admin_list_spam_patterns).post(handlers::admin_add_spam_pattern),
        )
        .route(
            "/v1/admin/spam/patterns/:id/deactivate",
            post(handlers::admin_deactivate_spam_pattern),
        )
        .route(
            "/v1/admin/spam/refresh",
            post(handlers::admin_refresh_spam_config),
        )
}
