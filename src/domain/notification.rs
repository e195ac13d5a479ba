use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub payload: Value,
    #[serde(with = "time::serde::rfc3339::option")]
    pub read_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// What a notification is about. Owner-facing only for now: the outcome of
/// an edit resolution or of a registration review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    EditDecision,
    RegistrationDecision,
}

impl NotificationType {
    pub fn as_db(&self) -> &'static str {
        match self {
            NotificationType::EditDecision => "edit_decision",
            NotificationType::RegistrationDecision => "registration_decision",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "edit_decision" => Some(NotificationType::EditDecision),
            "registration_decision" => Some(NotificationType::RegistrationDecision),
            _ => None,
        }
    }
}
