use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

/// One audit record. Rows are insert-only; nothing in the application
/// updates or deletes them.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityLogEntry {
    pub id: Uuid,
    pub business_id: Uuid,
    pub action_type: ActionType,
    pub actor_id: Option<Uuid>,
    pub actor_type: ActorType,
    pub field_changes: Value,
    pub metadata: Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    BusinessRegistered,
    BusinessApproved,
    BusinessRejected,
    EditSubmitted,
    EditApproved,
    EditRejected,
    EditPartial,
    EditAutoApproved,
}

impl ActionType {
    pub fn as_db(&self) -> &'static str {
        match self {
            ActionType::BusinessRegistered => "business_registered",
            ActionType::BusinessApproved => "business_approved",
            ActionType::BusinessRejected => "business_rejected",
            ActionType::EditSubmitted => "edit_submitted",
            ActionType::EditApproved => "edit_approved",
            ActionType::EditRejected => "edit_rejected",
            ActionType::EditPartial => "edit_partial",
            ActionType::EditAutoApproved => "edit_auto_approved",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "business_registered" => Some(ActionType::BusinessRegistered),
            "business_approved" => Some(ActionType::BusinessApproved),
            "business_rejected" => Some(ActionType::BusinessRejected),
            "edit_submitted" => Some(ActionType::EditSubmitted),
            "edit_approved" => Some(ActionType::EditApproved),
            "edit_rejected" => Some(ActionType::EditRejected),
            "edit_partial" => Some(ActionType::EditPartial),
            "edit_auto_approved" => Some(ActionType::EditAutoApproved),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    Owner,
    Admin,
    System,
}

impl ActorType {
    pub fn as_db(&self) -> &'static str {
        match self {
            ActorType::Owner => "owner",
            ActorType::Admin => "admin",
            ActorType::System => "system",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "owner" => Some(ActorType::Owner),
            "admin" => Some(ActorType::Admin),
            "system" => Some(ActorType::System),
            _ => None,
        }
    }
}
