use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_db(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            _ => None,
        }
    }
}

/// Outcome of classifying one message. Computed fresh per message and only
/// persisted (onto the message row) when the message is flagged.
#[derive(Debug, Clone, Serialize)]
pub struct SpamCheckResult {
    pub is_spam: bool,
    pub reason: Option<String>,
    pub severity: Option<Severity>,
    pub score: f64,
}

impl SpamCheckResult {
    pub fn clean() -> Self {
        Self {
            is_spam: false,
            reason: None,
            severity: None,
            score: 0.0,
        }
    }

    pub fn flagged(reason: impl Into<String>, severity: Severity, score: f64) -> Self {
        Self {
            is_spam: true,
            reason: Some(reason.into()),
            severity: Some(severity),
            score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitViolation {
    Global,
    Conversation,
}

/// Pre-flight throttle verdict. Best effort only: two concurrent sends can
/// both pass before either is counted.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub reason: Option<String>,
    pub retry_after_seconds: Option<u64>,
    pub violation: Option<RateLimitViolation>,
}

impl RateLimitResult {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
            retry_after_seconds: None,
            violation: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SpamKeyword {
    pub id: Uuid,
    pub keyword: String,
    pub severity: Severity,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpamPattern {
    pub id: Uuid,
    pub name: String,
    pub pattern: String,
    pub severity: Severity,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
