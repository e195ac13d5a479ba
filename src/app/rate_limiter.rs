use anyhow::Result;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::config::message_limits::MessageLimits;
use crate::domain::spam::{RateLimitResult, RateLimitViolation};
use crate::infra::db::Db;

const GLOBAL_LIMIT_REASON: &str =
    "You are sending messages too quickly. Please wait a moment before sending more.";
const CONVERSATION_LIMIT_REASON: &str =
    "Too many messages in this conversation. Please slow down.";

/// Pre-flight throttle over persisted message history. Two sliding windows,
/// both anchored to now minus the window length: the sender's total volume
/// first, then their volume in the one conversation.
#[derive(Clone)]
pub struct MessageRateLimiter {
    db: Db,
    limits: MessageLimits,
}

impl MessageRateLimiter {
    pub fn new(db: Db, limits: MessageLimits) -> Self {
        Self { db, limits }
    }

    /// Fails open: a throttle that cannot be evaluated never blocks a send.
    pub async fn check(&self, sender_id: Uuid, conversation_id: Uuid) -> RateLimitResult {
        match self.evaluate(sender_id, conversation_id).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(
                    error = ?err,
                    sender_id = %sender_id,
                    "rate limit check failed, allowing message"
                );
                RateLimitResult::allowed()
            }
        }
    }

    async fn evaluate(&self, sender_id: Uuid, conversation_id: Uuid) -> Result<RateLimitResult> {
        let window_start =
            OffsetDateTime::now_utc() - Duration::seconds(self.limits.window_seconds as i64);

        let global_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages WHERE sender_id = $1 AND created_at >= $2",
        )
        .bind(sender_id)
        .bind(window_start)
        .fetch_one(self.db.pool())
        .await?;

        if global_count >= self.limits.global_per_window {
            tracing::debug!(
                sender_id = %sender_id,
                count = global_count,
                limit = self.limits.global_per_window,
                "global message rate limit exceeded"
            );
            return Ok(self.blocked(RateLimitViolation::Global, GLOBAL_LIMIT_REASON));
        }

        let conversation_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages \
             WHERE sender_id = $1 AND conversation_id = $2 AND created_at >= $3",
        )
        .bind(sender_id)
        .bind(conversation_id)
        .bind(window_start)
        .fetch_one(self.db.pool())
        .await?;

        if conversation_count >= self.limits.per_conversation_per_window {
            tracing::debug!(
                sender_id = %sender_id,
                conversation_id = %conversation_id,
                count = conversation_count,
                limit = self.limits.per_conversation_per_window,
                "per-conversation message rate limit exceeded"
            );
            return Ok(self.blocked(
                RateLimitViolation::Conversation,
                CONVERSATION_LIMIT_REASON,
            ));
        }

        Ok(RateLimitResult::allowed())
    }

    fn blocked(&self, violation: RateLimitViolation, reason: &str) -> RateLimitResult {
        RateLimitResult {
            allowed: false,
            reason: Some(reason.to_string()),
            retry_after_seconds: Some(self.limits.window_seconds),
            violation: Some(violation),
        }
    }
}
