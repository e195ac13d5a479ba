use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::rate_limiter::MessageRateLimiter;
use crate::app::spam::SpamService;
use crate::config::message_limits::MessageLimits;
use crate::domain::message::{Conversation, Message};
use crate::domain::spam::{RateLimitResult, SpamCheckResult};
use crate::infra::db::Db;

pub enum SendOutcome {
    Sent {
        message: Message,
        spam: SpamCheckResult,
    },
    RateLimited(RateLimitResult),
}

#[derive(Clone)]
pub struct MessageService {
    db: Db,
    limiter: MessageRateLimiter,
    spam: SpamService,
}

impl MessageService {
    pub fn new(db: Db, spam: SpamService) -> Self {
        let limiter = MessageRateLimiter::new(db.clone(), MessageLimits::standard());
        Self { db, limiter, spam }
    }

    /// Open (or return the existing) conversation between a customer and a
    /// business. Returns None when the business does not exist.
    pub async fn open_conversation(
        &self,
        business_id: Uuid,
        customer_id: Uuid,
    ) -> Result<Option<Conversation>> {
        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM businesses WHERE id = $1")
            .bind(business_id)
            .fetch_optional(self.db.pool())
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        // The no-op DO UPDATE makes the insert return the existing row on
        // conflict, so opening is idempotent.
        let row = sqlx::query(
            "INSERT INTO conversations (business_id, customer_id) VALUES ($1, $2) \
             ON CONFLICT (business_id, customer_id) \
             DO UPDATE SET business_id = EXCLUDED.business_id \
             RETURNING id, business_id, customer_id, created_at",
        )
        .bind(business_id)
        .bind(customer_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(Some(Conversation {
            id: row.get("id"),
            business_id: row.get("business_id"),
            customer_id: row.get("customer_id"),
            created_at: row.get("created_at"),
        }))
    }

    pub async fn get_conversation(&self, conversation_id: Uuid) -> Result<Option<Conversation>> {
        let row = sqlx::query(
            "SELECT id, business_id, customer_id, created_at FROM conversations WHERE id = $1",
        )
        .bind(conversation_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| Conversation {
            id: row.get("id"),
            business_id: row.get("business_id"),
            customer_id: row.get("customer_id"),
            created_at: row.get("created_at"),
        }))
    }

    /// Guarded send: rate-limit pre-check, then spam classification, then
    /// insert. A flagged message is still persisted, with the verdict stored
    /// on the row. Returns None when the conversation does not exist.
    pub async fn send(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: String,
    ) -> Result<Option<SendOutcome>> {
        let exists: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM conversations WHERE id = $1")
                .bind(conversation_id)
                .fetch_optional(self.db.pool())
                .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let verdict = self.limiter.check(sender_id, conversation_id).await;
        if !verdict.allowed {
            return Ok(Some(SendOutcome::RateLimited(verdict)));
        }

        let spam = self.spam.check(&content, sender_id).await;

        let row = sqlx::query(
            "INSERT INTO messages \
             (conversation_id, sender_id, content, is_spam_flagged, spam_reason, spam_score, \
              spam_flagged_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, conversation_id, sender_id, content, is_spam_flagged, spam_reason, \
                       spam_score, spam_flagged_at, created_at",
        )
        .bind(conversation_id)
        .bind(sender_id)
        .bind(&content)
        .bind(spam.is_spam)
        .bind(spam.reason.as_deref())
        .bind(if spam.is_spam { Some(spam.score) } else { None })
        .bind(if spam.is_spam {
            Some(OffsetDateTime::now_utc())
        } else {
            None
        })
        .fetch_one(self.db.pool())
        .await?;

        let message = message_from_row(&row);
        Ok(Some(SendOutcome::Sent { message, spam }))
    }

    pub async fn list(
        &self,
        conversation_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<Message>> {
        let rows = match cursor {
            Some((created_at, message_id)) => {
                sqlx::query(
                    "SELECT id, conversation_id, sender_id, content, is_spam_flagged, \
                            spam_reason, spam_score, spam_flagged_at, created_at \
                     FROM messages \
                     WHERE conversation_id = $1 \
                       AND (created_at < $2 OR (created_at = $2 AND id < $3)) \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $4",
                )
                .bind(conversation_id)
                .bind(created_at)
                .bind(message_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, conversation_id, sender_id, content, is_spam_flagged, \
                            spam_reason, spam_score, spam_flagged_at, created_at \
                     FROM messages \
                     WHERE conversation_id = $1 \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $2",
                )
                .bind(conversation_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        Ok(rows.iter().map(message_from_row).collect())
    }
}

fn message_from_row(row: &PgRow) -> Message {
    Message {
        id: row.get("id"),
        conversation_id: row.get("conversation_id"),
        sender_id: row.get("sender_id"),
        content: row.get("content"),
        is_spam_flagged: row.get("is_spam_flagged"),
        spam_reason: row.get("spam_reason"),
        spam_score: row.get("spam_score"),
        spam_flagged_at: row.get("spam_flagged_at"),
        created_at: row.get("created_at"),
    }
}
