use anyhow::Result;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::activity::{ActionType, ActivityLogEntry, ActorType};
use crate::infra::db::Db;

/// Append one audit entry. Callers hold the transaction so the entry commits
/// or rolls back together with the mutation it records.
pub(crate) async fn insert_entry(
    conn: &mut PgConnection,
    business_id: Uuid,
    action_type: ActionType,
    actor_id: Option<Uuid>,
    actor_type: ActorType,
    field_changes: &Value,
    metadata: &Value,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO business_activity_log \
         (business_id, action_type, actor_id, actor_type, field_changes, metadata) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(business_id)
    .bind(action_type.as_db())
    .bind(actor_id)
    .bind(actor_type.as_db())
    .bind(field_changes)
    .bind(metadata)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Optional filters for the admin-wide audit query. All default to "no
/// constraint"; `search` matches the business name case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub business_id: Option<Uuid>,
    pub action_type: Option<ActionType>,
    pub actor_type: Option<ActorType>,
    pub from: Option<OffsetDateTime>,
    pub to: Option<OffsetDateTime>,
    pub search: Option<String>,
}

#[derive(Clone)]
pub struct ActivityLogService {
    db: Db,
}

impl ActivityLogService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Owner view: one business, newest first.
    pub async fn list_for_business(
        &self,
        business_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<ActivityLogEntry>> {
        let rows = match cursor {
            Some((created_at, entry_id)) => {
                sqlx::query(
                    "SELECT id, business_id, action_type, actor_id, actor_type, \
                            field_changes, metadata, created_at \
                     FROM business_activity_log \
                     WHERE business_id = $1 \
                       AND (created_at < $2 OR (created_at = $2 AND id < $3)) \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $4",
                )
                .bind(business_id)
                .bind(created_at)
                .bind(entry_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, business_id, action_type, actor_id, actor_type, \
                            field_changes, metadata, created_at \
                     FROM business_activity_log \
                     WHERE business_id = $1 \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $2",
                )
                .bind(business_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        rows.iter().map(entry_from_row).collect()
    }

    /// Admin view: the whole log, filterable and cursor-paginated.
    pub async fn list_admin(
        &self,
        filter: &ActivityFilter,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<ActivityLogEntry>> {
        let action_type = filter.action_type.map(|a| a.as_db());
        let actor_type = filter.actor_type.map(|a| a.as_db());

        let rows = match cursor {
            Some((created_at, entry_id)) => {
                sqlx::query(
                    "SELECT a.id, a.business_id, a.action_type, a.actor_id, a.actor_type, \
                            a.field_changes, a.metadata, a.created_at \
                     FROM business_activity_log a \
                     JOIN businesses b ON b.id = a.business_id \
                     WHERE ($1::uuid IS NULL OR a.business_id = $1) \
                       AND ($2::text IS NULL OR a.action_type = $2) \
                       AND ($3::text IS NULL OR a.actor_type = $3) \
                       AND ($4::timestamptz IS NULL OR a.created_at >= $4) \
                       AND ($5::timestamptz IS NULL OR a.created_at <= $5) \
                       AND ($6::text IS NULL OR b.name ILIKE '%' || $6 || '%') \
                       AND (a.created_at < $7 OR (a.created_at = $7 AND a.id < $8)) \
                     ORDER BY a.created_at DESC, a.id DESC \
                     LIMIT $9",
                )
                .bind(filter.business_id)
                .bind(action_type)
                .bind(actor_type)
                .bind(filter.from)
                .bind(filter.to)
                .bind(filter.search.as_deref())
                .bind(created_at)
                .bind(entry_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT a.id, a.business_id, a.action_type, a.actor_id, a.actor_type, \
                            a.field_changes, a.metadata, a.created_at \
                     FROM business_activity_log a \
                     JOIN businesses b ON b.id = a.business_id \
                     WHERE ($1::uuid IS NULL OR a.business_id = $1) \
                       AND ($2::text IS NULL OR a.action_type = $2) \
                       AND ($3::text IS NULL OR a.actor_type = $3) \
                       AND ($4::timestamptz IS NULL OR a.created_at >= $4) \
                       AND ($5::timestamptz IS NULL OR a.created_at <= $5) \
                       AND ($6::text IS NULL OR b.name ILIKE '%' || $6 || '%') \
                     ORDER BY a.created_at DESC, a.id DESC \
                     LIMIT $7",
                )
                .bind(filter.business_id)
                .bind(action_type)
                .bind(actor_type)
                .bind(filter.from)
                .bind(filter.to)
                .bind(filter.search.as_deref())
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        rows.iter().map(entry_from_row).collect()
    }
}

fn entry_from_row(row: &PgRow) -> Result<ActivityLogEntry> {
    let action_type: String = row.get("action_type");
    let action_type = ActionType::from_db(&action_type)
        .ok_or_else(|| anyhow::anyhow!("unknown action type: {}", action_type))?;
    let actor_type: String = row.get("actor_type");
    let actor_type = ActorType::from_db(&actor_type)
        .ok_or_else(|| anyhow::anyhow!("unknown actor type: {}", actor_type))?;

    Ok(ActivityLogEntry {
        id: row.get("id"),
        business_id: row.get("business_id"),
        action_type,
        actor_id: row.get("actor_id"),
        actor_type,
        field_changes: row.get("field_changes"),
        metadata: row.get("metadata"),
        created_at: row.get("created_at"),
    })
}
