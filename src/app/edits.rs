use std::collections::HashMap;

use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Postgres, Row, Transaction};
use uuid::Uuid;

use crate::app::activity_log;
use crate::app::businesses::business_from_row;
use crate::app::notifications::NotificationService;
use crate::domain::activity::{ActionType, ActorType};
use crate::domain::business::{Business, BusinessField, FieldKind};
use crate::domain::edits::{FieldDecision, PendingEdit};
use crate::domain::notification::NotificationType;
use crate::infra::db::Db;

const PENDING_COLUMNS: &str =
    "business_id, submitted_by, name, address, city, state, postal_code, categories, \
     created_at, updated_at";

const BUSINESS_COLUMNS: &str =
    "id, owner_id, name, address, city, state, postal_code, categories, phone, email, \
     operating_hours, description, logo_url, cover_image_url, website_url, social_media, \
     status, has_pending_edits, created_at, updated_at";

/// What happened to a submission: which fields went live immediately and
/// which are now staged for admin review.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SubmissionOutcome {
    pub applied_fields: Vec<&'static str>,
    pub staged_fields: Vec<&'static str>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ResolutionSummary {
    pub action: ActionType,
    pub approved_fields: Vec<&'static str>,
    pub rejected_fields: Vec<&'static str>,
}

#[derive(Clone)]
pub struct EditService {
    db: Db,
    notifications: NotificationService,
}

impl EditService {
    pub fn new(db: Db) -> Self {
        let notifications = NotificationService::new(db.clone());
        Self { db, notifications }
    }

    /// Partition a change set and act on both halves in one transaction:
    /// instant fields land on the business row immediately, sensitive fields
    /// are staged (upsert keyed by business id) and flip `has_pending_edits`.
    ///
    /// `current_values` are the caller's view of the pre-change values; they
    /// only feed the audit diff of instant fields (old is null when absent).
    pub async fn submit(
        &self,
        business_id: Uuid,
        submitted_by: Uuid,
        changes: Vec<(BusinessField, Value)>,
        current_values: &HashMap<BusinessField, Value>,
    ) -> Result<Option<SubmissionOutcome>> {
        let exists: Option<Uuid> =
            sqlx::query_scalar("SELECT owner_id FROM businesses WHERE id = $1")
                .bind(business_id)
                .fetch_optional(self.db.pool())
                .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let mut instant = Vec::new();
        let mut sensitive = Vec::new();
        for (field, value) in changes {
            match field.kind() {
                FieldKind::Sensitive => sensitive.push((field, value)),
                FieldKind::Instant => instant.push((field, value)),
                FieldKind::Unknown => {
                    return Err(anyhow!("field {} is not classified", field.as_str()))
                }
            }
        }

        let mut tx = self.db.pool().begin().await?;

        if !instant.is_empty() {
            apply_fields(&mut tx, business_id, &instant, false).await?;
            for (field, value) in &instant {
                let old = current_values.get(field).cloned().unwrap_or(Value::Null);
                let diff = json!({ field.as_str(): { "old": old, "new": value } });
                activity_log::insert_entry(
                    &mut tx,
                    business_id,
                    ActionType::EditAutoApproved,
                    None,
                    ActorType::System,
                    &diff,
                    &json!({}),
                )
                .await?;
            }
        }

        if !sensitive.is_empty() {
            stage_sensitive(&mut tx, business_id, submitted_by, &sensitive).await?;

            sqlx::query("UPDATE businesses SET has_pending_edits = true WHERE id = $1")
                .bind(business_id)
                .execute(&mut *tx)
                .await?;

            // Values are deliberately not logged at submission time; only the
            // resolution entry carries old/new.
            let field_names: Vec<&str> = sensitive.iter().map(|(f, _)| f.as_str()).collect();
            activity_log::insert_entry(
                &mut tx,
                business_id,
                ActionType::EditSubmitted,
                Some(submitted_by),
                ActorType::Owner,
                &json!({}),
                &json!({ "fields": field_names }),
            )
            .await?;
        }

        tx.commit().await?;

        Ok(Some(SubmissionOutcome {
            applied_fields: instant.iter().map(|(f, _)| f.as_str()).collect(),
            staged_fields: sensitive.iter().map(|(f, _)| f.as_str()).collect(),
        }))
    }

    pub async fn get_pending(&self, business_id: Uuid) -> Result<Option<PendingEdit>> {
        let sql = format!(
            "SELECT {} FROM pending_business_edits WHERE business_id = $1",
            PENDING_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(business_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(pending_from_row))
    }

    /// Admin review queue, oldest submission first.
    pub async fn list_pending(&self, limit: i64) -> Result<Vec<PendingEdit>> {
        let sql = format!(
            "SELECT {} FROM pending_business_edits ORDER BY updated_at ASC LIMIT $1",
            PENDING_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(limit)
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows.iter().map(pending_from_row).collect())
    }

    /// Apply every staged field. Returns None when the business has no
    /// pending edit.
    pub async fn approve_all(
        &self,
        business_id: Uuid,
        admin_id: Uuid,
    ) -> Result<Option<ResolutionSummary>> {
        self.resolve(business_id, admin_id, |_| true, None).await
    }

    /// Discard every staged field; the business row keeps its current
    /// values. A reason is always recorded and forwarded to the owner.
    pub async fn reject_all(
        &self,
        business_id: Uuid,
        admin_id: Uuid,
        reason: String,
    ) -> Result<Option<ResolutionSummary>> {
        self.resolve(business_id, admin_id, |_| false, Some(reason))
            .await
    }

    /// Field-by-field verdicts. When every staged field ends up approved (or
    /// rejected) this degenerates into approve_all (or reject_all): same log
    /// action type, same notification. Staged fields without a decision are
    /// treated as rejected.
    pub async fn resolve_partial(
        &self,
        business_id: Uuid,
        admin_id: Uuid,
        decisions: &[FieldDecision],
        reason: Option<String>,
    ) -> Result<Option<ResolutionSummary>> {
        let approved: HashMap<BusinessField, bool> = decisions
            .iter()
            .map(|decision| (decision.field, decision.approved))
            .collect();
        self.resolve(
            business_id,
            admin_id,
            move |field| approved.get(&field).copied().unwrap_or(false),
            reason,
        )
        .await
    }

    async fn resolve<F>(
        &self,
        business_id: Uuid,
        admin_id: Uuid,
        decide: F,
        reason: Option<String>,
    ) -> Result<Option<ResolutionSummary>>
    where
        F: Fn(BusinessField) -> bool,
    {
        let mut tx = self.db.pool().begin().await?;

        let Some(pending) = load_pending(&mut tx, business_id).await? else {
            tx.rollback().await?;
            return Ok(None);
        };

        let staged = pending.staged_fields();
        if staged.is_empty() {
            // Nothing to decide; leave everything untouched.
            tx.rollback().await?;
            return Ok(Some(ResolutionSummary {
                action: ActionType::EditApproved,
                approved_fields: Vec::new(),
                rejected_fields: Vec::new(),
            }));
        }

        let (approved, rejected): (Vec<_>, Vec<_>) =
            staged.into_iter().partition(|(field, _)| decide(*field));

        // Pre-image, read before any mutation: the "old" side of the diff
        // must never come from a read-after-write.
        let business = load_business(&mut tx, business_id).await?;

        let action = if rejected.is_empty() {
            ActionType::EditApproved
        } else if approved.is_empty() {
            ActionType::EditRejected
        } else {
            ActionType::EditPartial
        };

        if approved.is_empty() {
            sqlx::query("UPDATE businesses SET has_pending_edits = false WHERE id = $1")
                .bind(business_id)
                .execute(&mut *tx)
                .await?;
        } else {
            apply_fields(&mut tx, business_id, &approved, true).await?;
        }

        sqlx::query("DELETE FROM pending_business_edits WHERE business_id = $1")
            .bind(business_id)
            .execute(&mut *tx)
            .await?;

        let mut diff = serde_json::Map::new();
        for (field, new_value) in &approved {
            diff.insert(
                field.as_str().to_string(),
                json!({ "old": business.field_value(*field), "new": new_value }),
            );
        }
        let approved_names: Vec<&'static str> = approved.iter().map(|(f, _)| f.as_str()).collect();
        let rejected_names: Vec<&'static str> = rejected.iter().map(|(f, _)| f.as_str()).collect();

        let metadata = match action {
            ActionType::EditRejected => json!({ "fields": rejected_names, "reason": &reason }),
            ActionType::EditPartial => {
                json!({ "rejected_fields": rejected_names, "reason": &reason })
            }
            _ => json!({}),
        };

        activity_log::insert_entry(
            &mut tx,
            business_id,
            action,
            Some(admin_id),
            ActorType::Admin,
            &Value::Object(diff),
            &metadata,
        )
        .await?;

        tx.commit().await?;

        let decision = match action {
            ActionType::EditApproved => "approved",
            ActionType::EditRejected => "rejected",
            _ => "partial",
        };
        self.notifications
            .dispatch_best_effort(
                business.owner_id,
                NotificationType::EditDecision,
                json!({
                    "business_id": business_id,
                    "decision": decision,
                    "approved_fields": approved_names,
                    "rejected_fields": rejected_names,
                    "reason": reason,
                }),
            )
            .await;

        Ok(Some(ResolutionSummary {
            action,
            approved_fields: approved_names,
            rejected_fields: rejected_names,
        }))
    }
}

/// Write a set of field values onto the business row. Column names come from
/// the closed BusinessField enum, never from caller input.
async fn apply_fields(
    tx: &mut Transaction<'_, Postgres>,
    business_id: Uuid,
    fields: &[(BusinessField, Value)],
    clear_pending_flag: bool,
) -> Result<()> {
    let mut assignments: Vec<String> = fields
        .iter()
        .enumerate()
        .map(|(index, (field, _))| format!("{} = ${}", field.column(), index + 2))
        .collect();
    assignments.push("updated_at = now()".to_string());
    if clear_pending_flag {
        assignments.push("has_pending_edits = false".to_string());
    }

    let sql = format!(
        "UPDATE businesses SET {} WHERE id = $1",
        assignments.join(", ")
    );
    let mut query = sqlx::query(&sql).bind(business_id);
    for (field, value) in fields {
        query = bind_field_value(query, *field, value)?;
    }
    query.execute(&mut **tx).await?;
    Ok(())
}

fn bind_field_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    field: BusinessField,
    value: &Value,
) -> Result<Query<'q, Postgres, PgArguments>> {
    match field {
        BusinessField::Categories => Ok(query.bind(categories_from_value(value)?)),
        BusinessField::OperatingHours | BusinessField::SocialMedia => {
            Ok(query.bind(value.clone()))
        }
        _ => {
            let text = value
                .as_str()
                .ok_or_else(|| anyhow!("{} expects a string value", field.as_str()))?;
            Ok(query.bind(text.to_owned()))
        }
    }
}

fn categories_from_value(value: &Value) -> Result<Vec<String>> {
    value
        .as_array()
        .ok_or_else(|| anyhow!("categories expects an array of strings"))?
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_owned)
                .ok_or_else(|| anyhow!("categories expects an array of strings"))
        })
        .collect()
}

/// Upsert the staged values. Fields present in this submission overwrite
/// earlier staged values; fields absent keep whatever was staged before.
async fn stage_sensitive(
    tx: &mut Transaction<'_, Postgres>,
    business_id: Uuid,
    submitted_by: Uuid,
    fields: &[(BusinessField, Value)],
) -> Result<()> {
    let mut name = None;
    let mut address = None;
    let mut city = None;
    let mut state = None;
    let mut postal_code = None;
    let mut categories = None;
    for (field, value) in fields {
        match field {
            BusinessField::Name => name = Some(text_value(*field, value)?),
            BusinessField::Address => address = Some(text_value(*field, value)?),
            BusinessField::City => city = Some(text_value(*field, value)?),
            BusinessField::State => state = Some(text_value(*field, value)?),
            BusinessField::PostalCode => postal_code = Some(text_value(*field, value)?),
            BusinessField::Categories => categories = Some(categories_from_value(value)?),
            other => return Err(anyhow!("{} is not a sensitive field", other.as_str())),
        }
    }

    sqlx::query(
        "INSERT INTO pending_business_edits \
         (business_id, submitted_by, name, address, city, state, postal_code, categories) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (business_id) DO UPDATE SET \
            submitted_by = EXCLUDED.submitted_by, \
            name = COALESCE(EXCLUDED.name, pending_business_edits.name), \
            address = COALESCE(EXCLUDED.address, pending_business_edits.address), \
            city = COALESCE(EXCLUDED.city, pending_business_edits.city), \
            state = COALESCE(EXCLUDED.state, pending_business_edits.state), \
            postal_code = COALESCE(EXCLUDED.postal_code, pending_business_edits.postal_code), \
            categories = COALESCE(EXCLUDED.categories, pending_business_edits.categories), \
            updated_at = now()",
    )
    .bind(business_id)
    .bind(submitted_by)
    .bind(name)
    .bind(address)
    .bind(city)
    .bind(state)
    .bind(postal_code)
    .bind(categories)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn text_value(field: BusinessField, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| anyhow!("{} expects a string value", field.as_str()))
}

async fn load_pending(
    tx: &mut Transaction<'_, Postgres>,
    business_id: Uuid,
) -> Result<Option<PendingEdit>> {
    let sql = format!(
        "SELECT {} FROM pending_business_edits WHERE business_id = $1",
        PENDING_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(business_id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.as_ref().map(pending_from_row))
}

async fn load_business(
    tx: &mut Transaction<'_, Postgres>,
    business_id: Uuid,
) -> Result<Business> {
    let sql = format!("SELECT {} FROM businesses WHERE id = $1", BUSINESS_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(business_id)
        .fetch_one(&mut **tx)
        .await?;
    business_from_row(&row)
}

fn pending_from_row(row: &PgRow) -> PendingEdit {
    PendingEdit {
        business_id: row.get("business_id"),
        submitted_by: row.get("submitted_by"),
        name: row.get("name"),
        address: row.get("address"),
        city: row.get("city"),
        state: row.get("state"),
        postal_code: row.get("postal_code"),
        categories: row.get("categories"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
