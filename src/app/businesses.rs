use anyhow::Result;
use serde_json::json;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::app::activity_log;
use crate::app::notifications::NotificationService;
use crate::domain::activity::{ActionType, ActorType};
use crate::domain::business::{Business, BusinessStatus};
use crate::domain::notification::NotificationType;
use crate::infra::db::Db;

const BUSINESS_COLUMNS: &str =
    "id, owner_id, name, address, city, state, postal_code, categories, phone, email, \
     operating_hours, description, logo_url, cover_image_url, website_url, social_media, \
     status, has_pending_edits, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct RegisterBusiness {
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub categories: Vec<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub description: Option<String>,
    pub website_url: Option<String>,
}

#[derive(Clone)]
pub struct BusinessService {
    db: Db,
    notifications: NotificationService,
}

impl BusinessService {
    pub fn new(db: Db) -> Self {
        let notifications = NotificationService::new(db.clone());
        Self { db, notifications }
    }

    /// New businesses start in `pending` and stay invisible to the directory
    /// until an admin approves the registration.
    pub async fn register(&self, owner_id: Uuid, details: RegisterBusiness) -> Result<Business> {
        let mut tx = self.db.pool().begin().await?;

        let sql = format!(
            "INSERT INTO businesses \
             (owner_id, name, address, city, state, postal_code, categories, phone, email, \
              description, website_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {}",
            BUSINESS_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(owner_id)
            .bind(&details.name)
            .bind(&details.address)
            .bind(&details.city)
            .bind(&details.state)
            .bind(&details.postal_code)
            .bind(&details.categories)
            .bind(&details.phone)
            .bind(&details.email)
            .bind(&details.description)
            .bind(&details.website_url)
            .fetch_one(&mut *tx)
            .await?;
        let business = business_from_row(&row)?;

        activity_log::insert_entry(
            &mut *tx,
            business.id,
            ActionType::BusinessRegistered,
            Some(owner_id),
            ActorType::Owner,
            &json!({}),
            &json!({ "name": details.name }),
        )
        .await?;

        tx.commit().await?;
        Ok(business)
    }

    pub async fn get(&self, business_id: Uuid) -> Result<Option<Business>> {
        let sql = format!("SELECT {} FROM businesses WHERE id = $1", BUSINESS_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(business_id)
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(business_from_row).transpose()
    }

    /// Approve a pending registration. Returns None when no business is
    /// awaiting review under this id.
    pub async fn approve_registration(
        &self,
        business_id: Uuid,
        admin_id: Uuid,
    ) -> Result<Option<Business>> {
        let business = self
            .review_registration(business_id, admin_id, BusinessStatus::Active, None)
            .await?;

        if let Some(business) = &business {
            self.notifications
                .dispatch_best_effort(
                    business.owner_id,
                    NotificationType::RegistrationDecision,
                    json!({
                        "business_id": business.id,
                        "decision": "approved",
                    }),
                )
                .await;
        }
        Ok(business)
    }

    pub async fn reject_registration(
        &self,
        business_id: Uuid,
        admin_id: Uuid,
        reason: String,
    ) -> Result<Option<Business>> {
        let business = self
            .review_registration(business_id, admin_id, BusinessStatus::Rejected, Some(&reason))
            .await?;

        if let Some(business) = &business {
            self.notifications
                .dispatch_best_effort(
                    business.owner_id,
                    NotificationType::RegistrationDecision,
                    json!({
                        "business_id": business.id,
                        "decision": "rejected",
                        "reason": reason,
                    }),
                )
                .await;
        }
        Ok(business)
    }

    async fn review_registration(
        &self,
        business_id: Uuid,
        admin_id: Uuid,
        verdict: BusinessStatus,
        reason: Option<&str>,
    ) -> Result<Option<Business>> {
        let mut tx = self.db.pool().begin().await?;

        let sql = format!(
            "UPDATE businesses SET status = $1, updated_at = now() \
             WHERE id = $2 AND status = 'pending' \
             RETURNING {}",
            BUSINESS_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(verdict.as_db())
            .bind(business_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };
        let business = business_from_row(&row)?;

        let action_type = match verdict {
            BusinessStatus::Active => ActionType::BusinessApproved,
            _ => ActionType::BusinessRejected,
        };
        let metadata = match reason {
            Some(reason) => json!({ "reason": reason }),
            None => json!({}),
        };
        activity_log::insert_entry(
            &mut *tx,
            business_id,
            action_type,
            Some(admin_id),
            ActorType::Admin,
            &json!({}),
            &metadata,
        )
        .await?;

        tx.commit().await?;
        Ok(Some(business))
    }
}

pub(crate) fn business_from_row(row: &PgRow) -> Result<Business> {
    let status: String = row.get("status");
    let status = BusinessStatus::from_db(&status)
        .ok_or_else(|| anyhow::anyhow!("unknown business status: {}", status))?;

    Ok(Business {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        name: row.get("name"),
        address: row.get("address"),
        city: row.get("city"),
        state: row.get("state"),
        postal_code: row.get("postal_code"),
        categories: row.get("categories"),
        phone: row.get("phone"),
        email: row.get("email"),
        operating_hours: row.get("operating_hours"),
        description: row.get("description"),
        logo_url: row.get("logo_url"),
        cover_image_url: row.get("cover_image_url"),
        website_url: row.get("website_url"),
        social_media: row.get("social_media"),
        status,
        has_pending_edits: row.get("has_pending_edits"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
