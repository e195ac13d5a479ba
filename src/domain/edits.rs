use serde::Serialize;
use serde_json::{json, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::business::BusinessField;

/// The staged sensitive-field changes for one business. At most one row per
/// business exists at any time; a second submission before resolution
/// overwrites the previously staged values.
#[derive(Debug, Clone, Serialize)]
pub struct PendingEdit {
    pub business_id: Uuid,
    pub submitted_by: Uuid,
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub categories: Option<Vec<String>>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl PendingEdit {
    /// Non-null staged fields, as (field, proposed value) pairs.
    pub fn staged_fields(&self) -> Vec<(BusinessField, Value)> {
        let mut fields = Vec::new();
        if let Some(name) = &self.name {
            fields.push((BusinessField::Name, json!(name)));
        }
        if let Some(address) = &self.address {
            fields.push((BusinessField::Address, json!(address)));
        }
        if let Some(city) = &self.city {
            fields.push((BusinessField::City, json!(city)));
        }
        if let Some(state) = &self.state {
            fields.push((BusinessField::State, json!(state)));
        }
        if let Some(postal_code) = &self.postal_code {
            fields.push((BusinessField::PostalCode, json!(postal_code)));
        }
        if let Some(categories) = &self.categories {
            fields.push((BusinessField::Categories, json!(categories)));
        }
        fields
    }
}

/// An admin's verdict on one staged field during partial resolution.
#[derive(Debug, Clone, Copy)]
pub struct FieldDecision {
    pub field: BusinessField,
    pub approved: bool,
}
