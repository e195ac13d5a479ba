use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub categories: Vec<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub operating_hours: Option<Value>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub cover_image_url: Option<String>,
    pub website_url: Option<String>,
    pub social_media: Option<Value>,
    pub status: BusinessStatus,
    pub has_pending_edits: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Business {
    /// Current value of one editable field as JSON, used as the pre-image
    /// side of audit diffs.
    pub fn field_value(&self, field: BusinessField) -> Value {
        use serde_json::json;
        match field {
            BusinessField::Name => json!(self.name),
            BusinessField::Address => json!(self.address),
            BusinessField::City => json!(self.city),
            BusinessField::State => json!(self.state),
            BusinessField::PostalCode => json!(self.postal_code),
            BusinessField::Categories => json!(self.categories),
            BusinessField::Phone => json!(self.phone),
            BusinessField::Email => json!(self.email),
            BusinessField::OperatingHours => json!(self.operating_hours),
            BusinessField::Description => json!(self.description),
            BusinessField::LogoUrl => json!(self.logo_url),
            BusinessField::CoverImageUrl => json!(self.cover_image_url),
            BusinessField::WebsiteUrl => json!(self.website_url),
            BusinessField::SocialMedia => json!(self.social_media),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessStatus {
    Pending,
    Active,
    Rejected,
}

impl BusinessStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            BusinessStatus::Pending => "pending",
            BusinessStatus::Active => "active",
            BusinessStatus::Rejected => "rejected",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(BusinessStatus::Pending),
            "active" => Some(BusinessStatus::Active),
            "rejected" => Some(BusinessStatus::Rejected),
            _ => None,
        }
    }
}

/// Every editable profile field. The wire name is what edit submissions use;
/// the column name is where the value lands in the businesses table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusinessField {
    Name,
    Address,
    City,
    State,
    PostalCode,
    Categories,
    Phone,
    Email,
    OperatingHours,
    Description,
    LogoUrl,
    CoverImageUrl,
    WebsiteUrl,
    SocialMedia,
}

/// Classification outcome for a submitted field name. `Unknown` is a hard
/// error at the submission boundary: fields we do not recognize are rejected
/// instead of being silently applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Sensitive,
    Instant,
    Unknown,
}

impl FieldKind {
    pub fn classify(name: &str) -> FieldKind {
        match BusinessField::parse(name) {
            Some(field) => field.kind(),
            None => FieldKind::Unknown,
        }
    }
}

pub const SENSITIVE_FIELDS: [BusinessField; 6] = [
    BusinessField::Name,
    BusinessField::Address,
    BusinessField::City,
    BusinessField::State,
    BusinessField::PostalCode,
    BusinessField::Categories,
];

pub const INSTANT_UPDATE_FIELDS: [BusinessField; 8] = [
    BusinessField::Phone,
    BusinessField::Email,
    BusinessField::OperatingHours,
    BusinessField::Description,
    BusinessField::LogoUrl,
    BusinessField::CoverImageUrl,
    BusinessField::WebsiteUrl,
    BusinessField::SocialMedia,
];

impl BusinessField {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "business_name" => Some(BusinessField::Name),
            "address" => Some(BusinessField::Address),
            "city" => Some(BusinessField::City),
            "state" => Some(BusinessField::State),
            "postal_code" => Some(BusinessField::PostalCode),
            "categories" => Some(BusinessField::Categories),
            "business_phone" => Some(BusinessField::Phone),
            "business_email" => Some(BusinessField::Email),
            "operating_hours" => Some(BusinessField::OperatingHours),
            "description" => Some(BusinessField::Description),
            "logo_url" => Some(BusinessField::LogoUrl),
            "cover_image_url" => Some(BusinessField::CoverImageUrl),
            "website_url" => Some(BusinessField::WebsiteUrl),
            "social_media" => Some(BusinessField::SocialMedia),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessField::Name => "business_name",
            BusinessField::Address => "address",
            BusinessField::City => "city",
            BusinessField::State => "state",
            BusinessField::PostalCode => "postal_code",
            BusinessField::Categories => "categories",
            BusinessField::Phone => "business_phone",
            BusinessField::Email => "business_email",
            BusinessField::OperatingHours => "operating_hours",
            BusinessField::Description => "description",
            BusinessField::LogoUrl => "logo_url",
            BusinessField::CoverImageUrl => "cover_image_url",
            BusinessField::WebsiteUrl => "website_url",
            BusinessField::SocialMedia => "social_media",
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            BusinessField::Name => "name",
            BusinessField::Address => "address",
            BusinessField::City => "city",
            BusinessField::State => "state",
            BusinessField::PostalCode => "postal_code",
            BusinessField::Categories => "categories",
            BusinessField::Phone => "phone",
            BusinessField::Email => "email",
            BusinessField::OperatingHours => "operating_hours",
            BusinessField::Description => "description",
            BusinessField::LogoUrl => "logo_url",
            BusinessField::CoverImageUrl => "cover_image_url",
            BusinessField::WebsiteUrl => "website_url",
            BusinessField::SocialMedia => "social_media",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            BusinessField::Name
            | BusinessField::Address
            | BusinessField::City
            | BusinessField::State
            | BusinessField::PostalCode
            | BusinessField::Categories => FieldKind::Sensitive,
            BusinessField::Phone
            | BusinessField::Email
            | BusinessField::OperatingHours
            | BusinessField::Description
            | BusinessField::LogoUrl
            | BusinessField::CoverImageUrl
            | BusinessField::WebsiteUrl
            | BusinessField::SocialMedia => FieldKind::Instant,
        }
    }

    /// Whether a submitted JSON value has the shape this field stores.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            BusinessField::Categories => value
                .as_array()
                .map_or(false, |items| items.iter().all(Value::is_string)),
            BusinessField::OperatingHours | BusinessField::SocialMedia => value.is_object(),
            _ => value.is_string(),
        }
    }
}
