//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Role of a person in the marketplace.
///
/// The same physical person may exist as both a Client and a Master record;
/// `(phone, role)` is unique, not `phone` alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "PascalCase")]
pub enum UserRole {
    Client,
    Master,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Client => "Client",
            UserRole::Master => "Master",
            UserRole::Admin => "Admin",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub telegram_id: Option<String>,
    pub telegram_login: Option<String>,
    pub role: UserRole,
    pub city: Option<String>,
    /// Raw `/start` payload carried by the registration command.
    pub referral_link: Option<String>,
    pub referrer_id: Option<i64>,
    pub amo_crm_contact_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub phone: Option<String>,
    pub telegram_id: Option<String>,
    pub telegram_login: Option<String>,
    pub role: UserRole,
    pub city: Option<String>,
    pub referral_link: Option<String>,
    pub referrer_id: Option<i64>,
    pub amo_crm_contact_id: Option<i64>,
}

/// Field-diff patch for a user row.
///
/// `None` means "leave the column untouched"; the repository applies the
/// patch with COALESCE so concurrent edits on unrelated columns survive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub telegram_id: Option<String>,
    pub telegram_login: Option<String>,
    pub city: Option<String>,
    pub referrer_id: Option<i64>,
    pub amo_crm_contact_id: Option<i64>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.phone.is_none()
            && self.telegram_id.is_none()
            && self.telegram_login.is_none()
            && self.city.is_none()
            && self.referrer_id.is_none()
            && self.amo_crm_contact_id.is_none()
    }

    /// Names of the fields this patch writes, for structured logging.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.phone.is_some() {
            fields.push("phone");
        }
        if self.telegram_id.is_some() {
            fields.push("telegram_id");
        }
        if self.telegram_login.is_some() {
            fields.push("telegram_login");
        }
        if self.city.is_some() {
            fields.push("city");
        }
        if self.referrer_id.is_some() {
            fields.push("referrer_id");
        }
        if self.amo_crm_contact_id.is_some() {
            fields.push("amo_crm_contact_id");
        }
        fields
    }
}
