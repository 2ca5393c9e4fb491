//! Front-end flows
//!
//! Registration, order creation and the request lifecycle operations
//! driven by the chat/bot front-end. The outbound CRM path lives here:
//! registration binds a CRM contact, order creation opens a CRM lead.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::settings::Settings;
use crate::crm::client::CrmApi;
use crate::crm::status::encode_status;
use crate::database::DatabaseService;
use crate::models::catalog::{EquipmentType, ServiceType};
use crate::models::master::{CreateMasterRequest, Master};
use crate::models::request::{CreateServiceRequest, RequestStatus, ServiceRequest, ServiceRequestPatch};
use crate::models::transaction::Transaction;
use crate::models::user::{CreateUserRequest, User, UserPatch, UserRole};
use crate::services::bonus::BonusService;
use crate::utils::errors::{FixlineError, Result};
use crate::utils::helpers::{normalize_phone, parse_referral_payload};

/// Registration input from the front-end
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub phone: String,
    pub name: String,
    pub telegram_id: Option<String>,
    pub telegram_login: Option<String>,
    pub role: UserRole,
    pub city_name: Option<String>,
    pub referral_link: Option<String>,
    pub service_name: Option<String>,
    pub address: Option<String>,
    pub equipment_type_name: Option<String>,
}

/// Order creation input from the front-end
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRequestInput {
    pub telegram_id: String,
    pub service_name: String,
    pub city_name: String,
    pub address: String,
    pub description: Option<String>,
    pub equipment_type: String,
    pub equipment_brand: String,
    pub equipment_model: String,
}

/// Profile view returned to the front-end
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub user: User,
    pub master: Option<Master>,
    /// Ledger history across both the user row and the master profile.
    pub transactions: Vec<Transaction>,
}

/// Catalog listing for the front-end pickers
#[derive(Debug, Clone, Serialize)]
pub struct TypeCatalog {
    pub service_types: Vec<ServiceType>,
    pub equipment_types: Vec<EquipmentType>,
}

/// Registration and request lifecycle service
#[derive(Clone)]
pub struct RegistrationService {
    pool: PgPool,
    db: DatabaseService,
    crm: Arc<dyn CrmApi>,
    bonus: BonusService,
    settings: Settings,
}

impl RegistrationService {
    /// Create a new RegistrationService instance
    pub fn new(
        pool: PgPool,
        db: DatabaseService,
        crm: Arc<dyn CrmApi>,
        bonus: BonusService,
        settings: Settings,
    ) -> Self {
        Self {
            pool,
            db,
            crm,
            bonus,
            settings,
        }
    }

    /// Register a new user from the front-end
    pub async fn register(&self, input: RegisterInput) -> Result<User> {
        validate_register_input(&input)?;

        let phone = normalize_phone(&input.phone);
        if phone.is_empty() {
            return Err(FixlineError::validation("phone", "is required"));
        }

        if self
            .db
            .users
            .find_by_phone_and_role(&phone, input.role)
            .await?
            .is_some()
        {
            return Err(FixlineError::Conflict(format!(
                "user with phone {} and role {} already exists",
                phone,
                input.role.as_str()
            )));
        }

        let referrer = self.resolve_referrer(&input).await?;

        // All local writes share one transaction: a failure on any step
        // leaves no partial account behind
        let mut tx = self.pool.begin().await?;

        let user = self
            .db
            .users
            .create_in(
                &mut tx,
                CreateUserRequest {
                    name: input.name.clone(),
                    phone: Some(phone.clone()),
                    telegram_id: input.telegram_id.clone(),
                    telegram_login: input.telegram_login.clone(),
                    role: input.role,
                    city: input.city_name.clone(),
                    referral_link: input.referral_link.clone(),
                    referrer_id: referrer.as_ref().map(|r| r.id),
                    amo_crm_contact_id: None,
                },
            )
            .await?;

        if let Some(referrer) = &referrer {
            self.db
                .referrals
                .create_in(
                    &mut tx,
                    user.id,
                    referrer.id,
                    Decimal::from(self.settings.bonus.level1_amount),
                )
                .await?;
        }

        if input.role == UserRole::Master {
            self.db
                .masters
                .create_in(
                    &mut tx,
                    CreateMasterRequest {
                        user_id: user.id,
                        address: input.address.clone(),
                        city: input.city_name.clone(),
                        service_name: input.service_name.clone(),
                        equipment_type: input.equipment_type_name.clone(),
                    },
                )
                .await?;
        }

        self.bonus.grant_registration_bonus(&mut tx, &user).await?;

        tx.commit().await?;

        // Contact sync is best-effort: a CRM outage must not block signup
        if let Err(e) = self.bind_crm_contact(&user).await {
            warn!(user_id = user.id, error = %e, "CRM contact bind failed during registration");
        }

        info!(user_id = user.id, role = user.role.as_str(), "User registered");
        Ok(user)
    }

    /// Resolve the referrer user from the raw start payload, enforcing
    /// role compatibility. A user being created cannot already sit in any
    /// referrer chain, so only self-referral needs refusing here.
    async fn resolve_referrer(&self, input: &RegisterInput) -> Result<Option<User>> {
        let raw = match &input.referral_link {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let payload = match parse_referral_payload(raw) {
            Some(payload) => payload,
            None => return Ok(None),
        };

        // Self-referral through one's own telegram id
        if input.telegram_id.as_deref() == Some(payload.as_str()) {
            return Ok(None);
        }

        let wanted_role = referrer_role_for(input.role);
        let referrer = self
            .db
            .users
            .find_by_telegram_id_and_role(&payload, wanted_role)
            .await?;

        Ok(referrer)
    }

    /// Create a service request locally and open the matching CRM lead.
    ///
    /// The local insert and the CRM call share one atomic scope: a CRM
    /// refusal rolls the insert back, leaving no dangling row.
    pub async fn create_request(&self, input: CreateRequestInput) -> Result<ServiceRequest> {
        let user = self
            .db
            .users
            .find_by_telegram_id_and_role(&input.telegram_id, UserRole::Client)
            .await?
            .ok_or_else(|| {
                FixlineError::validation("telegram_id", "no client registered with this telegram id")
            })?;

        let mut tx = self.pool.begin().await?;

        let request = self
            .db
            .requests
            .create_in(
                &mut tx,
                CreateServiceRequest {
                    client_id: user.id,
                    service_name: Some(input.service_name.clone()),
                    city: Some(input.city_name.clone()),
                    address: Some(input.address.clone()),
                    description: input.description.clone(),
                    equipment_type: Some(input.equipment_type.clone()),
                    equipment_brand: Some(input.equipment_brand.clone()),
                    equipment_model: Some(input.equipment_model.clone()),
                    status: RequestStatus::Open,
                    price: Decimal::ZERO,
                    amo_crm_lead_id: None,
                    amo_status_code: Some(encode_status(RequestStatus::Open)),
                },
            )
            .await?;

        // CRM failure propagates before commit and rolls the insert back
        let lead = self.crm.create_lead(self.lead_payload(&user, &input)).await?;

        // The lead id is only known after the CRM call
        sqlx::query("UPDATE service_requests SET amo_crm_lead_id = $2 WHERE id = $1")
            .bind(request.id)
            .bind(lead.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(request_id = request.id, lead_id = lead.id, "Service request created and lead opened");

        Ok(ServiceRequest {
            amo_crm_lead_id: Some(lead.id),
            ..request
        })
    }

    fn lead_payload(&self, user: &User, input: &CreateRequestInput) -> serde_json::Value {
        let fields = &self.settings.crm.fields;
        let mut custom_fields = vec![
            field_payload(fields.service_name, &input.service_name),
            field_payload(fields.city_name, &input.city_name),
            field_payload(fields.address, &input.address),
            field_payload(fields.equipment_type, &input.equipment_type),
            field_payload(fields.equipment_brand, &input.equipment_brand),
            field_payload(fields.equipment_model, &input.equipment_model),
        ];
        if let Some(description) = &input.description {
            custom_fields.push(field_payload(fields.description, description));
        }

        let mut lead = json!({
            "name": format!("{}: {}", input.service_name, input.equipment_type),
            "status_id": encode_status(RequestStatus::Open),
            "custom_fields_values": custom_fields,
        });

        if let Some(contact_id) = user.amo_crm_contact_id {
            lead["_embedded"] = json!({"contacts": [{"id": contact_id}]});
        }

        lead
    }

    /// Request history for a client
    pub async fn requests_history(&self, telegram_id: &str) -> Result<Vec<ServiceRequest>> {
        let user = self.require_user(telegram_id).await?;
        if user.role != UserRole::Client {
            return Err(FixlineError::Auth("only clients have a request history".to_string()));
        }

        self.db.requests.list_by_client(user.id).await
    }

    /// Active requests assigned to a master
    pub async fn master_active(&self, telegram_id: &str) -> Result<Vec<ServiceRequest>> {
        let user = self.require_user(telegram_id).await?;
        if user.role != UserRole::Master {
            return Err(FixlineError::Auth("only masters have active assignments".to_string()));
        }

        let master = self
            .db
            .masters
            .find_by_user_id(user.id)
            .await?
            .ok_or_else(|| FixlineError::Internal(format!("master profile missing for user {}", user.id)))?;

        self.db.requests.list_active_by_master(master.id).await
    }

    /// A master takes an open request
    pub async fn assign(&self, telegram_id: &str, request_id: i64) -> Result<ServiceRequest> {
        let user = self.require_user(telegram_id).await?;
        if user.role != UserRole::Master {
            return Err(FixlineError::Auth("only masters can take requests".to_string()));
        }
        let master = self
            .db
            .masters
            .find_by_user_id(user.id)
            .await?
            .ok_or_else(|| FixlineError::Internal(format!("master profile missing for user {}", user.id)))?;

        let request = self
            .db
            .requests
            .find_by_id(request_id)
            .await?
            .ok_or(FixlineError::RequestNotFound { request_id })?;

        if request.status != RequestStatus::Open {
            return Err(FixlineError::InvalidRequestState {
                expected: RequestStatus::Open.as_str().to_string(),
                actual: request.status.as_str().to_string(),
            });
        }

        let patched = self
            .db
            .requests
            .apply_patch(
                request.id,
                ServiceRequestPatch {
                    master_id: Some(master.id),
                    status: Some(RequestStatus::InProgress),
                    ..Default::default()
                },
            )
            .await?;

        info!(request_id = request.id, master_id = master.id, "Request assigned");
        Ok(patched)
    }

    /// A master closes an in-progress request
    pub async fn close(&self, telegram_id: &str, request_id: i64) -> Result<ServiceRequest> {
        let user = self.require_user(telegram_id).await?;
        if user.role != UserRole::Master {
            return Err(FixlineError::Auth("only masters can close requests".to_string()));
        }

        let request = self
            .db
            .requests
            .find_by_id(request_id)
            .await?
            .ok_or(FixlineError::RequestNotFound { request_id })?;

        if request.status != RequestStatus::InProgress {
            return Err(FixlineError::InvalidRequestState {
                expected: RequestStatus::InProgress.as_str().to_string(),
                actual: request.status.as_str().to_string(),
            });
        }

        let patched = self
            .db
            .requests
            .apply_patch(
                request.id,
                ServiceRequestPatch {
                    status: Some(RequestStatus::Completed),
                    completed_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await?;

        info!(request_id = request.id, "Request closed");
        Ok(patched)
    }

    /// Profile view for a user
    pub async fn profile(&self, telegram_id: &str) -> Result<UserProfile> {
        let user = self.require_user(telegram_id).await?;
        let master = if user.role == UserRole::Master {
            self.db.masters.find_by_user_id(user.id).await?
        } else {
            None
        };

        let transactions = self
            .db
            .transactions
            .list_for_person(user.id, master.as_ref().map(|m| m.id))
            .await?;

        Ok(UserProfile {
            user,
            master,
            transactions,
        })
    }

    /// Catalog listing for the front-end pickers
    pub async fn types(&self) -> Result<TypeCatalog> {
        Ok(TypeCatalog {
            service_types: self.db.catalog.list_service_types().await?,
            equipment_types: self.db.catalog.list_equipment_types().await?,
        })
    }

    async fn require_user(&self, telegram_id: &str) -> Result<User> {
        self.db
            .users
            .find_by_telegram_id(telegram_id)
            .await?
            .ok_or_else(|| FixlineError::UserNotFound {
                telegram_id: telegram_id.to_string(),
            })
    }

    /// Find or create the CRM contact for a local user and bind its id
    async fn bind_crm_contact(&self, user: &User) -> Result<()> {
        let found = self
            .crm
            .search_contacts(user.phone.as_deref(), user.telegram_id.as_deref())
            .await?;

        let contact_id = match found.first() {
            Some(contact) => {
                self.crm
                    .update_contact(contact.id, self.contact_payload(user))
                    .await?;
                contact.id
            }
            None => self.crm.create_contact(self.contact_payload(user)).await?.id,
        };

        self.db
            .users
            .apply_patch(
                user.id,
                UserPatch {
                    amo_crm_contact_id: Some(contact_id),
                    ..Default::default()
                },
            )
            .await?;

        Ok(())
    }

    fn contact_payload(&self, user: &User) -> serde_json::Value {
        let fields = &self.settings.crm.fields;
        let mut custom_fields = Vec::new();
        if let Some(phone) = &user.phone {
            custom_fields.push(json!({
                "field_code": "PHONE",
                "values": [{"value": phone}],
            }));
        }
        if let Some(telegram_id) = &user.telegram_id {
            custom_fields.push(field_payload(fields.contact_telegram_id, telegram_id));
        }
        if let Some(city) = &user.city {
            custom_fields.push(field_payload(fields.contact_city, city));
        }

        json!({
            "name": user.name,
            "custom_fields_values": custom_fields,
        })
    }
}

fn field_payload(field_id: i64, value: &str) -> serde_json::Value {
    json!({
        "field_id": field_id,
        "values": [{"value": value}],
    })
}

/// Role a referrer must hold for a given registrant role
pub fn referrer_role_for(role: UserRole) -> UserRole {
    match role {
        UserRole::Master => UserRole::Master,
        UserRole::Client => UserRole::Client,
        UserRole::Admin => UserRole::Client,
    }
}

/// Role-specific required fields for registration
pub fn validate_register_input(input: &RegisterInput) -> Result<()> {
    if input.name.trim().is_empty() {
        return Err(FixlineError::validation("name", "is required"));
    }

    match input.role {
        UserRole::Master => {
            if input.city_name.as_deref().unwrap_or("").is_empty() {
                return Err(FixlineError::validation("city_name", "is required for masters"));
            }
            if input.service_name.as_deref().unwrap_or("").is_empty() {
                return Err(FixlineError::validation("service_name", "is required for masters"));
            }
            if input.address.as_deref().unwrap_or("").is_empty() {
                return Err(FixlineError::validation("address", "is required for masters"));
            }
            if input.equipment_type_name.as_deref().unwrap_or("").is_empty() {
                return Err(FixlineError::validation(
                    "equipment_type_name",
                    "is required for masters",
                ));
            }
        }
        UserRole::Client => {
            if input.city_name.as_deref().unwrap_or("").is_empty() {
                return Err(FixlineError::validation("city_name", "is required for clients"));
            }
        }
        UserRole::Admin => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_input(role: UserRole) -> RegisterInput {
        RegisterInput {
            phone: "+79001234567".to_string(),
            name: "Test".to_string(),
            telegram_id: Some("42".to_string()),
            telegram_login: None,
            role,
            city_name: Some("Moscow".to_string()),
            referral_link: None,
            service_name: None,
            address: None,
            equipment_type_name: None,
        }
    }

    #[test]
    fn test_client_requires_city() {
        let mut input = base_input(UserRole::Client);
        input.city_name = None;
        assert!(validate_register_input(&input).is_err());
    }

    #[test]
    fn test_master_requires_service_fields() {
        let mut input = base_input(UserRole::Master);
        input.service_name = Some("Repair".to_string());
        input.address = Some("Arbat 1".to_string());
        assert!(validate_register_input(&input).is_err());

        input.equipment_type_name = Some("Fridge".to_string());
        assert!(validate_register_input(&input).is_ok());
    }

    #[test]
    fn test_referrer_role_table() {
        assert_eq!(referrer_role_for(UserRole::Master), UserRole::Master);
        assert_eq!(referrer_role_for(UserRole::Client), UserRole::Client);
        assert_eq!(referrer_role_for(UserRole::Admin), UserRole::Client);
    }
}
