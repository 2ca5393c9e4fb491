//! Lead/request reconciler
//!
//! Core synchronization engine: given a CRM lead snapshot (webhook push or
//! paginated pull), materialize or update exactly one local service
//! request, its client user and its master binding. Replaying the same
//! lead leaves the database unchanged.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::{debug, info, warn};

use crate::config::settings::{CrmFieldIds, Settings};
use crate::crm::client::{first_field_value, CrmApi, CustomFieldValue, LeadSummary};
use crate::crm::contact::{parse_contact, ParsedContact};
use crate::crm::status::decode_status;
use crate::database::DatabaseService;
use crate::models::request::{CreateServiceRequest, ServiceRequest, ServiceRequestPatch};
use crate::models::user::{CreateUserRequest, User, UserPatch, UserRole};
use crate::utils::errors::Result;

/// Result of reconciling one lead
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// A new service request row was inserted
    Created(ServiceRequest),
    /// An existing row was brought up to date
    Updated(ServiceRequest),
    /// The lead has no associated contact; nothing was written
    Skipped,
}

impl ReconcileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Created(_) => "created",
            ReconcileOutcome::Updated(_) => "updated",
            ReconcileOutcome::Skipped => "skipped",
        }
    }
}

/// Reconciler service driving lead ingestion
#[derive(Clone)]
pub struct Reconciler {
    pool: PgPool,
    db: DatabaseService,
    crm: Arc<dyn CrmApi>,
    settings: Settings,
}

impl Reconciler {
    /// Create a new Reconciler instance
    pub fn new(pool: PgPool, db: DatabaseService, crm: Arc<dyn CrmApi>, settings: Settings) -> Self {
        Self {
            pool,
            db,
            crm,
            settings,
        }
    }

    /// Materialize or update the local service request for a CRM lead.
    ///
    /// Returns `Skipped` iff the lead has no associated contact. A
    /// unique-violation race with a concurrent delivery of the same lead
    /// is retried once; the retry lands on the update path.
    pub async fn save_lead(&self, lead_short: &LeadSummary) -> Result<ReconcileOutcome> {
        match self.save_lead_inner(lead_short).await {
            Err(e) if e.is_unique_violation() => {
                warn!(lead_id = lead_short.id, "Reconcile hit a duplicate-key race, retrying once");
                self.save_lead_inner(lead_short).await
            }
            other => other,
        }
    }

    async fn save_lead_inner(&self, lead_short: &LeadSummary) -> Result<ReconcileOutcome> {
        let status = decode_status(lead_short.status_id.unwrap_or_default());
        debug!(lead_id = lead_short.id, status = status.as_str(), "Reconciling lead");

        let lead_full = self.crm.get_lead(lead_short.id).await?;
        let lead_fields = lead_full.custom_fields_values.as_deref();

        // Resolve the client contact; a lead without one is skipped
        let links = self.crm.get_lead_links(lead_short.id).await?;
        let contact_link = links.iter().find(|l| l.to_entity_type == "contacts");
        let contact_id = match contact_link {
            Some(link) => link.to_entity_id,
            None => {
                debug!(lead_id = lead_short.id, "Lead has no contact link, skipping");
                return Ok(ReconcileOutcome::Skipped);
            }
        };

        let contact = self.crm.get_contact_by_id(contact_id).await?;
        let parsed = parse_contact(&contact, &self.settings.crm.fields);

        // All row writes for one lead happen in one transaction; the
        // FOR UPDATE lookups serialize concurrent deliveries per lead.
        let mut tx = self.pool.begin().await?;

        let client = self.resolve_client(&mut tx, &parsed).await?;

        let (request, created) = match self
            .db
            .requests
            .find_by_lead_id_for_update(&mut tx, lead_short.id)
            .await?
        {
            Some(existing) => (existing, false),
            None => {
                let request = self
                    .db
                    .requests
                    .create_in(
                        &mut tx,
                        CreateServiceRequest {
                            client_id: client.id,
                            service_name: None,
                            city: None,
                            address: None,
                            description: None,
                            equipment_type: None,
                            equipment_brand: None,
                            equipment_model: None,
                            status,
                            price: lead_short.price.unwrap_or_default(),
                            amo_crm_lead_id: Some(lead_short.id),
                            amo_status_code: lead_short.status_id,
                        },
                    )
                    .await?;
                (request, true)
            }
        };

        // Fold the upsert defaults, master binding, custom-field mirror
        // and outcome classification into one field-diff write
        let mut patch = mirror_patch(&request, lead_fields, &self.settings.crm.fields);

        if !created {
            if request.status != status {
                patch.status = Some(status);
            }
            if request.amo_status_code != lead_short.status_id {
                patch.amo_status_code = lead_short.status_id;
            }
            let price = lead_short.price.unwrap_or_default();
            if request.price != price {
                patch.price = Some(price);
            }
        }

        let (master_phone, master_telegram) =
            master_identity(lead_fields, &self.settings.crm.fields);
        if master_phone.is_some() || master_telegram.is_some() {
            let master = self
                .db
                .masters
                .find_by_user_phone_or_telegram_in(
                    &mut tx,
                    master_phone.as_deref(),
                    master_telegram.as_deref(),
                )
                .await?;
            if let Some(master) = master {
                if request.master_id != Some(master.id) {
                    patch.master_id = Some(master.id);
                }
            }
        }

        if let Some(outcome_name) = first_field_value(lead_fields, self.settings.crm.fields.work_outcome)
        {
            if let Some(outcome) = self.db.catalog.find_outcome_by_name(&outcome_name).await? {
                if request.work_outcome_id != Some(outcome.id) {
                    patch.work_outcome_id = Some(outcome.id);
                }
            }
        }

        let request = if patch.is_empty() {
            request
        } else {
            self.db.requests.apply_patch_in(&mut tx, request.id, patch).await?
        };

        tx.commit().await?;

        if created {
            info!(lead_id = lead_short.id, request_id = request.id, "Service request created from lead");
            Ok(ReconcileOutcome::Created(request))
        } else {
            debug!(lead_id = lead_short.id, request_id = request.id, "Service request updated from lead");
            Ok(ReconcileOutcome::Updated(request))
        }
    }

    /// Resolve the client user for a parsed contact: by CRM contact id,
    /// then by phone (binding the contact id), else create a new client.
    async fn resolve_client(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        parsed: &ParsedContact,
    ) -> Result<User> {
        if let Some(user) = self
            .db
            .users
            .find_by_contact_id_for_update(tx, parsed.amo_crm_contact_id)
            .await?
        {
            let patch = user_patch_from_contact(&user, parsed);
            if patch.is_empty() {
                return Ok(user);
            }
            debug!(user_id = user.id, fields = ?patch.changed_fields(), "Updating user from contact");
            return self.db.users.apply_patch_in(tx, user.id, patch).await;
        }

        if let Some(phone) = &parsed.phone {
            if let Some(user) = self
                .db
                .users
                .find_by_phone_and_role_for_update(tx, phone, UserRole::Client)
                .await?
            {
                let mut patch = user_patch_from_contact(&user, parsed);
                patch.amo_crm_contact_id = Some(parsed.amo_crm_contact_id);
                debug!(user_id = user.id, contact_id = parsed.amo_crm_contact_id, "Binding CRM contact to existing user");
                return self.db.users.apply_patch_in(tx, user.id, patch).await;
            }
        }

        info!(contact_id = parsed.amo_crm_contact_id, "Creating client from CRM contact");
        self.db
            .users
            .create_in(
                tx,
                CreateUserRequest {
                    name: parsed.name.clone(),
                    phone: parsed.phone.clone(),
                    telegram_id: parsed.telegram_id.clone(),
                    telegram_login: None,
                    role: UserRole::Client,
                    city: parsed.city.clone(),
                    referral_link: None,
                    referrer_id: None,
                    amo_crm_contact_id: Some(parsed.amo_crm_contact_id),
                },
            )
            .await
    }
}

/// Dirty-write rule for users: only non-null incoming values that differ
/// from the stored ones make it into the patch.
pub fn user_patch_from_contact(user: &User, parsed: &ParsedContact) -> UserPatch {
    let mut patch = UserPatch::default();

    if !parsed.name.is_empty() && parsed.name != user.name {
        patch.name = Some(parsed.name.clone());
    }
    if let Some(phone) = &parsed.phone {
        if user.phone.as_deref() != Some(phone) {
            patch.phone = Some(phone.clone());
        }
    }
    if let Some(telegram_id) = &parsed.telegram_id {
        if user.telegram_id.as_deref() != Some(telegram_id) {
            patch.telegram_id = Some(telegram_id.clone());
        }
    }
    if let Some(city) = &parsed.city {
        if user.city.as_deref() != Some(city) {
            patch.city = Some(city.clone());
        }
    }

    patch
}

/// Mirror whitelisted lead custom fields onto the request, writing only
/// values that differ from the stored ones. CRM wins over concurrent
/// front-end edits on the mirrored columns.
pub fn mirror_patch(
    request: &ServiceRequest,
    fields: Option<&[CustomFieldValue]>,
    ids: &CrmFieldIds,
) -> ServiceRequestPatch {
    let mut patch = ServiceRequestPatch::default();

    let mut mirror_text = |field_id: i64, stored: &Option<String>, slot: &mut Option<String>| {
        if let Some(value) = first_field_value(fields, field_id) {
            if stored.as_deref() != Some(value.as_str()) {
                *slot = Some(value);
            }
        }
    };

    mirror_text(ids.service_name, &request.service_name, &mut patch.service_name);
    mirror_text(ids.equipment_type, &request.equipment_type, &mut patch.equipment_type);
    mirror_text(ids.equipment_model, &request.equipment_model, &mut patch.equipment_model);
    mirror_text(ids.equipment_brand, &request.equipment_brand, &mut patch.equipment_brand);
    mirror_text(ids.city_name, &request.city, &mut patch.city);
    mirror_text(ids.address, &request.address, &mut patch.address);
    mirror_text(
        ids.crm_operator_comment,
        &request.crm_operator_comment,
        &mut patch.crm_operator_comment,
    );
    mirror_text(ids.description, &request.description, &mut patch.description);

    let mut mirror_rating = |field_id: i64, stored: &Option<i32>, slot: &mut Option<i32>| {
        if let Some(value) = first_field_value(fields, field_id) {
            if let Ok(rating) = value.parse::<i32>() {
                if (1..=5).contains(&rating) && *stored != Some(rating) {
                    *slot = Some(rating);
                }
            }
        }
    };

    mirror_rating(ids.quality_rating, &request.quality_rating, &mut patch.quality_rating);
    mirror_rating(
        ids.competence_rating,
        &request.competence_rating,
        &mut patch.competence_rating,
    );
    mirror_rating(
        ids.recommendation_rating,
        &request.recommendation_rating,
        &mut patch.recommendation_rating,
    );

    patch
}

/// Master identification fields carried on the lead, if any
pub fn master_identity(
    fields: Option<&[CustomFieldValue]>,
    ids: &CrmFieldIds,
) -> (Option<String>, Option<String>) {
    let phone = first_field_value(fields, ids.master_phone)
        .map(|raw| crate::utils::helpers::normalize_phone(&raw))
        .filter(|p| !p.is_empty());
    let telegram = first_field_value(fields, ids.master_telegram_id).filter(|v| !v.is_empty());
    (phone, telegram)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crm::client::CustomFieldEntry;
    use crate::models::request::RequestStatus;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn field(field_id: i64, value: serde_json::Value) -> CustomFieldValue {
        CustomFieldValue {
            field_id,
            field_code: None,
            values: vec![CustomFieldEntry { value }],
        }
    }

    fn stored_user() -> User {
        User {
            id: 1,
            name: "A".to_string(),
            phone: Some("+70000000001".to_string()),
            telegram_id: Some("777".to_string()),
            telegram_login: None,
            role: UserRole::Client,
            city: Some("Moscow".to_string()),
            referral_link: None,
            referrer_id: None,
            amo_crm_contact_id: Some(501),
            created_at: Utc::now(),
        }
    }

    fn stored_request() -> ServiceRequest {
        ServiceRequest {
            id: 10,
            client_id: 1,
            master_id: None,
            equipment_type: Some("Fridge".to_string()),
            equipment_brand: None,
            equipment_model: None,
            service_name: None,
            city: None,
            status: RequestStatus::Open,
            price: Decimal::ZERO,
            quality_rating: None,
            competence_rating: None,
            recommendation_rating: None,
            address: None,
            cancel_reason: None,
            description: None,
            amo_crm_lead_id: Some(1001),
            amo_status_code: Some(65736946),
            warranty: None,
            parts_cost: None,
            master_comment: None,
            crm_operator_comment: None,
            work_outcome_id: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn test_user_patch_skips_equal_and_null_values() {
        let user = stored_user();
        let parsed = ParsedContact {
            amo_crm_contact_id: 501,
            name: "A".to_string(),
            phone: Some("+70000000001".to_string()),
            telegram_id: None,
            city: None,
        };

        let patch = user_patch_from_contact(&user, &parsed);
        assert!(patch.is_empty());
    }

    #[test]
    fn test_user_patch_collects_changed_fields() {
        let user = stored_user();
        let parsed = ParsedContact {
            amo_crm_contact_id: 501,
            name: "B".to_string(),
            phone: Some("+70000000002".to_string()),
            telegram_id: Some("777".to_string()),
            city: None,
        };

        let patch = user_patch_from_contact(&user, &parsed);
        assert_eq!(patch.changed_fields(), vec!["name", "phone"]);
    }

    #[test]
    fn test_mirror_patch_writes_only_differing_fields() {
        let ids = CrmFieldIds::default();
        let request = stored_request();
        let fields = vec![
            field(ids.equipment_type, json!("Fridge")),
            field(ids.equipment_brand, json!("Bosch")),
            field(ids.quality_rating, json!("5")),
        ];

        let patch = mirror_patch(&request, Some(&fields), &ids);
        assert_eq!(patch.equipment_type, None);
        assert_eq!(patch.equipment_brand, Some("Bosch".to_string()));
        assert_eq!(patch.quality_rating, Some(5));
    }

    #[test]
    fn test_mirror_patch_rejects_out_of_range_rating() {
        let ids = CrmFieldIds::default();
        let request = stored_request();
        let fields = vec![field(ids.quality_rating, json!("9"))];

        let patch = mirror_patch(&request, Some(&fields), &ids);
        assert_eq!(patch.quality_rating, None);
    }

    #[test]
    fn test_master_identity_normalizes_phone() {
        let ids = CrmFieldIds::default();
        let fields = vec![
            field(ids.master_phone, json!("8 900 123 45 67")),
            field(ids.master_telegram_id, json!("123")),
        ];

        let (phone, telegram) = master_identity(Some(&fields), &ids);
        assert_eq!(phone, Some("+79001234567".to_string()));
        assert_eq!(telegram, Some("123".to_string()));
    }

    #[test]
    fn test_master_identity_absent() {
        let ids = CrmFieldIds::default();
        let (phone, telegram) = master_identity(None, &ids);
        assert_eq!(phone, None);
        assert_eq!(telegram, None);
    }
}
