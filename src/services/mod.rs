//! Services module
//!
//! This module contains business logic services

pub mod admin;
pub mod bonus;
pub mod importer;
pub mod notifier;
pub mod reconciler;
pub mod registration;

// Re-export commonly used services
pub use admin::{AdminService, BalanceImportReport, DeleteReport, ReferrerRepairReport};
pub use bonus::BonusService;
pub use importer::{ImportReport, ImportService};
pub use notifier::{FreeRequestPayload, NotifierService};
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use registration::{
    CreateRequestInput, RegisterInput, RegistrationService, TypeCatalog, UserProfile,
};

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::settings::Settings;
use crate::crm::client::CrmApi;
use crate::database::DatabaseService;
use crate::utils::errors::Result;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub reconciler: Reconciler,
    pub bonus_service: BonusService,
    pub notifier_service: NotifierService,
    pub import_service: ImportService,
    pub registration_service: RegistrationService,
    pub admin_service: AdminService,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(
        pool: PgPool,
        db: DatabaseService,
        crm: Arc<dyn CrmApi>,
        settings: Settings,
    ) -> Result<Self> {
        let reconciler = Reconciler::new(pool.clone(), db.clone(), crm.clone(), settings.clone());
        let bonus_service = BonusService::new(pool.clone(), db.clone(), settings.clone());
        let notifier_service = NotifierService::new(&settings)?;
        let import_service = ImportService::new(crm.clone(), reconciler.clone());
        let registration_service = RegistrationService::new(
            pool.clone(),
            db.clone(),
            crm,
            bonus_service.clone(),
            settings.clone(),
        );
        let admin_service = AdminService::new(pool, db, settings);

        Ok(Self {
            reconciler,
            bonus_service,
            notifier_service,
            import_service,
            registration_service,
            admin_service,
        })
    }
}
