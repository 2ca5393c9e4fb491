//! Batch importer
//!
//! Paginated backfill of CRM leads through the reconciler. Used for
//! catch-up after downtime and for the initial projection build; the
//! webhook only carries Free transitions, so this is the authoritative
//! cross-transition channel.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::crm::client::{CrmApi, LeadSummary, MAX_PAGE_LIMIT};
use crate::services::reconciler::{ReconcileOutcome, Reconciler};
use crate::utils::errors::Result;

/// Outcome counters for one import run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub new: u64,
    pub updated: u64,
    pub skipped: u64,
    pub errors: u64,
}

/// Importer service
#[derive(Clone)]
pub struct ImportService {
    crm: Arc<dyn CrmApi>,
    reconciler: Reconciler,
}

impl ImportService {
    /// Create a new ImportService instance
    pub fn new(crm: Arc<dyn CrmApi>, reconciler: Reconciler) -> Self {
        Self { crm, reconciler }
    }

    /// Replay CRM leads through the reconciler.
    ///
    /// `from_date` bounds the pull to leads created at or after midnight
    /// UTC of that date. A failing lead is counted and skipped; it never
    /// poisons the rest of the batch.
    pub async fn import_leads(&self, from_date: Option<NaiveDate>) -> Result<ImportReport> {
        let mut report = ImportReport::default();
        let mut extra: Vec<(String, String)> = Vec::new();

        if let Some(from_date) = from_date {
            let midnight = from_date
                .and_hms_opt(0, 0, 0)
                .expect("midnight is always valid")
                .and_utc()
                .timestamp();
            extra.push(("filter[created_at][from]".to_string(), midnight.to_string()));
        }

        let mut page = 1u32;
        loop {
            let leads = self
                .crm
                .list_leads(page, MAX_PAGE_LIMIT, Some("contacts"), &extra)
                .await?;

            if leads.is_empty() {
                break;
            }

            for lead in &leads {
                let summary = LeadSummary::from(lead);
                match self.reconciler.save_lead(&summary).await {
                    Ok(ReconcileOutcome::Created(_)) => report.new += 1,
                    Ok(ReconcileOutcome::Updated(_)) => report.updated += 1,
                    Ok(ReconcileOutcome::Skipped) => report.skipped += 1,
                    Err(e) => {
                        warn!(lead_id = lead.id, error = %e, "Lead import failed");
                        report.errors += 1;
                    }
                }
            }

            page += 1;
        }

        info!(
            new = report.new,
            updated = report.updated,
            skipped = report.skipped,
            errors = report.errors,
            "Lead import completed"
        );
        Ok(report)
    }
}
