//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging
//! utilities for the Fixline application.

use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;
use crate::utils::errors::Result;

/// Initialize logging based on configuration
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let file_appender = tracing_appender::rolling::daily(&config.file_path, "fixline.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
        .init();

    info!("Logging initialized with level: {}", config.level);
    Ok(())
}

/// Log CRM gateway errors with context
pub fn log_crm_error(operation: &str, error: &str, lead_id: Option<i64>) {
    error!(
        operation = operation,
        error = error,
        lead_id = lead_id,
        "CRM API error occurred"
    );
}

/// Log reconciliation outcomes
pub fn log_reconcile_outcome(lead_id: i64, outcome: &str, request_id: Option<i64>) {
    info!(
        lead_id = lead_id,
        outcome = outcome,
        request_id = request_id,
        "Lead reconciled"
    );
}

/// Log ledger writes
pub fn log_ledger_write(recipient: &str, kind: &str, amount: &str, reason: &str) {
    info!(
        recipient = recipient,
        kind = kind,
        amount = amount,
        reason = reason,
        "Ledger transaction recorded"
    );
}

/// Log webhook status transitions
pub fn log_webhook_transition(lead_id: i64, status_id: i64, applied: bool) {
    if applied {
        info!(lead_id = lead_id, status_id = status_id, "Webhook transition applied");
    } else {
        debug!(lead_id = lead_id, status_id = status_id, "Webhook transition ignored");
    }
}

/// Log admin batch actions
pub fn log_admin_action(action: &str, affected: u64, dry_run: bool) {
    warn!(
        action = action,
        affected = affected,
        dry_run = dry_run,
        "Admin action performed"
    );
}
