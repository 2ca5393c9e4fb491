//! Fixline back-office service
//!
//! Back-office for a field-repair marketplace. The service mediates between
//! a chat/bot front-end (registration, order creation, status inquiries) and
//! AmoCRM, which holds the authoritative lead pipeline. It keeps a local
//! projection of users, masters, service requests, referrals and bonus
//! transactions, and synchronizes that projection with CRM leads through
//! webhooks and periodic pulls.

pub mod api;
pub mod config;
pub mod crm;
pub mod database;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{FixlineError, Result};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use services::ServiceFactory;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
