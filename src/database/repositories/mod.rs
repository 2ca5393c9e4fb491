//! Database repositories module
//!
//! This module contains all repository implementations for data access

pub mod catalog;
pub mod master;
pub mod referral;
pub mod request;
pub mod transaction;
pub mod user;

// Re-export repositories
pub use catalog::CatalogRepository;
pub use master::MasterRepository;
pub use referral::ReferralRepository;
pub use request::RequestRepository;
pub use transaction::TransactionRepository;
pub use user::UserRepository;
