//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod catalog;
pub mod master;
pub mod referral;
pub mod request;
pub mod transaction;
pub mod user;

// Re-export commonly used models
pub use catalog::{EquipmentType, ServiceType, WorkOutcome};
pub use master::{CreateMasterRequest, Master};
pub use referral::ReferralLink;
pub use request::{CreateServiceRequest, RequestStatus, ServiceRequest, ServiceRequestPatch};
pub use transaction::{
    CreateTransactionRequest, Recipient, Transaction, TransactionKind, TransactionState,
};
pub use user::{CreateUserRequest, User, UserPatch, UserRole};
