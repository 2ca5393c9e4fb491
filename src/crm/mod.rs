//! AmoCRM integration module
//!
//! Gateway, webhook body decoding, status codec and contact parsing for
//! the external CRM that owns the lead pipeline.

pub mod client;
pub mod contact;
pub mod form;
pub mod status;

// Re-export commonly used types
pub use client::{
    first_field_value, first_field_value_by_code, Contact, CrmApi, CrmClient, CustomFieldEntry,
    CustomFieldValue, EntityLink, Lead, LeadSummary, MAX_PAGE_LIMIT,
};
pub use contact::{parse_contact, ParsedContact};
pub use status::{decode_status, encode_status};
