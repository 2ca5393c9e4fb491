//! HTTP API module
//!
//! Inbound surface for the bot front-end, the CRM webhook and the admin
//! operations.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;

pub use error::ApiError;
pub use routes::{build_router, AppState};
