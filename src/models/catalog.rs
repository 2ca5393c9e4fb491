//! Catalog models: work outcomes, service types, equipment types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Work-outcome classification referenced by service requests,
/// keyed by human-readable name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkOutcome {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServiceType {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EquipmentType {
    pub id: i64,
    pub name: String,
}
