//! Master (service technician) profile model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Per-user profile augmenting role=Master. Bound 1:1 to a user row;
/// deleting the user destroys the profile.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Master {
    pub id: i64,
    pub user_id: i64,
    pub address: Option<String>,
    pub rating: Decimal,
    pub balance: Decimal,
    pub city: Option<String>,
    pub service_name: Option<String>,
    pub equipment_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMasterRequest {
    pub user_id: i64,
    pub address: Option<String>,
    pub city: Option<String>,
    pub service_name: Option<String>,
    pub equipment_type: Option<String>,
}
