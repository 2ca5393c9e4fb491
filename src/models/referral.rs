//! Referral link model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Materialized referral edge (referred user -> referrer user).
/// Created once per pair; the graph forms a directed forest.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReferralLink {
    pub id: i64,
    pub referred_user_id: i64,
    pub referrer_user_id: i64,
    pub joined_at: DateTime<Utc>,
    pub bonus_amount: Decimal,
}
