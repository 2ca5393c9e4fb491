//! Ledger transaction model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_kind", rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Penalty,
    Bonus,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "Deposit",
            TransactionKind::Withdrawal => "Withdrawal",
            TransactionKind::Penalty => "Penalty",
            TransactionKind::Bonus => "Bonus",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_state", rename_all = "lowercase")]
pub enum TransactionState {
    Pending,
    Confirmed,
    Rejected,
}

/// Ledger recipient: exactly one of a plain user or a master profile.
///
/// Modelled as a sum type so the either/or invariant is structural rather
/// than a pair of nullable columns the code has to police.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    User(i64),
    Master(i64),
}

impl Recipient {
    pub fn user_id(&self) -> Option<i64> {
        match self {
            Recipient::User(id) => Some(*id),
            Recipient::Master(_) => None,
        }
    }

    pub fn master_id(&self) -> Option<i64> {
        match self {
            Recipient::User(_) => None,
            Recipient::Master(id) => Some(*id),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Recipient::User(id) => format!("user:{}", id),
            Recipient::Master(id) => format!("master:{}", id),
        }
    }
}

/// Append-only ledger row. Never mutated after Confirmed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: i64,
    pub user_id: Option<i64>,
    pub master_id: Option<i64>,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub state: TransactionState,
    pub reason: String,
    pub request_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Reconstruct the structural recipient from the stored columns.
    pub fn recipient(&self) -> Option<Recipient> {
        match (self.user_id, self.master_id) {
            (Some(id), None) => Some(Recipient::User(id)),
            (None, Some(id)) => Some(Recipient::Master(id)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransactionRequest {
    pub recipient: Recipient,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub state: TransactionState,
    pub reason: String,
    pub request_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_is_exclusive() {
        let r = Recipient::Master(7);
        assert_eq!(r.master_id(), Some(7));
        assert_eq!(r.user_id(), None);
        assert_eq!(r.describe(), "master:7");
    }
}
