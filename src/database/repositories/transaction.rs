//! Ledger transaction repository implementation
//!
//! The ledger is append-only: rows are inserted and read, never updated
//! or deleted outside the admin cascade.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::models::transaction::{
    CreateTransactionRequest, Recipient, Transaction, TransactionKind, TransactionState,
};
use crate::utils::errors::FixlineError;

const TX_COLUMNS: &str =
    "id, user_id, master_id, amount, kind, state, reason, request_id, created_at";

#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append a ledger row
    pub async fn create(&self, request: CreateTransactionRequest) -> Result<Transaction, FixlineError> {
        let mut conn = self.pool.acquire().await?;
        self.create_in(&mut conn, request).await
    }

    /// Append a ledger row on an existing connection
    pub async fn create_in(
        &self,
        conn: &mut PgConnection,
        request: CreateTransactionRequest,
    ) -> Result<Transaction, FixlineError> {
        let row = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            INSERT INTO transactions (user_id, master_id, amount, kind, state, reason, request_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            TX_COLUMNS
        ))
        .bind(request.recipient.user_id())
        .bind(request.recipient.master_id())
        .bind(request.amount)
        .bind(request.kind)
        .bind(request.state)
        .bind(request.reason)
        .bind(request.request_id)
        .fetch_one(conn)
        .await?;

        Ok(row)
    }

    /// Count confirmed transactions of a kind for a recipient
    pub async fn count_confirmed_in(
        &self,
        conn: &mut PgConnection,
        recipient: Recipient,
        kind: TransactionKind,
    ) -> Result<i64, FixlineError> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM transactions
            WHERE kind = $1 AND state = $2
              AND (($3::bigint IS NOT NULL AND user_id = $3)
                OR ($4::bigint IS NOT NULL AND master_id = $4))
            "#,
        )
        .bind(kind)
        .bind(TransactionState::Confirmed)
        .bind(recipient.user_id())
        .bind(recipient.master_id())
        .fetch_one(conn)
        .await?;

        Ok(count.0)
    }

    /// Duplicate check for balance imports: a confirmed row with the same
    /// master, kind and absolute amount already exists. Runs on the
    /// caller's connection so it can sit behind a master row lock.
    pub async fn exists_confirmed_for_master_in(
        &self,
        conn: &mut PgConnection,
        master_id: i64,
        kind: TransactionKind,
        abs_amount: Decimal,
    ) -> Result<bool, FixlineError> {
        let row: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM transactions
                WHERE master_id = $1 AND kind = $2 AND state = $3 AND abs(amount) = $4
            )
            "#,
        )
        .bind(master_id)
        .bind(kind)
        .bind(TransactionState::Confirmed)
        .bind(abs_amount)
        .fetch_one(conn)
        .await?;

        Ok(row.0)
    }

    /// All transactions for a person across both roles
    pub async fn list_for_person(
        &self,
        user_id: i64,
        master_id: Option<i64>,
    ) -> Result<Vec<Transaction>, FixlineError> {
        let rows = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            SELECT {} FROM transactions
            WHERE user_id = $1 OR ($2::bigint IS NOT NULL AND master_id = $2)
            ORDER BY created_at DESC
            "#,
            TX_COLUMNS
        ))
        .bind(user_id)
        .bind(master_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Delete all rows owned by a user (admin cascade only)
    pub async fn delete_by_user_in(
        &self,
        conn: &mut PgConnection,
        user_id: i64,
    ) -> Result<u64, FixlineError> {
        let result = sqlx::query("DELETE FROM transactions WHERE user_id = $1")
            .bind(user_id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Delete all rows owned by a master (admin cascade only)
    pub async fn delete_by_master_in(
        &self,
        conn: &mut PgConnection,
        master_id: i64,
    ) -> Result<u64, FixlineError> {
        let result = sqlx::query("DELETE FROM transactions WHERE master_id = $1")
            .bind(master_id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transaction_repository_creation() {
        let pool = PgPool::connect("postgresql://test").await;
        if let Ok(pool) = pool {
            let repo = TransactionRepository::new(pool);
            assert!(!repo.pool.is_closed());
        }
    }
}
