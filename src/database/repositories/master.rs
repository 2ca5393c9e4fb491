//! Master repository implementation

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::models::master::{CreateMasterRequest, Master};
use crate::utils::errors::FixlineError;

const MASTER_COLUMNS: &str =
    "id, user_id, address, rating, balance, city, service_name, equipment_type";

#[derive(Debug, Clone)]
pub struct MasterRepository {
    pool: PgPool,
}

impl MasterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a master profile for a user
    pub async fn create(&self, request: CreateMasterRequest) -> Result<Master, FixlineError> {
        let mut conn = self.pool.acquire().await?;
        self.create_in(&mut conn, request).await
    }

    /// Create a master profile on an existing connection (caller owns the transaction)
    pub async fn create_in(
        &self,
        conn: &mut PgConnection,
        request: CreateMasterRequest,
    ) -> Result<Master, FixlineError> {
        let master = sqlx::query_as::<_, Master>(
            r#"
            INSERT INTO masters (user_id, address, city, service_name, equipment_type)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, address, rating, balance, city, service_name, equipment_type
            "#,
        )
        .bind(request.user_id)
        .bind(request.address)
        .bind(request.city)
        .bind(request.service_name)
        .bind(request.equipment_type)
        .fetch_one(conn)
        .await?;

        Ok(master)
    }

    /// Find master profile by the owning user id
    pub async fn find_by_user_id(&self, user_id: i64) -> Result<Option<Master>, FixlineError> {
        let mut conn = self.pool.acquire().await?;
        self.find_by_user_id_in(&mut conn, user_id).await
    }

    /// Find master profile by the owning user id on an existing connection
    pub async fn find_by_user_id_in(
        &self,
        conn: &mut PgConnection,
        user_id: i64,
    ) -> Result<Option<Master>, FixlineError> {
        let master = sqlx::query_as::<_, Master>(&format!(
            "SELECT {} FROM masters WHERE user_id = $1",
            MASTER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

        Ok(master)
    }

    /// Lock a master row by id inside the caller's transaction
    pub async fn find_by_id_for_update(
        &self,
        conn: &mut PgConnection,
        id: i64,
    ) -> Result<Option<Master>, FixlineError> {
        let master = sqlx::query_as::<_, Master>(&format!(
            "SELECT {} FROM masters WHERE id = $1 FOR UPDATE",
            MASTER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(master)
    }

    /// Find the master whose user matches the given phone or telegram id.
    ///
    /// When several match, the lowest surrogate id wins (stable tie-break).
    pub async fn find_by_user_phone_or_telegram_in(
        &self,
        conn: &mut PgConnection,
        phone: Option<&str>,
        telegram_id: Option<&str>,
    ) -> Result<Option<Master>, FixlineError> {
        if phone.is_none() && telegram_id.is_none() {
            return Ok(None);
        }

        let master = sqlx::query_as::<_, Master>(
            r#"
            SELECT m.id, m.user_id, m.address, m.rating, m.balance, m.city, m.service_name, m.equipment_type
            FROM masters m
            JOIN users u ON u.id = m.user_id
            WHERE ($1::text IS NOT NULL AND u.phone = $1)
               OR ($2::text IS NOT NULL AND u.telegram_id = $2)
            ORDER BY m.id
            LIMIT 1
            "#,
        )
        .bind(phone)
        .bind(telegram_id)
        .fetch_optional(conn)
        .await?;

        Ok(master)
    }

    /// Add a confirmed amount to the stored balance (caller owns the transaction)
    pub async fn add_to_balance_in(
        &self,
        conn: &mut PgConnection,
        master_id: i64,
        amount: Decimal,
    ) -> Result<(), FixlineError> {
        sqlx::query("UPDATE masters SET balance = balance + $2 WHERE id = $1")
            .bind(master_id)
            .bind(amount)
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Delete master profile
    pub async fn delete_in(&self, conn: &mut PgConnection, id: i64) -> Result<(), FixlineError> {
        sqlx::query("DELETE FROM masters WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_master_repository_creation() {
        let pool = PgPool::connect("postgresql://test").await;
        if let Ok(pool) = pool {
            let repo = MasterRepository::new(pool);
            assert!(!repo.pool.is_closed());
        }
    }
}
