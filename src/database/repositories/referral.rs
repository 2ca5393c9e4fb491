//! Referral link repository implementation

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::models::referral::ReferralLink;
use crate::utils::errors::FixlineError;

const LINK_COLUMNS: &str = "id, referred_user_id, referrer_user_id, joined_at, bonus_amount";

#[derive(Debug, Clone)]
pub struct ReferralRepository {
    pool: PgPool,
}

impl ReferralRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a referral edge; at most one per referred user
    pub async fn create(
        &self,
        referred_user_id: i64,
        referrer_user_id: i64,
        bonus_amount: Decimal,
    ) -> Result<ReferralLink, FixlineError> {
        let mut conn = self.pool.acquire().await?;
        self.create_in(&mut conn, referred_user_id, referrer_user_id, bonus_amount)
            .await
    }

    /// Create a referral edge on an existing connection (caller owns the transaction)
    pub async fn create_in(
        &self,
        conn: &mut PgConnection,
        referred_user_id: i64,
        referrer_user_id: i64,
        bonus_amount: Decimal,
    ) -> Result<ReferralLink, FixlineError> {
        let link = sqlx::query_as::<_, ReferralLink>(&format!(
            r#"
            INSERT INTO referral_links (referred_user_id, referrer_user_id, bonus_amount)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            LINK_COLUMNS
        ))
        .bind(referred_user_id)
        .bind(referrer_user_id)
        .bind(bonus_amount)
        .fetch_one(conn)
        .await?;

        Ok(link)
    }

    /// Find the edge pointing out of the given referred user
    pub async fn find_by_referred(&self, referred_user_id: i64) -> Result<Option<ReferralLink>, FixlineError> {
        let link = sqlx::query_as::<_, ReferralLink>(&format!(
            "SELECT {} FROM referral_links WHERE referred_user_id = $1",
            LINK_COLUMNS
        ))
        .bind(referred_user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(link)
    }

    /// Delete all edges touching the user (admin cascade only)
    pub async fn delete_by_user_in(
        &self,
        conn: &mut PgConnection,
        user_id: i64,
    ) -> Result<u64, FixlineError> {
        let result =
            sqlx::query("DELETE FROM referral_links WHERE referred_user_id = $1 OR referrer_user_id = $1")
                .bind(user_id)
                .execute(conn)
                .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_referral_repository_creation() {
        let pool = PgPool::connect("postgresql://test").await;
        if let Ok(pool) = pool {
            let repo = ReferralRepository::new(pool);
            assert!(!repo.pool.is_closed());
        }
    }
}
