//! User repository implementation

use sqlx::{PgConnection, PgPool};

use crate::models::user::{CreateUserRequest, User, UserPatch, UserRole};
use crate::utils::errors::FixlineError;

const USER_COLUMNS: &str = "id, name, phone, telegram_id, telegram_login, role, city, referral_link, referrer_id, amo_crm_contact_id, created_at";

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user
    pub async fn create(&self, request: CreateUserRequest) -> Result<User, FixlineError> {
        let mut conn = self.pool.acquire().await?;
        self.create_in(&mut conn, request).await
    }

    /// Create a new user on an existing connection (caller owns the transaction)
    pub async fn create_in(
        &self,
        conn: &mut PgConnection,
        request: CreateUserRequest,
    ) -> Result<User, FixlineError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, phone, telegram_id, telegram_login, role, city, referral_link, referrer_id, amo_crm_contact_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, name, phone, telegram_id, telegram_login, role, city, referral_link, referrer_id, amo_crm_contact_id, created_at
            "#,
        )
        .bind(request.name)
        .bind(request.phone)
        .bind(request.telegram_id)
        .bind(request.telegram_login)
        .bind(request.role)
        .bind(request.city)
        .bind(request.referral_link)
        .bind(request.referrer_id)
        .bind(request.amo_crm_contact_id)
        .fetch_one(conn)
        .await?;

        Ok(user)
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, FixlineError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find user by Telegram ID
    pub async fn find_by_telegram_id(&self, telegram_id: &str) -> Result<Option<User>, FixlineError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE telegram_id = $1 ORDER BY id LIMIT 1",
            USER_COLUMNS
        ))
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find user by Telegram ID and role
    pub async fn find_by_telegram_id_and_role(
        &self,
        telegram_id: &str,
        role: UserRole,
    ) -> Result<Option<User>, FixlineError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE telegram_id = $1 AND role = $2 ORDER BY id LIMIT 1",
            USER_COLUMNS
        ))
        .bind(telegram_id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// All users matching a telegram id, across roles
    pub async fn find_all_by_telegram_id(&self, telegram_id: &str) -> Result<Vec<User>, FixlineError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE telegram_id = $1 ORDER BY id",
            USER_COLUMNS
        ))
        .bind(telegram_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Find user by phone and role
    pub async fn find_by_phone_and_role(
        &self,
        phone: &str,
        role: UserRole,
    ) -> Result<Option<User>, FixlineError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE phone = $1 AND role = $2 ORDER BY id LIMIT 1",
            USER_COLUMNS
        ))
        .bind(phone)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find user by CRM contact id, locking the row for the caller's transaction
    pub async fn find_by_contact_id_for_update(
        &self,
        conn: &mut PgConnection,
        amo_crm_contact_id: i64,
    ) -> Result<Option<User>, FixlineError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE amo_crm_contact_id = $1 FOR UPDATE",
            USER_COLUMNS
        ))
        .bind(amo_crm_contact_id)
        .fetch_optional(conn)
        .await?;

        Ok(user)
    }

    /// Find user by phone and role, locking the row for the caller's transaction
    pub async fn find_by_phone_and_role_for_update(
        &self,
        conn: &mut PgConnection,
        phone: &str,
        role: UserRole,
    ) -> Result<Option<User>, FixlineError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE phone = $1 AND role = $2 ORDER BY id LIMIT 1 FOR UPDATE",
            USER_COLUMNS
        ))
        .bind(phone)
        .bind(role)
        .fetch_optional(conn)
        .await?;

        Ok(user)
    }

    /// Lock a user row by id inside the caller's transaction
    pub async fn find_by_id_for_update(
        &self,
        conn: &mut PgConnection,
        id: i64,
    ) -> Result<Option<User>, FixlineError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1 FOR UPDATE",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(user)
    }

    /// Apply a field-diff patch; unset fields keep their stored values
    pub async fn apply_patch(&self, id: i64, patch: UserPatch) -> Result<User, FixlineError> {
        let mut conn = self.pool.acquire().await?;
        self.apply_patch_in(&mut conn, id, patch).await
    }

    /// Apply a field-diff patch on an existing connection
    pub async fn apply_patch_in(
        &self,
        conn: &mut PgConnection,
        id: i64,
        patch: UserPatch,
    ) -> Result<User, FixlineError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                telegram_id = COALESCE($4, telegram_id),
                telegram_login = COALESCE($5, telegram_login),
                city = COALESCE($6, city),
                referrer_id = COALESCE($7, referrer_id),
                amo_crm_contact_id = COALESCE($8, amo_crm_contact_id)
            WHERE id = $1
            RETURNING id, name, phone, telegram_id, telegram_login, role, city, referral_link, referrer_id, amo_crm_contact_id, created_at
            "#,
        )
        .bind(id)
        .bind(patch.name)
        .bind(patch.phone)
        .bind(patch.telegram_id)
        .bind(patch.telegram_login)
        .bind(patch.city)
        .bind(patch.referrer_id)
        .bind(patch.amo_crm_contact_id)
        .fetch_one(conn)
        .await?;

        Ok(user)
    }

    /// Users whose raw referral_link is digit-only and referrer is unset
    pub async fn list_with_unresolved_referral(&self) -> Result<Vec<User>, FixlineError> {
        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {} FROM users
            WHERE referrer_id IS NULL
              AND referral_link IS NOT NULL
              AND referral_link ~ '^[0-9]+$'
            ORDER BY id
            "#,
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Delete user
    pub async fn delete_in(&self, conn: &mut PgConnection, id: i64) -> Result<(), FixlineError> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Count total users
    pub async fn count(&self) -> Result<i64, FixlineError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_user_repository_creation() {
        // This would require a test database setup
        // For now, just test that the repository can be created
        let pool = PgPool::connect("postgresql://test").await;
        if let Ok(pool) = pool {
            let repo = UserRepository::new(pool);
            assert!(!repo.pool.is_closed());
        }
    }
}
