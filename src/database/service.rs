//! Database service layer
//!
//! This module provides a high-level interface to database operations

use sqlx::PgConnection;

use crate::database::{
    CatalogRepository, DatabasePool, MasterRepository, ReferralRepository, RequestRepository,
    TransactionRepository, UserRepository,
};
use crate::models::*;
use crate::utils::errors::FixlineError;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pub users: UserRepository,
    pub masters: MasterRepository,
    pub requests: RequestRepository,
    pub transactions: TransactionRepository,
    pub referrals: ReferralRepository,
    pub catalog: CatalogRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            masters: MasterRepository::new(pool.clone()),
            requests: RequestRepository::new(pool.clone()),
            transactions: TransactionRepository::new(pool.clone()),
            referrals: ReferralRepository::new(pool.clone()),
            catalog: CatalogRepository::new(pool),
        }
    }

    /// Resolve the ledger recipient for a user: masters are credited on
    /// their profile, everyone else directly on the user row.
    pub async fn resolve_recipient(&self, user: &User) -> Result<Recipient, FixlineError> {
        if user.role == UserRole::Master {
            if let Some(master) = self.masters.find_by_user_id(user.id).await? {
                return Ok(Recipient::Master(master.id));
            }
        }
        Ok(Recipient::User(user.id))
    }

    /// Recipient resolution on an existing connection, so an uncommitted
    /// master profile in the caller's transaction is visible.
    pub async fn resolve_recipient_in(
        &self,
        conn: &mut PgConnection,
        user: &User,
    ) -> Result<Recipient, FixlineError> {
        if user.role == UserRole::Master {
            if let Some(master) = self.masters.find_by_user_id_in(conn, user.id).await? {
                return Ok(Recipient::Master(master.id));
            }
        }
        Ok(Recipient::User(user.id))
    }

    /// Walk up the referrer chain and refuse an edge that would close a cycle.
    ///
    /// Returns true when binding `referrer_id` as the sponsor of
    /// `candidate_id` keeps the referral graph a forest.
    pub async fn referral_edge_is_acyclic(
        &self,
        candidate_id: i64,
        referrer_id: i64,
    ) -> Result<bool, FixlineError> {
        if candidate_id == referrer_id {
            return Ok(false);
        }

        let mut cursor = Some(referrer_id);
        // Legacy data may contain transient cycles; bound the walk.
        let mut hops = 0;
        while let Some(current) = cursor {
            if current == candidate_id {
                return Ok(false);
            }
            hops += 1;
            if hops > 100 {
                return Ok(false);
            }
            cursor = match self.users.find_by_id(current).await? {
                Some(user) => user.referrer_id,
                None => None,
            };
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_service_creation() {
        // This would require a test database setup
        // For now, just test that the service can be created
        let pool = sqlx::PgPool::connect("postgresql://test").await;
        if let Ok(pool) = pool {
            let service = DatabaseService::new(pool);
            // Self-referral is refused before any query runs
            let acyclic = service.referral_edge_is_acyclic(1, 1).await.unwrap();
            assert!(!acyclic);
        }
    }
}
