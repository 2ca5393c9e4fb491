//! Catalog repository: work outcomes, service types, equipment types

use sqlx::PgPool;

use crate::models::catalog::{EquipmentType, ServiceType, WorkOutcome};
use crate::utils::errors::FixlineError;

#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a work outcome by its human-readable name
    pub async fn find_outcome_by_name(&self, name: &str) -> Result<Option<WorkOutcome>, FixlineError> {
        let outcome = sqlx::query_as::<_, WorkOutcome>(
            "SELECT id, name FROM work_outcomes WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(outcome)
    }

    /// Find or create a work outcome by name
    pub async fn get_or_create_outcome(&self, name: &str) -> Result<WorkOutcome, FixlineError> {
        let outcome = sqlx::query_as::<_, WorkOutcome>(
            r#"
            INSERT INTO work_outcomes (name) VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(outcome)
    }

    /// List service types alphabetically
    pub async fn list_service_types(&self) -> Result<Vec<ServiceType>, FixlineError> {
        let rows = sqlx::query_as::<_, ServiceType>(
            "SELECT id, name FROM service_types ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// List equipment types alphabetically
    pub async fn list_equipment_types(&self) -> Result<Vec<EquipmentType>, FixlineError> {
        let rows = sqlx::query_as::<_, EquipmentType>(
            "SELECT id, name FROM equipment_types ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_catalog_repository_creation() {
        let pool = PgPool::connect("postgresql://test").await;
        if let Ok(pool) = pool {
            let repo = CatalogRepository::new(pool);
            assert!(!repo.pool.is_closed());
        }
    }
}
