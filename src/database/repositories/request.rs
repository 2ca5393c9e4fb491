//! Service request repository implementation

use sqlx::{PgConnection, PgPool};

use crate::models::request::{
    CreateServiceRequest, RequestStatus, ServiceRequest, ServiceRequestPatch,
};
use crate::utils::errors::FixlineError;

const REQUEST_COLUMNS: &str = "id, client_id, master_id, equipment_type, equipment_brand, equipment_model, service_name, city, status, price, quality_rating, competence_rating, recommendation_rating, address, cancel_reason, description, amo_crm_lead_id, amo_status_code, warranty, parts_cost, master_comment, crm_operator_comment, work_outcome_id, created_at, completed_at";

#[derive(Debug, Clone)]
pub struct RequestRepository {
    pool: PgPool,
}

impl RequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a service request
    pub async fn create(&self, request: CreateServiceRequest) -> Result<ServiceRequest, FixlineError> {
        let mut conn = self.pool.acquire().await?;
        self.create_in(&mut conn, request).await
    }

    /// Create a service request on an existing connection
    pub async fn create_in(
        &self,
        conn: &mut PgConnection,
        request: CreateServiceRequest,
    ) -> Result<ServiceRequest, FixlineError> {
        let row = sqlx::query_as::<_, ServiceRequest>(&format!(
            r#"
            INSERT INTO service_requests
                (client_id, service_name, city, address, description,
                 equipment_type, equipment_brand, equipment_model,
                 status, price, amo_crm_lead_id, amo_status_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(request.client_id)
        .bind(request.service_name)
        .bind(request.city)
        .bind(request.address)
        .bind(request.description)
        .bind(request.equipment_type)
        .bind(request.equipment_brand)
        .bind(request.equipment_model)
        .bind(request.status)
        .bind(request.price)
        .bind(request.amo_crm_lead_id)
        .bind(request.amo_status_code)
        .fetch_one(conn)
        .await?;

        Ok(row)
    }

    /// Find request by id
    pub async fn find_by_id(&self, id: i64) -> Result<Option<ServiceRequest>, FixlineError> {
        let row = sqlx::query_as::<_, ServiceRequest>(&format!(
            "SELECT {} FROM service_requests WHERE id = $1",
            REQUEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Find request by CRM lead id
    pub async fn find_by_lead_id(&self, lead_id: i64) -> Result<Option<ServiceRequest>, FixlineError> {
        let row = sqlx::query_as::<_, ServiceRequest>(&format!(
            "SELECT {} FROM service_requests WHERE amo_crm_lead_id = $1",
            REQUEST_COLUMNS
        ))
        .bind(lead_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Find request by CRM lead id, locking the row for the caller's transaction
    pub async fn find_by_lead_id_for_update(
        &self,
        conn: &mut PgConnection,
        lead_id: i64,
    ) -> Result<Option<ServiceRequest>, FixlineError> {
        let row = sqlx::query_as::<_, ServiceRequest>(&format!(
            "SELECT {} FROM service_requests WHERE amo_crm_lead_id = $1 FOR UPDATE",
            REQUEST_COLUMNS
        ))
        .bind(lead_id)
        .fetch_optional(conn)
        .await?;

        Ok(row)
    }

    /// Apply a field-diff patch; unset fields keep their stored values
    pub async fn apply_patch(
        &self,
        id: i64,
        patch: ServiceRequestPatch,
    ) -> Result<ServiceRequest, FixlineError> {
        let mut conn = self.pool.acquire().await?;
        self.apply_patch_in(&mut conn, id, patch).await
    }

    /// Apply a field-diff patch on an existing connection
    pub async fn apply_patch_in(
        &self,
        conn: &mut PgConnection,
        id: i64,
        patch: ServiceRequestPatch,
    ) -> Result<ServiceRequest, FixlineError> {
        let row = sqlx::query_as::<_, ServiceRequest>(&format!(
            r#"
            UPDATE service_requests
            SET master_id = COALESCE($2, master_id),
                equipment_type = COALESCE($3, equipment_type),
                equipment_brand = COALESCE($4, equipment_brand),
                equipment_model = COALESCE($5, equipment_model),
                service_name = COALESCE($6, service_name),
                city = COALESCE($7, city),
                status = COALESCE($8, status),
                price = COALESCE($9, price),
                quality_rating = COALESCE($10, quality_rating),
                competence_rating = COALESCE($11, competence_rating),
                recommendation_rating = COALESCE($12, recommendation_rating),
                address = COALESCE($13, address),
                cancel_reason = COALESCE($14, cancel_reason),
                description = COALESCE($15, description),
                amo_status_code = COALESCE($16, amo_status_code),
                warranty = COALESCE($17, warranty),
                parts_cost = COALESCE($18, parts_cost),
                master_comment = COALESCE($19, master_comment),
                crm_operator_comment = COALESCE($20, crm_operator_comment),
                work_outcome_id = COALESCE($21, work_outcome_id),
                completed_at = COALESCE($22, completed_at)
            WHERE id = $1
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(id)
        .bind(patch.master_id)
        .bind(patch.equipment_type)
        .bind(patch.equipment_brand)
        .bind(patch.equipment_model)
        .bind(patch.service_name)
        .bind(patch.city)
        .bind(patch.status)
        .bind(patch.price)
        .bind(patch.quality_rating)
        .bind(patch.competence_rating)
        .bind(patch.recommendation_rating)
        .bind(patch.address)
        .bind(patch.cancel_reason)
        .bind(patch.description)
        .bind(patch.amo_status_code)
        .bind(patch.warranty)
        .bind(patch.parts_cost)
        .bind(patch.master_comment)
        .bind(patch.crm_operator_comment)
        .bind(patch.work_outcome_id)
        .bind(patch.completed_at)
        .fetch_one(conn)
        .await?;

        Ok(row)
    }

    /// Requests where the given user is the client, newest first
    pub async fn list_by_client(&self, client_id: i64) -> Result<Vec<ServiceRequest>, FixlineError> {
        let rows = sqlx::query_as::<_, ServiceRequest>(&format!(
            "SELECT {} FROM service_requests WHERE client_id = $1 ORDER BY created_at DESC",
            REQUEST_COLUMNS
        ))
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Active (in progress) requests assigned to the given master
    pub async fn list_active_by_master(&self, master_id: i64) -> Result<Vec<ServiceRequest>, FixlineError> {
        let rows = sqlx::query_as::<_, ServiceRequest>(&format!(
            "SELECT {} FROM service_requests WHERE master_id = $1 AND status = $2 ORDER BY created_at DESC",
            REQUEST_COLUMNS
        ))
        .bind(master_id)
        .bind(RequestStatus::InProgress)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Set ratings to the given value on all completed requests; returns rows affected
    pub async fn set_ratings_on_completed(&self, value: i32) -> Result<u64, FixlineError> {
        let result = sqlx::query(
            r#"
            UPDATE service_requests
            SET quality_rating = $1, competence_rating = $1, recommendation_rating = $1
            WHERE status = $2
            "#,
        )
        .bind(value)
        .bind(RequestStatus::Completed)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Set the work outcome on all requests that have none; returns rows affected
    pub async fn set_default_outcome(&self, work_outcome_id: i64) -> Result<u64, FixlineError> {
        let result = sqlx::query(
            "UPDATE service_requests SET work_outcome_id = $1 WHERE work_outcome_id IS NULL",
        )
        .bind(work_outcome_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Delete all requests where the user is the client
    pub async fn delete_by_client_in(
        &self,
        conn: &mut PgConnection,
        client_id: i64,
    ) -> Result<u64, FixlineError> {
        let result = sqlx::query("DELETE FROM service_requests WHERE client_id = $1")
            .bind(client_id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Delete all requests assigned to the master
    pub async fn delete_by_master_in(
        &self,
        conn: &mut PgConnection,
        master_id: i64,
    ) -> Result<u64, FixlineError> {
        let result = sqlx::query("DELETE FROM service_requests WHERE master_id = $1")
            .bind(master_id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Count total requests
    pub async fn count(&self) -> Result<i64, FixlineError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM service_requests")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_request_repository_creation() {
        let pool = PgPool::connect("postgresql://test").await;
        if let Ok(pool) = pool {
            let repo = RequestRepository::new(pool);
            assert!(!repo.pool.is_closed());
        }
    }
}
