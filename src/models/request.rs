//! Service request (repair order) model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle status of a service request. CRM is the source of truth on
/// pipeline state; the local value mirrors the last decoded CRM status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "request_status", rename_all = "snake_case")]
pub enum RequestStatus {
    Open,
    InProgress,
    Completed,
    Cancelled,
    Free,
    AwaitingClosure,
    Closed,
    QualityControl,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Open => "Open",
            RequestStatus::InProgress => "In Progress",
            RequestStatus::Completed => "Completed",
            RequestStatus::Cancelled => "Cancelled",
            RequestStatus::Free => "Free",
            RequestStatus::AwaitingClosure => "Awaiting Closure",
            RequestStatus::Closed => "Closed",
            RequestStatus::QualityControl => "Quality Control",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServiceRequest {
    pub id: i64,
    pub client_id: i64,
    pub master_id: Option<i64>,
    pub equipment_type: Option<String>,
    pub equipment_brand: Option<String>,
    pub equipment_model: Option<String>,
    pub service_name: Option<String>,
    pub city: Option<String>,
    pub status: RequestStatus,
    pub price: Decimal,
    pub quality_rating: Option<i32>,
    pub competence_rating: Option<i32>,
    pub recommendation_rating: Option<i32>,
    pub address: Option<String>,
    pub cancel_reason: Option<String>,
    pub description: Option<String>,
    pub amo_crm_lead_id: Option<i64>,
    pub amo_status_code: Option<i64>,
    pub warranty: Option<String>,
    pub parts_cost: Option<Decimal>,
    pub master_comment: Option<String>,
    pub crm_operator_comment: Option<String>,
    pub work_outcome_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServiceRequest {
    pub client_id: i64,
    pub service_name: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub equipment_type: Option<String>,
    pub equipment_brand: Option<String>,
    pub equipment_model: Option<String>,
    pub status: RequestStatus,
    pub price: Decimal,
    pub amo_crm_lead_id: Option<i64>,
    pub amo_status_code: Option<i64>,
}

/// Field-diff patch for a service request row; `None` leaves the column
/// untouched (COALESCE semantics in the repository).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceRequestPatch {
    pub master_id: Option<i64>,
    pub equipment_type: Option<String>,
    pub equipment_brand: Option<String>,
    pub equipment_model: Option<String>,
    pub service_name: Option<String>,
    pub city: Option<String>,
    pub status: Option<RequestStatus>,
    pub price: Option<Decimal>,
    pub quality_rating: Option<i32>,
    pub competence_rating: Option<i32>,
    pub recommendation_rating: Option<i32>,
    pub address: Option<String>,
    pub cancel_reason: Option<String>,
    pub description: Option<String>,
    pub amo_status_code: Option<i64>,
    pub warranty: Option<String>,
    pub parts_cost: Option<Decimal>,
    pub master_comment: Option<String>,
    pub crm_operator_comment: Option<String>,
    pub work_outcome_id: Option<i64>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ServiceRequestPatch {
    pub fn is_empty(&self) -> bool {
        self.master_id.is_none()
            && self.equipment_type.is_none()
            && self.equipment_brand.is_none()
            && self.equipment_model.is_none()
            && self.service_name.is_none()
            && self.city.is_none()
            && self.status.is_none()
            && self.price.is_none()
            && self.quality_rating.is_none()
            && self.competence_rating.is_none()
            && self.recommendation_rating.is_none()
            && self.address.is_none()
            && self.cancel_reason.is_none()
            && self.description.is_none()
            && self.amo_status_code.is_none()
            && self.warranty.is_none()
            && self.parts_cost.is_none()
            && self.master_comment.is_none()
            && self.crm_operator_comment.is_none()
            && self.work_outcome_id.is_none()
            && self.completed_at.is_none()
    }
}
