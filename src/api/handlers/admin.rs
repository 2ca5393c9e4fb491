//! Admin endpoints
//!
//! Data-fix and import operations behind the bearer-only guard.

use axum::extract::State;
use axum::Json;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::error::ApiError;
use crate::api::routes::AppState;
use crate::services::admin::{BalanceImportReport, DeleteReport, ReferrerRepairReport};
use crate::services::importer::ImportReport;
use crate::utils::errors::FixlineError;

#[derive(Debug, Deserialize)]
pub struct DeleteUserBody {
    pub telegram_id: String,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Deserialize)]
pub struct ImportBalancesBody {
    /// Raw `telegram_id, amount` lines.
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct SetDefaultOutcomeBody {
    pub name: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ImportLeadsBody {
    pub from_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct RecordDepositBody {
    pub telegram_id: String,
    pub amount: Decimal,
    pub request_id: Option<i64>,
}

/// POST /admin/delete_user/
pub async fn delete_user(
    State(state): State<AppState>,
    Json(body): Json<DeleteUserBody>,
) -> Result<Json<DeleteReport>, ApiError> {
    let report = state
        .services
        .admin_service
        .delete_user(&body.telegram_id, body.dry_run)
        .await?;
    Ok(Json(report))
}

/// POST /admin/import_balances/
pub async fn import_balances(
    State(state): State<AppState>,
    Json(body): Json<ImportBalancesBody>,
) -> Result<Json<BalanceImportReport>, ApiError> {
    let report = state.services.admin_service.import_balances(&body.data).await?;
    Ok(Json(report))
}

/// POST /admin/repair_referrers/
pub async fn repair_referrers(
    State(state): State<AppState>,
) -> Result<Json<ReferrerRepairReport>, ApiError> {
    let report = state.services.admin_service.repair_referrers().await?;
    Ok(Json(report))
}

/// POST /admin/set_ratings/
pub async fn set_ratings(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let updated = state.services.admin_service.set_all_ratings().await?;
    Ok(Json(json!({ "updated": updated })))
}

/// POST /admin/set_default_outcome/
pub async fn set_default_outcome(
    State(state): State<AppState>,
    Json(body): Json<SetDefaultOutcomeBody>,
) -> Result<Json<Value>, ApiError> {
    let updated = state
        .services
        .admin_service
        .set_default_outcome(&body.name)
        .await?;
    Ok(Json(json!({ "updated": updated })))
}

/// POST /admin/record_deposit/
///
/// Confirms a deposit for a user; their first one triggers the two-level
/// sponsor credit.
pub async fn record_deposit(
    State(state): State<AppState>,
    Json(body): Json<RecordDepositBody>,
) -> Result<Json<Value>, ApiError> {
    let user = state
        .db
        .users
        .find_by_telegram_id(&body.telegram_id)
        .await?
        .ok_or_else(|| FixlineError::UserNotFound {
            telegram_id: body.telegram_id.clone(),
        })?;

    let deposit = state
        .services
        .bonus_service
        .record_deposit(&user, body.amount, body.request_id)
        .await?;
    Ok(Json(json!({ "detail": "deposit recorded", "transaction_id": deposit.id })))
}

/// POST /admin/import_leads/
pub async fn import_leads(
    State(state): State<AppState>,
    body: Option<Json<ImportLeadsBody>>,
) -> Result<Json<ImportReport>, ApiError> {
    let from_date = body.and_then(|Json(b)| b.from_date);
    let report = state.services.import_service.import_leads(from_date).await?;
    Ok(Json(report))
}
