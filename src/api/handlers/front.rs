//! Front-end facing handlers
//!
//! Registration, order creation and the request lifecycle endpoints
//! consumed by the chat/bot platform.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::error::ApiError;
use crate::api::routes::AppState;
use crate::models::request::ServiceRequest;
use crate::services::registration::{CreateRequestInput, RegisterInput, TypeCatalog, UserProfile};

#[derive(Debug, Deserialize)]
pub struct TelegramIdBody {
    pub telegram_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RequestActionBody {
    pub telegram_id: String,
    pub request_id: i64,
}

/// POST /register/
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user = state.services.registration_service.register(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "detail": format!("user {} registered", user.id) })),
    ))
}

/// POST /create_request/
pub async fn create_request(
    State(state): State<AppState>,
    Json(input): Json<CreateRequestInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let request = state
        .services
        .registration_service
        .create_request(input)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "detail": "request created", "request_id": request.id })),
    ))
}

/// POST /requests_history/
pub async fn requests_history(
    State(state): State<AppState>,
    Json(body): Json<TelegramIdBody>,
) -> Result<Json<Vec<ServiceRequest>>, ApiError> {
    let requests = state
        .services
        .registration_service
        .requests_history(&body.telegram_id)
        .await?;
    Ok(Json(requests))
}

/// POST /master/active/
pub async fn master_active(
    State(state): State<AppState>,
    Json(body): Json<TelegramIdBody>,
) -> Result<Json<Vec<ServiceRequest>>, ApiError> {
    let requests = state
        .services
        .registration_service
        .master_active(&body.telegram_id)
        .await?;
    Ok(Json(requests))
}

/// POST /assign/
pub async fn assign(
    State(state): State<AppState>,
    Json(body): Json<RequestActionBody>,
) -> Result<Json<Value>, ApiError> {
    let request = state
        .services
        .registration_service
        .assign(&body.telegram_id, body.request_id)
        .await?;
    Ok(Json(json!({ "detail": format!("request {} assigned", request.id) })))
}

/// POST /close/
pub async fn close(
    State(state): State<AppState>,
    Json(body): Json<RequestActionBody>,
) -> Result<Json<Value>, ApiError> {
    let request = state
        .services
        .registration_service
        .close(&body.telegram_id, body.request_id)
        .await?;
    Ok(Json(json!({ "detail": format!("request {} closed", request.id) })))
}

/// POST /profile/
pub async fn profile(
    State(state): State<AppState>,
    Json(body): Json<TelegramIdBody>,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state
        .services
        .registration_service
        .profile(&body.telegram_id)
        .await?;
    Ok(Json(profile))
}

/// POST /types/
pub async fn types(State(state): State<AppState>) -> Result<Json<TypeCatalog>, ApiError> {
    let catalog = state.services.registration_service.types().await?;
    Ok(Json(catalog))
}
