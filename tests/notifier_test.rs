//! Downstream notifier integration tests against a mock HTTP server

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fixline::config::Settings;
use fixline::models::request::{RequestStatus, ServiceRequest};
use fixline::services::NotifierService;

fn free_request() -> ServiceRequest {
    ServiceRequest {
        id: 1,
        client_id: 1,
        master_id: None,
        equipment_type: Some("Холодильник".to_string()),
        equipment_brand: Some("Bosch".to_string()),
        equipment_model: Some("KGN39".to_string()),
        service_name: Some("Ремонт".to_string()),
        city: Some("Москва".to_string()),
        status: RequestStatus::Free,
        price: Decimal::ZERO,
        quality_rating: None,
        competence_rating: None,
        recommendation_rating: None,
        address: Some("Арбат 1".to_string()),
        cancel_reason: None,
        description: Some("не морозит".to_string()),
        amo_crm_lead_id: Some(1001),
        amo_status_code: Some(63819778),
        warranty: None,
        parts_cost: None,
        master_comment: None,
        crm_operator_comment: None,
        work_outcome_id: None,
        created_at: Utc::now(),
        completed_at: None,
    }
}

fn notifier_for(server: &MockServer) -> NotifierService {
    let mut settings = Settings::default();
    settings.notifier.free_request_url = format!("{}/reactions/42/start", server.uri());
    settings.notifier.timeout_seconds = 2;
    NotifierService::new(&settings).expect("notifier builds")
}

#[tokio::test]
async fn test_free_request_payload_reaches_notifier() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/reactions/42/start"))
        .and(body_partial_json(json!({
            "город_заявки": "Москва",
            "адрес": "Арбат 1",
            "тип_оборудования": "Холодильник",
            "марка": "Bosch",
            "модель": "KGN39",
            "комментарий": "не морозит"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    notifier_for(&server).notify_free_request(&free_request()).await;
}

#[tokio::test]
async fn test_notifier_failure_is_swallowed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/reactions/42/start"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    // Must not panic or propagate; the webhook response stays 200
    notifier_for(&server).notify_free_request(&free_request()).await;
}
