//! CRM gateway integration tests against a mock HTTP server

use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fixline::crm::client::{CrmApi, CrmClient};
use fixline::utils::errors::FixlineError;

async fn gateway(server: &MockServer) -> CrmClient {
    CrmClient::with_base_url(server.uri(), "test-token".to_string()).expect("client builds")
}

#[tokio::test]
async fn test_get_lead_deserializes_and_sends_bearer() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/leads/1001"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1001,
            "name": "Repair: Fridge",
            "status_id": 65736946,
            "price": 2500,
            "custom_fields_values": [
                {"field_id": 745555, "values": [{"value": "Repair"}]}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let lead = gateway(&server).await.get_lead(1001).await.unwrap();
    assert_eq!(lead.id, 1001);
    assert_eq!(lead.status_id, Some(65736946));
    assert_eq!(lead.price, Some(2500));
}

#[tokio::test]
async fn test_missing_embedded_is_schema_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/leads/1001/links"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .mount(&server)
        .await;

    let err = gateway(&server).await.get_lead_links(1001).await.unwrap_err();
    assert_matches!(err, FixlineError::CrmSchema(_));
}

#[tokio::test]
async fn test_no_content_listing_is_empty() {
    let server = MockServer::start().await;

    // AmoCRM answers 204 instead of an empty page
    Mock::given(method("GET"))
        .and(path("/leads"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let leads = gateway(&server)
        .await
        .list_leads(1, 250, Some("contacts"), &[])
        .await
        .unwrap();
    assert!(leads.is_empty());
}

#[tokio::test]
async fn test_list_leads_passes_filters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/leads"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "250"))
        .and(query_param("with", "contacts"))
        .and(query_param("filter[created_at][from]", "1756512000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_embedded": {"leads": [{"id": 1}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let extra = vec![(
        "filter[created_at][from]".to_string(),
        "1756512000".to_string(),
    )];
    let leads = gateway(&server)
        .await
        .list_leads(2, 250, Some("contacts"), &extra)
        .await
        .unwrap();
    assert_eq!(leads.len(), 1);
}

#[tokio::test]
async fn test_non_2xx_surfaces_crm_error_with_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/contacts/501"))
        .respond_with(
            ResponseTemplate::new(402).set_body_string("{\"detail\":\"payment required\"}"),
        )
        .mount(&server)
        .await;

    let err = gateway(&server).await.get_contact_by_id(501).await.unwrap_err();
    match err {
        FixlineError::Crm { status, body } => {
            assert_eq!(status, 402);
            assert!(body.contains("payment required"));
        }
        other => panic!("expected Crm error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_create_lead_wraps_payload_in_array() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/leads"))
        .and(wiremock::matchers::body_partial_json(json!([
            {"name": "Repair: Fridge"}
        ])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_embedded": {"leads": [{"id": 2001, "status_id": 65736946}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let lead = gateway(&server)
        .await
        .create_lead(json!({"name": "Repair: Fridge", "status_id": 65736946}))
        .await
        .unwrap();
    assert_eq!(lead.id, 2001);
}

#[tokio::test]
async fn test_search_contacts_without_terms_skips_the_wire() {
    let server = MockServer::start().await;
    // No mock mounted: a request would 404 and fail the call

    let contacts = gateway(&server).await.search_contacts(None, None).await.unwrap();
    assert!(contacts.is_empty());
}
