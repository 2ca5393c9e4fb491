//! Downstream notifier service
//!
//! Posts an enriched request summary to the bot platform reaction URL when
//! a request transitions to Free. Failures are logged and never fail the
//! caller: the webhook must acknowledge the CRM regardless.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::settings::Settings;
use crate::models::request::ServiceRequest;
use crate::utils::errors::{FixlineError, Result};

/// Free-request summary pushed downstream. Key names are part of the bot
/// platform contract and are consumed verbatim by reaction templates.
#[derive(Debug, Clone, Serialize)]
pub struct FreeRequestPayload {
    #[serde(rename = "город_заявки")]
    pub city: String,
    #[serde(rename = "адрес")]
    pub address: String,
    #[serde(rename = "дата_заявки")]
    pub created_at: String,
    #[serde(rename = "тип_оборудования")]
    pub equipment_type: String,
    #[serde(rename = "марка")]
    pub equipment_brand: String,
    #[serde(rename = "модель")]
    pub equipment_model: String,
    #[serde(rename = "комментарий")]
    pub description: String,
}

impl From<&ServiceRequest> for FreeRequestPayload {
    fn from(request: &ServiceRequest) -> Self {
        Self {
            city: request.city.clone().unwrap_or_default(),
            address: request.address.clone().unwrap_or_default(),
            created_at: request.created_at.to_rfc3339(),
            equipment_type: request.equipment_type.clone().unwrap_or_default(),
            equipment_brand: request.equipment_brand.clone().unwrap_or_default(),
            equipment_model: request.equipment_model.clone().unwrap_or_default(),
            description: request.description.clone().unwrap_or_default(),
        }
    }
}

/// Notifier service for downstream fan-out
#[derive(Debug, Clone)]
pub struct NotifierService {
    client: Client,
    url: String,
}

impl NotifierService {
    /// Create a new NotifierService instance
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.notifier.timeout_seconds))
            .user_agent("Fixline/1.0")
            .build()
            .map_err(FixlineError::Http)?;

        Ok(Self {
            client,
            url: settings.notifier.free_request_url.clone(),
        })
    }

    /// Push the Free-transition summary downstream.
    ///
    /// Returns Ok even on notifier failure; the error is logged and the
    /// webhook response to the CRM stays 200.
    pub async fn notify_free_request(&self, request: &ServiceRequest) {
        let payload = FreeRequestPayload::from(request);

        match self.send(&payload).await {
            Ok(()) => {
                debug!(request_id = request.id, "Free-request notification delivered");
            }
            Err(e) => {
                warn!(request_id = request.id, error = %e, "Free-request notification failed");
            }
        }
    }

    async fn send(&self, payload: &FreeRequestPayload) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(FixlineError::Http)?;

        if !response.status().is_success() {
            return Err(FixlineError::DownstreamNotify {
                status: response.status().as_u16(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::request::RequestStatus;
    use chrono::Utc;
    use rust_decimal::Decimal;

    #[test]
    fn test_payload_uses_contract_keys() {
        let request = ServiceRequest {
            id: 1,
            client_id: 1,
            master_id: None,
            equipment_type: Some("Fridge".to_string()),
            equipment_brand: Some("Bosch".to_string()),
            equipment_model: Some("KGN39".to_string()),
            service_name: None,
            city: Some("Moscow".to_string()),
            status: RequestStatus::Free,
            price: Decimal::ZERO,
            quality_rating: None,
            competence_rating: None,
            recommendation_rating: None,
            address: Some("Arbat 1".to_string()),
            cancel_reason: None,
            description: Some("broken".to_string()),
            amo_crm_lead_id: Some(1001),
            amo_status_code: None,
            warranty: None,
            parts_cost: None,
            master_comment: None,
            crm_operator_comment: None,
            work_outcome_id: None,
            created_at: Utc::now(),
            completed_at: None,
        };

        let payload = FreeRequestPayload::from(&request);
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["город_заявки"], "Moscow");
        assert_eq!(json["адрес"], "Arbat 1");
        assert_eq!(json["тип_оборудования"], "Fridge");
        assert_eq!(json["марка"], "Bosch");
        assert_eq!(json["модель"], "KGN39");
        assert_eq!(json["комментарий"], "broken");
        // ISO-8601 timestamp
        assert!(json["дата_заявки"].as_str().unwrap().contains('T'));
    }
}
