//! AmoCRM API v4 gateway
//!
//! Typed operations against the CRM: fetch lead, list leads (paged), fetch
//! contact, fetch lead-contact links, create/patch contact, create lead.
//! The gateway does not retry; retry policy is the caller's concern.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::settings::Settings;
use crate::utils::errors::{FixlineError, Result};

/// Hard CRM pagination cap
pub const MAX_PAGE_LIMIT: u32 = 250;

/// One value slot of a CRM custom field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomFieldEntry {
    pub value: Value,
}

/// A custom field carried inside a lead or contact payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomFieldValue {
    pub field_id: i64,
    #[serde(default)]
    pub field_code: Option<String>,
    #[serde(default)]
    pub values: Vec<CustomFieldEntry>,
}

/// CRM lead as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status_id: Option<i64>,
    #[serde(default)]
    pub pipeline_id: Option<i64>,
    #[serde(default)]
    pub price: Option<i64>,
    #[serde(default)]
    pub custom_fields_values: Option<Vec<CustomFieldValue>>,
}

/// CRM contact as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub custom_fields_values: Option<Vec<CustomFieldValue>>,
}

/// A lead-to-entity link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityLink {
    pub to_entity_id: i64,
    pub to_entity_type: String,
}

/// Minimal lead snapshot driving reconciliation; produced either from a
/// webhook status change or from a full API lead.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadSummary {
    pub id: i64,
    pub status_id: Option<i64>,
    pub price: Option<Decimal>,
}

impl From<&Lead> for LeadSummary {
    fn from(lead: &Lead) -> Self {
        Self {
            id: lead.id,
            status_id: lead.status_id,
            price: lead.price.map(Decimal::from),
        }
    }
}

/// First value of the custom field with the given id, stringified.
///
/// Scans stop at the first matching field id; CRM may repeat ids.
pub fn first_field_value(fields: Option<&[CustomFieldValue]>, field_id: i64) -> Option<String> {
    fields?
        .iter()
        .find(|f| f.field_id == field_id)
        .and_then(|f| f.values.first())
        .map(|entry| stringify(&entry.value))
}

/// First value of the custom field with the given field code, stringified
pub fn first_field_value_by_code(
    fields: Option<&[CustomFieldValue]>,
    code: &str,
) -> Option<String> {
    fields?
        .iter()
        .find(|f| f.field_code.as_deref() == Some(code))
        .and_then(|f| f.values.first())
        .map(|entry| stringify(&entry.value))
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Typed CRM operations. Implemented by the reqwest client and by test stubs.
#[async_trait]
pub trait CrmApi: Send + Sync {
    /// Fetch a lead with its custom field values
    async fn get_lead(&self, lead_id: i64) -> Result<Lead>;

    /// Fetch the entity links of a lead (used to discover the contact)
    async fn get_lead_links(&self, lead_id: i64) -> Result<Vec<EntityLink>>;

    /// List leads, paginated; returns an empty list when exhausted
    async fn list_leads(
        &self,
        page: u32,
        limit: u32,
        with: Option<&str>,
        extra: &[(String, String)],
    ) -> Result<Vec<Lead>>;

    /// Fetch a contact by id
    async fn get_contact_by_id(&self, contact_id: i64) -> Result<Contact>;

    /// Create a contact
    async fn create_contact(&self, data: Value) -> Result<Contact>;

    /// Patch an existing contact
    async fn update_contact(&self, contact_id: i64, data: Value) -> Result<Contact>;

    /// Search contacts by phone and/or telegram id
    async fn search_contacts(
        &self,
        phone: Option<&str>,
        telegram_id: Option<&str>,
    ) -> Result<Vec<Contact>>;

    /// Create a lead
    async fn create_lead(&self, data: Value) -> Result<Lead>;
}

/// Reqwest-backed CRM gateway
#[derive(Debug, Clone)]
pub struct CrmClient {
    client: Client,
    base_url: String,
    token: String,
}

impl CrmClient {
    /// Create a new CrmClient instance
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .user_agent("Fixline/1.0")
            .build()
            .map_err(FixlineError::Http)?;

        Ok(Self {
            client,
            base_url: settings.crm_base_url(),
            token: settings.crm.token.clone(),
        })
    }

    /// Client against an explicit base URL (test servers)
    pub fn with_base_url(base_url: String, token: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent("Fixline/1.0")
            .build()
            .map_err(FixlineError::Http)?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<Value>,
    ) -> Result<Option<Value>> {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, url = %url, "CRM API request");

        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(&self.token)
            .query(query);

        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(FixlineError::Http)?;
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FixlineError::Crm {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = response.json().await.map_err(FixlineError::Http)?;
        Ok(Some(value))
    }

    /// Extract `_embedded.<key>` from an envelope response
    fn embedded(value: &Value, key: &str) -> Result<Value> {
        value
            .get("_embedded")
            .and_then(|e| e.get(key))
            .cloned()
            .ok_or_else(|| {
                FixlineError::CrmSchema(format!("response missing _embedded.{}", key))
            })
    }
}

#[async_trait]
impl CrmApi for CrmClient {
    async fn get_lead(&self, lead_id: i64) -> Result<Lead> {
        let value = self
            .request(Method::GET, &format!("/leads/{}", lead_id), &[], None)
            .await?
            .ok_or_else(|| FixlineError::CrmSchema("empty lead response".to_string()))?;

        Ok(serde_json::from_value(value)?)
    }

    async fn get_lead_links(&self, lead_id: i64) -> Result<Vec<EntityLink>> {
        let value = self
            .request(Method::GET, &format!("/leads/{}/links", lead_id), &[], None)
            .await?;

        let value = match value {
            Some(value) => value,
            None => return Ok(vec![]),
        };

        let links = Self::embedded(&value, "links")?;
        Ok(serde_json::from_value(links)?)
    }

    async fn list_leads(
        &self,
        page: u32,
        limit: u32,
        with: Option<&str>,
        extra: &[(String, String)],
    ) -> Result<Vec<Lead>> {
        let mut query: Vec<(String, String)> = vec![
            ("page".to_string(), page.to_string()),
            ("limit".to_string(), limit.min(MAX_PAGE_LIMIT).to_string()),
        ];
        if let Some(with) = with {
            query.push(("with".to_string(), with.to_string()));
        }
        query.extend_from_slice(extra);

        let value = self.request(Method::GET, "/leads", &query, None).await?;

        let value = match value {
            Some(value) => value,
            None => return Ok(vec![]),
        };

        let leads = Self::embedded(&value, "leads")?;
        Ok(serde_json::from_value(leads)?)
    }

    async fn get_contact_by_id(&self, contact_id: i64) -> Result<Contact> {
        let value = self
            .request(Method::GET, &format!("/contacts/{}", contact_id), &[], None)
            .await?
            .ok_or_else(|| FixlineError::CrmSchema("empty contact response".to_string()))?;

        Ok(serde_json::from_value(value)?)
    }

    async fn create_contact(&self, data: Value) -> Result<Contact> {
        // Create endpoints take an array of entities
        let value = self
            .request(Method::POST, "/contacts", &[], Some(Value::Array(vec![data])))
            .await?
            .ok_or_else(|| FixlineError::CrmSchema("empty create response".to_string()))?;

        let contacts: Vec<Contact> = serde_json::from_value(Self::embedded(&value, "contacts")?)?;
        contacts
            .into_iter()
            .next()
            .ok_or_else(|| FixlineError::CrmSchema("create returned no contact".to_string()))
    }

    async fn update_contact(&self, contact_id: i64, data: Value) -> Result<Contact> {
        let value = self
            .request(
                Method::PATCH,
                &format!("/contacts/{}", contact_id),
                &[],
                Some(data),
            )
            .await?
            .ok_or_else(|| FixlineError::CrmSchema("empty patch response".to_string()))?;

        Ok(serde_json::from_value(value)?)
    }

    async fn search_contacts(
        &self,
        phone: Option<&str>,
        telegram_id: Option<&str>,
    ) -> Result<Vec<Contact>> {
        let query_term = match (phone, telegram_id) {
            (Some(phone), _) => phone.to_string(),
            (None, Some(telegram_id)) => telegram_id.to_string(),
            (None, None) => return Ok(vec![]),
        };

        let value = self
            .request(
                Method::GET,
                "/contacts",
                &[("query".to_string(), query_term)],
                None,
            )
            .await?;

        let value = match value {
            Some(value) => value,
            None => return Ok(vec![]),
        };

        let contacts = Self::embedded(&value, "contacts")?;
        Ok(serde_json::from_value(contacts)?)
    }

    async fn create_lead(&self, data: Value) -> Result<Lead> {
        let value = self
            .request(Method::POST, "/leads", &[], Some(Value::Array(vec![data])))
            .await?
            .ok_or_else(|| FixlineError::CrmSchema("empty create response".to_string()))?;

        let leads: Vec<Lead> = serde_json::from_value(Self::embedded(&value, "leads")?)?;
        leads
            .into_iter()
            .next()
            .ok_or_else(|| FixlineError::CrmSchema("create returned no lead".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lead_deserialization() {
        let lead: Lead = serde_json::from_value(json!({
            "id": 1001,
            "status_id": 65736946,
            "price": 2500,
            "custom_fields_values": [
                {"field_id": 745555, "values": [{"value": "Repair"}]}
            ]
        }))
        .unwrap();

        assert_eq!(lead.id, 1001);
        assert_eq!(lead.status_id, Some(65736946));
        let summary = LeadSummary::from(&lead);
        assert_eq!(summary.price, Some(Decimal::from(2500)));
    }

    #[test]
    fn test_first_field_value_stops_at_first_match() {
        let fields = vec![
            CustomFieldValue {
                field_id: 7,
                field_code: None,
                values: vec![CustomFieldEntry { value: json!("first") }],
            },
            CustomFieldValue {
                field_id: 7,
                field_code: None,
                values: vec![CustomFieldEntry { value: json!("second") }],
            },
        ];
        assert_eq!(
            first_field_value(Some(&fields), 7),
            Some("first".to_string())
        );
        assert_eq!(first_field_value(Some(&fields), 8), None);
        assert_eq!(first_field_value(None, 7), None);
    }

    #[test]
    fn test_field_value_by_code() {
        let fields = vec![CustomFieldValue {
            field_id: 1,
            field_code: Some("PHONE".to_string()),
            values: vec![CustomFieldEntry { value: json!("+70000000001") }],
        }];
        assert_eq!(
            first_field_value_by_code(Some(&fields), "PHONE"),
            Some("+70000000001".to_string())
        );
    }

    #[test]
    fn test_numeric_field_value_stringified() {
        let fields = vec![CustomFieldValue {
            field_id: 9,
            field_code: None,
            values: vec![CustomFieldEntry { value: json!(123) }],
        }];
        assert_eq!(first_field_value(Some(&fields), 9), Some("123".to_string()));
    }
}
