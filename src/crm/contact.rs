//! Contact parser
//!
//! Extracts phone, telegram id, display name and city from a CRM contact
//! payload's custom fields. Phone comes from the standard `PHONE` field
//! code; telegram id and city come from account-specific custom-field ids
//! carried in Settings.

use crate::config::settings::CrmFieldIds;
use crate::crm::client::{first_field_value, first_field_value_by_code, Contact};
use crate::utils::helpers::normalize_phone;

/// Normalized contact record
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedContact {
    pub amo_crm_contact_id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub telegram_id: Option<String>,
    pub city: Option<String>,
}

/// Parse a CRM contact into a normalized record; absent values stay None
pub fn parse_contact(contact: &Contact, fields: &CrmFieldIds) -> ParsedContact {
    let custom = contact.custom_fields_values.as_deref();

    let phone = first_field_value_by_code(custom, "PHONE")
        .map(|raw| normalize_phone(&raw))
        .filter(|p| !p.is_empty());
    let telegram_id =
        first_field_value(custom, fields.contact_telegram_id).filter(|v| !v.is_empty());
    let city = first_field_value(custom, fields.contact_city).filter(|v| !v.is_empty());

    ParsedContact {
        amo_crm_contact_id: contact.id,
        name: contact.name.clone().unwrap_or_default(),
        phone,
        telegram_id,
        city,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crm::client::{CustomFieldEntry, CustomFieldValue};
    use serde_json::json;

    fn field(field_id: i64, code: Option<&str>, value: serde_json::Value) -> CustomFieldValue {
        CustomFieldValue {
            field_id,
            field_code: code.map(str::to_string),
            values: vec![CustomFieldEntry { value }],
        }
    }

    #[test]
    fn test_parse_full_contact() {
        let fields = CrmFieldIds::default();
        let contact = Contact {
            id: 501,
            name: Some("A".to_string()),
            custom_fields_values: Some(vec![
                field(100, Some("PHONE"), json!("8 (900) 000-00-01")),
                field(fields.contact_telegram_id, None, json!("777")),
                field(fields.contact_city, None, json!("Moscow")),
            ]),
        };

        let parsed = parse_contact(&contact, &fields);
        assert_eq!(parsed.amo_crm_contact_id, 501);
        assert_eq!(parsed.name, "A");
        assert_eq!(parsed.phone, Some("+79000000001".to_string()));
        assert_eq!(parsed.telegram_id, Some("777".to_string()));
        assert_eq!(parsed.city, Some("Moscow".to_string()));
    }

    #[test]
    fn test_parse_contact_missing_fields() {
        let fields = CrmFieldIds::default();
        let contact = Contact {
            id: 502,
            name: None,
            custom_fields_values: None,
        };

        let parsed = parse_contact(&contact, &fields);
        assert_eq!(parsed.name, "");
        assert_eq!(parsed.phone, None);
        assert_eq!(parsed.telegram_id, None);
        assert_eq!(parsed.city, None);
    }

    #[test]
    fn test_numeric_telegram_id_is_stringified() {
        let fields = CrmFieldIds::default();
        let contact = Contact {
            id: 503,
            name: Some("B".to_string()),
            custom_fields_values: Some(vec![field(
                fields.contact_telegram_id,
                None,
                json!(123456),
            )]),
        };

        let parsed = parse_contact(&contact, &fields);
        assert_eq!(parsed.telegram_id, Some("123456".to_string()));
    }
}
