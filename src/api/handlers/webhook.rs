//! CRM webhook endpoint
//!
//! AmoCRM pushes lead status changes as bracketed form-encoded bodies.
//! Only the Free transition carries a local side effect: the matching
//! request flips to Free under a row lock and the summary is fanned out
//! to the bot platform. Every other transition is acknowledged and left
//! to the batch importer.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use tracing::warn;

use crate::api::error::ApiError;
use crate::api::routes::AppState;
use crate::crm::form;
use crate::crm::status::decode_status;
use crate::models::request::{RequestStatus, ServiceRequestPatch};
use crate::utils::errors::{FixlineError, Result};
use crate::utils::logging::log_webhook_transition;

/// One status change from the webhook batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub lead_id: i64,
    pub status_id: i64,
}

/// POST /amocrm/webhook/
pub async fn amocrm_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> std::result::Result<Json<Value>, ApiError> {
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(&body)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let decoded = form::decode(&pairs);
    let changes = parse_changes(&decoded)?;

    // One bad change must not poison the rest of the batch
    for change in &changes {
        if let Err(e) = apply_change(&state, change).await {
            warn!(lead_id = change.lead_id, error = %e, "Webhook change failed");
        }
    }

    Ok(Json(json!({ "detail": "ok" })))
}

/// Validate the decoded webhook shape and pull out the status batch
pub fn parse_changes(decoded: &Value) -> Result<Vec<StatusChange>> {
    let entries = decoded
        .get("leads")
        .and_then(|leads| leads.get("status"))
        .and_then(|status| status.as_array())
        .filter(|entries| !entries.is_empty())
        .ok_or_else(|| {
            FixlineError::validation("leads.status", "must be a non-empty list of status changes")
        })?;

    let mut changes = Vec::with_capacity(entries.len());
    for entry in entries {
        let lead_id = lenient_i64(entry.get("id"));
        let status_id = lenient_i64(entry.get("status_id"));
        match (lead_id, status_id) {
            (Some(lead_id), Some(status_id)) => changes.push(StatusChange { lead_id, status_id }),
            _ => warn!(entry = %entry, "Webhook status entry missing id or status_id"),
        }
    }

    Ok(changes)
}

/// Form values arrive as strings; tolerate native numbers as well
fn lenient_i64(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

async fn apply_change(state: &AppState, change: &StatusChange) -> Result<()> {
    if decode_status(change.status_id) != RequestStatus::Free {
        log_webhook_transition(change.lead_id, change.status_id, false);
        return Ok(());
    }

    let mut tx = state.pool.begin().await?;

    let request = state
        .db
        .requests
        .find_by_lead_id_for_update(&mut tx, change.lead_id)
        .await?;
    let request = match request {
        Some(request) => request,
        None => {
            warn!(lead_id = change.lead_id, "Free transition for unknown lead ignored");
            return Ok(());
        }
    };

    let patched = state
        .db
        .requests
        .apply_patch_in(
            &mut tx,
            request.id,
            ServiceRequestPatch {
                status: Some(RequestStatus::Free),
                amo_status_code: Some(change.status_id),
                ..Default::default()
            },
        )
        .await?;

    tx.commit().await?;
    log_webhook_transition(change.lead_id, change.status_id, true);

    // Fan-out happens after commit; notifier failures are logged inside
    state.services.notifier_service.notify_free_request(&patched).await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded_body(pairs: &[(&str, &str)]) -> Value {
        let owned: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        form::decode(&owned)
    }

    #[test]
    fn test_parse_changes_from_bracketed_form() {
        let decoded = decoded_body(&[
            ("leads[status][0][id]", "1001"),
            ("leads[status][0][status_id]", "63819778"),
            ("leads[status][0][old_status_id]", "65736946"),
            ("leads[status][1][id]", "1002"),
            ("leads[status][1][status_id]", "142"),
            ("account[subdomain]", "acme"),
        ]);

        let changes = parse_changes(&decoded).unwrap();
        assert_eq!(
            changes,
            vec![
                StatusChange { lead_id: 1001, status_id: 63819778 },
                StatusChange { lead_id: 1002, status_id: 142 },
            ]
        );
    }

    #[test]
    fn test_empty_status_batch_is_rejected() {
        let decoded = decoded_body(&[("account[subdomain]", "acme")]);
        assert!(parse_changes(&decoded).is_err());
    }

    #[test]
    fn test_entries_without_ids_are_dropped() {
        let decoded = decoded_body(&[
            ("leads[status][0][status_id]", "63819778"),
            ("leads[status][1][id]", "1002"),
            ("leads[status][1][status_id]", "63819778"),
        ]);

        let changes = parse_changes(&decoded).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].lead_id, 1002);
    }

    #[test]
    fn test_lenient_i64_accepts_strings_and_numbers() {
        assert_eq!(lenient_i64(Some(&json!("42"))), Some(42));
        assert_eq!(lenient_i64(Some(&json!(42))), Some(42));
        assert_eq!(lenient_i64(Some(&json!(" 42 "))), Some(42));
        assert_eq!(lenient_i64(Some(&json!("abc"))), None);
        assert_eq!(lenient_i64(None), None);
    }
}
