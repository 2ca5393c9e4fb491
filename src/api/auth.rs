//! Inbound request authentication
//!
//! Two layers: the public surface accepts either the static service
//! bearer or a request originating from an allowlisted host, while the
//! admin surface accepts the bearer only.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;
use url::Url;

use crate::api::error::ApiError;
use crate::api::routes::AppState;
use crate::utils::errors::FixlineError;

/// Bearer-or-origin guard for the public surface
pub async fn require_caller(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if bearer_matches(&request, &state.settings.server.service_token)
        || origin_allowed(&request, &state.settings.allowed_origin_hosts())
    {
        return Ok(next.run(request).await);
    }

    debug!(path = %request.uri().path(), "Request rejected by caller guard");
    Err(ApiError(FixlineError::Auth(
        "missing bearer token or disallowed origin".to_string(),
    )))
}

/// Bearer-only guard for the admin surface
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if bearer_matches(&request, &state.settings.server.service_token) {
        return Ok(next.run(request).await);
    }

    debug!(path = %request.uri().path(), "Request rejected by admin guard");
    Err(ApiError(FixlineError::Auth(
        "admin routes require the service bearer token".to_string(),
    )))
}

fn bearer_matches(request: &Request, service_token: &str) -> bool {
    if service_token.is_empty() {
        return false;
    }

    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| token == service_token)
        .unwrap_or(false)
}

fn origin_allowed(request: &Request, allowed_hosts: &[String]) -> bool {
    let header_host = |name: header::HeaderName| {
        request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(host_of)
    };

    let candidate = header_host(header::ORIGIN).or_else(|| header_host(header::REFERER));

    match candidate {
        Some(host) => allowed_hosts.iter().any(|allowed| allowed == &host),
        None => false,
    }
}

/// Extract the host part of an Origin/Referer header value
fn host_of(value: &str) -> Option<String> {
    Url::parse(value)
        .ok()
        .and_then(|url| url.host_str().map(|h| h.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_of_extracts_host() {
        assert_eq!(host_of("https://bot.example.com/path"), Some("bot.example.com".to_string()));
        assert_eq!(host_of("https://acme.amocrm.ru"), Some("acme.amocrm.ru".to_string()));
        assert_eq!(host_of("not a url"), None);
    }

    #[test]
    fn test_bearer_matches() {
        let request = Request::builder()
            .header(header::AUTHORIZATION, "Bearer secret")
            .body(axum::body::Body::empty())
            .unwrap();
        assert!(bearer_matches(&request, "secret"));
        assert!(!bearer_matches(&request, "other"));
        // An empty configured token never authenticates anyone
        assert!(!bearer_matches(&request, ""));
    }

    #[test]
    fn test_origin_allowed_checks_referer_fallback() {
        let request = Request::builder()
            .header(header::REFERER, "https://bot.example.com/hook")
            .body(axum::body::Body::empty())
            .unwrap();
        let allowed = vec!["bot.example.com".to_string()];
        assert!(origin_allowed(&request, &allowed));
        assert!(!origin_allowed(&request, &["other.example.com".to_string()]));
    }
}
