//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use super::Settings;
use crate::utils::errors::{FixlineError, Result};

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_server_config(&settings.server)?;
    validate_database_config(&settings.database)?;
    validate_crm_config(&settings.crm)?;
    validate_notifier_config(&settings.notifier)?;
    validate_bonus_config(&settings.bonus)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate server configuration
fn validate_server_config(config: &super::ServerConfig) -> Result<()> {
    if config.bind_addr.is_empty() {
        return Err(FixlineError::Config(
            "Server bind address is required".to_string(),
        ));
    }

    if config.service_token.is_empty() {
        return Err(FixlineError::Config(
            "Service bearer token is required".to_string(),
        ));
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(FixlineError::Config("Database URL is required".to_string()));
    }

    if config.max_connections == 0 {
        return Err(FixlineError::Config(
            "Max connections must be greater than 0".to_string(),
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(FixlineError::Config(
            "Min connections cannot be greater than max connections".to_string(),
        ));
    }

    Ok(())
}

/// Validate CRM configuration
fn validate_crm_config(config: &super::CrmConfig) -> Result<()> {
    if config.subdomain.is_empty() {
        return Err(FixlineError::Config("CRM subdomain is required".to_string()));
    }

    if config.token.is_empty() {
        return Err(FixlineError::Config(
            "CRM bearer token is required".to_string(),
        ));
    }

    Ok(())
}

/// Validate notifier configuration
fn validate_notifier_config(config: &super::NotifierConfig) -> Result<()> {
    url::Url::parse(&config.free_request_url)
        .map_err(|e| FixlineError::Config(format!("Invalid notifier URL: {}", e)))?;

    if config.timeout_seconds == 0 {
        return Err(FixlineError::Config(
            "Notifier timeout must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate bonus configuration
fn validate_bonus_config(config: &super::BonusConfig) -> Result<()> {
    if config.self_amount < 0 || config.level1_amount < 0 || config.level2_amount < 0 {
        return Err(FixlineError::Config(
            "Bonus amounts cannot be negative".to_string(),
        ));
    }

    if !(0..=100).contains(&config.commission_percent) {
        return Err(FixlineError::Config(
            "Commission percent must be between 0 and 100".to_string(),
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(FixlineError::Config("Logging level is required".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> Settings {
        let mut settings = Settings::default();
        settings.server.service_token = "service-token".to_string();
        settings.crm.token = "crm-token".to_string();
        settings
    }

    #[test]
    fn test_valid_settings_pass() {
        assert!(validate_settings(&valid_settings()).is_ok());
    }

    #[test]
    fn test_missing_service_token_rejected() {
        let mut settings = valid_settings();
        settings.server.service_token = String::new();
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_bad_notifier_url_rejected() {
        let mut settings = valid_settings();
        settings.notifier.free_request_url = "not a url".to_string();
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_negative_bonus_rejected() {
        let mut settings = valid_settings();
        settings.bonus.level2_amount = -1;
        assert!(validate_settings(&settings).is_err());
    }
}
