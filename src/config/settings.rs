//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub crm: CrmConfig,
    pub notifier: NotifierConfig,
    pub bonus: BonusConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Static bearer token required on inbound requests.
    pub service_token: String,
    /// Comma-separated list of allowed Origin/Referer hosts.
    pub allowed_origins: String,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// AmoCRM API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrmConfig {
    pub subdomain: String,
    pub token: String,
    pub fields: CrmFieldIds,
}

/// CRM custom-field identifiers.
///
/// AmoCRM addresses custom fields by stable numeric ids that differ per
/// account; they are configuration, not code.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrmFieldIds {
    // Contact fields
    pub contact_telegram_id: i64,
    pub contact_city: i64,
    // Lead fields
    pub master_phone: i64,
    pub master_telegram_id: i64,
    pub service_name: i64,
    pub equipment_type: i64,
    pub equipment_brand: i64,
    pub equipment_model: i64,
    pub city_name: i64,
    pub address: i64,
    pub description: i64,
    pub crm_operator_comment: i64,
    pub quality_rating: i64,
    pub competence_rating: i64,
    pub recommendation_rating: i64,
    pub work_outcome: i64,
}

/// Downstream notifier configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifierConfig {
    /// Reaction start URL, e.g. `https://sambot.ru/reactions/<id>/start`.
    pub free_request_url: String,
    pub timeout_seconds: u64,
}

/// Referral bonus parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BonusConfig {
    /// Credited to a user on registration.
    pub self_amount: i64,
    /// Credited to the direct sponsor on the sponsee's first deposit.
    pub level1_amount: i64,
    /// Credited to the sponsor's sponsor on the sponsee's first deposit.
    pub level2_amount: i64,
    /// Service commission percentage on closed requests.
    pub commission_percent: i64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: String,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("FIXLINE")
                    .separator("__"),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::FixlineError> {
        super::validation::validate_settings(self)
    }

    /// CRM API v4 base URL for the configured subdomain
    pub fn crm_base_url(&self) -> String {
        format!("https://{}.amocrm.ru/api/v4", self.crm.subdomain)
    }

    /// Allowed origin hosts, split and trimmed.
    ///
    /// The CRM's own domain is implicitly allowlisted.
    pub fn allowed_origin_hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self
            .server
            .allowed_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        hosts.push(format!("{}.amocrm.ru", self.crm.subdomain));
        hosts
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_addr: "0.0.0.0:8000".to_string(),
                service_token: String::new(),
                allowed_origins: String::new(),
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/fixline".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            crm: CrmConfig {
                subdomain: "example".to_string(),
                token: String::new(),
                fields: CrmFieldIds::default(),
            },
            notifier: NotifierConfig {
                free_request_url: "https://sambot.ru/reactions/0/start".to_string(),
                timeout_seconds: 10,
            },
            bonus: BonusConfig {
                self_amount: 500,
                level1_amount: 500,
                level2_amount: 250,
                commission_percent: 20,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: "/var/log/fixline".to_string(),
            },
        }
    }
}

impl Default for CrmFieldIds {
    fn default() -> Self {
        Self {
            contact_telegram_id: 745551,
            contact_city: 745553,
            master_phone: 745547,
            master_telegram_id: 745549,
            service_name: 745555,
            equipment_type: 745557,
            equipment_brand: 745559,
            equipment_model: 745561,
            city_name: 745563,
            address: 745565,
            description: 745567,
            crm_operator_comment: 745569,
            quality_rating: 745571,
            competence_rating: 745573,
            recommendation_rating: 745575,
            work_outcome: 745577,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crm_base_url() {
        let mut settings = Settings::default();
        settings.crm.subdomain = "acme".to_string();
        assert_eq!(settings.crm_base_url(), "https://acme.amocrm.ru/api/v4");
    }

    #[test]
    fn test_allowed_origin_hosts_include_crm_domain() {
        let mut settings = Settings::default();
        settings.server.allowed_origins = "bot.example.com, admin.example.com".to_string();
        settings.crm.subdomain = "acme".to_string();

        let hosts = settings.allowed_origin_hosts();
        assert!(hosts.contains(&"bot.example.com".to_string()));
        assert!(hosts.contains(&"admin.example.com".to_string()));
        assert!(hosts.contains(&"acme.amocrm.ru".to_string()));
    }
}
