pub mod api;
pub mod build;
pub mod error;
pub mod filter;
pub mod formatter;
pub mod github;
pub mod logging;
pub mod message;
pub mod notifier;
pub mod pubsub;
pub mod resolver;
pub mod webhook;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use error::{NotifierError, Result};
use filter::FilterConfig;
use logging::LoggingConfig;
use notifier::Notifier;
use resolver::{DEFAULT_URL_TEMPLATE, UrlRuleConfig};

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_GITHUB_API: &str = "https://api.github.com";
const DEFAULT_GITHUB_WEB: &str = "https://github.com";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NotifierConfig {
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub filter: Option<FilterConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Repository name -> deployment name. Built-in table when absent.
    pub service_aliases: Option<HashMap<String, String>>,
    /// Dashboard URL rules in priority order. Built-in table when absent.
    pub url_rules: Option<Vec<UrlRuleConfig>>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WebhookConfig {
    pub url: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl WebhookConfig {
    pub fn get_timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GithubConfig {
    /// Organisation or user that owns the built repositories
    pub owner: Option<String>,
    pub token: Option<String>,
    pub api_base: Option<String>,
    pub web_base: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl GithubConfig {
    pub fn get_owner(&self) -> &str {
        self.owner.as_deref().unwrap_or_default()
    }

    pub fn get_api_base(&self) -> &str {
        self.api_base.as_deref().unwrap_or(DEFAULT_GITHUB_API)
    }

    pub fn get_web_base(&self) -> &str {
        self.web_base.as_deref().unwrap_or(DEFAULT_GITHUB_WEB)
    }

    pub fn get_timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConsoleConfig {
    pub project_id: Option<String>,
    /// Placeholders: {location}, {namespace}, {service}, {project}
    pub url_template: Option<String>,
}

impl ConsoleConfig {
    pub fn get_project_id(&self) -> &str {
        self.project_id.as_deref().unwrap_or_default()
    }

    pub fn get_url_template(&self) -> &str {
        self.url_template.as_deref().unwrap_or(DEFAULT_URL_TEMPLATE)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServerConfig {
    /// Shared secret expected in the `token` query parameter of push requests
    pub push_token: Option<String>,
}

impl NotifierConfig {
    /// Secrets from the environment take precedence over the file.
    pub fn apply_overrides(&mut self, webhook_url: Option<String>, github_token: Option<String>) {
        if let Some(url) = webhook_url.filter(|u| !u.is_empty()) {
            self.webhook.url = Some(url);
        }
        if let Some(token) = github_token.filter(|t| !t.is_empty()) {
            self.github.token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.webhook.url.as_deref().is_none_or(str::is_empty) {
            return Err(NotifierError::ConfigError(
                "webhook.url is required (or set DISCORD_WEBHOOK_URL)".to_string(),
            ));
        }
        if self.github.get_owner().is_empty() {
            return Err(NotifierError::ConfigError("github.owner is required".to_string()));
        }
        if self.console.get_project_id().is_empty() {
            return Err(NotifierError::ConfigError(
                "console.project_id is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse a configuration file without applying environment overrides
pub fn parse_config(config_str: &str) -> Result<NotifierConfig> {
    Ok(toml::from_str(config_str)?)
}

/// Load the configuration file, apply secrets from the environment and validate the result
pub fn load_config(path: &Path) -> Result<NotifierConfig> {
    let config_str = std::fs::read_to_string(path).map_err(|e| {
        NotifierError::ConfigError(format!("Failed to read config file '{}': {}", path.display(), e))
    })?;

    let mut config = parse_config(&config_str).map_err(|e| {
        NotifierError::ConfigError(format!("Failed to parse config file '{}': {}", path.display(), e))
    })?;
    config.apply_overrides(
        std::env::var("DISCORD_WEBHOOK_URL").ok(),
        std::env::var("GITHUB_TOKEN").ok(),
    );
    config.validate()?;

    Ok(config)
}

pub struct AppState {
    pub notifier: Notifier,
    pub push_token: Option<String>,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn from_config(config: &NotifierConfig) -> Result<Self> {
        Ok(Self {
            notifier: Notifier::from_config(config)?,
            push_token: config.server.push_token.clone().filter(|t| !t.is_empty()),
            start_time: Instant::now(),
            started_at: Utc::now(),
        })
    }
}

pub type SharedState = Arc<AppState>;
