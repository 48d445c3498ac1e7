use std::path::PathBuf;

use config::{Environment, File};
use error_stack::{report, ResultExt};
use masking::{PeekInterface, Secret};
use scenario_env::{config::Log, env};
use serde::Deserialize;
use test_utils::connector_auth::AutomationConfigs;

use crate::{
    consts,
    context::{ContextKey, ScenarioContext},
    errors::{ScenarioError, ScenarioResult},
    redirection::RedirectionOverrides,
};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub server: Server,
    pub log: Log,
    pub request: RequestSettings,
    pub redirection: RedirectionOverrides,
}

/// Service under test.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Server {
    pub base_url: String,
    pub admin_api_key: Secret<String>,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            admin_api_key: Secret::new("test_admin".to_string()),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RequestSettings {
    pub timeout_secs: u64,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            timeout_secs: consts::DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    /// Loads `config/<RUN_ENV>.toml` from the workspace, or the file named by
    /// `SCENARIO_CONFIG_FILE_PATH`, overridden by `SCENARIO__<SECTION>__<KEY>` variables.
    pub fn new() -> ScenarioResult<Self> {
        Self::with_config_path(None)
    }

    pub fn with_config_path(config_path: Option<PathBuf>) -> ScenarioResult<Self> {
        let config_path = config_path
            .or_else(|| std::env::var(consts::CONFIG_FILE_PATH_ENV).ok().map(PathBuf::from))
            .unwrap_or_else(|| {
                env::workspace_path()
                    .join("config")
                    .join(format!("{}.toml", env::which()))
            });

        let config = config::Config::builder()
            .add_source(File::from(config_path.as_path()).required(false))
            .add_source(
                Environment::with_prefix(consts::CONFIG_ENV_PREFIX)
                    .try_parsing(true)
                    .separator("__"),
            )
            .build()
            .change_context(ScenarioError::ConfigurationError(
                "settings could not be loaded".to_string(),
            ))
            .attach_printable_lazy(|| format!("config file: {}", config_path.display()))?;

        let settings: Self = config
            .try_deserialize()
            .change_context(ScenarioError::ConfigurationError(
                "settings could not be deserialized".to_string(),
            ))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Values from the connector authentication file's `[automation_configs]` take precedence.
    pub fn apply_automation_configs(&mut self, automation_configs: &AutomationConfigs) {
        if let Some(base_url) = &automation_configs.hs_base_url {
            self.server.base_url.clone_from(base_url);
        }
        if let Some(admin_api_key) = &automation_configs.hs_admin_api_key {
            self.server.admin_api_key = admin_api_key.clone();
        }
    }

    pub fn validate(&self) -> ScenarioResult<()> {
        let base_url = self.server.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(report!(ScenarioError::ConfigurationError(
                "server base_url must be an http(s) url".to_string()
            )))
            .attach_printable(base_url.to_string());
        }
        if self.server.admin_api_key.peek().is_empty() {
            return Err(report!(ScenarioError::ConfigurationError(
                "admin API key must not be empty".to_string()
            )));
        }
        if self.request.timeout_secs == 0 {
            return Err(report!(ScenarioError::ConfigurationError(
                "request timeout must be positive".to_string()
            )));
        }
        Ok(())
    }

    /// Fresh context for one scenario, holding the endpoint and admin credential.
    pub fn seed_context(&self) -> ScenarioContext {
        let mut context = ScenarioContext::new();
        context.set(ContextKey::BaseUrl, self.server.base_url.clone());
        context.set(ContextKey::AdminApiKey, self.server.admin_api_key.clone());
        context
    }
}
