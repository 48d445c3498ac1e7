use std::{collections::HashMap, env, path::Path};

use error_stack::{report, ResultExt};
use masking::Secret;
use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, CustomResult};

/// Env variable holding the path of the connector authentication file.
pub const CONNECTOR_AUTH_FILE_PATH: &str = "CONNECTOR_AUTH_FILE_PATH";

/// Table in the authentication file that carries runner settings instead of connector credentials.
const AUTOMATION_CONFIGS_TABLE: &str = "automation_configs";

/// Suffix of the table holding payout-specific credentials for a connector.
const PAYOUT_SUFFIX: &str = "_payout";

/// What a merchant connector account is being created for. Payout accounts of some connectors
/// use different credentials than their payment accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConnectorPurpose {
    Payment,
    Payout,
}

/// Settings of the scenario runner itself, read from the `[automation_configs]` table.
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct AutomationConfigs {
    pub hs_base_url: Option<String>,
    pub hs_admin_api_key: Option<Secret<String>>,
    pub hs_test_env: Option<String>,
    pub run_minimum_steps: Option<bool>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "auth_type")]
pub enum ConnectorAuthType {
    HeaderKey {
        api_key: Secret<String>,
    },
    BodyKey {
        api_key: Secret<String>,
        key1: Secret<String>,
    },
    SignatureKey {
        api_key: Secret<String>,
        key1: Secret<String>,
        api_secret: Secret<String>,
    },
    MultiAuthKey {
        api_key: Secret<String>,
        key1: Secret<String>,
        api_secret: Secret<String>,
        key2: Secret<String>,
    },
    #[default]
    NoKey,
}

impl ConnectorAuthType {
    /// Infer the auth kind from which keys a connector table declares. Every declared key must be
    /// a string.
    fn from_table(table: &toml::value::Table) -> CustomResult<Self, ConfigError> {
        let key = |name: &str| -> CustomResult<Option<Secret<String>>, ConfigError> {
            match table.get(name) {
                None => Ok(None),
                Some(toml::Value::String(raw)) => Ok(Some(Secret::new(raw.clone()))),
                Some(other) => Err(report!(ConfigError::DeserializationFailed))
                    .attach_printable_lazy(|| {
                        format!("`{name}` must be a string, found {}", other.type_str())
                    }),
            }
        };

        let auth_type = match (key("api_key")?, key("key1")?, key("api_secret")?, key("key2")?) {
            (Some(api_key), None, None, None) => Self::HeaderKey { api_key },
            (Some(api_key), Some(key1), None, None) => Self::BodyKey { api_key, key1 },
            (Some(api_key), Some(key1), Some(api_secret), None) => Self::SignatureKey {
                api_key,
                key1,
                api_secret,
            },
            (Some(api_key), Some(key1), Some(api_secret), Some(key2)) => Self::MultiAuthKey {
                api_key,
                key1,
                api_secret,
                key2,
            },
            _ => Self::NoKey,
        };
        Ok(auth_type)
    }

    /// `connector_account_details` object sent when creating a merchant connector account.
    ///
    /// This is the only place credentials leave their [`Secret`] wrapper.
    pub fn to_account_details(&self) -> CustomResult<serde_json::Value, ConfigError> {
        serde_json::to_value(self)
            .change_context(ConfigError::SerializationFailed)
            .attach_printable("connector_account_details")
    }
}

/// Credentials of every configured connector, keyed by connector name (`stripe`,
/// `adyen_payout`, ...), plus the runner's own automation settings.
#[derive(Clone, Debug, Default)]
pub struct ConnectorAuthenticationMap {
    connectors: HashMap<String, ConnectorAuthType>,
    automation_configs: AutomationConfigs,
}

impl ConnectorAuthenticationMap {
    /// Load the file named by `CONNECTOR_AUTH_FILE_PATH`.
    ///
    /// Do `export CONNECTOR_AUTH_FILE_PATH="/path/to/creds.toml"` before running scenarios.
    pub fn new() -> CustomResult<Self, ConfigError> {
        let path = env::var(CONNECTOR_AUTH_FILE_PATH)
            .map_err(|_| report!(ConfigError::EnvVarNotSet(CONNECTOR_AUTH_FILE_PATH)))?;
        Self::from_file(path)
    }

    pub fn from_file(path: impl AsRef<Path>) -> CustomResult<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .change_context(ConfigError::FileNotReadable)
            .attach_printable_lazy(|| format!("path: {}", path.as_ref().display()))?;
        Self::from_toml_str(&contents)
    }

    /// Parse the authentication file contents.
    ///
    /// ```toml
    /// [stripe]
    /// api_key = "sk_test_..."
    ///
    /// [adyen_payout]
    /// api_key = "..."
    /// key1 = "..."
    /// api_secret = "..."
    ///
    /// [automation_configs]
    /// hs_base_url = "http://localhost:8080"
    /// ```
    pub fn from_toml_str(contents: &str) -> CustomResult<Self, ConfigError> {
        let mut auth_config: toml::value::Table =
            toml::from_str(contents).change_context(ConfigError::DeserializationFailed)?;

        let automation_configs = auth_config
            .remove(AUTOMATION_CONFIGS_TABLE)
            .map(|table| table.try_into::<AutomationConfigs>())
            .transpose()
            .change_context(ConfigError::DeserializationFailed)
            .attach_printable("invalid `automation_configs` table")?
            .unwrap_or_default();

        let connectors = auth_config
            .into_iter()
            .map(|(connector_name, config)| {
                let auth_type = match config {
                    toml::Value::Table(table) => ConnectorAuthType::from_table(&table)
                        .attach_printable_lazy(|| format!("connector: {connector_name}"))?,
                    _ => ConnectorAuthType::NoKey,
                };
                Ok((connector_name, auth_type))
            })
            .collect::<CustomResult<HashMap<_, _>, ConfigError>>()?;

        Ok(Self {
            connectors,
            automation_configs,
        })
    }

    pub fn inner(&self) -> &HashMap<String, ConnectorAuthType> {
        &self.connectors
    }

    pub fn automation_configs(&self) -> &AutomationConfigs {
        &self.automation_configs
    }

    /// Credentials for `connector`. Payout accounts prefer the `<connector>_payout` table and fall
    /// back to the connector's payment credentials.
    pub fn resolve(
        &self,
        connector: &str,
        purpose: ConnectorPurpose,
    ) -> CustomResult<&ConnectorAuthType, ConfigError> {
        let payout_entry = match purpose {
            ConnectorPurpose::Payout => self.connectors.get(&format!("{connector}{PAYOUT_SUFFIX}")),
            ConnectorPurpose::Payment => None,
        };

        payout_entry
            .or_else(|| self.connectors.get(connector))
            .ok_or_else(|| report!(ConfigError::ConnectorNotConfigured(connector.to_string())))
            .attach_printable_lazy(|| format!("purpose: {purpose}"))
    }
}
