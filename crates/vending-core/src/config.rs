use crate::account::LifecycleSettings;
use crate::close::CloseSettings;
use crate::error::{Result, VendingError};
use crate::provisioning::{ProvisioningSettings, DEFAULT_PRODUCT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use vending_api::ClientSettings;

pub const DEFAULT_CONFIG_FILE: &str = "vending.yaml";
pub const DEFAULT_TOKEN_ENV: &str = "VENDING_TOKEN";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

impl ConfigWarning {
    fn warning(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Warning,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Error,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Environment variable holding the bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    #[serde(default = "default_product")]
    pub product: String,
    #[serde(default = "default_provision_poll_secs")]
    pub poll_interval_secs: u64,
}

fn default_product() -> String {
    DEFAULT_PRODUCT.to_string()
}

fn default_provision_poll_secs() -> u64 {
    5
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            product: default_product(),
            poll_interval_secs: default_provision_poll_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosureConfig {
    #[serde(default = "default_close_poll_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_close_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_close_poll_secs() -> u64 {
    10
}

fn default_close_timeout_secs() -> u64 {
    300
}

impl Default for ClosureConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_close_poll_secs(),
            timeout_secs: default_close_timeout_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Absent: account operations are unavailable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<EndpointConfig>,
    /// Absent: OU and account-status operations are unavailable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<EndpointConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
    #[serde(default)]
    pub closure: ClosureConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            catalog: None,
            directory: None,
            auth: None,
            http: HttpConfig::default(),
            provisioning: ProvisioningConfig::default(),
            closure: ClosureConfig::default(),
        }
    }
}

impl Config {
    /// The file `vending config init` writes.
    pub fn starter() -> Self {
        Self {
            catalog: Some(EndpointConfig {
                endpoint: "https://servicecatalog.eu-west-1.amazonaws.com".to_string(),
            }),
            directory: Some(EndpointConfig {
                endpoint: "https://organizations.us-east-1.amazonaws.com".to_string(),
            }),
            auth: Some(AuthConfig {
                token_env: default_token_env(),
            }),
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(VendingError::ConfigNotFound(path.display().to_string()));
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    pub fn client_settings(&self) -> ClientSettings {
        let defaults = ClientSettings::default();
        let bearer_token = self
            .auth
            .as_ref()
            .and_then(|auth| std::env::var(&auth.token_env).ok())
            .filter(|token| !token.is_empty());
        ClientSettings {
            user_agent: self.http.user_agent.clone().unwrap_or(defaults.user_agent),
            timeout: Duration::from_secs(self.http.timeout_secs),
            bearer_token,
        }
    }

    pub fn lifecycle_settings(&self) -> LifecycleSettings {
        LifecycleSettings {
            provisioning: ProvisioningSettings {
                product_query: self.provisioning.product.clone(),
                poll_interval: Duration::from_secs(self.provisioning.poll_interval_secs),
            },
            close: CloseSettings {
                poll_interval: Duration::from_secs(self.closure.poll_interval_secs),
                timeout: Duration::from_secs(self.closure.timeout_secs),
            },
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.catalog.is_none() && self.directory.is_none() {
            warnings.push(ConfigWarning::error(
                "neither catalog nor directory is configured; no operation can run",
            ));
        }

        for (section, endpoint) in [("catalog", &self.catalog), ("directory", &self.directory)] {
            let Some(endpoint) = endpoint else { continue };
            let url = endpoint.endpoint.trim();
            if url.is_empty() {
                warnings.push(ConfigWarning::error(format!("{section}.endpoint is empty")));
            } else if !(url.starts_with("https://") || url.starts_with("http://")) {
                warnings.push(ConfigWarning::error(format!(
                    "{section}.endpoint '{url}' must be an http(s) URL"
                )));
            } else if url.starts_with("http://") {
                warnings.push(ConfigWarning::warning(format!(
                    "{section}.endpoint '{url}' is not TLS; only use this against a local proxy"
                )));
            }
        }

        if let Some(auth) = &self.auth {
            if std::env::var_os(&auth.token_env).is_none() {
                warnings.push(ConfigWarning::warning(format!(
                    "auth.token_env names {} but it is not set; requests go out without a token",
                    auth.token_env
                )));
            }
        }

        if self.http.timeout_secs == 0 {
            warnings.push(ConfigWarning::error("http.timeout_secs must be greater than 0"));
        }
        if self.provisioning.product.trim().is_empty() {
            warnings.push(ConfigWarning::error("provisioning.product is empty"));
        }
        if self.provisioning.poll_interval_secs == 0 {
            warnings.push(ConfigWarning::error(
                "provisioning.poll_interval_secs must be greater than 0",
            ));
        }
        if self.closure.poll_interval_secs == 0 {
            warnings.push(ConfigWarning::error(
                "closure.poll_interval_secs must be greater than 0",
            ));
        }
        if self.closure.timeout_secs < self.closure.poll_interval_secs {
            warnings.push(ConfigWarning::warning(format!(
                "closure.timeout_secs ({}) is shorter than one poll interval ({}s); \
                 closure is polled only at the start and at the deadline",
                self.closure.timeout_secs, self.closure.poll_interval_secs
            )));
        }

        warnings
    }

    /// Fail on the first error-level finding.
    pub fn ensure_valid(&self) -> Result<()> {
        let errors: Vec<String> = self
            .validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message)
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(VendingError::InvalidConfig(errors.join("; ")))
        }
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => match home::home_dir() {
            Some(home) => home.join(rest.trim_start_matches('/')),
            None => PathBuf::from(path),
        },
        _ => PathBuf::from(path),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn has_error(warnings: &[ConfigWarning], needle: &str) -> bool {
        warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains(needle))
    }

    #[test]
    fn starter_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        Config::starter().save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, Config::starter());
    }

    #[test]
    fn minimal_yaml_gets_defaults() {
        let cfg: Config = serde_yaml::from_str("catalog:\n  endpoint: https://catalog.test\n").unwrap();
        assert_eq!(cfg.version, 1);
        assert!(cfg.directory.is_none());
        assert_eq!(cfg.provisioning.product, DEFAULT_PRODUCT);
        assert_eq!(cfg.provisioning.poll_interval_secs, 5);
        assert_eq!(cfg.closure.poll_interval_secs, 10);
        assert_eq!(cfg.closure.timeout_secs, 300);

        let settings = cfg.lifecycle_settings();
        assert_eq!(settings.close.timeout, Duration::from_secs(300));
        assert_eq!(settings.provisioning.poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, VendingError::ConfigNotFound(_)));
    }

    #[test]
    fn validate_flags_missing_endpoints() {
        let warnings = Config::default().validate();
        assert!(has_error(&warnings, "neither catalog nor directory"));
        assert!(Config::default().ensure_valid().is_err());
    }

    #[test]
    fn validate_flags_bad_endpoint_and_intervals() {
        let mut cfg = Config::starter();
        cfg.auth = None;
        cfg.catalog = Some(EndpointConfig {
            endpoint: "catalog.test".into(),
        });
        cfg.provisioning.poll_interval_secs = 0;
        let warnings = cfg.validate();
        assert!(has_error(&warnings, "catalog.endpoint"));
        assert!(has_error(&warnings, "provisioning.poll_interval_secs"));

        let err = cfg.ensure_valid().unwrap_err();
        assert!(err.to_string().contains("catalog.endpoint"));
    }

    #[test]
    fn starter_without_auth_is_clean() {
        let mut cfg = Config::starter();
        cfg.auth = None;
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn short_close_timeout_is_a_warning() {
        let mut cfg = Config::starter();
        cfg.auth = None;
        cfg.closure.timeout_secs = 5;
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Warning);
    }

    #[test]
    fn client_settings_use_configured_user_agent() {
        let mut cfg = Config::starter();
        cfg.auth = None;
        cfg.http.user_agent = Some("ci-bot/1.0".into());
        cfg.http.timeout_secs = 7;
        let settings = cfg.client_settings();
        assert_eq!(settings.user_agent, "ci-bot/1.0");
        assert_eq!(settings.timeout, Duration::from_secs(7));
        assert!(settings.bearer_token.is_none());
    }

    #[test]
    fn expand_home_only_touches_leading_tilde() {
        assert_eq!(expand_home("/etc/vending.yaml"), PathBuf::from("/etc/vending.yaml"));
        assert_eq!(expand_home("~user/x"), PathBuf::from("~user/x"));
        if let Some(home) = home::home_dir() {
            assert_eq!(expand_home("~/vending.yaml"), home.join("vending.yaml"));
        }
    }
}
