use anyhow::{Result, anyhow};
use serde::Deserialize;
use std::time::Duration;

/// Environment variable holding the JSON configuration
pub const CONFIG_ENV_VAR: &str = "IDP_AUTH_CONFIG";

pub const DEFAULT_LOGIN_PATH: &str = "/identityprovider/login";
const DEFAULT_PRINCIPAL_CACHE_SIZE: u64 = 10_000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Identity-provider authentication configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdpAuthConfig {
    /// Path unauthenticated browsers are redirected to (default: /identityprovider/login)
    pub login_path: String,
    /// Admit principals authenticated by an external identity provider (default: false)
    pub allow_external: bool,
    /// Maximum number of cached principals (default: 10000)
    pub principal_cache_size: u64,
    /// Timeout of a validation call in seconds (default: 30)
    pub request_timeout_secs: u64,
    /// Connection timeout to the identity provider in seconds (default: 5)
    pub connect_timeout_secs: u64,
}

impl Default for IdpAuthConfig {
    fn default() -> Self {
        Self {
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            allow_external: false,
            principal_cache_size: DEFAULT_PRINCIPAL_CACHE_SIZE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl IdpAuthConfig {
    /// Load configuration from the `IDP_AUTH_CONFIG` environment variable,
    /// falling back to defaults when it is not set.
    pub fn from_env() -> Result<Self> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(json) => Self::from_json(&json),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: IdpAuthConfig = serde_json::from_str(json)
            .map_err(|e| anyhow!("Failed to parse {CONFIG_ENV_VAR}: {e:?}"))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.login_path.starts_with('/') {
            return Err(anyhow!(
                "login_path must be an absolute path, got '{}'",
                self.login_path
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be positive"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IdpAuthConfig::from_json("{}").expect("parse config");
        assert_eq!(config.login_path, "/identityprovider/login");
        assert!(!config.allow_external);
        assert_eq!(config.principal_cache_size, 10_000);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_custom_values() {
        let json = r#"{
            "login_path": "/login",
            "allow_external": true,
            "principal_cache_size": 50,
            "request_timeout_secs": 2
        }"#;
        let config = IdpAuthConfig::from_json(json).expect("parse config");
        assert_eq!(config.login_path, "/login");
        assert!(config.allow_external);
        assert_eq!(config.principal_cache_size, 50);
        assert_eq!(config.request_timeout_secs, 2);
        assert_eq!(config.connect_timeout_secs, 5);
    }

    #[test]
    fn test_invalid_values() {
        assert!(IdpAuthConfig::from_json(r#"{"login_path": "login"}"#).is_err());
        assert!(IdpAuthConfig::from_json(r#"{"request_timeout_secs": 0}"#).is_err());
        assert!(IdpAuthConfig::from_json("not json").is_err());
    }
}
