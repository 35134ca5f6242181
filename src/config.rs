//! Configuration Management
//!
//! Settings come from `<config_dir>/azrm/config.json` and are overridden by
//! the usual `ARM_*` environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::azure::auth::AuthBuilder;
use crate::azure::environment::Environment;
use crate::error::{Error, Result};

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_certificate_path: Option<String>,
    #[serde(default)]
    pub client_certificate_password: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub auxiliary_tenant_ids: Vec<String>,
    /// `public`, `usgovernment` or `china`
    #[serde(default)]
    pub environment: Option<String>,
    /// Override of the Resource Manager endpoint of the environment
    #[serde(default)]
    pub resource_manager_endpoint: Option<String>,
    #[serde(default)]
    pub use_msal: bool,
    /// Pre-acquired bearer token; skips the credential exchange entirely
    #[serde(default)]
    pub access_token: Option<String>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("azrm").join("config.json"))
    }

    /// Load from the default path and apply the process environment
    pub fn load() -> Result<Self> {
        let config = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        Ok(config.with_env(|key| std::env::var(key).ok()))
    }

    /// Load configuration from a file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("reading {}: {}", path.display(), e)))?;
        serde_json::from_str(&content).map_err(|e| Error::Config(format!("parsing {}: {}", path.display(), e)))
    }

    /// Apply `ARM_*` overrides read through `lookup`
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let overrides = [
            ("ARM_SUBSCRIPTION_ID", &mut self.subscription_id),
            ("ARM_TENANT_ID", &mut self.tenant_id),
            ("ARM_CLIENT_ID", &mut self.client_id),
            ("ARM_CLIENT_CERTIFICATE_PATH", &mut self.client_certificate_path),
            ("ARM_CLIENT_CERTIFICATE_PASSWORD", &mut self.client_certificate_password),
            ("ARM_CLIENT_SECRET", &mut self.client_secret),
            ("ARM_ENVIRONMENT", &mut self.environment),
            ("ARM_RESOURCE_MANAGER_ENDPOINT", &mut self.resource_manager_endpoint),
            ("ARM_ACCESS_TOKEN", &mut self.access_token),
        ];
        for (key, field) in overrides {
            if let Some(value) = get(key) {
                *field = Some(value);
            }
        }

        if let Some(value) = get("ARM_AUXILIARY_TENANT_IDS") {
            self.auxiliary_tenant_ids = value
                .split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(value) = get("ARM_USE_MSAL") {
            self.use_msal = matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        self
    }

    /// The cloud to talk to, with any endpoint override applied
    pub fn environment(&self) -> Result<Environment> {
        let mut environment = Environment::from_name(self.environment.as_deref().unwrap_or_default())?;
        if let Some(endpoint) = &self.resource_manager_endpoint {
            if url::Url::parse(endpoint).is_err() {
                return Err(Error::Config(format!("invalid resource manager endpoint {:?}", endpoint)));
            }
            environment.resource_manager = endpoint.trim_end_matches('/').to_string();
        }
        Ok(environment)
    }

    pub fn auth_builder(&self) -> AuthBuilder {
        let value = |field: &Option<String>| field.clone().unwrap_or_default();
        AuthBuilder {
            client_id: value(&self.client_id),
            tenant_id: value(&self.tenant_id),
            subscription_id: value(&self.subscription_id),
            tenant_only: false,
            auxiliary_tenant_ids: self.auxiliary_tenant_ids.clone(),
            supports_client_cert_auth: true,
            client_cert_path: value(&self.client_certificate_path),
            client_cert_password: value(&self.client_certificate_password),
            supports_client_secret_auth: true,
            client_secret: value(&self.client_secret),
            use_msal: self.use_msal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides_file() {
        let config = Config {
            subscription_id: Some("from-file".into()),
            tenant_id: Some("tenant-file".into()),
            ..Default::default()
        }
        .with_env(env(&[
            ("ARM_SUBSCRIPTION_ID", "from-env"),
            ("ARM_CLIENT_ID", "client"),
            ("ARM_AUXILIARY_TENANT_IDS", "a; b;"),
            ("ARM_USE_MSAL", "TRUE"),
            ("ARM_TENANT_ID", "  "),
        ]));

        assert_eq!(config.subscription_id.as_deref(), Some("from-env"));
        assert_eq!(config.tenant_id.as_deref(), Some("tenant-file"));
        assert_eq!(config.client_id.as_deref(), Some("client"));
        assert_eq!(config.auxiliary_tenant_ids, vec!["a", "b"]);
        assert!(config.use_msal);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"subscription_id": "sub", "environment": "china"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.subscription_id.as_deref(), Some("sub"));
        assert_eq!(config.environment().unwrap(), Environment::china());
    }

    #[test]
    fn test_load_from_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_resource_manager_override() {
        let config = Config {
            resource_manager_endpoint: Some("http://127.0.0.1:8080/".into()),
            ..Default::default()
        };
        let environment = config.environment().unwrap();
        assert_eq!(environment.resource_manager, "http://127.0.0.1:8080");
        assert_eq!(environment.active_directory, Environment::public().active_directory);

        let config = Config {
            resource_manager_endpoint: Some("not a url".into()),
            ..Default::default()
        };
        assert!(config.environment().is_err());
    }

    #[test]
    fn test_auth_builder_prefers_certificate() {
        let config = Config {
            client_certificate_path: Some("/tmp/cert.pfx".into()),
            client_secret: Some("secret".into()),
            ..Default::default()
        };
        let method = config.auth_builder().build().unwrap();
        assert_eq!(method.name(), "Service Principal / Client Certificate");
    }
}
