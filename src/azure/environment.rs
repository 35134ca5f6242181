//! Azure clouds and their endpoints

use crate::error::{Error, Result};

/// Endpoints of one Azure cloud
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub name: String,
    /// Base URL of Azure Active Directory / Microsoft Entra ID
    pub active_directory: String,
    /// Base URL of Azure Resource Manager
    pub resource_manager: String,
    /// Audience requested when exchanging credentials for an ARM token
    pub token_audience: String,
}

impl Environment {
    pub fn public() -> Self {
        Self::new(
            "public",
            "https://login.microsoftonline.com",
            "https://management.azure.com",
            "https://management.core.windows.net/",
        )
    }

    pub fn us_government() -> Self {
        Self::new(
            "usgovernment",
            "https://login.microsoftonline.us",
            "https://management.usgovcloudapi.net",
            "https://management.core.usgovcloudapi.net/",
        )
    }

    pub fn china() -> Self {
        Self::new(
            "china",
            "https://login.chinacloudapi.cn",
            "https://management.chinacloudapi.cn",
            "https://management.core.chinacloudapi.cn/",
        )
    }

    /// An environment with arbitrary endpoints (Azure Stack, test servers)
    pub fn new(name: &str, active_directory: &str, resource_manager: &str, token_audience: &str) -> Self {
        Self {
            name: name.to_string(),
            active_directory: active_directory.trim_end_matches('/').to_string(),
            resource_manager: resource_manager.trim_end_matches('/').to_string(),
            token_audience: token_audience.to_string(),
        }
    }

    /// Look up a well-known cloud by name
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "" | "public" | "global" | "azurepubliccloud" => Ok(Self::public()),
            "usgovernment" | "usgovernmentl4" | "azureusgovernmentcloud" => Ok(Self::us_government()),
            "china" | "azurechinacloud" => Ok(Self::china()),
            other => Err(Error::Config(format!("unknown environment {:?}", other))),
        }
    }

    /// Token endpoint for `tenant_id`; v2 is the Microsoft identity platform endpoint
    pub fn token_url(&self, tenant_id: &str, version: TokenVersion) -> String {
        match version {
            TokenVersion::V1 => format!("{}/{}/oauth2/token", self.active_directory, tenant_id),
            TokenVersion::V2 => format!("{}/{}/oauth2/v2.0/token", self.active_directory, tenant_id),
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::public()
    }
}

/// Which token protocol to speak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenVersion {
    /// Legacy endpoint, requests a `resource`
    #[default]
    V1,
    /// Identity platform endpoint, requests a `{resource}/.default` scope
    V2,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_is_case_insensitive() {
        assert_eq!(Environment::from_name("Public").unwrap(), Environment::public());
        assert_eq!(Environment::from_name("USGovernment").unwrap().name, "usgovernment");
        assert!(Environment::from_name("mars").is_err());
    }

    #[test]
    fn test_token_url_construction() {
        let env = Environment::public();
        assert_eq!(
            env.token_url("my-tenant-123", TokenVersion::V2),
            "https://login.microsoftonline.com/my-tenant-123/oauth2/v2.0/token"
        );
        assert_eq!(
            env.token_url("my-tenant-123", TokenVersion::V1),
            "https://login.microsoftonline.com/my-tenant-123/oauth2/token"
        );
    }

    #[test]
    fn test_custom_endpoints_are_trimmed() {
        let env = Environment::new("test", "http://127.0.0.1:9000/", "http://127.0.0.1:9001/", "aud");
        assert_eq!(env.active_directory, "http://127.0.0.1:9000");
        assert_eq!(env.resource_manager, "http://127.0.0.1:9001");
    }
}
