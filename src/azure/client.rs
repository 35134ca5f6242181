//! ARM Client
//!
//! Main client for interacting with Azure Resource Manager, combining an
//! authorizer and the HTTP client. Generated-style service clients in
//! [`crate::sdk`] describe each call as an [`Operation`] and hand it here.

use std::sync::Arc;

use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::authorizer::Authorizer;
use super::http::{ArmHttpClient, RawResponse};
use crate::error::{Error, Result};

/// One REST call against a resource path
#[derive(Debug, Clone)]
pub struct Operation {
    /// `Client.Method`, used in logs and errors
    pub name: &'static str,
    pub method: Method,
    /// Resource ID path, appended to the base URI
    pub path: String,
    pub api_version: &'static str,
    pub body: Option<Value>,
    /// Status codes that count as success
    pub expected: &'static [u16],
}

impl Operation {
    pub fn new(name: &'static str, method: Method, path: String, api_version: &'static str) -> Self {
        Self {
            name,
            method,
            path,
            api_version,
            body: None,
            expected: &[200],
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn expecting(mut self, expected: &'static [u16]) -> Self {
        self.expected = expected;
        self
    }
}

/// Successful response of an [`Operation`]
#[derive(Debug, Clone)]
pub struct ArmResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ArmResponse {
    /// Decode the body into a model
    pub fn model<T: DeserializeOwned>(self, operation: &str) -> Result<T> {
        serde_json::from_value(self.body).map_err(|source| Error::Decode {
            what: format!("{} response", operation),
            source,
        })
    }
}

/// Main ARM client
#[derive(Clone)]
pub struct ArmClient {
    authorizer: Arc<dyn Authorizer>,
    pub http: ArmHttpClient,
    /// Resource Manager base URI, without a trailing slash
    pub base_uri: String,
}

impl ArmClient {
    pub fn new(authorizer: Arc<dyn Authorizer>, http: ArmHttpClient, base_uri: &str) -> Self {
        Self {
            authorizer,
            http,
            base_uri: base_uri.trim_end_matches('/').to_string(),
        }
    }

    /// Build the request URL for a resource path, escaping every segment
    pub fn resource_url(&self, path: &str, api_version: &str) -> String {
        let escaped: Vec<_> = path
            .trim_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment))
            .collect();
        format!(
            "{}/{}?api-version={}",
            self.base_uri,
            escaped.join("/"),
            urlencoding::encode(api_version)
        )
    }

    /// Execute an operation: exactly one request, no local retries
    pub async fn execute(&self, operation: Operation) -> Result<ArmResponse> {
        let mut headers = self.authorizer.headers().await?;
        if operation.body.is_some() {
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_static("application/json; charset=utf-8"),
            );
        }

        let url = self.resource_url(&operation.path, operation.api_version);
        let raw = self
            .http
            .send(operation.method.clone(), &url, headers, operation.body.as_ref())
            .await
            .map_err(|source| Error::Transport {
                operation: operation.name.to_string(),
                id: operation.path.clone(),
                source,
            })?;

        self.respond(&operation, raw)
    }

    fn respond(&self, operation: &Operation, raw: RawResponse) -> Result<ArmResponse> {
        if !operation.expected.contains(&raw.status.as_u16()) {
            let (code, message) = raw.api_error();
            return Err(Error::Api {
                operation: operation.name.to_string(),
                id: operation.path.clone(),
                status: raw.status.as_u16(),
                code,
                message,
            });
        }

        let body = raw.json().map_err(|source| Error::Decode {
            what: format!("{} response", operation.name),
            source,
        })?;

        Ok(ArmResponse {
            status: raw.status,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::authorizer::StaticTokenAuthorizer;

    fn client() -> ArmClient {
        let http = ArmHttpClient::new().unwrap();
        ArmClient::new(Arc::new(StaticTokenAuthorizer::new("t")), http, "https://management.azure.com/")
    }

    #[test]
    fn test_resource_url() {
        let url = client().resource_url("/subscriptions/sub/resourceGroups/rg", "2021-05-01");
        assert_eq!(
            url,
            "https://management.azure.com/subscriptions/sub/resourceGroups/rg?api-version=2021-05-01"
        );
    }

    #[test]
    fn test_resource_url_escapes_reserved_characters() {
        let url = client().resource_url(
            "/subscriptions/sub/providers/Microsoft.CostManagement/exports/a#b?c d",
            "2020-06-01",
        );
        assert_eq!(
            url,
            "https://management.azure.com/subscriptions/sub/providers/Microsoft.CostManagement/exports/a%23b%3Fc%20d?api-version=2020-06-01"
        );

        let parsed = url::Url::parse(&url).unwrap();
        assert_eq!(parsed.fragment(), None);
        assert_eq!(parsed.query(), Some("api-version=2020-06-01"));
    }
}
