//! OAuth2 client-credentials exchange against Azure Active Directory
//!
//! Implements the flow documented for service principals:
//!
//! 1. Build a client assertion (a JWT signed with the certificate's RSA key,
//!    identified by the certificate's SHA-1 thumbprint) or use a client secret
//! 2. POST it to the tenant's token endpoint
//! 3. Receive an access token with an expiry

use std::time::{Duration, Instant};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::environment::{Environment, TokenVersion};
use super::http::sanitize_for_log;
use crate::error::{Error, Result};

const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Lifetime of a client assertion
const ASSERTION_TTL_SECS: i64 = 600;

/// Token expiry buffer - refresh tokens this much before they actually expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Default token TTL if the endpoint does not say (conservative: 30 minutes)
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// Longest lifetime trusted from a token response
const MAX_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// What the service principal proves its identity with
pub(crate) enum ClientCredential {
    Certificate {
        key: EncodingKey,
        /// base64url SHA-1 thumbprint of the DER certificate
        thumbprint: String,
    },
    Secret(String),
}

/// A bearer token and the instant it should no longer be used
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    /// When this token expires (with buffer applied)
    pub expires_at: Instant,
}

impl AccessToken {
    pub fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    aud: &'a str,
    iss: &'a str,
    sub: &'a str,
    jti: String,
    nbf: i64,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    /// The legacy endpoint sends this as a string, the v2 endpoint as a number
    #[serde(default)]
    expires_in: Option<Value>,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

/// Exchanges one service principal's credential for tokens, per tenant
pub(crate) struct TokenExchange {
    http: Client,
    environment: Environment,
    version: TokenVersion,
    client_id: String,
    credential: ClientCredential,
    /// Resource the token is requested for
    endpoint: String,
}

impl TokenExchange {
    pub(crate) fn new(
        http: Client,
        environment: Environment,
        version: TokenVersion,
        client_id: &str,
        credential: ClientCredential,
        endpoint: &str,
    ) -> Self {
        Self {
            http,
            environment,
            version,
            client_id: client_id.to_string(),
            credential,
            endpoint: endpoint.to_string(),
        }
    }

    /// Request a fresh token for `tenant_id`; failures are not retried
    pub(crate) async fn acquire(&self, tenant_id: &str) -> Result<AccessToken> {
        let url = self.environment.token_url(tenant_id, self.version);
        tracing::debug!("Azure token request → {}", url);

        let mut form: Vec<(&str, String)> = vec![
            ("grant_type", "client_credentials".to_string()),
            ("client_id", self.client_id.clone()),
        ];

        match self.version {
            TokenVersion::V1 => form.push(("resource", self.endpoint.clone())),
            TokenVersion::V2 => form.push((
                "scope",
                format!("{}/.default", self.endpoint.trim_end_matches('/')),
            )),
        }

        match &self.credential {
            ClientCredential::Certificate { key, thumbprint } => {
                let assertion = self.client_assertion(&url, key, thumbprint)?;
                form.push(("client_assertion_type", CLIENT_ASSERTION_TYPE.to_string()));
                form.push(("client_assertion", assertion));
            },
            ClientCredential::Secret(secret) => form.push(("client_secret", secret.clone())),
        }

        let response = self
            .http
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::TokenAcquisition {
                endpoint: url.clone(),
                status: None,
                reason: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| Error::TokenAcquisition {
            endpoint: url.clone(),
            status: Some(status.as_u16()),
            reason: e.to_string(),
        })?;

        if !status.is_success() {
            tracing::error!("Token exchange failed: {} - {}", status, sanitize_for_log(&body));
            let reason = serde_json::from_str::<TokenErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error_description.or(e.error))
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(Error::TokenAcquisition {
                endpoint: url,
                status: Some(status.as_u16()),
                reason,
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| Error::TokenAcquisition {
            endpoint: url.clone(),
            status: Some(status.as_u16()),
            reason: format!("parsing token response: {}", e),
        })?;

        Ok(token_from_response(parsed))
    }

    fn client_assertion(&self, audience: &str, key: &EncodingKey, thumbprint: &str) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            aud: audience,
            iss: &self.client_id,
            sub: &self.client_id,
            jti: uuid::Uuid::new_v4().to_string(),
            nbf: now,
            iat: now,
            exp: now + ASSERTION_TTL_SECS,
        };

        let header = Header {
            alg: Algorithm::RS256,
            x5t: Some(thumbprint.to_string()),
            ..Default::default()
        };

        encode(&header, &claims, key).map_err(|e| Error::TokenAcquisition {
            endpoint: audience.to_string(),
            status: None,
            reason: format!("signing client assertion: {}", e),
        })
    }
}

/// base64url SHA-1 digest of a DER certificate, as used in the `x5t` header
pub(crate) fn certificate_thumbprint(der: &[u8]) -> String {
    use sha1::{Digest, Sha1};
    URL_SAFE_NO_PAD.encode(Sha1::digest(der))
}

fn token_from_response(response: TokenResponse) -> AccessToken {
    let ttl = response
        .expires_in
        .as_ref()
        .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TOKEN_TTL)
        .min(MAX_TOKEN_TTL);

    let now = Instant::now();
    let expires_at = now
        .checked_add(ttl.saturating_sub(TOKEN_EXPIRY_BUFFER))
        .unwrap_or(now);

    AccessToken {
        token: response.access_token,
        expires_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(expires_in: Option<Value>) -> TokenResponse {
        TokenResponse {
            access_token: "tok123".into(),
            expires_in,
        }
    }

    #[test]
    fn test_token_from_response_numeric_expiry() {
        let token = token_from_response(response(Some(serde_json::json!(3600))));
        assert_eq!(token.token, "tok123");
        assert!(token.is_valid());
    }

    #[test]
    fn test_token_from_response_string_expiry() {
        let token = token_from_response(response(Some(serde_json::json!("3599"))));
        assert!(token.is_valid());
    }

    #[test]
    fn test_short_lived_token_is_already_stale() {
        // Shorter than the expiry buffer
        let token = token_from_response(response(Some(serde_json::json!(30))));
        assert!(!token.is_valid());
    }

    #[test]
    fn test_huge_expiry_is_capped() {
        let token = token_from_response(response(Some(serde_json::json!(u64::MAX))));
        assert!(token.is_valid());
        assert!(token.expires_at <= Instant::now() + MAX_TOKEN_TTL);
    }

    #[test]
    fn test_huge_string_expiry_is_capped() {
        let token = token_from_response(response(Some(serde_json::json!("18446744073709551615"))));
        assert!(token.is_valid());
        assert!(token.expires_at <= Instant::now() + MAX_TOKEN_TTL);
    }

    #[test]
    fn test_thumbprint_is_unpadded_base64url() {
        let thumbprint = certificate_thumbprint(b"certificate");
        assert_eq!(thumbprint.len(), 27);
        assert!(!thumbprint.contains('='));
    }
}
