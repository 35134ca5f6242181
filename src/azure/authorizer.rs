//! Request authorizers
//!
//! An [`Authorizer`] produces the headers that authenticate one ARM request.

use std::collections::HashMap;

use futures::future::{BoxFuture, FutureExt};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tokio::sync::RwLock;

use super::token::{AccessToken, TokenExchange};
use crate::error::{Error, Result};

/// Header carrying tokens for the auxiliary tenants of a cross-tenant request
pub const AUXILIARY_AUTHORIZATION: &str = "x-ms-authorization-auxiliary";

/// Attaches credentials to outbound requests
pub trait Authorizer: Send + Sync {
    fn headers(&self) -> BoxFuture<'_, Result<HeaderMap>>;
}

fn bearer(token: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| Error::Config(format!("token is not a valid header value: {}", e)))
}

/// A token acquired out of band (`az account get-access-token`, tests)
pub struct StaticTokenAuthorizer {
    token: String,
}

impl StaticTokenAuthorizer {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl Authorizer for StaticTokenAuthorizer {
    fn headers(&self) -> BoxFuture<'_, Result<HeaderMap>> {
        async move {
            let mut headers = HeaderMap::new();
            headers.insert(AUTHORIZATION, bearer(&self.token)?);
            Ok(headers)
        }
        .boxed()
    }
}

/// Service principal authorizer with per-tenant token caching
pub struct BearerAuthorizer {
    exchange: TokenExchange,
    tenant_id: String,
    auxiliary_tenant_ids: Vec<String>,
    token_cache: RwLock<HashMap<String, AccessToken>>,
}

impl BearerAuthorizer {
    pub(crate) fn new(exchange: TokenExchange, tenant_id: &str, auxiliary_tenant_ids: &[String]) -> Self {
        Self {
            exchange,
            tenant_id: tenant_id.to_string(),
            auxiliary_tenant_ids: auxiliary_tenant_ids.to_vec(),
            token_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Get a token for `tenant_id`, reusing the cached one while it is still valid
    pub async fn token(&self, tenant_id: &str) -> Result<String> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.get(tenant_id) {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token for tenant {} expired, fetching new token", tenant_id);
            }
        }

        let fresh = self.exchange.acquire(tenant_id).await?;
        let token = fresh.token.clone();

        {
            let mut cache = self.token_cache.write().await;
            cache.insert(tenant_id.to_string(), fresh);
        }

        tracing::debug!("New token cached for tenant {}", tenant_id);
        Ok(token)
    }

    /// Acquire every token the authorizer will need
    pub(crate) async fn prime(&self) -> Result<()> {
        self.token(&self.tenant_id).await?;
        for tenant in &self.auxiliary_tenant_ids {
            self.token(tenant).await?;
        }
        Ok(())
    }
}

impl Authorizer for BearerAuthorizer {
    fn headers(&self) -> BoxFuture<'_, Result<HeaderMap>> {
        async move {
            let mut headers = HeaderMap::new();
            let token = self.token(&self.tenant_id).await?;
            headers.insert(AUTHORIZATION, bearer(&token)?);

            if !self.auxiliary_tenant_ids.is_empty() {
                let mut auxiliary = Vec::with_capacity(self.auxiliary_tenant_ids.len());
                for tenant in &self.auxiliary_tenant_ids {
                    auxiliary.push(format!("Bearer {}", self.token(tenant).await?));
                }
                let value = HeaderValue::from_str(&auxiliary.join(", "))
                    .map_err(|e| Error::Config(format!("token is not a valid header value: {}", e)))?;
                headers.insert(AUXILIARY_AUTHORIZATION, value);
            }

            Ok(headers)
        }
        .boxed()
    }
}
