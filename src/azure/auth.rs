//! Azure Authentication
//!
//! Resolves service principal credentials into an [`Authorizer`]. An
//! [`AuthBuilder`] collects the configuration once; [`AuthBuilder::build`]
//! picks the first applicable [`AuthMethod`], which can then be validated and
//! turned into an authorizer that mints tokens for outbound calls.

use std::path::Path;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use jsonwebtoken::EncodingKey;
use p12_keystore::KeyStore;
use reqwest::Client;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;

use super::authorizer::{Authorizer, BearerAuthorizer};
use super::environment::{Environment, TokenVersion};
use super::token::{certificate_thumbprint, ClientCredential, TokenExchange};
use crate::error::{Error, Result, Violations};

/// Top-level authentication settings
#[derive(Debug, Clone, Default)]
pub struct AuthBuilder {
    pub client_id: String,
    pub tenant_id: String,
    pub subscription_id: String,
    /// Authenticate against the tenant only; no subscription is required
    pub tenant_only: bool,
    pub auxiliary_tenant_ids: Vec<String>,

    pub supports_client_cert_auth: bool,
    pub client_cert_path: String,
    pub client_cert_password: String,

    pub supports_client_secret_auth: bool,
    pub client_secret: String,

    /// Speak the identity platform (v2) token protocol instead of the legacy one
    pub use_msal: bool,
}

impl AuthBuilder {
    /// Pick the first authentication method applicable to this configuration
    pub fn build(&self) -> Result<Box<dyn AuthMethod>> {
        let candidates: [Box<dyn AuthMethod>; 2] = [
            Box::new(ClientCertificateAuth::from_builder(self)),
            Box::new(ClientSecretAuth::from_builder(self)),
        ];

        for method in candidates {
            if method.is_applicable(self) {
                tracing::info!("Authenticating using {}", method.name());
                return Ok(method);
            }
        }

        Err(Error::Config(
            "no supported authentication method was configured".to_string(),
        ))
    }

    fn token_version(&self) -> TokenVersion {
        if self.use_msal {
            TokenVersion::V2
        } else {
            TokenVersion::V1
        }
    }
}

/// A way of authenticating a service principal
pub trait AuthMethod: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_applicable(&self, builder: &AuthBuilder) -> bool;

    /// Check every required field, reporting all problems at once
    fn validate(&self) -> Result<()>;

    /// Build an authorizer for tokens scoped to `endpoint`; the first token is
    /// acquired immediately so credential problems surface here
    fn authorizer<'a>(
        &'a self,
        http: &'a Client,
        environment: &'a Environment,
        endpoint: &'a str,
    ) -> BoxFuture<'a, Result<Arc<dyn Authorizer>>>;
}

fn missing(field: &str, method: &str) -> String {
    format!(
        "a {} must be configured when authenticating as a Service Principal using a {}",
        field, method
    )
}

/// Service Principal / Client Certificate
#[derive(Debug, Clone)]
pub struct ClientCertificateAuth {
    auxiliary_tenant_ids: Vec<String>,
    client_id: String,
    client_cert_path: String,
    client_cert_password: String,
    subscription_id: String,
    tenant_id: String,
    tenant_only: bool,
    version: TokenVersion,
}

impl ClientCertificateAuth {
    pub fn from_builder(b: &AuthBuilder) -> Self {
        Self {
            auxiliary_tenant_ids: b.auxiliary_tenant_ids.clone(),
            client_id: b.client_id.clone(),
            client_cert_path: b.client_cert_path.clone(),
            client_cert_password: b.client_cert_password.clone(),
            subscription_id: b.subscription_id.clone(),
            tenant_id: b.tenant_id.clone(),
            tenant_only: b.tenant_only,
            version: b.token_version(),
        }
    }
}

impl AuthMethod for ClientCertificateAuth {
    fn name(&self) -> &'static str {
        "Service Principal / Client Certificate"
    }

    fn is_applicable(&self, builder: &AuthBuilder) -> bool {
        builder.supports_client_cert_auth && !builder.client_cert_path.is_empty()
    }

    fn validate(&self) -> Result<()> {
        const METHOD: &str = "Client Certificate";
        let mut violations = Violations::new();

        if !self.tenant_only && self.subscription_id.is_empty() {
            violations.push(missing("Subscription ID", METHOD));
        }

        if self.client_id.is_empty() {
            violations.push(missing("Client ID", METHOD));
        }

        if self.client_cert_path.is_empty() {
            violations.push(missing("Client Certificate Path", METHOD));
        } else if let Err(err) = decode_pkcs12_file(&self.client_cert_path, &self.client_cert_password) {
            violations.push(format!("the Client Certificate Path is not a valid pfx file: {}", err));
        }

        if self.tenant_id.is_empty() {
            violations.push(missing("Tenant ID", METHOD));
        }

        violations.into_result()
    }

    fn authorizer<'a>(
        &'a self,
        http: &'a Client,
        environment: &'a Environment,
        endpoint: &'a str,
    ) -> BoxFuture<'a, Result<Arc<dyn Authorizer>>> {
        async move {
            let certificate = decode_pkcs12_file(&self.client_cert_path, &self.client_cert_password)?;
            let credential = ClientCredential::Certificate {
                key: certificate.encoding_key,
                thumbprint: certificate.thumbprint,
            };

            let exchange = TokenExchange::new(
                http.clone(),
                environment.clone(),
                self.version,
                &self.client_id,
                credential,
                endpoint,
            );
            let authorizer = BearerAuthorizer::new(exchange, &self.tenant_id, &self.auxiliary_tenant_ids);
            authorizer.prime().await?;

            Ok(Arc::new(authorizer) as Arc<dyn Authorizer>)
        }
        .boxed()
    }
}

/// Service Principal / Client Secret
#[derive(Debug, Clone)]
pub struct ClientSecretAuth {
    auxiliary_tenant_ids: Vec<String>,
    client_id: String,
    client_secret: String,
    subscription_id: String,
    tenant_id: String,
    tenant_only: bool,
    version: TokenVersion,
}

impl ClientSecretAuth {
    pub fn from_builder(b: &AuthBuilder) -> Self {
        Self {
            auxiliary_tenant_ids: b.auxiliary_tenant_ids.clone(),
            client_id: b.client_id.clone(),
            client_secret: b.client_secret.clone(),
            subscription_id: b.subscription_id.clone(),
            tenant_id: b.tenant_id.clone(),
            tenant_only: b.tenant_only,
            version: b.token_version(),
        }
    }
}

impl AuthMethod for ClientSecretAuth {
    fn name(&self) -> &'static str {
        "Service Principal / Client Secret"
    }

    fn is_applicable(&self, builder: &AuthBuilder) -> bool {
        builder.supports_client_secret_auth && !builder.client_secret.is_empty()
    }

    fn validate(&self) -> Result<()> {
        const METHOD: &str = "Client Secret";
        let mut violations = Violations::new();

        if !self.tenant_only && self.subscription_id.is_empty() {
            violations.push(missing("Subscription ID", METHOD));
        }
        if self.client_id.is_empty() {
            violations.push(missing("Client ID", METHOD));
        }
        if self.client_secret.is_empty() {
            violations.push(missing("Client Secret", METHOD));
        }
        if self.tenant_id.is_empty() {
            violations.push(missing("Tenant ID", METHOD));
        }

        violations.into_result()
    }

    fn authorizer<'a>(
        &'a self,
        http: &'a Client,
        environment: &'a Environment,
        endpoint: &'a str,
    ) -> BoxFuture<'a, Result<Arc<dyn Authorizer>>> {
        async move {
            let exchange = TokenExchange::new(
                http.clone(),
                environment.clone(),
                self.version,
                &self.client_id,
                ClientCredential::Secret(self.client_secret.clone()),
                endpoint,
            );
            let authorizer = BearerAuthorizer::new(exchange, &self.tenant_id, &self.auxiliary_tenant_ids);
            authorizer.prime().await?;

            Ok(Arc::new(authorizer) as Arc<dyn Authorizer>)
        }
        .boxed()
    }
}

/// Key material recovered from a PKCS#12 bundle
pub struct DecodedCertificate {
    /// PKCS#1 RSA key ready for signing
    pub encoding_key: EncodingKey,
    /// base64url SHA-1 thumbprint of the leaf certificate
    pub thumbprint: String,
    pub subject: String,
}

/// Read a PKCS#12 (pfx) file and extract its RSA key and leaf certificate
///
/// The file is read into memory and closed before decoding starts.
pub fn decode_pkcs12_file(path: impl AsRef<Path>, password: &str) -> Result<DecodedCertificate> {
    let path = path.as_ref();
    let decode_error = |reason: String| Error::CredentialDecode {
        path: path.display().to_string(),
        reason,
    };

    let data = std::fs::read(path).map_err(|e| decode_error(format!("reading Client Certificate: {}", e)))?;

    let keystore = KeyStore::from_pkcs12(&data, password).map_err(|e| decode_error(e.to_string()))?;

    let (_, chain) = keystore
        .private_key_chain()
        .ok_or_else(|| decode_error("PKCS#12 bundle does not contain a private key".to_string()))?;

    let certificate = chain
        .chain()
        .first()
        .ok_or_else(|| decode_error("PKCS#12 bundle does not contain a certificate".to_string()))?;

    let rsa_key = RsaPrivateKey::from_pkcs8_der(chain.key())
        .map_err(|_| decode_error("PKCS#12 certificate must contain an RSA private key".to_string()))?;

    let pkcs1 = rsa_key
        .to_pkcs1_der()
        .map_err(|e| decode_error(format!("encoding RSA private key: {}", e)))?;

    Ok(DecodedCertificate {
        encoding_key: EncodingKey::from_rsa_der(pkcs1.as_bytes()),
        thumbprint: certificate_thumbprint(certificate.as_der()),
        subject: certificate.subject().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/client.pfx");
    const EC_FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/ec-client.pfx");
    const PASSWORD: &str = "fixture-password";

    fn cert_builder() -> AuthBuilder {
        AuthBuilder {
            client_id: "client".into(),
            tenant_id: "tenant".into(),
            subscription_id: "sub".into(),
            supports_client_cert_auth: true,
            client_cert_path: FIXTURE.into(),
            client_cert_password: PASSWORD.into(),
            ..Default::default()
        }
    }

    fn messages(err: Error) -> Vec<String> {
        match err {
            Error::Validation(messages) => messages,
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_all_missing_fields_are_reported() {
        let method = ClientCertificateAuth::from_builder(&AuthBuilder::default());
        let messages = messages(method.validate().unwrap_err());
        assert_eq!(messages.len(), 4);
        assert!(messages[0].contains("Subscription ID"));
        assert!(messages[1].contains("Client ID"));
        assert!(messages[2].contains("Client Certificate Path"));
        assert!(messages[3].contains("Tenant ID"));
    }

    #[test]
    fn test_tenant_only_does_not_need_subscription() {
        let builder = AuthBuilder {
            tenant_only: true,
            ..Default::default()
        };
        let method = ClientCertificateAuth::from_builder(&builder);
        assert_eq!(messages(method.validate().unwrap_err()).len(), 3);
    }

    #[test]
    fn test_valid_certificate_configuration_passes() {
        let method = ClientCertificateAuth::from_builder(&cert_builder());
        assert!(method.validate().is_ok());
    }

    #[test]
    fn test_unreadable_certificate_is_a_validation_message() {
        let builder = AuthBuilder {
            client_cert_path: "/nonexistent/client.pfx".into(),
            ..cert_builder()
        };
        let method = ClientCertificateAuth::from_builder(&builder);
        let messages = messages(method.validate().unwrap_err());
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("not a valid pfx file"));
    }

    #[test]
    fn test_decode_fixture() {
        let decoded = decode_pkcs12_file(FIXTURE, PASSWORD).unwrap();
        assert!(decoded.subject.contains("azrm-test-client"));
        assert_eq!(decoded.thumbprint.len(), 27);
    }

    #[test]
    fn test_decode_wrong_password_fails() {
        let err = decode_pkcs12_file(FIXTURE, "wrong").err().unwrap();
        assert!(matches!(err, Error::CredentialDecode { .. }));
    }

    #[test]
    fn test_decode_corrupt_file_fails_without_panicking() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"definitely not a pfx bundle").unwrap();
        let err = decode_pkcs12_file(file.path(), PASSWORD).err().unwrap();
        assert!(matches!(err, Error::CredentialDecode { .. }));
    }

    #[test]
    fn test_decode_requires_rsa_key() {
        let err = decode_pkcs12_file(EC_FIXTURE, PASSWORD).err().unwrap();
        match err {
            Error::CredentialDecode { reason, .. } => assert!(reason.contains("RSA")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_build_prefers_certificate() {
        let builder = AuthBuilder {
            supports_client_secret_auth: true,
            client_secret: "secret".into(),
            ..cert_builder()
        };
        let method = builder.build().unwrap();
        assert_eq!(method.name(), "Service Principal / Client Certificate");
    }

    #[test]
    fn test_build_falls_back_to_secret() {
        let builder = AuthBuilder {
            supports_client_secret_auth: true,
            client_secret: "secret".into(),
            client_cert_path: String::new(),
            ..cert_builder()
        };
        assert_eq!(builder.build().unwrap().name(), "Service Principal / Client Secret");
    }

    #[test]
    fn test_build_without_credentials_fails() {
        assert!(matches!(AuthBuilder::default().build(), Err(Error::Config(_))));
    }
}
