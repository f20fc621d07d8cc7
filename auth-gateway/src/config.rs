use crate::error::{ServiceError, ServiceResult};
use crypto::SignatureAlgorithm;
use logger_redacted::RedactionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use trust_bundle::BundleEncoding;

/// Environment variable prefix, e.g. `SVID__MAX_CHAIN_LENGTH=3`
pub const ENV_PREFIX: &str = "SVID";

/// Credential service configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CredentialServiceConfig {
    /// Trust domain of the anchor bundle and the JWT bundle
    #[serde(default)]
    pub trust_domain: Option<String>,

    /// Trust anchors loaded at startup when no store is supplied
    #[serde(default)]
    pub trust_bundle_path: Option<PathBuf>,

    #[serde(default = "default_bundle_encoding")]
    pub trust_bundle_encoding: BundleEncoding,

    /// JWKS document of JWT authorities
    #[serde(default)]
    pub jwt_bundle_path: Option<PathBuf>,

    /// Longest accepted chain, leaf and anchor included (default: 5)
    #[serde(default = "default_max_chain_length")]
    pub max_chain_length: usize,

    #[serde(default = "default_permitted_algorithms")]
    pub permitted_algorithms: Vec<SignatureAlgorithm>,

    /// Largest accepted certificate or token input in bytes (default: 64 KiB)
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: usize,

    /// Lifetime of issued tokens without an explicit `exp` (default: 300 = 5 minutes)
    #[serde(default = "default_token_ttl")]
    pub token_ttl_seconds: i64,

    /// Issuer required on verification and stamped on issuance when the caller gives none
    #[serde(default)]
    pub default_issuer: Option<String>,

    /// Audience members every verified token must carry
    #[serde(default)]
    pub expected_audience: Vec<String>,

    /// Deadline of the async verification wrapper (default: 2000 ms)
    #[serde(default = "default_verification_timeout")]
    pub verification_timeout_ms: u64,

    #[serde(default)]
    pub redaction: RedactionConfig,
}

fn default_bundle_encoding() -> BundleEncoding { BundleEncoding::Pem }
fn default_max_chain_length() -> usize { auth_chain::DEFAULT_MAX_CHAIN_LENGTH }
fn default_permitted_algorithms() -> Vec<SignatureAlgorithm> { SignatureAlgorithm::ALL.to_vec() }
fn default_max_input_bytes() -> usize { 64 * 1024 }
fn default_token_ttl() -> i64 { 300 } // 5 minutes
fn default_verification_timeout() -> u64 { 2000 }

impl Default for CredentialServiceConfig {
    fn default() -> Self {
        Self {
            trust_domain: None,
            trust_bundle_path: None,
            trust_bundle_encoding: default_bundle_encoding(),
            jwt_bundle_path: None,
            max_chain_length: default_max_chain_length(),
            permitted_algorithms: default_permitted_algorithms(),
            max_input_bytes: default_max_input_bytes(),
            token_ttl_seconds: default_token_ttl(),
            default_issuer: None,
            expected_audience: Vec::new(),
            verification_timeout_ms: default_verification_timeout(),
            redaction: RedactionConfig::default(),
        }
    }
}

impl CredentialServiceConfig {
    /// Load from an optional file plus `SVID__*` environment variables.
    ///
    /// Environment values override the file; nested keys use `__`, e.g.
    /// `SVID__REDACTION__HASH_FOR_CORRELATION=false`.
    pub fn load(path: Option<&Path>) -> ServiceResult<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path));
        }
        let settings = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("permitted_algorithms")
                    .with_list_parse_key("expected_audience")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ServiceError::Configuration(e.to_string()))?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| ServiceError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ServiceResult<()> {
        if self.max_chain_length == 0 {
            return Err(ServiceError::Configuration(
                "max_chain_length must be at least 1".to_string(),
            ));
        }
        if self.permitted_algorithms.is_empty() {
            return Err(ServiceError::Configuration(
                "permitted_algorithms must not be empty".to_string(),
            ));
        }
        if self.max_input_bytes == 0 {
            return Err(ServiceError::Configuration(
                "max_input_bytes must be positive".to_string(),
            ));
        }
        if self.token_ttl_seconds <= 0 {
            return Err(ServiceError::Configuration(
                "token_ttl_seconds must be positive".to_string(),
            ));
        }
        if (self.trust_bundle_path.is_some() || self.jwt_bundle_path.is_some())
            && self.trust_domain.is_none()
        {
            return Err(ServiceError::Configuration(
                "trust_domain is required when a bundle path is set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn verification_timeout(&self) -> Duration {
        Duration::from_millis(self.verification_timeout_ms)
    }
}
