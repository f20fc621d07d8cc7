// Constant patterns below are compiled once; a failure is a programming error
#![allow(clippy::expect_used)]

use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

lazy_static! {
    // A compact JWS header is a JSON object, so it always encodes to `eyJ...`
    static ref TOKEN_REGEX: Regex =
        Regex::new(r"\beyJ[A-Za-z0-9_-]*\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]*").expect("token pattern");
    static ref PEM_REGEX: Regex = Regex::new(
        r"(?s)-----BEGIN ([A-Z0-9 ]+)-----(?:.*?-----END [A-Z0-9 ]+-----|.*)"
    )
    .expect("pem pattern");
}

/// An additional pattern replaced verbatim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomPattern {
    pub pattern: String,
    pub replacement: String,
}

/// Redaction configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionConfig {
    /// Replace compact bearer tokens
    pub redact_tokens: bool,
    /// Replace PEM blocks (certificates and keys)
    pub redact_pem: bool,
    /// Replace with a short hash instead of a fixed marker, so the same
    /// credential can be correlated across log lines
    pub hash_for_correlation: bool,
    pub custom_patterns: Vec<CustomPattern>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_tokens: true,
            redact_pem: true,
            hash_for_correlation: true,
            custom_patterns: Vec::new(),
        }
    }
}

/// Credential redactor for log messages
#[derive(Debug, Clone)]
pub struct CredentialRedactor {
    config: RedactionConfig,
    custom: Vec<(Regex, String)>,
}

impl Default for CredentialRedactor {
    fn default() -> Self {
        Self {
            config: RedactionConfig::default(),
            custom: Vec::new(),
        }
    }
}

impl CredentialRedactor {
    pub fn new(config: RedactionConfig) -> Result<Self, regex::Error> {
        let custom = config
            .custom_patterns
            .iter()
            .map(|p| Ok((Regex::new(&p.pattern)?, p.replacement.clone())))
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { config, custom })
    }

    pub fn config(&self) -> &RedactionConfig {
        &self.config
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.config.redact_pem {
            result = self.redact_pem(&result);
        }

        if self.config.redact_tokens {
            result = self.redact_tokens(&result);
        }

        for (pattern, replacement) in &self.custom {
            result = pattern.replace_all(&result, replacement.as_str()).to_string();
        }

        result
    }

    /// Short correlation hash of `value`: base64 of the first 8 bytes of its SHA-256
    pub fn tag(&self, value: &[u8]) -> String {
        let digest = Sha256::digest(value);
        general_purpose::STANDARD.encode(digest.get(..8).unwrap_or_default())
    }

    fn redact_tokens(&self, text: &str) -> String {
        TOKEN_REGEX
            .replace_all(text, |caps: &regex::Captures| {
                if self.config.hash_for_correlation {
                    format!("TOKEN[{}]", self.tag(matched(caps).as_bytes()))
                } else {
                    "TOKEN[REDACTED]".to_string()
                }
            })
            .to_string()
    }

    fn redact_pem(&self, text: &str) -> String {
        PEM_REGEX
            .replace_all(text, |caps: &regex::Captures| {
                let label = caps.get(1).map_or("", |m| m.as_str()).replace(' ', "_");
                if self.config.hash_for_correlation {
                    format!("PEM:{}[{}]", label, self.tag(matched(caps).as_bytes()))
                } else {
                    format!("PEM:{}[REDACTED]", label)
                }
            })
            .to_string()
    }
}

fn matched<'t>(caps: &regex::Captures<'t>) -> &'t str {
    caps.get(0).map_or("", |m| m.as_str())
}

lazy_static! {
    static ref DEFAULT_REDACTOR: CredentialRedactor = CredentialRedactor::default();
}

/// Redact `text` with the default configuration.
pub fn redact(text: &str) -> String {
    DEFAULT_REDACTOR.redact(text)
}

/// Correlation hash of `value` with the default configuration.
pub fn correlation_tag(value: &[u8]) -> String {
    DEFAULT_REDACTOR.tag(value)
}
