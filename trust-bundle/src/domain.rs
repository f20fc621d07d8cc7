//! Trust domains and SPIFFE IDs

use error_common::CredentialError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const SPIFFE_SCHEME: &str = "spiffe://";

/// Name of a trust domain, e.g. `example.org`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrustDomain(String);

impl TrustDomain {
    /// Accepts a bare name (`example.org`) or a SPIFFE ID whose trust domain
    /// is taken (`spiffe://example.org/workload`).
    pub fn new(name: &str) -> Result<Self, CredentialError> {
        if name.is_empty() {
            return Err(CredentialError::InvalidArgument(
                "trust domain is missing".to_string(),
            ));
        }
        if name.contains(":/") {
            return Ok(SpiffeId::parse(name)?.trust_domain().clone());
        }
        validate_trust_domain_name(name)?;
        Ok(Self(name.to_string()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// `spiffe://<name>`
    pub fn id_string(&self) -> String {
        format!("{}{}", SPIFFE_SCHEME, self.0)
    }
}

impl fmt::Display for TrustDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TrustDomain {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TrustDomain {
    type Error = CredentialError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<TrustDomain> for String {
    fn from(value: TrustDomain) -> Self {
        value.0
    }
}

/// A SPIFFE ID: `spiffe://<trust-domain>/<path>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SpiffeId {
    trust_domain: TrustDomain,
    path: String,
}

impl SpiffeId {
    pub fn parse(id: &str) -> Result<Self, CredentialError> {
        if id.is_empty() {
            return Err(CredentialError::InvalidArgument("SPIFFE ID is empty".to_string()));
        }
        let rest = id
            .strip_prefix(SPIFFE_SCHEME)
            .ok_or_else(|| CredentialError::malformed("SPIFFE ID scheme must be 'spiffe'"))?;

        let (domain, path) = match rest.find('/') {
            Some(index) => rest.split_at(index),
            None => (rest, ""),
        };
        if domain.is_empty() {
            return Err(CredentialError::malformed("SPIFFE ID is missing its trust domain"));
        }
        validate_trust_domain_name(domain)?;
        validate_path(path)?;

        Ok(Self {
            trust_domain: TrustDomain(domain.to_string()),
            path: path.to_string(),
        })
    }

    pub fn trust_domain(&self) -> &TrustDomain {
        &self.trust_domain
    }

    /// Path component including its leading `/`, or empty
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_member_of(&self, trust_domain: &TrustDomain) -> bool {
        &self.trust_domain == trust_domain
    }
}

impl fmt::Display for SpiffeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", SPIFFE_SCHEME, self.trust_domain, self.path)
    }
}

impl FromStr for SpiffeId {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SpiffeId {
    type Error = CredentialError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SpiffeId> for String {
    fn from(value: SpiffeId) -> Self {
        value.to_string()
    }
}

fn validate_trust_domain_name(name: &str) -> Result<(), CredentialError> {
    let valid = name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'_'));
    if !valid {
        return Err(CredentialError::malformed(format!(
            "trust domain '{}' contains characters outside [a-z0-9.-_]",
            name
        )));
    }
    Ok(())
}

fn validate_path(path: &str) -> Result<(), CredentialError> {
    if path.is_empty() {
        return Ok(());
    }
    for segment in path.split('/').skip(1) {
        match segment {
            "" => return Err(CredentialError::malformed("SPIFFE ID path has an empty segment")),
            "." | ".." => {
                return Err(CredentialError::malformed(
                    "SPIFFE ID path has a dot segment",
                ))
            }
            _ => {}
        }
        let valid = segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_'));
        if !valid {
            return Err(CredentialError::malformed(format!(
                "SPIFFE ID path segment '{}' contains characters outside [A-Za-z0-9.-_]",
                segment
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_spiffe_id() {
        let id = SpiffeId::parse("spiffe://example.org/ns/prod/sa/db").unwrap();
        assert_eq!(id.trust_domain().name(), "example.org");
        assert_eq!(id.path(), "/ns/prod/sa/db");
        assert_eq!(id.to_string(), "spiffe://example.org/ns/prod/sa/db");
    }

    #[test]
    fn test_trust_domain_from_id_or_name() {
        let a = TrustDomain::new("example.org").unwrap();
        let b = TrustDomain::new("spiffe://example.org/workload").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.id_string(), "spiffe://example.org");
    }

    #[test]
    fn test_rejects_invalid_ids() {
        for id in [
            "https://example.org/a",
            "spiffe:///path",
            "spiffe://Example.org/a",
            "spiffe://example.org:8080/a",
            "spiffe://user@example.org/a",
            "spiffe://example.org/a//b",
            "spiffe://example.org/a/../b",
            "spiffe://example.org/a/",
            "spiffe://example.org/a?query",
            "spiffe://example.org/a#frag",
        ] {
            assert!(SpiffeId::parse(id).is_err(), "{} should be rejected", id);
        }
    }

    #[test]
    fn test_empty_trust_domain_is_an_argument_error() {
        assert!(matches!(
            TrustDomain::new(""),
            Err(CredentialError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_serde_uses_string_form() {
        let id = SpiffeId::parse("spiffe://example.org/svc").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"spiffe://example.org/svc\"");
        let back: SpiffeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
