use crate::domain::TrustDomain;
use anyhow::Context;
use crypto::{decode_certificates, encode_certificates_pem, Certificate};
use error_common::CredentialError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// On-disk encoding of an X.509 bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleEncoding {
    Pem,
    Der,
}

/// Trusted X.509 authorities for one trust domain
///
/// Authorities are kept unique by DER identity, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X509Bundle {
    trust_domain: TrustDomain,
    authorities: Vec<Certificate>,
}

impl X509Bundle {
    pub fn new(trust_domain: TrustDomain, authorities: Vec<Certificate>) -> Self {
        let mut bundle = Self {
            trust_domain,
            authorities: Vec::with_capacity(authorities.len()),
        };
        for authority in authorities {
            bundle.add_authority(authority);
        }
        bundle
    }

    /// Parse authorities from PEM `CERTIFICATE` blocks.
    pub fn parse(trust_domain: TrustDomain, bundle_bytes: &[u8]) -> Result<Self, CredentialError> {
        require_bytes(bundle_bytes)?;
        Ok(Self::new(trust_domain, decode_certificates_of(bundle_bytes, BundleEncoding::Pem)?))
    }

    /// Parse authorities from concatenated DER certificates.
    pub fn parse_raw(trust_domain: TrustDomain, bundle_bytes: &[u8]) -> Result<Self, CredentialError> {
        require_bytes(bundle_bytes)?;
        Ok(Self::new(trust_domain, decode_certificates_of(bundle_bytes, BundleEncoding::Der)?))
    }

    /// Load a bundle file.
    pub fn load(
        trust_domain: TrustDomain,
        path: impl AsRef<Path>,
        encoding: BundleEncoding,
    ) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read X.509 bundle {}", path.display()))?;
        let bundle = match encoding {
            BundleEncoding::Pem => Self::parse(trust_domain, &bytes),
            BundleEncoding::Der => Self::parse_raw(trust_domain, &bytes),
        }
        .with_context(|| format!("failed to parse X.509 bundle {}", path.display()))?;

        info!(
            path = %path.display(),
            trust_domain = %bundle.trust_domain,
            authorities = bundle.authorities.len(),
            "Loaded X.509 bundle"
        );
        Ok(bundle)
    }

    /// Write the bundle to `path` in the given encoding.
    pub fn save(&self, path: impl AsRef<Path>, encoding: BundleEncoding) -> anyhow::Result<()> {
        let path = path.as_ref();
        let bytes = match encoding {
            BundleEncoding::Pem => encode_certificates_pem(&self.authorities).into_bytes(),
            BundleEncoding::Der => self
                .authorities
                .iter()
                .flat_map(|cert| cert.der().iter().copied())
                .collect(),
        };
        std::fs::write(path, bytes)
            .with_context(|| format!("failed to write X.509 bundle {}", path.display()))?;
        debug!(path = %path.display(), ?encoding, "Saved X.509 bundle");
        Ok(())
    }

    pub fn trust_domain(&self) -> &TrustDomain {
        &self.trust_domain
    }

    pub fn x509_authorities(&self) -> &[Certificate] {
        &self.authorities
    }

    /// Returns false when the authority was already present.
    pub fn add_authority(&mut self, authority: Certificate) -> bool {
        if self.authorities.contains(&authority) {
            return false;
        }
        self.authorities.push(authority);
        true
    }

    /// Returns false when the authority was not present.
    pub fn remove_authority(&mut self, authority: &Certificate) -> bool {
        let before = self.authorities.len();
        self.authorities.retain(|existing| existing != authority);
        self.authorities.len() != before
    }

    pub fn len(&self) -> usize {
        self.authorities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authorities.is_empty()
    }
}

fn require_bytes(bundle_bytes: &[u8]) -> Result<(), CredentialError> {
    if bundle_bytes.is_empty() {
        return Err(CredentialError::InvalidArgument(
            "bundle bytes cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn decode_certificates_of(
    bundle_bytes: &[u8],
    encoding: BundleEncoding,
) -> Result<Vec<Certificate>, CredentialError> {
    let looks_pem = bundle_bytes
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .map(|&b| b == b'-')
        .unwrap_or(false);
    match (encoding, looks_pem) {
        (BundleEncoding::Pem, false) => {
            Err(CredentialError::malformed("expected PEM certificate blocks"))
        }
        (BundleEncoding::Der, true) => Err(CredentialError::malformed("expected DER certificates")),
        _ => decode_certificates(bundle_bytes),
    }
}
