use crate::algorithm::CertSignatureAlgorithm;
use crate::der;
use crate::keys::PublicKey;
use error_common::CredentialError;
use sha2::{Digest, Sha256};
use std::fmt;
use x509_parser::prelude::*;

/// X.509 distinguished name, compared by its exact DER encoding
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DistinguishedName {
    raw: Vec<u8>,
    display: String,
}

impl DistinguishedName {
    fn from_x509(name: &X509Name<'_>) -> Self {
        Self {
            raw: name.as_raw().to_vec(),
            display: name.to_string(),
        }
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn as_str(&self) -> &str {
        &self.display
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl fmt::Debug for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DistinguishedName({:?})", self.display)
    }
}

/// Validity interval in unix seconds, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validity {
    pub not_before: i64,
    pub not_after: i64,
}

impl Validity {
    pub fn contains(&self, now: i64) -> bool {
        self.not_before <= now && now <= self.not_after
    }
}

/// Basic constraints extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BasicConstraints {
    pub is_ca: bool,
    pub path_len: Option<u32>,
}

/// The key usage bits the chain validator cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyUsage {
    pub digital_signature: bool,
    pub key_cert_sign: bool,
    pub crl_sign: bool,
}

/// A decoded X.509 certificate
///
/// Owns its DER encoding and every field the engine reads. Immutable once
/// decoded.
#[derive(Clone)]
pub struct Certificate {
    der: Vec<u8>,
    subject: DistinguishedName,
    issuer: DistinguishedName,
    serial: String,
    validity: Validity,
    public_key: PublicKey,
    signature_algorithm: CertSignatureAlgorithm,
    tbs: Vec<u8>,
    signature: Vec<u8>,
    basic_constraints: Option<BasicConstraints>,
    key_usage: Option<KeyUsage>,
    uri_sans: Vec<String>,
    fingerprint: String,
}

impl Certificate {
    /// Decode a single DER certificate. Trailing bytes are rejected.
    pub fn from_der(input: &[u8]) -> Result<Self, CredentialError> {
        let input = der::single_sequence(input)?;

        let (rest, cert) = X509Certificate::from_der(input)
            .map_err(|e| CredentialError::malformed(format!("failed to parse certificate: {}", e)))?;
        if !rest.is_empty() {
            return Err(CredentialError::malformed("trailing bytes after certificate"));
        }

        let signature_algorithm =
            CertSignatureAlgorithm::from_oid(&cert.signature_algorithm.algorithm.to_id_string())?;
        let public_key = PublicKey::from_spki(cert.public_key())?;

        let basic_constraints = cert
            .basic_constraints()
            .map_err(|e| CredentialError::malformed(format!("invalid basic constraints: {}", e)))?
            .map(|ext| BasicConstraints {
                is_ca: ext.value.ca,
                path_len: ext.value.path_len_constraint,
            });

        let key_usage = cert
            .key_usage()
            .map_err(|e| CredentialError::malformed(format!("invalid key usage: {}", e)))?
            .map(|ext| KeyUsage {
                digital_signature: ext.value.digital_signature(),
                key_cert_sign: ext.value.key_cert_sign(),
                crl_sign: ext.value.crl_sign(),
            });

        let uri_sans = cert
            .subject_alternative_name()
            .map_err(|e| CredentialError::malformed(format!("invalid subject alternative name: {}", e)))?
            .map(|ext| {
                ext.value
                    .general_names
                    .iter()
                    .filter_map(|name| match name {
                        GeneralName::URI(uri) => Some(uri.to_string()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let validity = Validity {
            not_before: cert.validity().not_before.timestamp(),
            not_after: cert.validity().not_after.timestamp(),
        };

        Ok(Self {
            der: input.to_vec(),
            subject: DistinguishedName::from_x509(cert.subject()),
            issuer: DistinguishedName::from_x509(cert.issuer()),
            serial: serial_hex(cert.tbs_certificate.raw_serial()),
            validity,
            public_key,
            signature_algorithm,
            tbs: cert.tbs_certificate.as_ref().to_vec(),
            signature: cert.signature_value.data.to_vec(),
            basic_constraints,
            key_usage,
            uri_sans,
            fingerprint: hex::encode(Sha256::digest(input)),
        })
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn subject(&self) -> &DistinguishedName {
        &self.subject
    }

    pub fn issuer(&self) -> &DistinguishedName {
        &self.issuer
    }

    /// Serial number as lower-case hex without leading zero bytes
    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn validity(&self) -> Validity {
        self.validity
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn signature_algorithm(&self) -> CertSignatureAlgorithm {
        self.signature_algorithm
    }

    pub fn basic_constraints(&self) -> Option<BasicConstraints> {
        self.basic_constraints
    }

    pub fn key_usage(&self) -> Option<KeyUsage> {
        self.key_usage
    }

    pub fn is_ca(&self) -> bool {
        self.basic_constraints.map(|bc| bc.is_ca).unwrap_or(false)
    }

    pub fn uri_sans(&self) -> &[String] {
        &self.uri_sans
    }

    /// The first `spiffe://` URI SAN, if any
    pub fn spiffe_id(&self) -> Option<&str> {
        self.uri_sans
            .iter()
            .map(String::as_str)
            .find(|uri| uri.starts_with("spiffe://"))
    }

    /// SHA-256 of the DER encoding, lower-case hex
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn is_self_issued(&self) -> bool {
        self.subject == self.issuer
    }

    /// Whether `issuer_key` verifies this certificate's signature.
    pub fn is_signed_by(&self, issuer_key: &PublicKey) -> bool {
        match self
            .signature_algorithm
            .verification_algorithm(issuer_key.algorithm())
        {
            Some(algorithm) => issuer_key.verify_with(algorithm, &self.tbs, &self.signature),
            None => false,
        }
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject.as_str())
            .field("issuer", &self.issuer.as_str())
            .field("serial", &self.serial)
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

fn serial_hex(raw: &[u8]) -> String {
    let significant = raw
        .iter()
        .position(|&b| b != 0)
        .and_then(|first| raw.get(first..))
        .unwrap_or(&[0]);
    hex::encode(significant)
}
