//! Closed algorithm sets
//!
//! Every supported key type, certificate signature scheme and token
//! signature scheme is a variant of an enum here. Anything else is rejected
//! with `UnsupportedAlgorithm`; there is no permissive fallback.

use error_common::CredentialError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod oid {
    pub const RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
    pub const EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
    pub const ED25519: &str = "1.3.101.112";

    pub const CURVE_P256: &str = "1.2.840.10045.3.1.7";
    pub const CURVE_P384: &str = "1.3.132.0.34";

    pub const SHA256_WITH_RSA: &str = "1.2.840.113549.1.1.11";
    pub const SHA384_WITH_RSA: &str = "1.2.840.113549.1.1.12";
    pub const SHA512_WITH_RSA: &str = "1.2.840.113549.1.1.13";
    pub const ECDSA_WITH_SHA256: &str = "1.2.840.10045.4.3.2";
    pub const ECDSA_WITH_SHA384: &str = "1.2.840.10045.4.3.3";
}

/// Asymmetric key types the engine can hold and verify with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    Rsa,
    EcP256,
    EcP384,
    Ed25519,
}

impl KeyAlgorithm {
    /// Resolve a key algorithm from an SPKI / PKCS#8 algorithm identifier.
    pub fn from_oids(algorithm: &str, curve: Option<&str>) -> Result<Self, CredentialError> {
        match (algorithm, curve) {
            (oid::RSA_ENCRYPTION, _) => Ok(Self::Rsa),
            (oid::EC_PUBLIC_KEY, Some(oid::CURVE_P256)) => Ok(Self::EcP256),
            (oid::EC_PUBLIC_KEY, Some(oid::CURVE_P384)) => Ok(Self::EcP384),
            (oid::EC_PUBLIC_KEY, Some(other)) => {
                Err(CredentialError::unsupported(format!("elliptic curve {}", other)))
            }
            (oid::EC_PUBLIC_KEY, None) => Err(CredentialError::malformed(
                "EC key is missing its named curve parameter",
            )),
            (oid::ED25519, _) => Ok(Self::Ed25519),
            (other, _) => Err(CredentialError::unsupported(format!("key algorithm {}", other))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Rsa => "RSA",
            Self::EcP256 => "EC P-256",
            Self::EcP384 => "EC P-384",
            Self::Ed25519 => "Ed25519",
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Signature schemes accepted on certificates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CertSignatureAlgorithm {
    RsaPkcs1Sha256,
    RsaPkcs1Sha384,
    RsaPkcs1Sha512,
    EcdsaSha256,
    EcdsaSha384,
    Ed25519,
}

impl CertSignatureAlgorithm {
    pub fn from_oid(oid_str: &str) -> Result<Self, CredentialError> {
        match oid_str {
            oid::SHA256_WITH_RSA => Ok(Self::RsaPkcs1Sha256),
            oid::SHA384_WITH_RSA => Ok(Self::RsaPkcs1Sha384),
            oid::SHA512_WITH_RSA => Ok(Self::RsaPkcs1Sha512),
            oid::ECDSA_WITH_SHA256 => Ok(Self::EcdsaSha256),
            oid::ECDSA_WITH_SHA384 => Ok(Self::EcdsaSha384),
            oid::ED25519 => Ok(Self::Ed25519),
            other => Err(CredentialError::unsupported(format!(
                "certificate signature algorithm {}",
                other
            ))),
        }
    }

    /// The `ring` verification algorithm for this scheme under an issuer key
    /// of type `key`, or `None` when the pairing is not valid.
    pub fn verification_algorithm(
        &self,
        key: KeyAlgorithm,
    ) -> Option<&'static dyn ring::signature::VerificationAlgorithm> {
        use ring::signature as sig;
        match (self, key) {
            (Self::RsaPkcs1Sha256, KeyAlgorithm::Rsa) => Some(&sig::RSA_PKCS1_2048_8192_SHA256),
            (Self::RsaPkcs1Sha384, KeyAlgorithm::Rsa) => Some(&sig::RSA_PKCS1_2048_8192_SHA384),
            (Self::RsaPkcs1Sha512, KeyAlgorithm::Rsa) => Some(&sig::RSA_PKCS1_2048_8192_SHA512),
            (Self::EcdsaSha256, KeyAlgorithm::EcP256) => Some(&sig::ECDSA_P256_SHA256_ASN1),
            (Self::EcdsaSha256, KeyAlgorithm::EcP384) => Some(&sig::ECDSA_P384_SHA256_ASN1),
            (Self::EcdsaSha384, KeyAlgorithm::EcP256) => Some(&sig::ECDSA_P256_SHA384_ASN1),
            (Self::EcdsaSha384, KeyAlgorithm::EcP384) => Some(&sig::ECDSA_P384_SHA384_ASN1),
            (Self::Ed25519, KeyAlgorithm::Ed25519) => Some(&sig::ED25519),
            (Self::RsaPkcs1Sha256 | Self::RsaPkcs1Sha384 | Self::RsaPkcs1Sha512, _)
            | (Self::EcdsaSha256 | Self::EcdsaSha384, _)
            | (Self::Ed25519, _) => None,
        }
    }
}

/// Token (JWS) signature algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    RS256,
    RS384,
    RS512,
    PS256,
    PS384,
    PS512,
    ES256,
    ES384,
    EdDSA,
}

impl SignatureAlgorithm {
    pub const ALL: [SignatureAlgorithm; 9] = [
        Self::RS256,
        Self::RS384,
        Self::RS512,
        Self::PS256,
        Self::PS384,
        Self::PS512,
        Self::ES256,
        Self::ES384,
        Self::EdDSA,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::PS256 => "PS256",
            Self::PS384 => "PS384",
            Self::PS512 => "PS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::EdDSA => "EdDSA",
        }
    }

    /// Whether a key of type `key` may produce or check this signature.
    ///
    /// This is the algorithm-consistency check that stops a header from
    /// reinterpreting a key as a different scheme.
    pub fn is_compatible_with(&self, key: KeyAlgorithm) -> bool {
        match self {
            Self::RS256 | Self::RS384 | Self::RS512 | Self::PS256 | Self::PS384 | Self::PS512 => {
                key == KeyAlgorithm::Rsa
            }
            Self::ES256 => key == KeyAlgorithm::EcP256,
            Self::ES384 => key == KeyAlgorithm::EcP384,
            Self::EdDSA => key == KeyAlgorithm::Ed25519,
        }
    }

    /// Whether signing with this algorithm yields the same bytes for the same input.
    pub fn is_deterministic(&self) -> bool {
        match self {
            Self::RS256 | Self::RS384 | Self::RS512 | Self::EdDSA => true,
            Self::PS256 | Self::PS384 | Self::PS512 | Self::ES256 | Self::ES384 => false,
        }
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|alg| alg.as_str() == s)
            .ok_or_else(|| CredentialError::unsupported(format!("token algorithm '{}'", s)))
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HMAC JWS schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HmacAlgorithm {
    HS256,
    HS384,
    HS512,
}

/// Any `alg` a token header may name
///
/// HMAC and `none` are recognized so that a header naming them is reported
/// as inconsistent with the verification key. No key type is compatible with
/// them, and they can be neither produced nor permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderAlgorithm {
    Signature(SignatureAlgorithm),
    Hmac(HmacAlgorithm),
    Unsecured,
}

impl HeaderAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signature(alg) => alg.as_str(),
            Self::Hmac(HmacAlgorithm::HS256) => "HS256",
            Self::Hmac(HmacAlgorithm::HS384) => "HS384",
            Self::Hmac(HmacAlgorithm::HS512) => "HS512",
            Self::Unsecured => "none",
        }
    }

    /// The asymmetric scheme, or `None` for HMAC and unsecured headers.
    pub fn signature_algorithm(&self) -> Option<SignatureAlgorithm> {
        match self {
            Self::Signature(alg) => Some(*alg),
            Self::Hmac(_) | Self::Unsecured => None,
        }
    }

    pub fn is_compatible_with(&self, key: KeyAlgorithm) -> bool {
        self.signature_algorithm()
            .is_some_and(|alg| alg.is_compatible_with(key))
    }
}

impl From<SignatureAlgorithm> for HeaderAlgorithm {
    fn from(alg: SignatureAlgorithm) -> Self {
        Self::Signature(alg)
    }
}

impl FromStr for HeaderAlgorithm {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HS256" => Ok(Self::Hmac(HmacAlgorithm::HS256)),
            "HS384" => Ok(Self::Hmac(HmacAlgorithm::HS384)),
            "HS512" => Ok(Self::Hmac(HmacAlgorithm::HS512)),
            "none" => Ok(Self::Unsecured),
            other => other.parse().map(Self::Signature),
        }
    }
}

impl fmt::Display for HeaderAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for HeaderAlgorithm {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
