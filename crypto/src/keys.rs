use crate::algorithm::{oid, KeyAlgorithm};
use error_common::CredentialError;
use std::fmt;
use x509_parser::prelude::*;
use zeroize::Zeroizing;

const P256_POINT_LEN: usize = 65;
const P384_POINT_LEN: usize = 97;
const ED25519_KEY_LEN: usize = 32;

/// Public key material in the form signature primitives consume
///
/// - RSA: PKCS#1 `RSAPublicKey` DER
/// - EC: uncompressed SEC1 point
/// - Ed25519: raw 32-byte key
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
    algorithm: KeyAlgorithm,
    key_bytes: Vec<u8>,
}

impl PublicKey {
    /// Build a key from already-extracted key bytes, validating their shape.
    pub fn from_parts(algorithm: KeyAlgorithm, key_bytes: Vec<u8>) -> Result<Self, CredentialError> {
        match algorithm {
            KeyAlgorithm::Rsa => {
                use rsa::pkcs1::DecodeRsaPublicKey;
                rsa::RsaPublicKey::from_pkcs1_der(&key_bytes)
                    .map_err(|e| CredentialError::malformed(format!("invalid RSA public key: {}", e)))?;
            }
            KeyAlgorithm::EcP256 => check_point(&key_bytes, P256_POINT_LEN)?,
            KeyAlgorithm::EcP384 => check_point(&key_bytes, P384_POINT_LEN)?,
            KeyAlgorithm::Ed25519 => {
                if key_bytes.len() != ED25519_KEY_LEN {
                    return Err(CredentialError::malformed(format!(
                        "Ed25519 public key must be {} bytes, got {}",
                        ED25519_KEY_LEN,
                        key_bytes.len()
                    )));
                }
            }
        }
        Ok(Self { algorithm, key_bytes })
    }

    /// Extract the key from a parsed `SubjectPublicKeyInfo`.
    pub(crate) fn from_spki(spki: &SubjectPublicKeyInfo<'_>) -> Result<Self, CredentialError> {
        let algorithm_oid = spki.algorithm.algorithm.to_id_string();
        let curve_oid = if algorithm_oid == oid::EC_PUBLIC_KEY {
            spki.algorithm
                .parameters
                .as_ref()
                .and_then(|params| params.as_oid().ok())
                .map(|curve| curve.to_id_string())
        } else {
            None
        };
        let algorithm = KeyAlgorithm::from_oids(&algorithm_oid, curve_oid.as_deref())?;
        Self::from_parts(algorithm, spki.subject_public_key.data.to_vec())
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    pub fn key_bytes(&self) -> &[u8] {
        &self.key_bytes
    }

    /// Verify `signature` over `message` with a `ring` algorithm chosen by the caller.
    pub fn verify_with(
        &self,
        algorithm: &'static dyn ring::signature::VerificationAlgorithm,
        message: &[u8],
        signature: &[u8],
    ) -> bool {
        ring::signature::UnparsedPublicKey::new(algorithm, &self.key_bytes)
            .verify(message, signature)
            .is_ok()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("algorithm", &self.algorithm)
            .field("key", &hex::encode(&self.key_bytes))
            .finish()
    }
}

fn check_point(bytes: &[u8], expected_len: usize) -> Result<(), CredentialError> {
    if bytes.len() != expected_len || bytes.first() != Some(&0x04) {
        return Err(CredentialError::malformed(
            "EC public key must be an uncompressed point of the curve's size",
        ));
    }
    Ok(())
}

/// Signing key material
///
/// Held as PKCS#1 DER for RSA and PKCS#8 DER for EC and Ed25519, which is
/// what the token signer consumes. Never serialized, never printed, and
/// zeroized on drop.
pub struct PrivateKey {
    algorithm: KeyAlgorithm,
    der: Zeroizing<Vec<u8>>,
}

impl PrivateKey {
    pub(crate) fn new(algorithm: KeyAlgorithm, der: Vec<u8>) -> Self {
        Self {
            algorithm,
            der: Zeroizing::new(der),
        }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// Key DER in signer form (PKCS#1 for RSA, PKCS#8 otherwise).
    pub fn signing_der(&self) -> &[u8] {
        &self.der
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("algorithm", &self.algorithm)
            .field("material", &"[REDACTED]")
            .finish()
    }
}
