use crate::domain::TrustDomain;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use crypto::{KeyAlgorithm, PublicKey};
use error_common::CredentialError;
use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk, JwkSet};
use std::collections::BTreeMap;
use tracing::debug;

const P256_COORDINATE_LEN: usize = 32;
const P384_COORDINATE_LEN: usize = 48;

/// JWT authorities (key id to public key) for one trust domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwtBundle {
    trust_domain: TrustDomain,
    authorities: BTreeMap<String, PublicKey>,
}

impl JwtBundle {
    pub fn new(trust_domain: TrustDomain) -> Self {
        Self {
            trust_domain,
            authorities: BTreeMap::new(),
        }
    }

    /// Parse a JWKS document. Every key must carry a `kid`.
    pub fn parse(trust_domain: TrustDomain, bundle_bytes: &[u8]) -> Result<Self, CredentialError> {
        if bundle_bytes.is_empty() {
            return Err(CredentialError::InvalidArgument(
                "bundle bytes cannot be empty".to_string(),
            ));
        }
        let jwks: JwkSet = serde_json::from_slice(bundle_bytes).map_err(|e| {
            CredentialError::malformed(format!("bundle bytes do not represent a valid JWKS: {}", e))
        })?;

        let mut bundle = Self::new(trust_domain);
        for jwk in &jwks.keys {
            let key_id = jwk
                .common
                .key_id
                .clone()
                .filter(|kid| !kid.is_empty())
                .ok_or_else(|| CredentialError::malformed("JWKS entry is missing its key id"))?;
            bundle.authorities.insert(key_id, public_key_from_jwk(jwk)?);
        }

        debug!(
            trust_domain = %bundle.trust_domain,
            authorities = bundle.authorities.len(),
            "Parsed JWT bundle"
        );
        Ok(bundle)
    }

    pub fn trust_domain(&self) -> &TrustDomain {
        &self.trust_domain
    }

    pub fn jwt_authorities(&self) -> &BTreeMap<String, PublicKey> {
        &self.authorities
    }

    /// Look up an authority. An empty key id is an argument error; an
    /// unknown one is `None`.
    pub fn get_jwt_authority(&self, key_id: &str) -> Result<Option<&PublicKey>, CredentialError> {
        if key_id.is_empty() {
            return Err(CredentialError::InvalidArgument(
                "key_id cannot be empty".to_string(),
            ));
        }
        Ok(self.authorities.get(key_id))
    }

    pub fn add_jwt_authority(&mut self, key_id: &str, key: PublicKey) -> Result<(), CredentialError> {
        if key_id.is_empty() {
            return Err(CredentialError::InvalidArgument(
                "key_id cannot be empty".to_string(),
            ));
        }
        self.authorities.insert(key_id.to_string(), key);
        Ok(())
    }

    pub fn remove_jwt_authority(&mut self, key_id: &str) -> Option<PublicKey> {
        self.authorities.remove(key_id)
    }

    pub fn len(&self) -> usize {
        self.authorities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authorities.is_empty()
    }
}

fn public_key_from_jwk(jwk: &Jwk) -> Result<PublicKey, CredentialError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(params) => {
            use rsa::pkcs1::EncodeRsaPublicKey;

            let n = rsa::BigUint::from_bytes_be(&decode_member("n", &params.n)?);
            let e = rsa::BigUint::from_bytes_be(&decode_member("e", &params.e)?);
            let key = rsa::RsaPublicKey::new(n, e)
                .map_err(|e| CredentialError::malformed(format!("invalid RSA JWK: {}", e)))?;
            let pkcs1 = key
                .to_pkcs1_der()
                .map_err(|e| CredentialError::malformed(format!("invalid RSA JWK: {}", e)))?;
            PublicKey::from_parts(KeyAlgorithm::Rsa, pkcs1.as_bytes().to_vec())
        }
        AlgorithmParameters::EllipticCurve(params) => {
            let (algorithm, coordinate_len) = match params.curve {
                EllipticCurve::P256 => (KeyAlgorithm::EcP256, P256_COORDINATE_LEN),
                EllipticCurve::P384 => (KeyAlgorithm::EcP384, P384_COORDINATE_LEN),
                ref other => {
                    return Err(CredentialError::unsupported(format!("JWK curve {:?}", other)))
                }
            };
            let x = decode_member("x", &params.x)?;
            let y = decode_member("y", &params.y)?;
            if x.len() != coordinate_len || y.len() != coordinate_len {
                return Err(CredentialError::malformed("EC JWK coordinates have the wrong length"));
            }
            let mut point = Vec::with_capacity(1 + 2 * coordinate_len);
            point.push(0x04);
            point.extend_from_slice(&x);
            point.extend_from_slice(&y);
            PublicKey::from_parts(algorithm, point)
        }
        AlgorithmParameters::OctetKeyPair(params) => match params.curve {
            EllipticCurve::Ed25519 => {
                PublicKey::from_parts(KeyAlgorithm::Ed25519, decode_member("x", &params.x)?)
            }
            ref other => Err(CredentialError::unsupported(format!("JWK curve {:?}", other))),
        },
        AlgorithmParameters::OctetKey(_) => {
            Err(CredentialError::unsupported("symmetric JWK keys"))
        }
    }
}

fn decode_member(name: &str, value: &str) -> Result<Vec<u8>, CredentialError> {
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|_| CredentialError::malformed(format!("JWK member '{}' is not base64url", name)))
}
