use crate::claims::Claims;
use crate::header::Header;
use crate::keys::{encoding_key, jwt_algorithm};
use crate::token::{encode_segment, Token};
use crypto::{PrivateKey, SignatureAlgorithm};
use error_common::CredentialError;
use tracing::debug;

/// Claim names serialized from dedicated fields; a custom claim may not reuse them
const REGISTERED_CLAIMS: [&str; 6] = ["sub", "iss", "aud", "exp", "iat", "nbf"];

/// Sign `claims` with `key` under `algorithm`.
///
/// Stateless. Output is byte-for-byte reproducible for the deterministic
/// algorithms (RS*, EdDSA). The key/algorithm pairing must be consistent.
pub fn sign(
    claims: &Claims,
    key: &PrivateKey,
    algorithm: SignatureAlgorithm,
    key_id: Option<&str>,
) -> Result<Token, CredentialError> {
    if !algorithm.is_compatible_with(key.algorithm()) {
        return Err(CredentialError::unsupported(format!(
            "{} cannot be produced with a {} key",
            algorithm,
            key.algorithm()
        )));
    }
    if let Some(name) = claims
        .custom
        .keys()
        .find(|name| REGISTERED_CLAIMS.contains(&name.as_str()))
    {
        return Err(CredentialError::InvalidArgument(format!(
            "custom claim '{}' collides with a registered claim",
            name
        )));
    }

    let header = Header::new(algorithm, key_id.map(str::to_string));
    let header_json = serde_json::to_vec(&header)
        .map_err(|e| CredentialError::InvalidArgument(format!("unencodable header: {}", e)))?;
    let claims_json = serde_json::to_vec(claims)
        .map_err(|e| CredentialError::InvalidArgument(format!("unencodable claims: {}", e)))?;
    let signing_input = format!("{}.{}", encode_segment(&header_json), encode_segment(&claims_json));

    let signature = jsonwebtoken::crypto::sign(
        signing_input.as_bytes(),
        &encoding_key(key),
        jwt_algorithm(algorithm),
    )
    .map_err(|e| CredentialError::InvalidArgument(format!("signing failed: {}", e)))?;

    debug!(algorithm = %algorithm, kid = ?key_id, sub = ?claims.sub, "Token signed");
    Ok(Token::assemble(header, claims.clone(), signing_input, &signature))
}

/// A private key bound to one algorithm and key id
#[derive(Debug)]
pub struct TokenSigner {
    key: PrivateKey,
    algorithm: SignatureAlgorithm,
    key_id: Option<String>,
}

impl TokenSigner {
    pub fn new(
        key: PrivateKey,
        algorithm: SignatureAlgorithm,
        key_id: Option<String>,
    ) -> Result<Self, CredentialError> {
        if !algorithm.is_compatible_with(key.algorithm()) {
            return Err(CredentialError::unsupported(format!(
                "{} cannot be produced with a {} key",
                algorithm,
                key.algorithm()
            )));
        }
        Ok(Self {
            key,
            algorithm,
            key_id,
        })
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    pub fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    pub fn sign(&self, claims: &Claims) -> Result<Token, CredentialError> {
        sign(claims, &self.key, self.algorithm, self.key_id.as_deref())
    }
}
