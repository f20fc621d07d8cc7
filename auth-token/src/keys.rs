//! Bridging engine key types to `jsonwebtoken`

use crypto::{KeyAlgorithm, PrivateKey, PublicKey, SignatureAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};

pub(crate) fn jwt_algorithm(alg: SignatureAlgorithm) -> Algorithm {
    match alg {
        SignatureAlgorithm::RS256 => Algorithm::RS256,
        SignatureAlgorithm::RS384 => Algorithm::RS384,
        SignatureAlgorithm::RS512 => Algorithm::RS512,
        SignatureAlgorithm::PS256 => Algorithm::PS256,
        SignatureAlgorithm::PS384 => Algorithm::PS384,
        SignatureAlgorithm::PS512 => Algorithm::PS512,
        SignatureAlgorithm::ES256 => Algorithm::ES256,
        SignatureAlgorithm::ES384 => Algorithm::ES384,
        SignatureAlgorithm::EdDSA => Algorithm::EdDSA,
    }
}

pub(crate) fn encoding_key(key: &PrivateKey) -> EncodingKey {
    match key.algorithm() {
        KeyAlgorithm::Rsa => EncodingKey::from_rsa_der(key.signing_der()),
        KeyAlgorithm::EcP256 | KeyAlgorithm::EcP384 => EncodingKey::from_ec_der(key.signing_der()),
        KeyAlgorithm::Ed25519 => EncodingKey::from_ed_der(key.signing_der()),
    }
}

pub(crate) fn decoding_key(key: &PublicKey) -> DecodingKey {
    match key.algorithm() {
        KeyAlgorithm::Rsa => DecodingKey::from_rsa_der(key.key_bytes()),
        KeyAlgorithm::EcP256 | KeyAlgorithm::EcP384 => DecodingKey::from_ec_der(key.key_bytes()),
        KeyAlgorithm::Ed25519 => DecodingKey::from_ed_der(key.key_bytes()),
    }
}
