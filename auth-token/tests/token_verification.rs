//! Token issuance and verification
//!
//! Covers the round trip for each key family, the fixed check order, the
//! expiry boundary, algorithm substitution and tamper sensitivity.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

use auth_token::*;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use crypto::{decode_private_key, decode_public_key, PrivateKey, PublicKey, SignatureAlgorithm};
use error_common::{CredentialError, TokenError};
use proptest::prelude::*;
use rcgen::{KeyPair, PKCS_ECDSA_P256_SHA256, PKCS_ECDSA_P384_SHA384, PKCS_ED25519};
use serde_json::json;
use std::sync::OnceLock;

/// 2025-06-01T00:00:00Z
const NOW: i64 = 1_748_736_000;
const ISSUER: &str = "https://issuer.example.org";

struct Keys {
    private: PrivateKey,
    public: PublicKey,
    pkcs8: Vec<u8>,
}

fn generate(alg: &'static rcgen::SignatureAlgorithm) -> Keys {
    let pair = KeyPair::generate_for(alg).unwrap();
    Keys {
        private: decode_private_key(&pair.serialize_der()).unwrap(),
        public: decode_public_key(pair.public_key_pem().as_bytes()).unwrap(),
        pkcs8: pair.serialize_der(),
    }
}

fn ed25519() -> Keys {
    generate(&PKCS_ED25519)
}

fn p256() -> Keys {
    generate(&PKCS_ECDSA_P256_SHA256)
}

/// RSA generation is slow; share one key across tests
fn rsa_keys() -> &'static (PrivateKey, PublicKey) {
    static KEYS: OnceLock<(PrivateKey, PublicKey)> = OnceLock::new();
    KEYS.get_or_init(|| {
        use rsa::pkcs1::EncodeRsaPrivateKey;
        use rsa::pkcs8::EncodePublicKey;

        let private = rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap();
        let public = rsa::RsaPublicKey::from(&private);
        (
            decode_private_key(private.to_pkcs1_der().unwrap().as_bytes()).unwrap(),
            decode_public_key(public.to_public_key_der().unwrap().as_bytes()).unwrap(),
        )
    })
}

fn claims() -> Claims {
    Claims::new("spiffe://example.org/web", NOW, 300)
        .with_issuer(ISSUER)
        .with_audience(["spiffe://example.org/db"])
        .with_claim("role", json!("reader"))
}

fn error_of(result: VerificationResult) -> CredentialError {
    match result {
        VerificationResult::Invalid(err) => err,
        VerificationResult::Valid { .. } => panic!("expected an invalid verdict"),
    }
}

fn replace_header(token: &Token, header: serde_json::Value) -> String {
    let encoded = URL_SAFE_NO_PAD.encode(header.to_string());
    let mut parts = token.as_str().splitn(2, '.');
    parts.next();
    format!("{}.{}", encoded, parts.next().unwrap())
}

// ============================================================================
// Round trip
// ============================================================================

#[test]
fn test_round_trip_for_each_key_family() {
    let p384 = generate(&PKCS_ECDSA_P384_SHA384);
    let ed = ed25519();
    let ec = p256();
    let (rsa_private, rsa_public) = rsa_keys();

    let cases: Vec<(&PrivateKey, &PublicKey, SignatureAlgorithm)> = vec![
        (&ed.private, &ed.public, SignatureAlgorithm::EdDSA),
        (&ec.private, &ec.public, SignatureAlgorithm::ES256),
        (&p384.private, &p384.public, SignatureAlgorithm::ES384),
        (rsa_private, rsa_public, SignatureAlgorithm::RS256),
        (rsa_private, rsa_public, SignatureAlgorithm::PS384),
    ];

    for (private, public, alg) in cases {
        let token = sign(&claims(), private, alg, Some("key-1")).unwrap();
        assert_eq!(token.header().kid.as_deref(), Some("key-1"));

        let result = verify(&token, public, NOW + 10, Some(ISSUER));
        assert_eq!(
            result,
            VerificationResult::Valid {
                subject: "spiffe://example.org/web".to_string(),
                claims: claims(),
            },
            "{} round trip failed",
            alg
        );
    }
}

#[test]
fn test_deterministic_algorithms_reproduce_tokens() {
    let ed = ed25519();
    let first = sign(&claims(), &ed.private, SignatureAlgorithm::EdDSA, None).unwrap();
    let second = sign(&claims(), &ed.private, SignatureAlgorithm::EdDSA, None).unwrap();
    assert_eq!(first.as_str(), second.as_str());

    let (rsa_private, _) = rsa_keys();
    let first = sign(&claims(), rsa_private, SignatureAlgorithm::RS512, None).unwrap();
    let second = sign(&claims(), rsa_private, SignatureAlgorithm::RS512, None).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_tokens_from_jsonwebtoken_encode_verify() {
    let ed = ed25519();
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::EdDSA),
        &claims(),
        &jsonwebtoken::EncodingKey::from_ed_der(&ed.pkcs8),
    )
    .unwrap();

    assert!(TokenVerifier::default()
        .verify_str(&token, &ed.public, NOW, Some(ISSUER))
        .is_valid());
}

// ============================================================================
// Temporal checks
// ============================================================================

#[test]
fn test_expiry_boundary() {
    let ed = ed25519();
    let token = sign(&claims(), &ed.private, SignatureAlgorithm::EdDSA, None).unwrap();
    let exp = token.claims().exp.unwrap();

    assert!(verify(&token, &ed.public, exp - 1, None).is_valid());
    assert_eq!(
        error_of(verify(&token, &ed.public, exp, None)),
        CredentialError::from(TokenError::Expired)
    );
}

#[test]
fn test_issued_at_boundary() {
    let ed = ed25519();
    let token = sign(&claims(), &ed.private, SignatureAlgorithm::EdDSA, None).unwrap();

    assert!(verify(&token, &ed.public, NOW, None).is_valid());
    assert_eq!(
        error_of(verify(&token, &ed.public, NOW - 1, None)),
        CredentialError::from(TokenError::NotYetValid)
    );
}

// ============================================================================
// Check order
// ============================================================================

#[test]
fn test_signature_is_checked_before_expiry() {
    let signer = ed25519();
    let other = ed25519();
    let token = sign(&claims(), &signer.private, SignatureAlgorithm::EdDSA, None).unwrap();

    // Both the key and the time are wrong; the signature failure wins
    assert_eq!(
        error_of(verify(&token, &other.public, NOW + 10_000, None)),
        CredentialError::from(TokenError::BadSignature)
    );
}

#[test]
fn test_expiry_is_checked_before_issuer() {
    let ed = ed25519();
    let token = sign(&claims(), &ed.private, SignatureAlgorithm::EdDSA, None).unwrap();

    assert_eq!(
        error_of(verify(&token, &ed.public, NOW + 10_000, Some("someone-else"))),
        CredentialError::from(TokenError::Expired)
    );
    assert!(matches!(
        error_of(verify(&token, &ed.public, NOW, Some("someone-else"))),
        CredentialError::Token(TokenError::IssuerMismatch { .. })
    ));
}

#[test]
fn test_audience_and_subject_requirements() {
    let ed = ed25519();
    let token = sign(&claims(), &ed.private, SignatureAlgorithm::EdDSA, None).unwrap();

    let expecting_db = TokenVerifier::default().with_audience(["spiffe://example.org/db"]);
    assert!(expecting_db.verify(&token, &ed.public, NOW, None).is_valid());

    let expecting_other = TokenVerifier::default().with_audience(["spiffe://example.org/other"]);
    assert_eq!(
        error_of(expecting_other.verify(&token, &ed.public, NOW, None)),
        CredentialError::from(TokenError::AudienceMismatch)
    );

    let mut anonymous = claims();
    anonymous.sub = None;
    let token = sign(&anonymous, &ed.private, SignatureAlgorithm::EdDSA, None).unwrap();
    assert_eq!(
        error_of(verify(&token, &ed.public, NOW, None)),
        CredentialError::from(TokenError::MissingClaim("sub".into()))
    );
}

#[test]
fn test_unexpected_header_type_is_rejected() {
    let ed = ed25519();
    let mut header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::EdDSA);
    header.typ = Some("xyz".to_string());
    let token = jsonwebtoken::encode(
        &header,
        &claims(),
        &jsonwebtoken::EncodingKey::from_ed_der(&ed.pkcs8),
    )
    .unwrap();

    assert_eq!(
        error_of(TokenVerifier::default().verify_str(&token, &ed.public, NOW, None)),
        CredentialError::from(TokenError::InvalidType("xyz".into()))
    );
}

// ============================================================================
// Algorithm substitution
// ============================================================================

#[test]
fn test_key_of_another_type_is_algorithm_mismatch() {
    let ec = p256();
    let ed = ed25519();
    let token = sign(&claims(), &ec.private, SignatureAlgorithm::ES256, None).unwrap();

    assert!(matches!(
        error_of(verify(&token, &ed.public, NOW, None)),
        CredentialError::Token(TokenError::AlgorithmMismatch { .. })
    ));
}

#[test]
fn test_rewritten_header_algorithm_is_algorithm_mismatch() {
    let ec = p256();
    let token = sign(&claims(), &ec.private, SignatureAlgorithm::ES256, None).unwrap();
    let forged = replace_header(&token, json!({ "alg": "ES384", "typ": "JWT" }));

    assert!(matches!(
        error_of(TokenVerifier::default().verify_str(&forged, &ec.public, NOW, None)),
        CredentialError::Token(TokenError::AlgorithmMismatch { .. })
    ));
}

#[test]
fn test_symmetric_and_none_headers_are_algorithm_mismatch() {
    let ed = ed25519();
    let ec = p256();
    let ed_token = sign(&claims(), &ed.private, SignatureAlgorithm::EdDSA, None).unwrap();
    let ec_token = sign(&claims(), &ec.private, SignatureAlgorithm::ES256, None).unwrap();

    for alg in ["HS256", "HS512", "none"] {
        for (token, public) in [(&ed_token, &ed.public), (&ec_token, &ec.public)] {
            let forged = replace_header(token, json!({ "alg": alg, "typ": "JWT" }));
            let err = error_of(TokenVerifier::default().verify_str(&forged, public, NOW, None));
            assert!(
                matches!(err, CredentialError::Token(TokenError::AlgorithmMismatch { .. })),
                "{} header gave {:?}",
                alg,
                err
            );
            assert_eq!(err.reason_code(), "TOKEN_3001");
        }
    }
}

#[test]
fn test_unknown_header_algorithm_is_unsupported() {
    let ed = ed25519();
    let token = sign(&claims(), &ed.private, SignatureAlgorithm::EdDSA, None).unwrap();
    let forged = replace_header(&token, json!({ "alg": "ES512" }));

    assert!(matches!(
        error_of(TokenVerifier::default().verify_str(&forged, &ed.public, NOW, None)),
        CredentialError::UnsupportedAlgorithm(_)
    ));
}

#[test]
fn test_algorithm_outside_permitted_set_is_unsupported() {
    let ed = ed25519();
    let token = sign(&claims(), &ed.private, SignatureAlgorithm::EdDSA, None).unwrap();
    let verifier = TokenVerifier::new([SignatureAlgorithm::ES256, SignatureAlgorithm::RS256]);

    assert!(matches!(
        error_of(verifier.verify(&token, &ed.public, NOW, None)),
        CredentialError::UnsupportedAlgorithm(_)
    ));
}

#[test]
fn test_signing_with_incompatible_pairing_fails() {
    let ec = p256();
    assert!(matches!(
        sign(&claims(), &ec.private, SignatureAlgorithm::RS256, None),
        Err(CredentialError::UnsupportedAlgorithm(_))
    ));
    assert!(TokenSigner::new(ec.private, SignatureAlgorithm::EdDSA, None).is_err());
}

#[test]
fn test_custom_claim_cannot_shadow_registered_claim() {
    let ed = ed25519();
    let shadowing = claims().with_claim("exp", json!(9_999_999_999i64));
    assert!(matches!(
        sign(&shadowing, &ed.private, SignatureAlgorithm::EdDSA, None),
        Err(CredentialError::InvalidArgument(_))
    ));
}

// ============================================================================
// Tamper sensitivity
// ============================================================================

fn tamper_fixture() -> &'static (String, PublicKey) {
    static FIXTURE: OnceLock<(String, PublicKey)> = OnceLock::new();
    FIXTURE.get_or_init(|| {
        let ed = ed25519();
        let token = sign(&claims(), &ed.private, SignatureAlgorithm::EdDSA, Some("k")).unwrap();
        (token.into_string(), ed.public)
    })
}

const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_.";

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Replacing any single character of a signed token invalidates it.
    #[test]
    fn tampered_token_is_never_valid(index in any::<prop::sample::Index>(), pick in 0..TOKEN_ALPHABET.len()) {
        let (token, public) = tamper_fixture();
        let mut bytes = token.clone().into_bytes();
        let position = index.index(bytes.len());
        let replacement = TOKEN_ALPHABET[pick];
        prop_assume!(bytes[position] != replacement);
        bytes[position] = replacement;

        let tampered = String::from_utf8(bytes).unwrap();
        let result = TokenVerifier::default().verify_str(&tampered, public, NOW, Some(ISSUER));
        prop_assert!(!result.is_valid(), "tampered token at {} verified", position);
    }

    /// Arbitrary subjects and custom claims survive a sign/verify round trip.
    #[test]
    fn signed_claims_verify_unchanged(subject in "[a-z0-9/]{1,40}", value in any::<i64>()) {
        let ed = ed25519();
        let claims = Claims::new(subject.clone(), NOW, 60).with_claim("n", json!(value));
        let token = sign(&claims, &ed.private, SignatureAlgorithm::EdDSA, None).unwrap();

        let result = verify(&token, &ed.public, NOW, None);
        prop_assert_eq!(result.subject(), Some(subject.as_str()));
        prop_assert_eq!(result.claims(), Some(&claims));
    }
}
