//! Token verification
//!
//! Checks run in a fixed order and every one is evaluated; the first failure
//! in this order is the reported reason:
//!
//! 1. signature: the header algorithm must be permitted and consistent with
//!    the key type (HMAC and `none` never are), then the signature over
//!    `header.claims` is recomputed
//! 2. header type: `typ`, when present, is `JWT` or `JOSE`
//! 3. temporal: `iat <= now < exp`, with `nbf` as an extra lower bound
//! 4. issuer: `iss` equals the required issuer, when one is given
//! 5. audience: every expected audience member appears in `aud`; JWT-SVID
//!    verifiers also require a non-empty `aud` and an expected audience
//! 6. subject: `sub` is present

use crate::claims::Claims;
use crate::keys::{decoding_key, jwt_algorithm};
use crate::result::VerificationResult;
use crate::token::Token;
use crypto::{PublicKey, SignatureAlgorithm};
use error_common::{CredentialError, TokenError};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenVerifier {
    permitted: Vec<SignatureAlgorithm>,
    audience: Vec<String>,
    require_audience_claim: bool,
}

impl Default for TokenVerifier {
    fn default() -> Self {
        Self::new(SignatureAlgorithm::ALL)
    }
}

impl TokenVerifier {
    pub fn new(permitted: impl IntoIterator<Item = SignatureAlgorithm>) -> Self {
        Self {
            permitted: permitted.into_iter().collect(),
            audience: Vec::new(),
            require_audience_claim: false,
        }
    }

    /// Verifier for JWT-SVIDs: `aud` must be present and contain `audience`.
    pub fn jwt_svid<I, S>(audience: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::default().with_audience(audience).requiring_audience_claim()
    }

    /// JWT-SVID audience rules: an expected audience must be configured
    /// (`InvalidArgument` otherwise), and an `aud` claim that is absent or
    /// holds only empty strings counts as missing.
    pub fn requiring_audience_claim(mut self) -> Self {
        self.require_audience_claim = true;
        self
    }

    /// Every member of `audience` must appear in the token's `aud`.
    pub fn with_audience<I, S>(mut self, audience: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audience = audience.into_iter().map(Into::into).collect();
        self
    }

    pub fn permitted(&self) -> &[SignatureAlgorithm] {
        &self.permitted
    }

    pub fn verify(
        &self,
        token: &Token,
        key: &PublicKey,
        now: i64,
        required_issuer: Option<&str>,
    ) -> VerificationResult {
        let claims = token.claims();
        let stages: [(&str, Result<(), CredentialError>); 6] = [
            ("signature", self.check_signature(token, key)),
            ("header", token.header().check_type().map_err(Into::into)),
            ("temporal", check_temporal(claims, now).map_err(Into::into)),
            ("issuer", check_issuer(claims, required_issuer).map_err(Into::into)),
            ("audience", self.check_audience(claims)),
            ("subject", check_subject(claims).map_err(Into::into)),
        ];

        match stages
            .into_iter()
            .find_map(|(stage, result)| result.err().map(|err| (stage, err)))
        {
            Some((stage, err)) => {
                debug!(stage, reason_code = err.reason_code(), error = %err, "Token rejected");
                VerificationResult::Invalid(err)
            }
            None => VerificationResult::Valid {
                subject: claims.sub.clone().unwrap_or_default(),
                claims: claims.clone(),
            },
        }
    }

    /// Parse and verify a compact token. Parse failures are `Invalid`.
    pub fn verify_str(
        &self,
        token: &str,
        key: &PublicKey,
        now: i64,
        required_issuer: Option<&str>,
    ) -> VerificationResult {
        match Token::parse(token) {
            Ok(token) => self.verify(&token, key, now, required_issuer),
            Err(err) => VerificationResult::Invalid(err),
        }
    }

    fn check_signature(&self, token: &Token, key: &PublicKey) -> Result<(), CredentialError> {
        let header_alg = token.header().alg;
        let algorithm = match header_alg.signature_algorithm() {
            Some(algorithm) if !self.permitted.contains(&algorithm) => {
                return Err(CredentialError::unsupported(format!(
                    "token algorithm {} is not permitted",
                    algorithm
                )));
            }
            Some(algorithm) if algorithm.is_compatible_with(key.algorithm()) => algorithm,
            // HMAC and `none` never fit an asymmetric key
            _ => {
                return Err(TokenError::AlgorithmMismatch {
                    algorithm: header_alg.to_string(),
                    key_type: key.algorithm().to_string(),
                }
                .into());
            }
        };

        match jsonwebtoken::crypto::verify(
            token.signature_segment(),
            token.signing_input().as_bytes(),
            &decoding_key(key),
            jwt_algorithm(algorithm),
        ) {
            Ok(true) => Ok(()),
            Ok(false) | Err(_) => Err(TokenError::BadSignature.into()),
        }
    }

    fn check_audience(&self, claims: &Claims) -> Result<(), CredentialError> {
        if self.require_audience_claim {
            if self.audience.is_empty() {
                return Err(CredentialError::InvalidArgument(
                    "expected audience cannot be empty".to_string(),
                ));
            }
            if claims.aud.iter().all(String::is_empty) {
                return Err(TokenError::MissingClaim("aud".to_string()).into());
            }
        }
        if self
            .audience
            .iter()
            .all(|expected| claims.aud.contains(expected))
        {
            Ok(())
        } else {
            Err(TokenError::AudienceMismatch.into())
        }
    }
}

/// Verify with every algorithm permitted and no audience requirement.
pub fn verify(
    token: &Token,
    key: &PublicKey,
    now: i64,
    required_issuer: Option<&str>,
) -> VerificationResult {
    TokenVerifier::default().verify(token, key, now, required_issuer)
}

fn check_temporal(claims: &Claims, now: i64) -> Result<(), TokenError> {
    let exp = claims
        .exp
        .ok_or_else(|| TokenError::MissingClaim("exp".to_string()))?;
    let not_before = claims.iat.into_iter().chain(claims.nbf).max();
    if let Some(not_before) = not_before {
        if now < not_before {
            return Err(TokenError::NotYetValid);
        }
    }
    if now >= exp {
        return Err(TokenError::Expired);
    }
    Ok(())
}

fn check_issuer(claims: &Claims, required: Option<&str>) -> Result<(), TokenError> {
    match required {
        Some(expected) if claims.iss.as_deref() != Some(expected) => Err(TokenError::IssuerMismatch {
            expected: expected.to_string(),
            actual: claims.iss.clone().unwrap_or_default(),
        }),
        _ => Ok(()),
    }
}

fn check_subject(claims: &Claims) -> Result<(), TokenError> {
    match claims.sub.as_deref() {
        Some(sub) if !sub.is_empty() => Ok(()),
        _ => Err(TokenError::MissingClaim("sub".to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn claims(iat: Option<i64>, nbf: Option<i64>, exp: Option<i64>) -> Claims {
        Claims {
            sub: Some("a".into()),
            iat,
            nbf,
            exp,
            ..Claims::default()
        }
    }

    #[test]
    fn test_temporal_window_is_half_open() {
        let c = claims(Some(100), None, Some(200));
        assert_eq!(check_temporal(&c, 99), Err(TokenError::NotYetValid));
        assert_eq!(check_temporal(&c, 100), Ok(()));
        assert_eq!(check_temporal(&c, 199), Ok(()));
        assert_eq!(check_temporal(&c, 200), Err(TokenError::Expired));
    }

    #[test]
    fn test_nbf_is_an_additional_lower_bound() {
        let c = claims(Some(100), Some(150), Some(200));
        assert_eq!(check_temporal(&c, 120), Err(TokenError::NotYetValid));
        assert_eq!(check_temporal(&c, 150), Ok(()));
    }

    #[test]
    fn test_missing_expiry_is_missing_claim() {
        assert_eq!(
            check_temporal(&claims(None, None, None), 0),
            Err(TokenError::MissingClaim("exp".into()))
        );
    }

    #[test]
    fn test_issuer_check() {
        let mut c = claims(None, None, Some(1));
        assert!(check_issuer(&c, None).is_ok());
        assert!(matches!(
            check_issuer(&c, Some("issuer")),
            Err(TokenError::IssuerMismatch { .. })
        ));
        c.iss = Some("issuer".into());
        assert!(check_issuer(&c, Some("issuer")).is_ok());
    }

    #[test]
    fn test_expected_audience_must_be_subset() {
        let verifier = TokenVerifier::default().with_audience(["a", "b"]);
        let mut c = claims(None, None, Some(1));
        c.aud = vec!["a".into(), "b".into(), "c".into()];
        assert!(verifier.check_audience(&c).is_ok());
        c.aud = vec!["a".into()];
        assert_eq!(
            verifier.check_audience(&c),
            Err(TokenError::AudienceMismatch.into())
        );
    }

    #[test]
    fn test_jwt_svid_requires_audience_claim() {
        let verifier = TokenVerifier::jwt_svid(["spiffe://example.org/db"]);
        let mut c = claims(None, None, Some(1));
        assert_eq!(
            verifier.check_audience(&c),
            Err(TokenError::MissingClaim("aud".into()).into())
        );

        c.aud = vec![String::new(), String::new()];
        assert_eq!(
            verifier.check_audience(&c),
            Err(TokenError::MissingClaim("aud".into()).into())
        );

        c.aud = vec!["spiffe://example.org/db".into()];
        assert!(verifier.check_audience(&c).is_ok());
    }

    #[test]
    fn test_jwt_svid_rejects_empty_expected_audience() {
        let verifier = TokenVerifier::jwt_svid(Vec::<String>::new());
        let mut c = claims(None, None, Some(1));
        c.aud = vec!["spiffe://example.org/db".into()];
        assert!(matches!(
            verifier.check_audience(&c),
            Err(CredentialError::InvalidArgument(_))
        ));
    }
}
