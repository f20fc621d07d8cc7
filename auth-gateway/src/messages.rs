//! Transport-agnostic request and response shapes of the two RPC operations

use auth_token::{Claims, VerificationResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyCredentialRequest {
    /// Leaf certificate followed by any intermediates, PEM or concatenated DER
    pub certificate_bytes: Vec<u8>,
    pub token_bytes: Vec<u8>,
    #[serde(default)]
    pub issuer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyCredentialResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims: Option<Claims>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<VerificationResult> for VerifyCredentialResponse {
    fn from(result: VerificationResult) -> Self {
        match result {
            VerificationResult::Valid { subject, claims } => Self {
                valid: true,
                subject: Some(subject),
                claims: Some(claims),
                error_code: None,
                error_message: None,
            },
            VerificationResult::Invalid(err) => Self {
                valid: false,
                subject: None,
                claims: None,
                error_code: Some(err.reason_code().to_string()),
                error_message: Some(err.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueCredentialRequest {
    pub claims: Claims,
    pub key_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCredentialResponse {
    pub token_bytes: Vec<u8>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use error_common::{CredentialError, TokenError};

    #[test]
    fn test_invalid_result_carries_reason_code() {
        let response = VerifyCredentialResponse::from(VerificationResult::Invalid(
            CredentialError::from(TokenError::Expired),
        ));
        assert!(!response.valid);
        assert_eq!(response.error_code.as_deref(), Some("TOKEN_3002"));
        assert!(response.subject.is_none());

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("claims").is_none());
    }

    #[test]
    fn test_valid_result_carries_subject_and_claims() {
        let claims = Claims::new("spiffe://example.org/web", 0, 60);
        let response = VerifyCredentialResponse::from(VerificationResult::Valid {
            subject: "spiffe://example.org/web".into(),
            claims: claims.clone(),
        });
        assert!(response.valid);
        assert_eq!(response.claims, Some(claims));
        assert!(response.error_code.is_none());
    }
}
