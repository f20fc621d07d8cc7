use crate::codes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures while building or checking a certificate chain.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainError {
    /// Candidates were exhausted before a trust anchor was reached
    #[error("no path to a trust anchor from '{subject}'")]
    NoPathFound { subject: String },

    /// A certificate's validity interval excludes the evaluation time
    #[error("certificate '{subject}' is outside its validity interval [{not_before}, {not_after}] at {now}")]
    ExpiredCertificate {
        subject: String,
        not_before: i64,
        not_after: i64,
        now: i64,
    },

    /// Issuer candidates exist by name but none of their keys verifies the signature
    #[error("no issuer key verifies the signature of '{subject}'")]
    SignatureMismatch { subject: String },

    /// CA basic constraint, key usage or path length violated
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// The issuer relation revisited a certificate already in the chain
    #[error("issuer cycle detected at '{subject}'")]
    CycleDetected { subject: String },

    /// Certificate serial was revoked by its issuer
    #[error("certificate serial {serial} has been revoked")]
    Revoked { serial: String },
}

/// Failures while checking a bearer token.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenError {
    /// Header algorithm cannot be used with the supplied key type
    #[error("algorithm {algorithm} is inconsistent with a {key_type} key")]
    AlgorithmMismatch { algorithm: String, key_type: String },

    #[error("token has expired")]
    Expired,

    #[error("token is not yet valid")]
    NotYetValid,

    #[error("issuer mismatch: expected '{expected}', found '{actual}'")]
    IssuerMismatch { expected: String, actual: String },

    #[error("token signature verification failed")]
    BadSignature,

    #[error("audience does not match expected value")]
    AudienceMismatch,

    #[error("missing required claim '{0}'")]
    MissingClaim(String),

    #[error("token header 'typ' is not supported: {0}")]
    InvalidType(String),
}

/// Error taxonomy shared by every stage of credential verification.
///
/// All variants except [`CredentialError::ResourceExhausted`] describe an
/// invalid credential and are reported to callers as a verdict, never as a
/// process failure.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialError {
    /// Byte sequence is not a well-formed structure for its encoding
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Structure uses a key or signature algorithm outside the supported set
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Token(#[from] TokenError),

    /// No key is registered under the requested key identifier
    #[error("no key registered for key id '{0}'")]
    KeyNotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Input exceeds the configured capacity; not a statement about validity
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
}

impl CredentialError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput(message.into())
    }

    pub fn unsupported(algorithm: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm(algorithm.into())
    }

    /// Stable, documented reason code for this error.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::MalformedInput(_) => codes::decode::MALFORMED_INPUT,
            Self::UnsupportedAlgorithm(_) => codes::decode::UNSUPPORTED_ALGORITHM,
            Self::Chain(err) => err.reason_code(),
            Self::Token(err) => err.reason_code(),
            Self::KeyNotFound(_) => codes::service::KEY_NOT_FOUND,
            Self::InvalidArgument(_) => codes::service::INVALID_ARGUMENT,
            Self::ResourceExhausted(_) => codes::service::RESOURCE_EXHAUSTED,
        }
    }

    /// Whether the error is a capacity problem rather than a verdict on the credential.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ResourceExhausted(_))
    }
}

impl ChainError {
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::NoPathFound { .. } => codes::chain::NO_PATH_FOUND,
            Self::ExpiredCertificate { .. } => codes::chain::EXPIRED_CERTIFICATE,
            Self::SignatureMismatch { .. } => codes::chain::SIGNATURE_MISMATCH,
            Self::ConstraintViolation(_) => codes::chain::CONSTRAINT_VIOLATION,
            Self::CycleDetected { .. } => codes::chain::CYCLE_DETECTED,
            Self::Revoked { .. } => codes::chain::REVOKED,
        }
    }
}

impl TokenError {
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::AlgorithmMismatch { .. } => codes::token::ALGORITHM_MISMATCH,
            Self::Expired => codes::token::EXPIRED,
            Self::NotYetValid => codes::token::NOT_YET_VALID,
            Self::IssuerMismatch { .. } => codes::token::ISSUER_MISMATCH,
            Self::BadSignature => codes::token::BAD_SIGNATURE,
            Self::AudienceMismatch => codes::token::AUDIENCE_MISMATCH,
            Self::MissingClaim(_) => codes::token::MISSING_CLAIM,
            Self::InvalidType(_) => codes::token::INVALID_TYPE,
        }
    }
}

/// Result type alias for credential operations
pub type Result<T> = std::result::Result<T, CredentialError>;

/// Log a rejected credential with its reason code
pub fn log_rejection(stage: &str, error: &CredentialError) {
    tracing::warn!(
        stage = stage,
        reason_code = error.reason_code(),
        error = %error,
        "Credential rejected"
    );
}
