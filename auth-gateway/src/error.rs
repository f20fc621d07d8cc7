use error_common::CredentialError;
use thiserror::Error;

/// Errors surfaced by the credential service itself
///
/// Verification verdicts are not errors; these cover setup problems and
/// the few conditions that are not statements about a credential.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to load {what}: {source:#}")]
    Bundle {
        what: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("verification did not finish within {millis} ms")]
    DeadlineExceeded { millis: u128 },

    #[error("verification worker failed: {0}")]
    Worker(String),
}

impl ServiceError {
    /// Stable reason code, shared with credential errors where one applies
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Credential(err) => err.reason_code(),
            Self::Configuration(_) | Self::Bundle { .. } => error_common::codes::service::CONFIGURATION,
            Self::DeadlineExceeded { .. } => error_common::codes::service::DEADLINE_EXCEEDED,
            Self::Worker(_) => error_common::codes::service::INTERNAL,
        }
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
