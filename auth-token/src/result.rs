use crate::claims::Claims;
use error_common::CredentialError;

/// Outcome of verifying a credential
///
/// Never partially valid: either every check passed and the verified
/// subject and claims are available, or the first failing check is reported.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationResult {
    Valid { subject: String, claims: Claims },
    Invalid(CredentialError),
}

impl VerificationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::Valid { subject, .. } => Some(subject),
            Self::Invalid(_) => None,
        }
    }

    pub fn claims(&self) -> Option<&Claims> {
        match self {
            Self::Valid { claims, .. } => Some(claims),
            Self::Invalid(_) => None,
        }
    }

    pub fn error(&self) -> Option<&CredentialError> {
        match self {
            Self::Valid { .. } => None,
            Self::Invalid(err) => Some(err),
        }
    }

    /// Stable reason code of the failure, if any
    pub fn reason_code(&self) -> Option<&'static str> {
        self.error().map(CredentialError::reason_code)
    }

    pub fn into_result(self) -> Result<(String, Claims), CredentialError> {
        match self {
            Self::Valid { subject, claims } => Ok((subject, claims)),
            Self::Invalid(err) => Err(err),
        }
    }
}

impl From<CredentialError> for VerificationResult {
    fn from(err: CredentialError) -> Self {
        Self::Invalid(err)
    }
}
