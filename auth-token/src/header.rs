use crypto::{HeaderAlgorithm, SignatureAlgorithm};
use error_common::{CredentialError, TokenError};
use serde::{Deserialize, Serialize};

/// `typ` values accepted on verification
pub const ACCEPTED_TYPES: [&str; 2] = ["JWT", "JOSE"];

/// JOSE header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub alg: HeaderAlgorithm,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

/// Header as found on the wire, before `alg` is checked against the recognized set
#[derive(Deserialize)]
struct RawHeader {
    alg: String,
    #[serde(default)]
    typ: Option<String>,
    #[serde(default)]
    kid: Option<String>,
}

impl Header {
    pub fn new(alg: SignatureAlgorithm, kid: Option<String>) -> Self {
        Self {
            alg: alg.into(),
            typ: Some("JWT".to_string()),
            kid,
        }
    }

    pub(crate) fn from_json(json: &[u8]) -> Result<Self, CredentialError> {
        let raw: RawHeader = serde_json::from_slice(json)
            .map_err(|e| CredentialError::malformed(format!("invalid token header: {}", e)))?;
        Ok(Self {
            alg: raw.alg.parse()?,
            typ: raw.typ,
            kid: raw.kid,
        })
    }

    /// `typ`, when present, must be `JWT` or `JOSE`.
    pub fn check_type(&self) -> Result<(), TokenError> {
        match &self.typ {
            Some(typ) if !ACCEPTED_TYPES.contains(&typ.as_str()) => {
                Err(TokenError::InvalidType(typ.clone()))
            }
            _ => Ok(()),
        }
    }
}
