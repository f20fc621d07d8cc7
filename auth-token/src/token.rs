use crate::claims::Claims;
use crate::header::Header;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use error_common::CredentialError;
use std::fmt;

/// A compact-serialized JWS token: `header.claims.signature`
///
/// Parsing checks the structure only. The signature segment is kept as
/// text and is decoded during verification, so a damaged signature is
/// reported as a bad signature rather than a malformed token.
#[derive(Clone, PartialEq)]
pub struct Token {
    header: Header,
    claims: Claims,
    compact: String,
    signing_input_len: usize,
}

impl Token {
    pub fn parse(input: &str) -> Result<Self, CredentialError> {
        let mut segments = input.split('.');
        let (Some(header_b64), Some(claims_b64), Some(_signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(CredentialError::malformed(
                "token must have exactly three dot-separated segments",
            ));
        };

        let header = Header::from_json(&decode_segment("header", header_b64)?)?;
        let claims: Claims = serde_json::from_slice(&decode_segment("claims", claims_b64)?)
            .map_err(|e| CredentialError::malformed(format!("invalid token claims: {}", e)))?;

        Ok(Self {
            header,
            claims,
            compact: input.to_string(),
            signing_input_len: header_b64.len() + 1 + claims_b64.len(),
        })
    }

    pub fn from_bytes(input: &[u8]) -> Result<Self, CredentialError> {
        let text = std::str::from_utf8(input)
            .map_err(|_| CredentialError::malformed("token is not valid UTF-8"))?;
        Self::parse(text.trim())
    }

    pub(crate) fn assemble(header: Header, claims: Claims, signing_input: String, signature: &str) -> Self {
        let signing_input_len = signing_input.len();
        let mut compact = signing_input;
        compact.push('.');
        compact.push_str(signature);
        Self {
            header,
            claims,
            compact,
            signing_input_len,
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    /// `header.claims`, the bytes the signature covers
    pub fn signing_input(&self) -> &str {
        self.compact
            .get(..self.signing_input_len)
            .unwrap_or_default()
    }

    /// The base64url signature segment, undecoded
    pub fn signature_segment(&self) -> &str {
        self.compact
            .get(self.signing_input_len + 1..)
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.compact
    }

    pub fn into_string(self) -> String {
        self.compact
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compact)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Bearer tokens are credentials; never print the compact form
        f.debug_struct("Token")
            .field("header", &self.header)
            .field("sub", &self.claims.sub)
            .field("iss", &self.claims.iss)
            .finish_non_exhaustive()
    }
}

pub(crate) fn encode_segment(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn decode_segment(name: &str, segment: &str) -> Result<Vec<u8>, CredentialError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| CredentialError::malformed(format!("token {} is not base64url", name)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn encoded(json: &str) -> String {
        encode_segment(json.as_bytes())
    }

    #[test]
    fn test_parse_splits_signing_input_and_signature() {
        let header = encoded(r#"{"alg":"EdDSA","typ":"JWT"}"#);
        let claims = encoded(r#"{"sub":"a","exp":10}"#);
        let compact = format!("{}.{}.c2lnbmF0dXJl", header, claims);

        let token = Token::parse(&compact).unwrap();
        assert_eq!(token.signing_input(), format!("{}.{}", header, claims));
        assert_eq!(token.signature_segment(), "c2lnbmF0dXJl");
        assert_eq!(token.claims().exp, Some(10));
    }

    #[test]
    fn test_wrong_segment_count_is_malformed() {
        for input in ["", "a", "a.b", "a.b.c.d"] {
            assert!(matches!(Token::parse(input), Err(CredentialError::MalformedInput(_))));
        }
    }

    #[test]
    fn test_non_json_claims_are_malformed() {
        let compact = format!("{}.{}.", encoded(r#"{"alg":"ES256"}"#), encoded("[1,2"));
        assert!(matches!(Token::parse(&compact), Err(CredentialError::MalformedInput(_))));
    }

    #[test]
    fn test_debug_does_not_print_the_token() {
        let compact = format!(
            "{}.{}.c2lnbmF0dXJl",
            encoded(r#"{"alg":"EdDSA"}"#),
            encoded(r#"{"sub":"a"}"#)
        );
        let token = Token::parse(&compact).unwrap();
        assert!(!format!("{:?}", token).contains("c2lnbmF0dXJl"));
    }
}
