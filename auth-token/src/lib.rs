//! Bearer token issuance and verification for SVID Engine
//!
//! Tokens are compact JWS (`header.claims.signature`, base64url without
//! padding). Signing is stateless; verification runs a fixed sequence of
//! checks described in [`verifier`] and returns a [`VerificationResult`].
//!
//! # Example
//!
//! ```rust,no_run
//! use auth_token::{sign, Claims, TokenVerifier};
//! use crypto::{PrivateKey, PublicKey, SignatureAlgorithm};
//!
//! # fn example(private: &PrivateKey, public: &PublicKey) -> Result<(), error_common::CredentialError> {
//! let claims = Claims::new("spiffe://example.org/web", 1_700_000_000, 300)
//!     .with_issuer("https://issuer.example.org");
//! let token = sign(&claims, private, SignatureAlgorithm::ES256, Some("key-1"))?;
//!
//! let result = TokenVerifier::default().verify(
//!     &token,
//!     public,
//!     1_700_000_100,
//!     Some("https://issuer.example.org"),
//! );
//! assert!(result.is_valid());
//! # Ok(())
//! # }
//! ```

pub mod claims;
pub mod header;
mod keys;
pub mod result;
pub mod signer;
pub mod token;
pub mod verifier;

pub use claims::Claims;
pub use header::Header;
pub use result::VerificationResult;
pub use signer::{sign, TokenSigner};
pub use token::Token;
pub use verifier::{verify, TokenVerifier};
