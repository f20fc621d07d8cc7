//! Credential service facade for SVID Engine
//!
//! Exposes the two operations an RPC layer serves, `VerifyCredential` and
//! `IssueCredential`, on top of the decoding, chain validation and token
//! verification crates. The service holds a shared trust store, an optional
//! JWT bundle, the signing keys registered at construction, its
//! configuration and a clock; nothing else.
//!
//! # Features
//!
//! - Certificate chain plus bearer token verification with stable reason codes
//! - Token issuance with registered signing keys
//! - JWT-SVID verification against a JWT bundle, keyed by `kid`
//! - An async wrapper that bounds the wait on a blocking worker
//! - Configuration from a file and `SVID__*` environment variables
//!
//! # Example
//!
//! ```rust,no_run
//! use auth_gateway::{CredentialService, CredentialServiceConfig, VerifyCredentialRequest};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CredentialServiceConfig::load(Some("svid.toml".as_ref()))?;
//!     let service = CredentialService::builder().config(config).build()?;
//!
//!     let response = service.verify(VerifyCredentialRequest {
//!         certificate_bytes: std::fs::read("leaf-and-intermediates.pem")?,
//!         token_bytes: std::fs::read("token.jwt")?,
//!         issuer: None,
//!     })?;
//!     println!("valid: {}, code: {:?}", response.valid, response.error_code);
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod messages;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::CredentialServiceConfig;
pub use error::{ServiceError, ServiceResult};
pub use messages::*;
pub use service::{CredentialService, CredentialServiceBuilder};
