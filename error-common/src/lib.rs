//! Common error handling for SVID Engine
//!
//! Every stage of credential verification reports failures through one
//! taxonomy so the facade can map them to verdicts with stable reason codes.
//!
//! # Error Categories
//!
//! - **MalformedInput / UnsupportedAlgorithm**: structure decoding failures
//! - **ChainError**: chain-of-trust failures
//! - **TokenError**: bearer token signature and claim failures
//! - **KeyNotFound / InvalidArgument**: caller errors at the facade
//! - **ResourceExhausted**: capacity problems, the only fatal category
//!
//! # Example
//!
//! ```rust
//! use error_common::{CredentialError, TokenError};
//!
//! let err: CredentialError = TokenError::Expired.into();
//! assert_eq!(err.reason_code(), "TOKEN_3002");
//! assert!(!err.is_fatal());
//! ```

pub mod codes;
pub mod types;

pub use types::*;
