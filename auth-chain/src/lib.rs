//! Chain-of-trust validation for SVID Engine
//!
//! [`ChainValidator::validate`] builds a path from a leaf certificate to a
//! trust anchor using caller-supplied intermediates, checking signatures,
//! validity, CA constraints and revocation along the way. It is pure and
//! works against an immutable [`trust_bundle::TrustSnapshot`].

pub mod chain;
pub mod validator;

pub use chain::Chain;
pub use validator::{validate, ChainValidator, DEFAULT_MAX_CHAIN_LENGTH};
