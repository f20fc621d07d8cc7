//! Log redaction for credential material
//!
//! Bearer tokens and PEM blocks must never reach log output verbatim. The
//! redactor replaces them with a short SHA-256 tag so that the same
//! credential can still be correlated across log lines without being
//! recoverable from them.
//!
//! # Example
//!
//! ```rust
//! use logger_redacted::redact;
//!
//! let line = redact("verifying eyJhbGciOiJFZERTQSJ9.eyJzdWIiOiJhIn0.c2ln");
//! assert!(line.starts_with("verifying TOKEN["));
//! ```
//!
//! The `redacted_debug!` and `redacted_warn!` macros format their arguments
//! and redact the result before handing it to `tracing`.

pub mod macros;
pub mod redactor;

pub use redactor::{correlation_tag, redact, CredentialRedactor, CustomPattern, RedactionConfig};

#[doc(hidden)]
pub use tracing as __tracing;
