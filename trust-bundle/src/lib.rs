//! Trust configuration for SVID Engine
//!
//! - [`TrustStore`]: the shared set of trust anchors, published as
//!   immutable snapshots
//! - [`X509Bundle`] / [`JwtBundle`]: per trust domain authority sets, loaded
//!   from PEM/DER files or JWKS documents
//! - [`TrustDomain`] / [`SpiffeId`]: identity names

pub mod domain;
pub mod jwt_bundle;
pub mod store;
pub mod x509_bundle;

pub use domain::{SpiffeId, TrustDomain};
pub use jwt_bundle::JwtBundle;
pub use store::{TrustAnchor, TrustSnapshot, TrustStore};
pub use x509_bundle::{BundleEncoding, X509Bundle};
