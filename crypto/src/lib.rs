//! Structure decoding and key material for SVID Engine
//!
//! This crate turns untrusted DER or PEM bytes into typed values:
//! - [`Certificate`]: decoded X.509 certificate with the fields chain
//!   validation needs, owning its DER
//! - [`PublicKey`] / [`PrivateKey`]: key material in the form the signature
//!   primitives consume
//! - closed algorithm sets ([`KeyAlgorithm`], [`CertSignatureAlgorithm`],
//!   [`SignatureAlgorithm`])
//!
//! # Example
//!
//! ```rust,no_run
//! use crypto::{decode, Decoded};
//!
//! # fn example(bytes: &[u8]) -> Result<(), error_common::CredentialError> {
//! match decode(bytes)? {
//!     Decoded::Certificate(cert) => println!("subject: {}", cert.subject()),
//!     other => println!("decoded a {}", other.kind()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod algorithm;
pub mod certificate;
pub mod decoder;
pub mod der;
pub mod keys;

pub use algorithm::{
    CertSignatureAlgorithm, HeaderAlgorithm, HmacAlgorithm, KeyAlgorithm, SignatureAlgorithm,
};
pub use certificate::{BasicConstraints, Certificate, DistinguishedName, KeyUsage, Validity};
pub use decoder::{
    decode, decode_certificate, decode_certificates, decode_private_key, decode_public_key,
    encode_certificates_pem, Decoded,
};
pub use keys::{PrivateKey, PublicKey};
