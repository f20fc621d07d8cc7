//! X.509 bundle file tests
//!
//! Bundles are written to and read back from temporary files in both
//! encodings, then fed into a trust store.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

use crypto::Certificate;
use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, KeyPair, PKCS_ECDSA_P256_SHA256};
use trust_bundle::*;

fn ca(cn: &str) -> Certificate {
    let key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).unwrap();
    let mut params = CertificateParams::new(vec![]).unwrap();
    params.distinguished_name.push(DnType::CommonName, cn);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let cert = params.self_signed(&key).unwrap();
    Certificate::from_der(cert.der()).unwrap()
}

fn domain() -> TrustDomain {
    TrustDomain::new("example.org").unwrap()
}

// ============================================================================
// Save / load
// ============================================================================

#[test]
fn test_save_and_load_pem_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bundle.pem");

    let bundle = X509Bundle::new(domain(), vec![ca("Root One"), ca("Root Two")]);
    bundle.save(&path, BundleEncoding::Pem).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.matches("-----BEGIN CERTIFICATE-----").count(), 2);

    let loaded = X509Bundle::load(domain(), &path, BundleEncoding::Pem).unwrap();
    assert_eq!(loaded, bundle);
}

#[test]
fn test_save_and_load_der_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bundle.der");

    let bundle = X509Bundle::new(domain(), vec![ca("Root One"), ca("Root Two")]);
    bundle.save(&path, BundleEncoding::Der).unwrap();

    let loaded = X509Bundle::load(domain(), &path, BundleEncoding::Der).unwrap();
    assert_eq!(loaded.x509_authorities(), bundle.x509_authorities());
}

#[test]
fn test_load_with_wrong_encoding_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bundle.pem");
    X509Bundle::new(domain(), vec![ca("Root")])
        .save(&path, BundleEncoding::Pem)
        .unwrap();

    assert!(X509Bundle::load(domain(), &path, BundleEncoding::Der).is_err());
}

#[test]
fn test_load_missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.pem");

    let err = X509Bundle::load(domain(), &path, BundleEncoding::Pem).unwrap_err();
    assert!(format!("{:#}", err).contains("absent.pem"));
}

// ============================================================================
// Authority set semantics
// ============================================================================

#[test]
fn test_authorities_are_unique() {
    let root = ca("Root");
    let mut bundle = X509Bundle::new(domain(), vec![root.clone(), root.clone()]);
    assert_eq!(bundle.len(), 1);

    assert!(!bundle.add_authority(root.clone()));
    assert!(bundle.remove_authority(&root));
    assert!(!bundle.remove_authority(&root));
    assert!(bundle.is_empty());
}

#[test]
fn test_parse_rejects_empty_and_garbage() {
    assert!(matches!(
        X509Bundle::parse(domain(), b""),
        Err(error_common::CredentialError::InvalidArgument(_))
    ));
    assert!(matches!(
        X509Bundle::parse(domain(), b"not pem"),
        Err(error_common::CredentialError::MalformedInput(_))
    ));
    assert!(matches!(
        X509Bundle::parse_raw(domain(), &[0x30, 0x82, 0x10, 0x00, 0x01]),
        Err(error_common::CredentialError::MalformedInput(_))
    ));
}

// ============================================================================
// Trust store population
// ============================================================================

#[test]
fn test_trust_store_from_bundle_tags_trust_domain() {
    let root = ca("Domain Root");
    let bundle = X509Bundle::new(domain(), vec![root.clone()]);
    let store = TrustStore::from_bundle(&bundle);

    let anchors = store.lookup(root.subject());
    assert_eq!(anchors.len(), 1);
    assert_eq!(anchors[0].trust_domain(), Some(&domain()));

    // Adding the same bundle again adds nothing
    assert_eq!(store.add_bundle(&bundle), 0);
}
