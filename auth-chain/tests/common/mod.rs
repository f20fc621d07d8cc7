//! Test PKI built with rcgen

#![allow(dead_code)]

use crypto::Certificate;
use rcgen::{
    BasicConstraints, CertificateParams, DnType, IsCa, KeyPair, KeyUsagePurpose, SanType,
    PKCS_ECDSA_P256_SHA256,
};
use trust_bundle::{TrustAnchor, TrustStore};

/// 2025-06-01T00:00:00Z
pub const NOW: i64 = 1_748_736_000;

pub struct Issued {
    pub cert: rcgen::Certificate,
    pub key: KeyPair,
    pub parsed: Certificate,
}

impl Issued {
    pub fn certificate(&self) -> Certificate {
        self.parsed.clone()
    }
}

pub fn ca_params(cn: &str) -> CertificateParams {
    let mut params = CertificateParams::new(vec![]).unwrap();
    params.distinguished_name.push(DnType::CommonName, cn);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
    params
}

pub fn leaf_params(cn: &str, spiffe_id: &str) -> CertificateParams {
    let mut params = CertificateParams::new(vec![]).unwrap();
    params.distinguished_name.push(DnType::CommonName, cn);
    params.subject_alt_names = vec![SanType::URI(spiffe_id.try_into().unwrap())];
    params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
    params
}

/// Sign `params` with `issuer`, or self-sign when `issuer` is `None`.
pub fn issue(params: CertificateParams, issuer: Option<&Issued>) -> Issued {
    let key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).unwrap();
    issue_with_key(params, key, issuer)
}

pub fn issue_with_key(params: CertificateParams, key: KeyPair, issuer: Option<&Issued>) -> Issued {
    let cert = match issuer {
        Some(issuer) => params.signed_by(&key, &issuer.cert, &issuer.key).unwrap(),
        None => params.self_signed(&key).unwrap(),
    };
    let parsed = Certificate::from_der(cert.der()).unwrap();
    Issued { cert, key, parsed }
}

pub fn new_root(cn: &str) -> Issued {
    issue(ca_params(cn), None)
}

pub fn new_intermediate(cn: &str, issuer: &Issued) -> Issued {
    issue(ca_params(cn), Some(issuer))
}

pub fn new_leaf(cn: &str, issuer: &Issued) -> Issued {
    issue(
        leaf_params(cn, &format!("spiffe://example.org/{}", cn)),
        Some(issuer),
    )
}

pub fn store_with(anchors: &[&Issued]) -> TrustStore {
    let store = TrustStore::new();
    for anchor in anchors {
        store.add(TrustAnchor::new(anchor.certificate()));
    }
    store
}

/// A second handle on the same key material
pub fn copy_key(key: &KeyPair) -> KeyPair {
    KeyPair::from_pem(&key.serialize_pem()).unwrap()
}
