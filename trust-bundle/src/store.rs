//! Trust store
//!
//! Holds the trust anchors as an immutable [`TrustSnapshot`] behind an
//! `Arc`. Readers clone the `Arc` and validate against a snapshot that can
//! never change under them. Writers are serialized, build a modified copy,
//! and swap the pointer, so a reader sees either the old or the new state.

use crate::domain::TrustDomain;
use crate::x509_bundle::X509Bundle;
use crypto::{Certificate, DistinguishedName};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;

/// A certificate trusted by configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustAnchor {
    certificate: Certificate,
    trust_domain: Option<TrustDomain>,
}

impl TrustAnchor {
    pub fn new(certificate: Certificate) -> Self {
        Self {
            certificate,
            trust_domain: None,
        }
    }

    pub fn for_domain(certificate: Certificate, trust_domain: TrustDomain) -> Self {
        Self {
            certificate,
            trust_domain: Some(trust_domain),
        }
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn trust_domain(&self) -> Option<&TrustDomain> {
        self.trust_domain.as_ref()
    }
}

/// Immutable view of the trust store at one point in time
#[derive(Debug, Clone, Default)]
pub struct TrustSnapshot {
    by_subject: HashMap<Vec<u8>, Vec<Arc<TrustAnchor>>>,
    fingerprints: HashSet<String>,
    revoked: HashSet<(Vec<u8>, String)>,
    version: u64,
}

impl TrustSnapshot {
    /// Anchors whose subject equals `issuer`
    pub fn lookup(&self, issuer: &DistinguishedName) -> &[Arc<TrustAnchor>] {
        self.by_subject
            .get(issuer.as_raw())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether this exact certificate (by DER identity) is an anchor
    pub fn contains(&self, certificate: &Certificate) -> bool {
        self.fingerprints.contains(certificate.fingerprint())
    }

    /// Whether the certificate's issuer has revoked its serial
    pub fn is_revoked(&self, certificate: &Certificate) -> bool {
        self.revoked.contains(&(
            certificate.issuer().as_raw().to_vec(),
            normalize_serial(certificate.serial()),
        ))
    }

    pub fn anchors(&self) -> impl Iterator<Item = &Arc<TrustAnchor>> {
        self.by_subject.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    /// Incremented by every write
    pub fn version(&self) -> u64 {
        self.version
    }

    fn insert(&mut self, anchor: TrustAnchor) -> bool {
        if !self
            .fingerprints
            .insert(anchor.certificate.fingerprint().to_string())
        {
            return false;
        }
        self.by_subject
            .entry(anchor.certificate.subject().as_raw().to_vec())
            .or_default()
            .push(Arc::new(anchor));
        true
    }
}

/// Shared, single-writer trust store
#[derive(Debug, Default)]
pub struct TrustStore {
    current: RwLock<Arc<TrustSnapshot>>,
    writer: Mutex<()>,
}

impl TrustStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bundle(bundle: &X509Bundle) -> Self {
        let store = Self::new();
        store.add_bundle(bundle);
        store
    }

    /// The current snapshot. Never blocks on a writer building its update.
    pub fn snapshot(&self) -> Arc<TrustSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Add an anchor. Returns false when the same certificate is already trusted.
    pub fn add(&self, anchor: TrustAnchor) -> bool {
        let subject = anchor.certificate.subject().to_string();
        let added = self.update(|snapshot| snapshot.insert(anchor));
        if added {
            info!(subject = %subject, "Trust anchor added");
        }
        added
    }

    /// Add every authority of a bundle, returning how many were new.
    pub fn add_bundle(&self, bundle: &X509Bundle) -> usize {
        let added = self.update(|snapshot| {
            bundle
                .x509_authorities()
                .iter()
                .filter(|cert| {
                    snapshot.insert(TrustAnchor::for_domain(
                        (*cert).clone(),
                        bundle.trust_domain().clone(),
                    ))
                })
                .count()
        });
        info!(
            trust_domain = %bundle.trust_domain(),
            added,
            "X.509 bundle added to trust store"
        );
        added
    }

    /// Remove every anchor with the given serial number, returning how many were removed.
    pub fn remove(&self, serial: &str) -> usize {
        let serial = normalize_serial(serial);
        let removed = self.update(|snapshot| {
            let TrustSnapshot {
                by_subject,
                fingerprints,
                ..
            } = snapshot;
            let mut removed = 0;
            for anchors in by_subject.values_mut() {
                anchors.retain(|anchor| {
                    let keep = normalize_serial(anchor.certificate.serial()) != serial;
                    if !keep {
                        fingerprints.remove(anchor.certificate.fingerprint());
                        removed += 1;
                    }
                    keep
                });
            }
            by_subject.retain(|_, anchors| !anchors.is_empty());
            removed
        });
        info!(serial = %serial, removed, "Trust anchors removed");
        removed
    }

    /// Mark `serial` as revoked by `issuer`.
    pub fn revoke(&self, issuer: &DistinguishedName, serial: &str) {
        let serial = normalize_serial(serial);
        self.update(|snapshot| {
            snapshot
                .revoked
                .insert((issuer.as_raw().to_vec(), serial.clone()));
        });
        info!(issuer = %issuer, serial = %serial, "Certificate revoked");
    }

    pub fn lookup(&self, issuer: &DistinguishedName) -> Vec<Arc<TrustAnchor>> {
        self.snapshot().lookup(issuer).to_vec()
    }

    pub fn contains(&self, certificate: &Certificate) -> bool {
        self.snapshot().contains(certificate)
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Copy, modify and publish a new snapshot. Writers are serialized.
    fn update<T>(&self, apply: impl FnOnce(&mut TrustSnapshot) -> T) -> T {
        let _guard = self.writer.lock();
        let mut next = TrustSnapshot::clone(&self.current.read());
        let result = apply(&mut next);
        next.version += 1;
        *self.current.write() = Arc::new(next);
        result
    }
}

/// Lower-case hex without a `0x` prefix or leading zeros
fn normalize_serial(serial: &str) -> String {
    let digits = serial
        .strip_prefix("0x")
        .or_else(|| serial.strip_prefix("0X"))
        .unwrap_or(serial)
        .trim_start_matches('0');
    if digits.is_empty() {
        "0".to_string()
    } else {
        digits.to_ascii_lowercase()
    }
}
