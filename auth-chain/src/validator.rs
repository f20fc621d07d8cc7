//! Chain-of-trust construction and checking
//!
//! Starting from the leaf, each step gathers issuer candidates whose subject
//! equals the current certificate's issuer: trust anchors first, then the
//! supplied intermediates. The first candidate whose key verifies the current
//! certificate's signature and that is not already on the path is taken. The
//! walk ends at an anchor.
//!
//! Every certificate on the path, anchors included, must be inside its
//! validity interval at `now`. Non-anchor issuers must be CAs permitted to
//! sign certificates. Path length constraints apply to every issuer.

use crate::chain::Chain;
use crypto::Certificate;
use error_common::ChainError;
use std::collections::HashSet;
use tracing::debug;
use trust_bundle::{TrustSnapshot, TrustStore};

pub const DEFAULT_MAX_CHAIN_LENGTH: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainValidator {
    max_chain_length: usize,
}

impl Default for ChainValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHAIN_LENGTH)
    }
}

struct Candidate<'a> {
    certificate: &'a Certificate,
    is_anchor: bool,
}

impl ChainValidator {
    /// `max_chain_length` counts every certificate including leaf and anchor.
    pub fn new(max_chain_length: usize) -> Self {
        Self {
            max_chain_length: max_chain_length.max(1),
        }
    }

    pub fn max_chain_length(&self) -> usize {
        self.max_chain_length
    }

    /// Build and check a chain from `leaf` to an anchor of `trust`.
    pub fn validate(
        &self,
        leaf: &Certificate,
        intermediates: &[Certificate],
        trust: &TrustSnapshot,
        now: i64,
    ) -> Result<Chain, ChainError> {
        let result = self.build(leaf, intermediates, trust, now);
        match &result {
            Ok(chain) => debug!(
                leaf = %leaf.subject(),
                length = chain.len(),
                anchor = %chain.anchor().subject(),
                "Chain validated"
            ),
            Err(err) => debug!(
                leaf = %leaf.subject(),
                reason_code = err.reason_code(),
                error = %err,
                "Chain rejected"
            ),
        }
        result
    }

    fn build(
        &self,
        leaf: &Certificate,
        intermediates: &[Certificate],
        trust: &TrustSnapshot,
        now: i64,
    ) -> Result<Chain, ChainError> {
        check_validity(leaf, now)?;
        check_not_revoked(leaf, trust)?;

        if trust.contains(leaf) {
            return finish(vec![leaf.clone()]);
        }

        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(leaf.fingerprint());
        let mut path: Vec<&Certificate> = vec![leaf];
        let mut current = leaf;

        loop {
            let anchors = trust.lookup(current.issuer());
            let candidates: Vec<Candidate<'_>> = anchors
                .iter()
                .map(|anchor| Candidate {
                    certificate: anchor.certificate(),
                    is_anchor: true,
                })
                .chain(
                    intermediates
                        .iter()
                        .filter(|cert| cert.subject() == current.issuer())
                        .map(|cert| Candidate {
                            certificate: cert,
                            is_anchor: false,
                        }),
                )
                .collect();

            debug!(
                subject = %current.subject(),
                issuer = %current.issuer(),
                anchors = anchors.len(),
                candidates = candidates.len(),
                "Searching for issuer"
            );

            if candidates.is_empty() {
                return Err(ChainError::NoPathFound {
                    subject: current.subject().to_string(),
                });
            }

            let mut only_revisits = false;
            let mut selected = None;
            for candidate in candidates {
                if !current.is_signed_by(candidate.certificate.public_key()) {
                    continue;
                }
                if visited.contains(candidate.certificate.fingerprint()) {
                    only_revisits = true;
                    continue;
                }
                selected = Some(candidate);
                break;
            }

            let Some(issuer) = selected else {
                let subject = current.subject().to_string();
                return Err(if only_revisits {
                    ChainError::CycleDetected { subject }
                } else {
                    ChainError::SignatureMismatch { subject }
                });
            };

            if path.len() + 1 > self.max_chain_length {
                return Err(ChainError::ConstraintViolation(format!(
                    "chain exceeds the maximum length of {}",
                    self.max_chain_length
                )));
            }

            check_validity(issuer.certificate, now)?;
            check_not_revoked(issuer.certificate, trust)?;
            check_issuer_constraints(issuer.certificate, issuer.is_anchor, &path)?;

            path.push(issuer.certificate);
            if issuer.is_anchor {
                return finish(path.into_iter().cloned().collect());
            }
            visited.insert(issuer.certificate.fingerprint());
            current = issuer.certificate;
        }
    }
}

/// Validate against the current snapshot of `store` with default limits.
pub fn validate(
    leaf: &Certificate,
    intermediates: &[Certificate],
    store: &TrustStore,
    now: i64,
) -> Result<Chain, ChainError> {
    ChainValidator::default().validate(leaf, intermediates, &store.snapshot(), now)
}

fn finish(certificates: Vec<Certificate>) -> Result<Chain, ChainError> {
    Chain::new(certificates).ok_or_else(|| ChainError::NoPathFound {
        subject: String::new(),
    })
}

fn check_validity(cert: &Certificate, now: i64) -> Result<(), ChainError> {
    let validity = cert.validity();
    if !validity.contains(now) {
        return Err(ChainError::ExpiredCertificate {
            subject: cert.subject().to_string(),
            not_before: validity.not_before,
            not_after: validity.not_after,
            now,
        });
    }
    Ok(())
}

fn check_not_revoked(cert: &Certificate, trust: &TrustSnapshot) -> Result<(), ChainError> {
    if trust.is_revoked(cert) {
        return Err(ChainError::Revoked {
            serial: cert.serial().to_string(),
        });
    }
    Ok(())
}

/// `below` is the path from the leaf up to the certificate `issuer` signed.
fn check_issuer_constraints(
    issuer: &Certificate,
    is_anchor: bool,
    below: &[&Certificate],
) -> Result<(), ChainError> {
    let subject = issuer.subject();

    if !is_anchor {
        if !issuer.is_ca() {
            return Err(ChainError::ConstraintViolation(format!(
                "'{}' issues certificates but is not a CA",
                subject
            )));
        }
        if let Some(usage) = issuer.key_usage() {
            if !usage.key_cert_sign {
                return Err(ChainError::ConstraintViolation(format!(
                    "'{}' key usage does not permit certificate signing",
                    subject
                )));
            }
        }
    }

    if let Some(path_len) = issuer.basic_constraints().and_then(|bc| bc.path_len) {
        // Non-self-issued intermediates between this issuer and the leaf
        let following = below
            .iter()
            .skip(1)
            .filter(|cert| !cert.is_self_issued())
            .count();
        if following > path_len as usize {
            return Err(ChainError::ConstraintViolation(format!(
                "'{}' permits {} intermediate certificate(s) below it, found {}",
                subject, path_len, following
            )));
        }
    }

    Ok(())
}
