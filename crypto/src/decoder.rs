//! Structure decoder
//!
//! Turns DER or PEM bytes into typed certificates and keys. Pure: no I/O,
//! no shared state. Every DER element is length-checked before a structure
//! parser touches it.

use crate::algorithm::{oid, KeyAlgorithm};
use crate::certificate::Certificate;
use crate::der;
use crate::keys::{PrivateKey, PublicKey};
use error_common::CredentialError;
use tracing::debug;
use x509_parser::prelude::{FromDer, SubjectPublicKeyInfo};

pub const LABEL_CERTIFICATE: &str = "CERTIFICATE";
pub const LABEL_PRIVATE_KEY: &str = "PRIVATE KEY";
pub const LABEL_RSA_PRIVATE_KEY: &str = "RSA PRIVATE KEY";
pub const LABEL_EC_PRIVATE_KEY: &str = "EC PRIVATE KEY";
pub const LABEL_PUBLIC_KEY: &str = "PUBLIC KEY";

const PEM_BEGIN: &str = "-----BEGIN ";
const PEM_END: &str = "-----END ";

/// A decoded structure
#[derive(Debug)]
pub enum Decoded {
    Certificate(Box<Certificate>),
    PrivateKey(PrivateKey),
    PublicKey(PublicKey),
}

impl Decoded {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Certificate(_) => "certificate",
            Self::PrivateKey(_) => "private key",
            Self::PublicKey(_) => "public key",
        }
    }
}

/// Decode exactly one structure from DER or PEM bytes.
pub fn decode(input: &[u8]) -> Result<Decoded, CredentialError> {
    if is_pem(input) {
        let block = single_pem_block(input)?;
        return decode_pem_block(&block);
    }

    let input = der::single_sequence(input)?;
    let mut unsupported = None;

    match Certificate::from_der(input) {
        Ok(cert) => return Ok(Decoded::Certificate(Box::new(cert))),
        Err(err @ CredentialError::UnsupportedAlgorithm(_)) => unsupported = Some(err),
        Err(_) => {}
    }
    match public_key_from_spki(input) {
        Ok(key) => return Ok(Decoded::PublicKey(key)),
        Err(err @ CredentialError::UnsupportedAlgorithm(_)) => unsupported = unsupported.or(Some(err)),
        Err(_) => {}
    }
    match private_key_from_der(input) {
        Ok(key) => return Ok(Decoded::PrivateKey(key)),
        Err(err @ CredentialError::UnsupportedAlgorithm(_)) => unsupported = unsupported.or(Some(err)),
        Err(_) => {}
    }

    Err(unsupported.unwrap_or_else(|| {
        CredentialError::malformed("DER input is not a certificate, public key or private key")
    }))
}

/// Decode one certificate (PEM `CERTIFICATE` block or DER).
pub fn decode_certificate(input: &[u8]) -> Result<Certificate, CredentialError> {
    if is_pem(input) {
        let block = single_pem_block(input)?;
        expect_label(&block, LABEL_CERTIFICATE)?;
        return Certificate::from_der(block.contents());
    }
    Certificate::from_der(input)
}

/// Decode a certificate bundle: PEM `CERTIFICATE` blocks or concatenated DER.
pub fn decode_certificates(input: &[u8]) -> Result<Vec<Certificate>, CredentialError> {
    let certs = if is_pem(input) {
        pem_blocks(input)?
            .iter()
            .map(|block| {
                expect_label(block, LABEL_CERTIFICATE)?;
                Certificate::from_der(block.contents())
            })
            .collect::<Result<Vec<_>, _>>()?
    } else {
        der::split_sequences(input)?
            .into_iter()
            .map(Certificate::from_der)
            .collect::<Result<Vec<_>, _>>()?
    };
    debug!(count = certs.len(), "Decoded certificate bundle");
    Ok(certs)
}

/// Decode a private key from PEM (`PRIVATE KEY`, `RSA PRIVATE KEY`,
/// `EC PRIVATE KEY`) or DER (PKCS#8, PKCS#1, SEC1).
pub fn decode_private_key(input: &[u8]) -> Result<PrivateKey, CredentialError> {
    if is_pem(input) {
        let block = single_pem_block(input)?;
        return match decode_pem_block(&block)? {
            Decoded::PrivateKey(key) => Ok(key),
            other => Err(CredentialError::malformed(format!(
                "expected a private key, found a {}",
                other.kind()
            ))),
        };
    }
    private_key_from_der(der::single_sequence(input)?)
}

/// Decode a public key from a PEM `PUBLIC KEY` block or DER SPKI.
pub fn decode_public_key(input: &[u8]) -> Result<PublicKey, CredentialError> {
    if is_pem(input) {
        let block = single_pem_block(input)?;
        expect_label(&block, LABEL_PUBLIC_KEY)?;
        return public_key_from_spki(block.contents());
    }
    public_key_from_spki(input)
}

/// Encode DER certificates as a PEM bundle.
pub fn encode_certificates_pem(certs: &[Certificate]) -> String {
    let blocks: Vec<pem::Pem> = certs
        .iter()
        .map(|cert| pem::Pem::new(LABEL_CERTIFICATE, cert.der().to_vec()))
        .collect();
    pem::encode_many(&blocks)
}

fn is_pem(input: &[u8]) -> bool {
    input
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .and_then(|start| input.get(start..))
        .is_some_and(|text| text.starts_with(PEM_BEGIN.as_bytes()))
}

fn decode_pem_block(block: &pem::Pem) -> Result<Decoded, CredentialError> {
    let contents = der::single_sequence(block.contents())?;
    match block.tag() {
        LABEL_CERTIFICATE => Ok(Decoded::Certificate(Box::new(Certificate::from_der(contents)?))),
        LABEL_PUBLIC_KEY => Ok(Decoded::PublicKey(public_key_from_spki(contents)?)),
        LABEL_PRIVATE_KEY => Ok(Decoded::PrivateKey(private_key_from_pkcs8(contents)?)),
        LABEL_RSA_PRIVATE_KEY => Ok(Decoded::PrivateKey(private_key_from_pkcs1(contents)?)),
        LABEL_EC_PRIVATE_KEY => Ok(Decoded::PrivateKey(private_key_from_sec1(contents)?)),
        other => Err(CredentialError::malformed(format!(
            "unrecognized PEM label '{}'",
            other
        ))),
    }
}

fn expect_label(block: &pem::Pem, label: &str) -> Result<(), CredentialError> {
    if block.tag() != label {
        return Err(CredentialError::malformed(format!(
            "expected PEM label '{}', found '{}'",
            label,
            block.tag()
        )));
    }
    Ok(())
}

fn single_pem_block(input: &[u8]) -> Result<pem::Pem, CredentialError> {
    let mut blocks = pem_blocks(input)?;
    if blocks.len() != 1 {
        return Err(CredentialError::malformed(format!(
            "expected one PEM block, found {}",
            blocks.len()
        )));
    }
    blocks
        .pop()
        .ok_or_else(|| CredentialError::malformed("no PEM block found"))
}

/// Parse every PEM block, rejecting any non-whitespace text outside blocks.
fn pem_blocks(input: &[u8]) -> Result<Vec<pem::Pem>, CredentialError> {
    let text = std::str::from_utf8(input)
        .map_err(|_| CredentialError::malformed("PEM input is not valid UTF-8"))?;
    let framed = check_pem_framing(text)?;

    let blocks = pem::parse_many(input)
        .map_err(|e| CredentialError::malformed(format!("invalid PEM: {}", e)))?;
    if blocks.len() != framed {
        return Err(CredentialError::malformed("inconsistent PEM framing"));
    }
    Ok(blocks)
}

/// Walk the PEM text line by line and return the number of blocks.
fn check_pem_framing(text: &str) -> Result<usize, CredentialError> {
    let mut open: Option<&str> = None;
    let mut count = 0;

    for line in text.lines().map(str::trim) {
        match open {
            None => {
                if line.is_empty() {
                    continue;
                }
                let label = line
                    .strip_prefix(PEM_BEGIN)
                    .and_then(|rest| rest.strip_suffix("-----"))
                    .ok_or_else(|| CredentialError::malformed("text outside of PEM blocks"))?;
                open = Some(label);
            }
            Some(label) => {
                if let Some(end) = line.strip_prefix(PEM_END) {
                    let end_label = end
                        .strip_suffix("-----")
                        .ok_or_else(|| CredentialError::malformed("malformed PEM END line"))?;
                    if end_label != label {
                        return Err(CredentialError::malformed(format!(
                            "PEM BEGIN label '{}' does not match END label '{}'",
                            label, end_label
                        )));
                    }
                    open = None;
                    count += 1;
                }
            }
        }
    }

    if open.is_some() {
        return Err(CredentialError::malformed("unterminated PEM block"));
    }
    if count == 0 {
        return Err(CredentialError::malformed("no PEM block found"));
    }
    Ok(count)
}

fn public_key_from_spki(input: &[u8]) -> Result<PublicKey, CredentialError> {
    let input = der::single_sequence(input)?;
    let (rest, spki) = SubjectPublicKeyInfo::from_der(input)
        .map_err(|e| CredentialError::malformed(format!("failed to parse public key: {}", e)))?;
    if !rest.is_empty() {
        return Err(CredentialError::malformed("trailing bytes after public key"));
    }
    PublicKey::from_spki(&spki)
}

/// DER private keys: PKCS#8 first, then PKCS#1 RSA, then SEC1 EC.
fn private_key_from_der(input: &[u8]) -> Result<PrivateKey, CredentialError> {
    match private_key_from_pkcs8(input) {
        Err(CredentialError::MalformedInput(_)) => {}
        result => return result,
    }
    if let Ok(key) = private_key_from_pkcs1(input) {
        return Ok(key);
    }
    private_key_from_sec1(input)
        .map_err(|_| CredentialError::malformed("DER input is not a supported private key encoding"))
}

fn private_key_from_pkcs8(input: &[u8]) -> Result<PrivateKey, CredentialError> {
    let info = pkcs8::PrivateKeyInfo::try_from(input)
        .map_err(|e| CredentialError::malformed(format!("invalid PKCS#8 private key: {}", e)))?;

    let algorithm_oid = info.algorithm.oid.to_string();
    let curve_oid = if algorithm_oid == oid::EC_PUBLIC_KEY {
        info.algorithm.parameters_oid().ok().map(|curve| curve.to_string())
    } else {
        None
    };
    let algorithm = KeyAlgorithm::from_oids(&algorithm_oid, curve_oid.as_deref())?;

    match algorithm {
        KeyAlgorithm::Rsa => private_key_from_pkcs1(info.private_key),
        KeyAlgorithm::EcP256 | KeyAlgorithm::EcP384 | KeyAlgorithm::Ed25519 => {
            validate_pkcs8(algorithm, input)?;
            Ok(PrivateKey::new(algorithm, input.to_vec()))
        }
    }
}

fn private_key_from_pkcs1(input: &[u8]) -> Result<PrivateKey, CredentialError> {
    use rsa::pkcs1::DecodeRsaPrivateKey;

    rsa::RsaPrivateKey::from_pkcs1_der(input)
        .map_err(|e| CredentialError::malformed(format!("invalid RSA private key: {}", e)))?;
    Ok(PrivateKey::new(KeyAlgorithm::Rsa, input.to_vec()))
}

fn private_key_from_sec1(input: &[u8]) -> Result<PrivateKey, CredentialError> {
    use p256::pkcs8::EncodePrivateKey;

    let (algorithm, document) = if let Ok(key) = p256::SecretKey::from_sec1_der(input) {
        (KeyAlgorithm::EcP256, key.to_pkcs8_der())
    } else if let Ok(key) = p384::SecretKey::from_sec1_der(input) {
        (KeyAlgorithm::EcP384, key.to_pkcs8_der())
    } else {
        return Err(CredentialError::malformed(
            "EC private key is not a SEC1 key on a supported curve",
        ));
    };

    let document = document
        .map_err(|e| CredentialError::malformed(format!("failed to re-encode EC private key: {}", e)))?;
    let pkcs8 = document.as_bytes().to_vec();
    validate_pkcs8(algorithm, &pkcs8)?;
    Ok(PrivateKey::new(algorithm, pkcs8))
}

fn validate_pkcs8(algorithm: KeyAlgorithm, pkcs8: &[u8]) -> Result<(), CredentialError> {
    use ring::signature::{self as sig, EcdsaKeyPair, Ed25519KeyPair};

    let rng = ring::rand::SystemRandom::new();
    let valid = match algorithm {
        KeyAlgorithm::EcP256 => {
            EcdsaKeyPair::from_pkcs8(&sig::ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8, &rng).is_ok()
        }
        KeyAlgorithm::EcP384 => {
            EcdsaKeyPair::from_pkcs8(&sig::ECDSA_P384_SHA384_FIXED_SIGNING, pkcs8, &rng).is_ok()
        }
        KeyAlgorithm::Ed25519 => Ed25519KeyPair::from_pkcs8_maybe_unchecked(pkcs8).is_ok(),
        KeyAlgorithm::Rsa => false,
    };
    if !valid {
        return Err(CredentialError::malformed(format!(
            "{} private key failed validation",
            algorithm
        )));
    }
    Ok(())
}
