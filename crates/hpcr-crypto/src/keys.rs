//! RSA key provider: generation, parsing and fingerprints.
//!
//! Keys cross module boundaries as PEM text. Structured `rsa` types only
//! live inside this crate.

use der::{Decode, Encode};
use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use x509_cert::Certificate;
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::pem_codec::{decode_all, decode_first, first_of_type};
use crate::types::{TYPE_CERTIFICATE, TYPE_PUBLIC_KEY};

/// Generate an RSA private key and return it as PKCS#1 PEM.
pub fn generate_private_key(bits: usize) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let key = RsaPrivateKey::new(&mut OsRng, bits)
        .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;
    let pem = key
        .to_pkcs1_pem(LineEnding::LF)
        .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;
    Ok(Zeroizing::new(pem.as_bytes().to_vec()))
}

/// Parse the first PEM block of `data` as an RSA private key.
///
/// PKCS#1 (`RSA PRIVATE KEY`) is tried first, then PKCS#8 (`PRIVATE KEY`).
pub fn parse_private_key(data: &[u8]) -> Result<RsaPrivateKey, CryptoError> {
    let block = decode_first(data)?;
    RsaPrivateKey::from_pkcs1_der(&block.bytes)
        .or_else(|_| RsaPrivateKey::from_pkcs8_der(&block.bytes))
        .map_err(|e| CryptoError::InvalidKey(format!("not an RSA private key: {}", e)))
}

/// Parse the first `PUBLIC KEY` block of `data` as an RSA public key.
pub fn parse_public_key(data: &[u8]) -> Result<RsaPublicKey, CryptoError> {
    let blocks = decode_all(data)?;
    let der = first_of_type(&blocks, TYPE_PUBLIC_KEY).ok_or_else(|| {
        CryptoError::InvalidKey(format!("no [{}] block in PEM", TYPE_PUBLIC_KEY))
    })?;
    public_key_from_spki_der(&der)
}

/// Extract the RSA public key of a DER certificate.
pub fn public_key_from_certificate_der(der: &[u8]) -> Result<RsaPublicKey, CryptoError> {
    let cert = parse_certificate_der(der)?;
    let spki = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| CryptoError::InvalidKey(format!("invalid subject public key: {}", e)))?;
    public_key_from_spki_der(&spki)
}

fn public_key_from_spki_der(der: &[u8]) -> Result<RsaPublicKey, CryptoError> {
    RsaPublicKey::from_public_key_der(der)
        .map_err(|e| CryptoError::UnsupportedKeyType(format!("not an RSA public key: {}", e)))
}

/// Resolve the RSA public key from either a certificate or a public key PEM.
///
/// A `CERTIFICATE` block wins over a `PUBLIC KEY` block when both are present.
pub fn public_key_from_key_or_certificate(data: &[u8]) -> Result<RsaPublicKey, CryptoError> {
    let blocks = decode_all(data)?;
    if let Some(der) = first_of_type(&blocks, TYPE_CERTIFICATE) {
        return public_key_from_certificate_der(&der);
    }
    if let Some(der) = first_of_type(&blocks, TYPE_PUBLIC_KEY) {
        return public_key_from_spki_der(&der);
    }
    Err(CryptoError::UnsupportedKeyType(format!(
        "unable to decode neither a [{}] nor a [{}] block from PEM",
        TYPE_CERTIFICATE, TYPE_PUBLIC_KEY
    )))
}

/// Encode a public key as PKIX `PUBLIC KEY` PEM.
pub fn public_key_to_pem(key: &RsaPublicKey) -> Result<Vec<u8>, CryptoError> {
    key.to_public_key_pem(LineEnding::LF)
        .map(String::into_bytes)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))
}

/// Derive the PKIX public key PEM of a private key PEM.
pub fn public_key_pem(private_key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let key = parse_private_key(private_key)?;
    public_key_to_pem(&key.to_public_key())
}

fn first_certificate_der(certificate: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let blocks = decode_all(certificate)?;
    first_of_type(&blocks, TYPE_CERTIFICATE).ok_or_else(|| {
        CryptoError::PemDecodeFailed(format!(
            "unable to decode type [{}] from PEM",
            TYPE_CERTIFICATE
        ))
    })
}

fn parse_certificate_der(der: &[u8]) -> Result<Certificate, CryptoError> {
    Certificate::from_der(der)
        .map_err(|e| CryptoError::InvalidKey(format!("invalid certificate: {}", e)))
}

/// Extract the public key PEM of a certificate PEM.
pub fn certificate_public_key_pem(certificate: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let der = first_certificate_der(certificate)?;
    public_key_to_pem(&public_key_from_certificate_der(&der)?)
}

/// SHA-256 over the DER encoding of the first certificate in `certificate`.
pub fn certificate_fingerprint(certificate: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let der = first_certificate_der(certificate)?;
    // Reject payloads that are not certificates before hashing them.
    parse_certificate_der(&der)?;
    Ok(Sha256::digest(&der).to_vec())
}

/// Serial number of the first certificate, as upper-case hex without the
/// DER sign byte (`openssl x509 -serial` notation).
pub fn certificate_serial(certificate: &[u8]) -> Result<String, CryptoError> {
    let cert = parse_certificate_der(&first_certificate_der(certificate)?)?;
    let bytes = cert.tbs_certificate.serial_number.as_bytes();
    let start = bytes
        .iter()
        .position(|&b| b != 0)
        .unwrap_or(bytes.len().saturating_sub(1));
    Ok(hex::encode_upper(&bytes[start..]))
}

/// SHA-256 over the PKIX DER encoding of the public half of a private key.
pub fn private_key_fingerprint(private_key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let key = parse_private_key(private_key)?;
    let der = key
        .to_public_key()
        .to_public_key_der()
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    Ok(Sha256::digest(der.as_bytes()).to_vec())
}
