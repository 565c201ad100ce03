//! RSA PKCS#1 v1.5 signatures over SHA-256.

use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::error::CryptoError;
use crate::keys::{parse_private_key, parse_public_key};

pub fn sign_with_key(key: &RsaPrivateKey, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let digest = Sha256::digest(data);
    key.sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))
}

pub fn verify_with_key(
    key: &RsaPublicKey,
    data: &[u8],
    signature: &[u8],
) -> Result<(), CryptoError> {
    let digest = Sha256::digest(data);
    key.verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature)
        .map_err(|_| CryptoError::SignatureInvalid)
}

/// Sign `data` with a private key PEM. Returns the raw signature bytes.
pub fn sign_digest(private_key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let key = parse_private_key(private_key)?;
    sign_with_key(&key, data)
}

/// Verify a raw signature against a `PUBLIC KEY` PEM.
pub fn verify_digest(public_key: &[u8], data: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
    let key = parse_public_key(public_key)?;
    verify_with_key(&key, data, signature)
}
