//! RSA PKCS#1 v1.5 encryption of the per-token password.

use rand::rngs::OsRng;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};

use crate::base64::{base64_decode, base64_encode};
use crate::error::CryptoError;
use crate::keys::{parse_private_key, public_key_from_key_or_certificate};

pub fn encrypt_with_key(key: &RsaPublicKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    key.encrypt(&mut OsRng, Pkcs1v15Encrypt, plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
}

pub fn decrypt_with_key(key: &RsaPrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    key.decrypt(Pkcs1v15Encrypt, ciphertext)
        .map_err(|e| CryptoError::InvalidCiphertext(e.to_string()))
}

/// Encrypt `plaintext` to a certificate or public key PEM.
///
/// Returns the base64 of the raw RSA ciphertext.
pub fn encrypt(key_or_certificate: &[u8], plaintext: &[u8]) -> Result<String, CryptoError> {
    let key = public_key_from_key_or_certificate(key_or_certificate)?;
    Ok(base64_encode(&encrypt_with_key(&key, plaintext)?))
}

/// Reverse of [`encrypt`] using the matching private key PEM.
pub fn decrypt(private_key: &[u8], ciphertext_b64: &str) -> Result<Vec<u8>, CryptoError> {
    let key = parse_private_key(private_key)?;
    let ciphertext = base64_decode(ciphertext_b64)
        .map_err(|e| CryptoError::InvalidCiphertext(format!("invalid base64: {}", e)))?;
    decrypt_with_key(&key, &ciphertext)
}
