//! In-process backend built on the RustCrypto crates.

use zeroize::Zeroizing;

use super::Backend;
use crate::base64::{base64_decode, base64_encode};
use crate::error::CryptoError;
use crate::types::RSA_KEY_BITS;
use crate::{asymmetric, keys, signing, symmetric, token};

#[derive(Debug, Clone)]
pub struct NativeBackend {
    key_bits: usize,
}

impl NativeBackend {
    pub fn new() -> Self {
        Self {
            key_bits: RSA_KEY_BITS,
        }
    }

    /// Generate keys with a different modulus size.
    pub fn with_key_bits(key_bits: usize) -> Self {
        Self { key_bits }
    }
}

impl Default for NativeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn private_key(&self) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        keys::generate_private_key(self.key_bits)
    }

    fn public_key(&self, private_key: &[u8]) -> Result<Vec<u8>, CryptoError> {
        keys::public_key_pem(private_key)
    }

    fn public_key_from_certificate(&self, certificate: &[u8]) -> Result<Vec<u8>, CryptoError> {
        keys::certificate_public_key_pem(certificate)
    }

    fn cert_serial(&self, certificate: &[u8]) -> Result<String, CryptoError> {
        keys::certificate_serial(certificate)
    }

    fn cert_fingerprint(&self, certificate: &[u8]) -> Result<Vec<u8>, CryptoError> {
        keys::certificate_fingerprint(certificate)
    }

    fn private_key_fingerprint(&self, private_key: &[u8]) -> Result<Vec<u8>, CryptoError> {
        keys::private_key_fingerprint(private_key)
    }

    fn sign_digest(&self, private_key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        signing::sign_digest(private_key, data)
    }

    fn verify_digest(
        &self,
        public_key: &[u8],
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), CryptoError> {
        signing::verify_digest(public_key, data, signature)
    }

    fn random_password(&self, len: usize) -> Result<String, CryptoError> {
        token::random_password(len)
    }

    fn asymmetric_encrypt(
        &self,
        key_or_certificate: &[u8],
        data: &[u8],
    ) -> Result<String, CryptoError> {
        asymmetric::encrypt(key_or_certificate, data)
    }

    fn asymmetric_decrypt(
        &self,
        private_key: &[u8],
        ciphertext_b64: &str,
    ) -> Result<Vec<u8>, CryptoError> {
        asymmetric::decrypt(private_key, ciphertext_b64)
    }

    fn symmetric_encrypt(&self, data: &[u8], password: &[u8]) -> Result<String, CryptoError> {
        Ok(base64_encode(&symmetric::encrypt(data, password)?))
    }

    fn symmetric_decrypt(
        &self,
        envelope_b64: &str,
        password: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let envelope = base64_decode(envelope_b64)
            .map_err(|e| CryptoError::DecryptionFailed(format!("invalid base64: {}", e)))?;
        symmetric::decrypt(&envelope, password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::tests::TEST_KEY;

    #[test]
    fn symmetric_round_trip() {
        let backend = NativeBackend::new();
        let envelope = backend.symmetric_encrypt(b"payload", b"password").unwrap();
        assert_eq!(
            backend.symmetric_decrypt(&envelope, b"password").unwrap(),
            b"payload"
        );
    }

    #[test]
    fn symmetric_rejects_bad_base64() {
        let backend = NativeBackend::new();
        let err = backend.symmetric_decrypt("%%%", b"password").unwrap_err();
        assert!(matches!(err, CryptoError::DecryptionFailed(_)));
    }

    #[test]
    fn basic_round_trip() {
        let backend = NativeBackend::new();
        let public = backend.public_key(&TEST_KEY).unwrap();
        let token = backend.encrypt_basic(&public, b"hello").unwrap();
        assert_eq!(backend.decrypt_basic(&TEST_KEY, &token).unwrap(), b"hello");
    }

    #[test]
    fn sign_and_verify() {
        let backend = NativeBackend::new();
        let public = backend.public_key(&TEST_KEY).unwrap();
        let sig = backend.sign_digest(&TEST_KEY, b"message").unwrap();
        backend.verify_digest(&public, b"message", &sig).unwrap();
        assert!(backend.verify_digest(&public, b"messagf", &sig).is_err());
    }

    #[test]
    fn configurable_key_size() {
        let backend = NativeBackend::with_key_bits(2048);
        let key = backend.private_key().unwrap();
        let public = backend.public_key(&key).unwrap();
        let ct = backend.asymmetric_encrypt(&public, b"x").unwrap();
        assert_eq!(base64_decode(&ct).unwrap().len(), 256);
    }
}
