//! Cryptographic backends.
//!
//! Two implementations share one [`Backend`] interface: [`OpenSslBackend`]
//! shells out to the `openssl` binary, [`NativeBackend`] runs in-process.
//! Their outputs are interchangeable byte for byte, so any token, envelope or
//! signature produced by one is accepted by the other.
//!
//! All key material is passed as PEM bytes.

pub mod native;
pub mod openssl;

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::token;

pub use native::NativeBackend;
pub use openssl::OpenSslBackend;

pub trait Backend: Send + Sync + fmt::Debug {
    /// Short identifier used in log events.
    fn name(&self) -> &'static str;

    /// Generate a fresh RSA private key PEM.
    fn private_key(&self) -> Result<Zeroizing<Vec<u8>>, CryptoError>;

    /// Derive the `PUBLIC KEY` PEM of a private key PEM.
    fn public_key(&self, private_key: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Extract the `PUBLIC KEY` PEM of a certificate PEM.
    fn public_key_from_certificate(&self, certificate: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Certificate serial number as upper-case hex.
    fn cert_serial(&self, certificate: &[u8]) -> Result<String, CryptoError>;

    /// SHA-256 over the certificate DER.
    fn cert_fingerprint(&self, certificate: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// SHA-256 over the PKIX DER of the derived public key.
    fn private_key_fingerprint(&self, private_key: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// RSA PKCS#1 v1.5 signature over the SHA-256 digest of `data`.
    fn sign_digest(&self, private_key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Verify a signature produced by [`Backend::sign_digest`].
    fn verify_digest(
        &self,
        public_key: &[u8],
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), CryptoError>;

    /// `len` base64-alphabet characters drawn from the OS random source.
    fn random_password(&self, len: usize) -> Result<String, CryptoError>;

    /// RSA-encrypt to a certificate or public key PEM, base64 output.
    fn asymmetric_encrypt(
        &self,
        key_or_certificate: &[u8],
        data: &[u8],
    ) -> Result<String, CryptoError>;

    fn asymmetric_decrypt(
        &self,
        private_key: &[u8],
        ciphertext_b64: &str,
    ) -> Result<Vec<u8>, CryptoError>;

    /// Salted AES-256-CBC envelope, base64 output.
    fn symmetric_encrypt(&self, data: &[u8], password: &[u8]) -> Result<String, CryptoError>;

    fn symmetric_decrypt(
        &self,
        envelope_b64: &str,
        password: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;

    fn encrypt_basic(
        &self,
        key_or_certificate: &[u8],
        data: &[u8],
    ) -> Result<String, CryptoError> {
        token::encrypt_basic(self, key_or_certificate, data)
    }

    fn decrypt_basic(&self, private_key: &[u8], token: &str) -> Result<Vec<u8>, CryptoError> {
        token::decrypt_basic(self, private_key, token)
    }
}

/// Which implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    OpenSsl,
    Native,
    /// Probe for OpenSSL, fall back to native.
    Auto,
}

/// Build a backend of the requested kind.
///
/// `OpenSsl` fails with [`CryptoError::BackendUnavailable`] when the probe
/// fails; `Auto` never fails.
pub fn backend_for(kind: BackendKind) -> Result<Arc<dyn Backend>, CryptoError> {
    match kind {
        BackendKind::OpenSsl => Ok(Arc::new(OpenSslBackend::probe()?)),
        BackendKind::Native => Ok(Arc::new(NativeBackend::new())),
        BackendKind::Auto => Ok(default_backend()),
    }
}

/// Probe the external tool and fall back to the native implementation.
pub fn select_backend() -> Arc<dyn Backend> {
    match OpenSslBackend::probe() {
        Ok(backend) => {
            debug!(
                binary = %backend.binary().display(),
                "using openssl backend"
            );
            Arc::new(backend)
        }
        Err(e) => {
            warn!(error = %e, "openssl unavailable, using native backend");
            Arc::new(NativeBackend::new())
        }
    }
}

static DEFAULT_BACKEND: OnceCell<Arc<dyn Backend>> = OnceCell::new();

/// Process-wide backend, selected on first use and reused afterwards.
pub fn default_backend() -> Arc<dyn Backend> {
    DEFAULT_BACKEND.get_or_init(select_backend).clone()
}
