use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("PEM decode failed: {0}")]
    PemDecodeFailed(String),

    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("{command} exited with status {status:?}: {stderr}")]
    ToolFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid ciphertext: {0}")]
    InvalidCiphertext(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Signature is invalid")]
    SignatureInvalid,

    #[error("Random number generation failed: {0}")]
    RngFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
