pub mod asymmetric;
pub mod backend;
pub mod base64;
pub mod config;
pub mod error;
pub mod keys;
pub mod pem_codec;
pub mod signing;
pub mod symmetric;
pub mod token;
pub mod types;

pub use backend::{
    backend_for, default_backend, select_backend, Backend, BackendKind, NativeBackend,
    OpenSslBackend,
};
pub use base64::{base64_decode, base64_encode};
pub use config::{OpenSslConfig, DEFAULT_OPENSSL, OPENSSL_BIN_ENV};
pub use error::CryptoError;
pub use pem_codec::{decode_all, decode_first, decode_first_of_type, PemBlock};
pub use token::{is_hyper_protect_basic, random_password, split_token};
pub use types::{PASSWORD_LENGTH, RSA_KEY_BITS, TOKEN_PREFIX};
