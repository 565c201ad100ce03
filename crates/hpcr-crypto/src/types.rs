/// Prefix of every hybrid token: `hyper-protect-basic.<password>.<payload>`.
pub const TOKEN_PREFIX: &str = "hyper-protect-basic";

/// Magic prefix of the salted symmetric envelope (OpenSSL `enc` format).
pub const SALTED_PREFIX: &[u8; 8] = b"Salted__";

/// Salt length in bytes inside the symmetric envelope.
pub const SALT_LENGTH: usize = 8;

/// AES-256 key length in bytes.
pub const KEY_LENGTH: usize = 32;

/// AES block length in bytes; also the CBC IV length.
pub const AES_BLOCK_SIZE: usize = 16;

/// PBKDF2-HMAC-SHA256 iteration count (OpenSSL `enc -pbkdf2` default).
pub const PBKDF2_ITERATIONS: u32 = 10_000;

/// Length of the random password protecting each token payload.
pub const PASSWORD_LENGTH: usize = 32;

/// Modulus size for freshly generated RSA keys.
pub const RSA_KEY_BITS: usize = 4096;

/// PEM label of a PKIX public key.
pub const TYPE_PUBLIC_KEY: &str = "PUBLIC KEY";

/// PEM label of an X.509 certificate.
pub const TYPE_CERTIFICATE: &str = "CERTIFICATE";

/// Marker the external tool must print for `version` to be accepted.
pub const OPENSSL_MARKER: &str = "OpenSSL";
