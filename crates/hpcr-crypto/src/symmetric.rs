//! Salted AES-256-CBC envelope, byte-compatible with
//! `openssl enc -aes-256-cbc -pbkdf2 -md sha256 -iter 10000`.
//!
//! Layout: `"Salted__" || salt(8) || ciphertext`, PKCS#7 padded.

use cbc::cipher::block_padding::{NoPadding, Pkcs7};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::types::{AES_BLOCK_SIZE, KEY_LENGTH, PBKDF2_ITERATIONS, SALTED_PREFIX, SALT_LENGTH};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const HEADER_LENGTH: usize = SALTED_PREFIX.len() + SALT_LENGTH;

/// Derive the AES key and CBC IV from a password and salt.
///
/// PBKDF2-HMAC-SHA256 produces 48 bytes: the first 32 are the key, the last
/// 16 the IV.
pub fn derive_key_iv(
    password: &[u8],
    salt: &[u8],
) -> Zeroizing<[u8; KEY_LENGTH + AES_BLOCK_SIZE]> {
    let mut out = Zeroizing::new([0u8; KEY_LENGTH + AES_BLOCK_SIZE]);
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, PBKDF2_ITERATIONS, &mut out[..]);
    out
}

/// Encrypt with an explicit salt. Returns the raw envelope bytes.
pub fn encrypt_with_salt(
    plaintext: &[u8],
    password: &[u8],
    salt: &[u8; SALT_LENGTH],
) -> Result<Vec<u8>, CryptoError> {
    let key_iv = derive_key_iv(password, salt);
    let (key, iv) = key_iv.split_at(KEY_LENGTH);
    let cipher = Aes256CbcEnc::new_from_slices(key, iv)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut out = Vec::with_capacity(HEADER_LENGTH + ciphertext.len());
    out.extend_from_slice(SALTED_PREFIX);
    out.extend_from_slice(salt);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Encrypt under a fresh random salt. Returns the raw envelope bytes.
pub fn encrypt(plaintext: &[u8], password: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut salt = [0u8; SALT_LENGTH];
    getrandom::getrandom(&mut salt).map_err(|e| CryptoError::RngFailed(e.to_string()))?;
    encrypt_with_salt(plaintext, password, &salt)
}

/// Decrypt a raw envelope.
pub fn decrypt(envelope: &[u8], password: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if envelope.len() < HEADER_LENGTH || &envelope[..SALTED_PREFIX.len()] != SALTED_PREFIX {
        return Err(CryptoError::DecryptionFailed(
            "missing salted envelope header".into(),
        ));
    }
    let salt = &envelope[SALTED_PREFIX.len()..HEADER_LENGTH];
    let body = &envelope[HEADER_LENGTH..];
    if body.is_empty() || body.len() % AES_BLOCK_SIZE != 0 {
        return Err(CryptoError::DecryptionFailed(format!(
            "ciphertext length {} is not a positive multiple of {}",
            body.len(),
            AES_BLOCK_SIZE
        )));
    }

    let key_iv = derive_key_iv(password, salt);
    let (key, iv) = key_iv.split_at(KEY_LENGTH);
    let cipher = Aes256CbcDec::new_from_slices(key, iv)
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;
    let padded = cipher
        .decrypt_padded_vec_mut::<NoPadding>(body)
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;
    strip_padding(padded)
}

/// Remove PKCS#7 padding, validating every pad byte.
fn strip_padding(mut data: Vec<u8>) -> Result<Vec<u8>, CryptoError> {
    let pad = match data.last() {
        Some(&b) => b as usize,
        None => return Err(CryptoError::DecryptionFailed("empty plaintext".into())),
    };
    if pad == 0 || pad > AES_BLOCK_SIZE || pad > data.len() {
        return Err(CryptoError::DecryptionFailed("bad padding".into()));
    }
    if data[data.len() - pad..].iter().any(|&b| b as usize != pad) {
        return Err(CryptoError::DecryptionFailed("bad padding".into()));
    }
    data.truncate(data.len() - pad);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let envelope = encrypt(b"hello world", b"password").unwrap();
        assert_eq!(decrypt(&envelope, b"password").unwrap(), b"hello world");
    }

    #[test]
    fn envelope_layout() {
        let salt = [7u8; SALT_LENGTH];
        let envelope = encrypt_with_salt(b"abc", b"pw", &salt).unwrap();
        assert_eq!(&envelope[..8], b"Salted__");
        assert_eq!(&envelope[8..16], &salt);
        assert_eq!(envelope.len(), 16 + AES_BLOCK_SIZE);
    }

    #[test]
    fn block_aligned_plaintext_gets_full_pad_block() {
        let salt = [1u8; SALT_LENGTH];
        let envelope = encrypt_with_salt(&[0u8; 16], b"pw", &salt).unwrap();
        assert_eq!(envelope.len(), HEADER_LENGTH + 32);
        assert_eq!(decrypt(&envelope, b"pw").unwrap(), vec![0u8; 16]);
    }

    #[test]
    fn empty_plaintext() {
        let envelope = encrypt(b"", b"pw").unwrap();
        assert_eq!(envelope.len(), HEADER_LENGTH + AES_BLOCK_SIZE);
        assert!(decrypt(&envelope, b"pw").unwrap().is_empty());
    }

    #[test]
    fn deterministic_for_fixed_salt() {
        let salt = [3u8; SALT_LENGTH];
        let a = encrypt_with_salt(b"data", b"pw", &salt).unwrap();
        let b = encrypt_with_salt(b"data", b"pw", &salt).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn fresh_salt_per_call() {
        let a = encrypt(b"data", b"pw").unwrap();
        let b = encrypt(b"data", b"pw").unwrap();
        assert_ne!(a[8..16], b[8..16]);
    }

    #[test]
    fn key_iv_split() {
        let key_iv = derive_key_iv(b"pw", &[0u8; SALT_LENGTH]);
        assert_eq!(key_iv.len(), 48);
        assert_ne!(&key_iv[..16], &key_iv[32..]);
    }

    #[test]
    fn wrong_password_never_panics() {
        let envelope = encrypt(b"some secret text", b"right").unwrap();
        // A wrong key yields garbage; padding almost always fails, but a
        // lucky 0x01 tail may decode. Either way the result is not the input.
        match decrypt(&envelope, b"wrong") {
            Ok(plain) => assert_ne!(plain, b"some secret text"),
            Err(e) => assert!(matches!(e, CryptoError::DecryptionFailed(_))),
        }
    }

    #[test]
    fn rejects_missing_header() {
        let err = decrypt(b"NotSalted1234567abcdefghijklmnop", b"pw").unwrap_err();
        assert!(matches!(err, CryptoError::DecryptionFailed(_)));
    }

    #[test]
    fn rejects_short_input() {
        assert!(decrypt(b"Salted__", b"pw").is_err());
    }

    #[test]
    fn rejects_unaligned_body() {
        let mut envelope = encrypt(b"hello", b"pw").unwrap();
        envelope.pop();
        assert!(decrypt(&envelope, b"pw").is_err());
    }

    #[test]
    fn strip_padding_rejects_zero_and_oversized() {
        assert!(strip_padding(vec![1, 2, 3, 0]).is_err());
        assert!(strip_padding(vec![17u8; 32]).is_err());
        assert!(strip_padding(Vec::new()).is_err());
    }

    #[test]
    fn strip_padding_rejects_inconsistent_bytes() {
        let mut block = vec![0u8; 13];
        block.extend_from_slice(&[2, 3, 3]);
        assert!(strip_padding(block).is_err());
    }

    #[test]
    fn strip_padding_accepts_valid() {
        let mut block = b"abcdefghijklm".to_vec();
        block.extend_from_slice(&[3, 3, 3]);
        assert_eq!(strip_padding(block).unwrap(), b"abcdefghijklm");
    }
}
