//! PEM block scanning.
//!
//! Key files may hold several concatenated blocks (a certificate followed by
//! its chain, a key followed by a certificate). Lookups return the first
//! block carrying the requested label.

use ::pem::{EncodeConfig, LineEnding, Pem};

use crate::error::CryptoError;

/// A decoded PEM block: its label and the DER payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemBlock {
    pub label: String,
    pub bytes: Vec<u8>,
}

impl PemBlock {
    pub fn is_type(&self, label: &str) -> bool {
        self.label == label
    }
}

/// Decode every PEM block in `data`, in order of appearance.
pub fn decode_all(data: &[u8]) -> Result<Vec<PemBlock>, CryptoError> {
    let blocks =
        ::pem::parse_many(data).map_err(|e| CryptoError::PemDecodeFailed(e.to_string()))?;
    Ok(blocks
        .into_iter()
        .map(|p| PemBlock {
            label: p.tag().to_string(),
            bytes: p.into_contents(),
        })
        .collect())
}

/// Decode the first PEM block of any type.
pub fn decode_first(data: &[u8]) -> Result<PemBlock, CryptoError> {
    decode_all(data)?
        .into_iter()
        .next()
        .ok_or_else(|| CryptoError::PemDecodeFailed("unable to decode block from PEM".into()))
}

/// Return the payload of the first block labelled `label`, if any.
pub fn first_of_type(blocks: &[PemBlock], label: &str) -> Option<Vec<u8>> {
    blocks
        .iter()
        .find(|b| b.is_type(label))
        .map(|b| b.bytes.clone())
}

/// Decode `data` and return the payload of the first block labelled `label`.
pub fn decode_first_of_type(data: &[u8], label: &str) -> Result<Vec<u8>, CryptoError> {
    let blocks = decode_all(data)?;
    first_of_type(&blocks, label).ok_or_else(|| {
        CryptoError::PemDecodeFailed(format!("unable to decode type [{}] from PEM", label))
    })
}

/// Encode a payload as a PEM block with LF line endings.
pub fn encode(label: &str, bytes: &[u8]) -> String {
    ::pem::encode_config(
        &Pem::new(label, bytes.to_vec()),
        EncodeConfig::new().set_line_ending(LineEnding::LF),
    )
}
