//! Contract encryption and signing.
//!
//! `encrypt_and_sign` runs a fixed pipeline and stops at the first failure:
//!
//! 1. embed the signer's public key as `env.signingKey`
//! 2. serialize `workload` and `env` to text
//! 3. encrypt `workload`, `env` and `attestationPublicKey` to hybrid tokens
//! 4. sign `workload || env` (the text from step 2) and store the base64
//!    signature under `envWorkloadSignature`
//!
//! The caller's contract is never modified.

use std::fmt;
use std::sync::Arc;

use hpcr_crypto::{base64_decode, base64_encode, Backend, CryptoError};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::ContractError;
use crate::types::{
    Contract, EncryptedContract, Section, KEY_ATTESTATION_PUBLIC_KEY, KEY_ENV,
    KEY_ENV_WORKLOAD_SIGNATURE, KEY_WORKLOAD,
};

const VERIFY_STEP: &str = "verify workload and env signature";

/// Binds a backend, a signing private key and an encryption key or
/// certificate, and applies them to contracts.
#[derive(Clone)]
pub struct ContractSigner {
    backend: Arc<dyn Backend>,
    signing_key: Zeroizing<Vec<u8>>,
    encryption_key: Vec<u8>,
}

impl ContractSigner {
    pub fn new(backend: Arc<dyn Backend>, signing_key: &[u8], encryption_key: &[u8]) -> Self {
        Self {
            backend,
            signing_key: Zeroizing::new(signing_key.to_vec()),
            encryption_key: encryption_key.to_vec(),
        }
    }

    /// Encrypt and sign `contract`.
    pub fn sign(&self, contract: &Contract) -> Result<EncryptedContract, ContractError> {
        encrypt_and_sign(
            self.backend.as_ref(),
            &self.signing_key,
            &self.encryption_key,
            contract,
        )
    }

    /// Encrypt `contract` without signing it.
    pub fn encrypt(&self, contract: &Contract) -> Result<EncryptedContract, ContractError> {
        encrypt_contract(self.backend.as_ref(), &self.encryption_key, contract)
    }
}

impl fmt::Debug for ContractSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractSigner")
            .field("backend", &self.backend.name())
            .finish_non_exhaustive()
    }
}

fn section_text(section: Option<&Section>) -> Result<Option<String>, ContractError> {
    section.map(Section::to_text).transpose()
}

fn encrypt_field(
    backend: &dyn Backend,
    encryption_key: &[u8],
    out: &mut EncryptedContract,
    key: &'static str,
    step: &'static str,
    text: Option<&str>,
) -> Result<(), ContractError> {
    if let Some(text) = text {
        let token = backend
            .encrypt_basic(encryption_key, text.as_bytes())
            .map_err(ContractError::at(step))?;
        out.insert(key.to_string(), token);
    }
    Ok(())
}

/// Text the `envWorkloadSignature` is computed over.
pub fn signature_input(
    workload: Option<&str>,
    env: Option<&str>,
) -> Result<Vec<u8>, ContractError> {
    match (workload, env) {
        (Some(workload), Some(env)) => {
            let mut data = Vec::with_capacity(workload.len() + env.len());
            data.extend_from_slice(workload.as_bytes());
            data.extend_from_slice(env.as_bytes());
            Ok(data)
        }
        _ => Err(ContractError::MissingSignatureInput),
    }
}

/// Base64 signature over `workload || env`.
pub fn env_workload_signature(
    backend: &dyn Backend,
    signing_key: &[u8],
    workload: Option<&str>,
    env: Option<&str>,
) -> Result<String, ContractError> {
    let data = signature_input(workload, env)?;
    let signature = backend
        .sign_digest(signing_key, &data)
        .map_err(ContractError::at("sign workload and env"))?;
    Ok(base64_encode(&signature))
}

/// Check an `envWorkloadSignature` against the signer's public key PEM.
pub fn verify_env_workload_signature(
    backend: &dyn Backend,
    signing_public_key: &[u8],
    workload: &str,
    env: &str,
    signature_b64: &str,
) -> Result<(), ContractError> {
    let data = signature_input(Some(workload), Some(env))?;
    let signature = base64_decode(signature_b64)
        .map_err(|_| CryptoError::SignatureInvalid)
        .map_err(ContractError::at(VERIFY_STEP))?;
    backend
        .verify_digest(signing_public_key, &data, &signature)
        .map_err(ContractError::at(VERIFY_STEP))
}

/// Embed the signing key, encrypt the contract fields and attach the
/// `envWorkloadSignature`.
pub fn encrypt_and_sign(
    backend: &dyn Backend,
    signing_key: &[u8],
    encryption_key: &[u8],
    contract: &Contract,
) -> Result<EncryptedContract, ContractError> {
    let public_key = backend
        .public_key(signing_key)
        .map_err(ContractError::KeyDerivationFailed)?;
    let public_key = String::from_utf8(public_key).map_err(|e| {
        ContractError::KeyDerivationFailed(CryptoError::InvalidKey(e.to_string()))
    })?;
    let contract = contract.with_signing_key(&public_key);
    debug!(backend = backend.name(), "embedded signing key");

    let workload = section_text(contract.workload.as_ref())?;
    let env = section_text(contract.env.as_ref())?;

    let mut out = EncryptedContract::new();
    encrypt_field(
        backend,
        encryption_key,
        &mut out,
        KEY_WORKLOAD,
        "encrypt workload",
        workload.as_deref(),
    )?;
    encrypt_field(
        backend,
        encryption_key,
        &mut out,
        KEY_ENV,
        "encrypt env",
        env.as_deref(),
    )?;
    encrypt_field(
        backend,
        encryption_key,
        &mut out,
        KEY_ATTESTATION_PUBLIC_KEY,
        "encrypt attestation public key",
        contract.attestation_public_key.as_deref(),
    )?;
    debug!(fields = out.len(), "encrypted contract fields");

    let signature =
        env_workload_signature(backend, signing_key, workload.as_deref(), env.as_deref())?;
    out.insert(KEY_ENV_WORKLOAD_SIGNATURE.to_string(), signature);
    debug!("attached workload and env signature");
    Ok(out)
}

/// Encrypt every present field of `contract`, including an existing
/// `envWorkloadSignature`. Nothing is signed or embedded.
pub fn encrypt_contract(
    backend: &dyn Backend,
    encryption_key: &[u8],
    contract: &Contract,
) -> Result<EncryptedContract, ContractError> {
    let workload = section_text(contract.workload.as_ref())?;
    let env = section_text(contract.env.as_ref())?;

    let mut out = EncryptedContract::new();
    encrypt_field(
        backend,
        encryption_key,
        &mut out,
        KEY_WORKLOAD,
        "encrypt workload",
        workload.as_deref(),
    )?;
    encrypt_field(
        backend,
        encryption_key,
        &mut out,
        KEY_ENV,
        "encrypt env",
        env.as_deref(),
    )?;
    encrypt_field(
        backend,
        encryption_key,
        &mut out,
        KEY_ATTESTATION_PUBLIC_KEY,
        "encrypt attestation public key",
        contract.attestation_public_key.as_deref(),
    )?;
    encrypt_field(
        backend,
        encryption_key,
        &mut out,
        KEY_ENV_WORKLOAD_SIGNATURE,
        "encrypt workload and env signature",
        contract.env_workload_signature.as_deref(),
    )?;
    debug!(fields = out.len(), "encrypted contract");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hpcr_crypto::{is_hyper_protect_basic, NativeBackend};
    use once_cell::sync::Lazy;
    use serde_json::{json, Map};

    static SIGNING_KEY: Lazy<Zeroizing<Vec<u8>>> =
        Lazy::new(|| NativeBackend::with_key_bits(2048).private_key().unwrap());
    static ENCRYPTION_KEY: Lazy<Zeroizing<Vec<u8>>> =
        Lazy::new(|| NativeBackend::with_key_bits(2048).private_key().unwrap());

    fn encryption_public() -> Vec<u8> {
        NativeBackend::new().public_key(&ENCRYPTION_KEY).unwrap()
    }

    #[test]
    fn signature_input_concatenates_without_delimiter() {
        assert_eq!(signature_input(Some("ab"), Some("cd")).unwrap(), b"abcd");
    }

    #[test]
    fn signature_input_requires_both() {
        assert!(matches!(
            signature_input(None, Some("env")),
            Err(ContractError::MissingSignatureInput)
        ));
        assert!(matches!(
            signature_input(Some("workload"), None),
            Err(ContractError::MissingSignatureInput)
        ));
    }

    #[test]
    fn missing_workload_fails() {
        let backend = NativeBackend::new();
        let contract = Contract::default().with_env("some env");
        let err = encrypt_and_sign(&backend, &SIGNING_KEY, &encryption_public(), &contract)
            .unwrap_err();
        assert!(matches!(err, ContractError::MissingSignatureInput));
    }

    #[test]
    fn bad_signing_key_fails_key_derivation() {
        let backend = NativeBackend::new();
        let contract = Contract::default().with_workload("w").with_env("e");
        let err = encrypt_and_sign(&backend, b"not a key", &encryption_public(), &contract)
            .unwrap_err();
        assert!(matches!(err, ContractError::KeyDerivationFailed(_)));
    }

    #[test]
    fn bad_encryption_key_names_the_step() {
        let backend = NativeBackend::new();
        let contract = Contract::default().with_workload("w").with_env("e");
        let err =
            encrypt_and_sign(&backend, &SIGNING_KEY, b"garbage", &contract).unwrap_err();
        match err {
            ContractError::Step { step, source } => {
                assert_eq!(step, "encrypt workload");
                assert!(matches!(
                    source,
                    CryptoError::UnsupportedKeyType(_) | CryptoError::PemDecodeFailed(_)
                ));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn mapping_env_receives_signing_key() {
        let backend = NativeBackend::new();
        let mut env = Map::new();
        env.insert("type".into(), json!("env"));
        let contract = Contract::default()
            .with_workload("some workload")
            .with_env(env);
        let out = encrypt_and_sign(&backend, &SIGNING_KEY, &encryption_public(), &contract)
            .unwrap();

        let env_text = backend
            .decrypt_basic(&ENCRYPTION_KEY, &out[KEY_ENV])
            .unwrap();
        let env_text = String::from_utf8(env_text).unwrap();
        let parsed: serde_json::Value = serde_yaml::from_str(&env_text).unwrap();
        let public = String::from_utf8(backend.public_key(&SIGNING_KEY).unwrap()).unwrap();
        assert_eq!(parsed["signingKey"], json!(public));
        assert_eq!(parsed["type"], json!("env"));

        let public = backend.public_key(&SIGNING_KEY).unwrap();
        verify_env_workload_signature(
            &backend,
            &public,
            "some workload",
            &env_text,
            &out[KEY_ENV_WORKLOAD_SIGNATURE],
        )
        .unwrap();
    }

    #[test]
    fn attestation_key_is_encrypted_when_present() {
        let backend = NativeBackend::new();
        let contract = Contract::default()
            .with_workload("w")
            .with_env("e")
            .with_attestation_public_key("attestation key");
        let out = encrypt_and_sign(&backend, &SIGNING_KEY, &encryption_public(), &contract)
            .unwrap();
        assert_eq!(out.len(), 4);
        let token = &out[KEY_ATTESTATION_PUBLIC_KEY];
        assert!(is_hyper_protect_basic(token));
        assert_eq!(
            backend.decrypt_basic(&ENCRYPTION_KEY, token).unwrap(),
            b"attestation key"
        );
    }

    #[test]
    fn encrypt_contract_keeps_only_present_fields() {
        let backend = NativeBackend::new();
        let contract = Contract {
            workload: Some(Section::from("w")),
            env_workload_signature: Some("sig".into()),
            ..Default::default()
        };
        let out = encrypt_contract(&backend, &encryption_public(), &contract).unwrap();
        assert_eq!(
            out.keys().map(String::as_str).collect::<Vec<_>>(),
            vec![KEY_ENV_WORKLOAD_SIGNATURE, KEY_WORKLOAD]
        );
        assert_eq!(
            backend
                .decrypt_basic(&ENCRYPTION_KEY, &out[KEY_ENV_WORKLOAD_SIGNATURE])
                .unwrap(),
            b"sig"
        );
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let backend = NativeBackend::new();
        let contract = Contract::default().with_workload("w").with_env("e");
        let out = encrypt_and_sign(&backend, &SIGNING_KEY, &encryption_public(), &contract)
            .unwrap();
        let public = backend.public_key(&SIGNING_KEY).unwrap();
        let signature = &out[KEY_ENV_WORKLOAD_SIGNATURE];
        let err = verify_env_workload_signature(&backend, &public, "w", "E", signature)
            .unwrap_err();
        assert!(matches!(
            err,
            ContractError::Step {
                step: VERIFY_STEP,
                source: CryptoError::SignatureInvalid,
            }
        ));
    }

    #[test]
    fn undecodable_signature_fails_like_a_mismatch() {
        let backend = NativeBackend::new();
        let public = backend.public_key(&SIGNING_KEY).unwrap();
        let err = verify_env_workload_signature(&backend, &public, "w", "e", "not base64!")
            .unwrap_err();
        assert!(matches!(
            err,
            ContractError::Step {
                step: VERIFY_STEP,
                source: CryptoError::SignatureInvalid,
            }
        ));
    }

    #[test]
    fn signer_binds_keys() {
        let signer = ContractSigner::new(
            Arc::new(NativeBackend::new()),
            &SIGNING_KEY,
            &encryption_public(),
        );
        let contract = Contract::default().with_workload("w").with_env("e");
        let out = signer.sign(&contract).unwrap();
        assert!(out.contains_key(KEY_ENV_WORKLOAD_SIGNATURE));
        let out = signer.encrypt(&contract).unwrap();
        assert!(!out.contains_key(KEY_ENV_WORKLOAD_SIGNATURE));
    }
}
