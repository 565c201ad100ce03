//! Contract model and the encrypt-and-sign pipeline.

pub mod error;
pub mod signer;
pub mod types;

pub use error::ContractError;
pub use signer::{
    encrypt_and_sign, encrypt_contract, env_workload_signature, signature_input,
    verify_env_workload_signature, ContractSigner,
};
pub use types::{
    Contract, EncryptedContract, Section, KEY_ATTESTATION_PUBLIC_KEY, KEY_ENV,
    KEY_ENV_WORKLOAD_SIGNATURE, KEY_SIGNING_KEY, KEY_WORKLOAD,
};
