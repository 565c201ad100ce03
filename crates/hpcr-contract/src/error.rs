use hpcr_crypto::CryptoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("Cannot derive the public signing key: {0}")]
    KeyDerivationFailed(#[source] CryptoError),

    #[error("The contract is missing [workload] or [env] or both")]
    MissingSignatureInput,

    #[error("Contract does not match the expected shape: {0}")]
    SchemaValidationFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("{step} failed: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: CryptoError,
    },

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl ContractError {
    pub(crate) fn at(step: &'static str) -> impl FnOnce(CryptoError) -> ContractError {
        move |source| ContractError::Step { step, source }
    }
}

impl From<serde_yaml::Error> for ContractError {
    fn from(e: serde_yaml::Error) -> Self {
        ContractError::Serialization(e.to_string())
    }
}
