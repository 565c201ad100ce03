use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ContractError;

pub const KEY_WORKLOAD: &str = "workload";
pub const KEY_ENV: &str = "env";
pub const KEY_ATTESTATION_PUBLIC_KEY: &str = "attestationPublicKey";
pub const KEY_ENV_WORKLOAD_SIGNATURE: &str = "envWorkloadSignature";
/// Field inside `env` carrying the signer's public key PEM.
pub const KEY_SIGNING_KEY: &str = "signingKey";

/// Encrypted form of a contract: field name to hybrid token.
///
/// Only fields that were present in the source contract appear.
pub type EncryptedContract = BTreeMap<String, String>;

/// The `workload` or `env` section of a contract.
///
/// Either a structured mapping, or text that is already serialized and is
/// used verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Section {
    Text(String),
    Fields(Map<String, Value>),
}

impl Section {
    /// Canonical text form: text passes through, mappings become YAML.
    pub fn to_text(&self) -> Result<String, ContractError> {
        match self {
            Section::Text(text) => Ok(text.clone()),
            Section::Fields(fields) => Ok(serde_yaml::to_string(fields)?),
        }
    }
}

impl From<&str> for Section {
    fn from(text: &str) -> Self {
        Section::Text(text.to_string())
    }
}

impl From<Map<String, Value>> for Section {
    fn from(fields: Map<String, Value>) -> Self {
        Section::Fields(fields)
    }
}

/// A deployment contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Contract {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload: Option<Section>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<Section>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation_public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_workload_signature: Option<String>,
}

impl Contract {
    /// Build a contract from an already parsed document, checking its shape.
    ///
    /// Rejects non-mapping documents, unknown top-level keys, and fields of
    /// the wrong kind.
    pub fn from_value(value: Value) -> Result<Self, ContractError> {
        if !value.is_object() {
            return Err(ContractError::SchemaValidationFailed(
                "contract must be a mapping".into(),
            ));
        }
        serde_json::from_value(value)
            .map_err(|e| ContractError::SchemaValidationFailed(e.to_string()))
    }

    /// Parse YAML text and validate it with [`Contract::from_value`].
    pub fn from_yaml(text: &str) -> Result<Self, ContractError> {
        let value: Value = serde_yaml::from_str(text)?;
        Self::from_value(value)
    }

    pub fn with_workload(mut self, workload: impl Into<Section>) -> Self {
        self.workload = Some(workload.into());
        self
    }

    pub fn with_env(mut self, env: impl Into<Section>) -> Self {
        self.env = Some(env.into());
        self
    }

    pub fn with_attestation_public_key(mut self, key: impl Into<String>) -> Self {
        self.attestation_public_key = Some(key.into());
        self
    }

    /// Copy of this contract with `env.signingKey` set to `public_key_pem`.
    ///
    /// A missing `env` becomes a mapping holding only the key. A text `env`
    /// is opaque and is returned unchanged.
    pub fn with_signing_key(&self, public_key_pem: &str) -> Contract {
        let mut copy = self.clone();
        let key = Value::String(public_key_pem.to_string());
        match &mut copy.env {
            None => {
                let mut fields = Map::new();
                fields.insert(KEY_SIGNING_KEY.to_string(), key);
                copy.env = Some(Section::Fields(fields));
            }
            Some(Section::Fields(fields)) => {
                fields.insert(KEY_SIGNING_KEY.to_string(), key);
            }
            Some(Section::Text(_)) => {
                debug!("env is pre-serialized text, signing key not embedded");
            }
        }
        copy
    }
}
