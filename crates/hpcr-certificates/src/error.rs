use thiserror::Error;

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("Invalid version {version:?}: {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("Invalid version constraint {constraint:?}: {reason}")]
    InvalidConstraint { constraint: String, reason: String },

    #[error("No certificate version satisfies {0}")]
    VersionConstraintUnsatisfied(String),

    #[error("Template error: {0}")]
    TemplateError(String),

    #[error("Failed to fetch {url}: {reason}")]
    NetworkFetchFailed { url: String, reason: String },
}
