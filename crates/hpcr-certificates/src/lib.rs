//! Certificate resolution: pick the encryption certificate for a runtime
//! version constraint, from a local set or by downloading it.

pub mod download;
pub mod error;
pub mod select;
pub mod template;
pub mod types;

pub use download::{download_certificates, CertificateFetcher, HttpFetcher};
pub use error::CertificateError;
pub use select::{
    certificate_from_spec, parse_constraint, parse_version, select_by_spec, Constraint,
};
pub use template::{resolve_download_url, UrlTemplate, DEFAULT_TEMPLATE};
pub use types::VersionCert;
