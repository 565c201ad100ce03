use semver::Version;

/// A certificate paired with the runtime version it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCert {
    pub version: Version,
    /// PEM text, or any label standing in for it.
    pub certificate: String,
}

impl VersionCert {
    pub fn new(version: Version, certificate: impl Into<String>) -> Self {
        Self {
            version,
            certificate: certificate.into(),
        }
    }
}
