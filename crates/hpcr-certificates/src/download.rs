//! Certificate download.

use std::time::Duration;

use semver::Version;
use tracing::debug;

use crate::error::CertificateError;
use crate::template::UrlTemplate;
use crate::types::VersionCert;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches a URL as text.
pub trait CertificateFetcher {
    fn fetch_text(&self, url: &str) -> Result<String, CertificateError>;
}

/// Blocking HTTP(S) fetcher. Non-success status codes are errors.
#[derive(Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl CertificateFetcher for HttpFetcher {
    fn fetch_text(&self, url: &str) -> Result<String, CertificateError> {
        let failed = |e: ureq::Error| CertificateError::NetworkFetchFailed {
            url: url.to_string(),
            reason: e.to_string(),
        };
        let response = self.agent.get(url).call().map_err(failed)?;
        response.into_body().read_to_string().map_err(failed)
    }
}

/// Download the certificate of every version in `versions`.
///
/// Results keep the order of `versions`. The first failure aborts the
/// batch and nothing is returned.
pub fn download_certificates<F: CertificateFetcher + ?Sized>(
    fetcher: &F,
    template: &UrlTemplate,
    versions: &[Version],
) -> Result<Vec<VersionCert>, CertificateError> {
    versions
        .iter()
        .map(|version| {
            let url = template.resolve(version);
            debug!(%version, %url, "downloading certificate");
            let certificate = fetcher.fetch_text(&url)?;
            Ok(VersionCert::new(version.clone(), certificate))
        })
        .collect()
}
