//! Download URL templates.
//!
//! Templates are literal text with `{{.Major}}`, `{{.Minor}}` and
//! `{{.Patch}}` placeholders. Whitespace inside the braces is ignored.

use semver::Version;

use crate::error::CertificateError;

/// Where IBM publishes the encryption certificate of each runtime release.
pub const DEFAULT_TEMPLATE: &str = "https://cloud.ibm.com/media/docs/downloads/hyper-protect-container-runtime/ibm-hyper-protect-container-runtime-{{.Major}}-{{.Minor}}-s390x-{{.Patch}}-encrypt.crt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Major,
    Minor,
    Patch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// A compiled URL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    segments: Vec<Segment>,
}

impl UrlTemplate {
    pub fn parse(template: &str) -> Result<Self, CertificateError> {
        let mut segments = Vec::new();
        let mut rest = template;
        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            let after = &rest[start + 2..];
            let end = after.find("}}").ok_or_else(|| {
                CertificateError::TemplateError(format!("unclosed action in {:?}", template))
            })?;
            let field = match after[..end].trim() {
                ".Major" => Field::Major,
                ".Minor" => Field::Minor,
                ".Patch" => Field::Patch,
                other => {
                    return Err(CertificateError::TemplateError(format!(
                        "unknown field {:?}, expected .Major, .Minor or .Patch",
                        other
                    )))
                }
            };
            segments.push(Segment::Field(field));
            rest = &after[end + 2..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }
        Ok(Self { segments })
    }

    /// Substitute the components of `version`.
    pub fn resolve(&self, version: &Version) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(Field::Major) => out.push_str(&version.major.to_string()),
                Segment::Field(Field::Minor) => out.push_str(&version.minor.to_string()),
                Segment::Field(Field::Patch) => out.push_str(&version.patch.to_string()),
            }
        }
        out
    }
}

/// Compile `template` and resolve it for `version`.
pub fn resolve_download_url(
    template: &str,
    version: &Version,
) -> Result<String, CertificateError> {
    Ok(UrlTemplate::parse(template)?.resolve(version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template() {
        let url = resolve_download_url(DEFAULT_TEMPLATE, &Version::new(1, 0, 11)).unwrap();
        assert_eq!(
            url,
            "https://cloud.ibm.com/media/docs/downloads/hyper-protect-container-runtime/ibm-hyper-protect-container-runtime-1-0-s390x-11-encrypt.crt"
        );
    }

    #[test]
    fn whitespace_inside_braces() {
        let template = UrlTemplate::parse("v{{ .Major }}.{{.Minor}}").unwrap();
        assert_eq!(template.resolve(&Version::new(2, 3, 4)), "v2.3");
    }

    #[test]
    fn literal_only() {
        let template = UrlTemplate::parse("https://example.com/cert.crt").unwrap();
        assert_eq!(
            template.resolve(&Version::new(1, 2, 3)),
            "https://example.com/cert.crt"
        );
    }

    #[test]
    fn unclosed_action() {
        let err = UrlTemplate::parse("https://example.com/{{.Major").unwrap_err();
        assert!(matches!(err, CertificateError::TemplateError(_)));
    }

    #[test]
    fn unknown_field() {
        let err = resolve_download_url("{{.Build}}", &Version::new(1, 0, 0)).unwrap_err();
        assert!(matches!(err, CertificateError::TemplateError(_)));
    }
}
