//! Version parsing and constraint-based certificate selection.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use semver::{Version, VersionReq};
use tracing::debug;

use crate::error::CertificateError;
use crate::types::VersionCert;

/// A version constraint such as `^1.0.0`, `1.0.9` or `>=1.0.10 <2 || ^3`.
///
/// `||` separates alternatives; a version matches when any alternative does.
/// Within an alternative, comparators are separated by commas or spaces. An
/// operator-less version matches exactly (`1.0.9`) or by its given prefix
/// (`1.2`, `1.x`), and `A - B` is the inclusive range `>=A, <=B`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    text: String,
    alternatives: Vec<VersionReq>,
}

impl Constraint {
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for Constraint {
    type Err = CertificateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_constraint(s)
    }
}

pub fn parse_constraint(text: &str) -> Result<Constraint, CertificateError> {
    let invalid = |reason: String| CertificateError::InvalidConstraint {
        constraint: text.to_string(),
        reason,
    };
    let alternatives = text
        .split("||")
        .map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return Err(invalid("empty alternative".to_string()));
            }
            let normalized = normalize_alternative(part).map_err(&invalid)?;
            VersionReq::parse(&normalized).map_err(|e| invalid(e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Constraint {
        text: text.trim().to_string(),
        alternatives,
    })
}

// Longest spellings first so `>=` is not read as `>`.
const OPERATORS: &[&str] = &[
    "!=", ">=", "=>", "<=", "=<", "~>", ">", "<", "=", "~", "^",
];

/// Rewrite one `||` alternative into the comma separated form `VersionReq`
/// parses.
fn normalize_alternative(part: &str) -> Result<String, String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut words = part
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|w| !w.is_empty());
    while let Some(word) = words.next() {
        if OPERATORS.contains(&word) {
            let version = words
                .next()
                .ok_or_else(|| format!("operator {} without a version", word))?;
            tokens.push(format!("{}{}", word, version));
        } else {
            tokens.push(word.to_string());
        }
    }

    let mut comparators = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if tokens.get(i + 1).map(String::as_str) == Some("-") {
            let upper = tokens
                .get(i + 2)
                .ok_or_else(|| "range without an upper bound".to_string())?;
            comparators.push(format!(">={}", bare_version(&tokens[i])?));
            comparators.push(format!("<={}", bare_version(upper)?));
            i += 3;
        } else {
            comparators.push(normalize_comparator(&tokens[i])?);
            i += 1;
        }
    }
    Ok(comparators.join(", "))
}

fn normalize_comparator(token: &str) -> Result<String, String> {
    let op = OPERATORS
        .iter()
        .find(|op| token.starts_with(*op))
        .copied()
        .unwrap_or("");
    let version = strip_v(&token[op.len()..]);
    let op = match op {
        "" if is_wildcard(version) => "",
        "" => "=",
        "=>" => ">=",
        "=<" => "<=",
        "~>" => "~",
        "!=" => return Err("operator != is not supported".to_string()),
        other => other,
    };
    Ok(format!("{}{}", op, version))
}

/// Operand of a hyphen range: a version without an operator.
fn bare_version(token: &str) -> Result<&str, String> {
    if OPERATORS.iter().any(|op| token.starts_with(op)) {
        return Err(format!("range bound {} carries an operator", token));
    }
    Ok(strip_v(token))
}

fn strip_v(version: &str) -> &str {
    version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version)
}

fn is_wildcard(version: &str) -> bool {
    version
        .split('.')
        .any(|part| matches!(part, "x" | "X" | "*"))
}

/// Parse a version, accepting a leading `v` and missing minor or patch
/// components (`v1.2` is `1.2.0`).
pub fn parse_version(text: &str) -> Result<Version, CertificateError> {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    let split = trimmed
        .find(|c: char| c == '-' || c == '+')
        .unwrap_or(trimmed.len());
    let (core, suffix) = trimmed.split_at(split);
    let padding = match core.split('.').count() {
        1 => ".0.0",
        2 => ".0",
        _ => "",
    };
    Version::parse(&format!("{}{}{}", core, padding, suffix)).map_err(|e| {
        CertificateError::InvalidVersion {
            version: text.to_string(),
            reason: e.to_string(),
        }
    })
}

/// Latest candidate satisfying `constraint`, if any.
pub fn select_by_spec(
    constraint: &Constraint,
    candidates: impl IntoIterator<Item = VersionCert>,
) -> Option<VersionCert> {
    let mut matching: Vec<VersionCert> = candidates
        .into_iter()
        .filter(|c| constraint.matches(&c.version))
        .collect();
    matching.sort_by(|a, b| b.version.cmp(&a.version));
    matching.into_iter().next()
}

/// Pick from a `version -> certificate` map.
///
/// Every key must parse as a version, even those that would not match.
pub fn certificate_from_spec(
    constraint: &Constraint,
    certificates: &BTreeMap<String, String>,
) -> Result<VersionCert, CertificateError> {
    let candidates = certificates
        .iter()
        .map(|(version, cert)| Ok(VersionCert::new(parse_version(version)?, cert.clone())))
        .collect::<Result<Vec<_>, CertificateError>>()?;
    let selected = select_by_spec(constraint, candidates)
        .ok_or_else(|| CertificateError::VersionConstraintUnsatisfied(constraint.to_string()))?;
    debug!(
        constraint = %constraint,
        version = %selected.version,
        "selected certificate"
    );
    Ok(selected)
}
