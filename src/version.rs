//! Version and constraint model
//!
//! Configuration authors rarely write full semantic versions (`version: 1.2`
//! is far more common than `version: 1.2.0`), so declared versions are parsed
//! leniently and normalized into a [`semver::Version`].

use std::fmt;
use std::str::FromStr;

use semver::{Version, VersionReq};

use crate::error::{ConfigError, Result};

/// Parse a declared configuration version
///
/// Accepts an optional leading `v` and fills in missing minor and patch
/// components with zero, so `"1"`, `"1.0"` and `"v1.0.0"` all parse to
/// `1.0.0`. Pre-release and build suffixes are kept as-is.
pub fn parse_version(version_str: &str) -> Result<Version> {
    let trimmed = version_str.trim();
    let stripped = trimmed.strip_prefix('v').unwrap_or(trimmed);

    let suffix_at = stripped.find(['-', '+']).unwrap_or(stripped.len());
    let (core, suffix) = stripped.split_at(suffix_at);
    let normalized = match core.matches('.').count() {
        0 => format!("{core}.0.0{suffix}"),
        1 => format!("{core}.0{suffix}"),
        _ => stripped.to_string(),
    };

    Version::parse(&normalized).map_err(|source| ConfigError::VersionParse {
        version: version_str.to_string(),
        source,
    })
}

/// Return the greatest version of a collection
pub fn latest_version<'a>(versions: impl IntoIterator<Item = &'a Version>) -> Option<&'a Version> {
    versions.into_iter().max()
}

/// A version requirement deciding which documents a schema parser accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    raw: String,
    req: VersionReq,
}

impl Constraint {
    /// Parse a constraint such as `^1` or `>=2.1, <3`
    pub fn parse(constraint: &str) -> Result<Self> {
        let req = VersionReq::parse(constraint).map_err(|source| ConfigError::InvalidConstraint {
            constraint: constraint.to_string(),
            source,
        })?;
        Ok(Self {
            raw: constraint.trim().to_string(),
            req,
        })
    }

    /// Check whether `version` satisfies this constraint
    pub fn matches(&self, version: &Version) -> bool {
        self.req.matches(version)
    }

    /// The constraint as it was written
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Constraint {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
