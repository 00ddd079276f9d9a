//! Semantic version types with lenient parsing.
//!
//! Registry documents contain historical version labels that predate strict
//! semver (`0.0.1alpha1`, `v1.2.3`). `Version::parse_loose` accepts those and
//! `clean_version` renders them in canonical form.

use std::fmt;
use thiserror::Error;

/// Semantic version (major.minor.patch-prerelease+build)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
    pub build: Option<String>,
}

/// Version parsing and validation errors
#[derive(Error, Debug)]
pub enum VersionError {
    #[error("Invalid version format: {input}")]
    InvalidFormat { input: String },

    #[error("Invalid number in version: {component}")]
    InvalidNumber { component: String },

    #[error("Invalid prerelease identifier: {prerelease}")]
    InvalidPrerelease { prerelease: String },
}

impl Version {
    /// Parse a version label the way old registry documents wrote them.
    ///
    /// Leading `v`/`=` and surrounding whitespace are ignored, and a
    /// prerelease tag glued to the patch number (`1.0.0beta2`) is split off.
    pub fn parse_loose(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        let stripped = trimmed
            .trim_start_matches('=')
            .trim_start()
            .trim_start_matches(['v', 'V']);

        // Split on '+' for build metadata
        let (version_part, build) = match stripped.split_once('+') {
            Some((v, b)) => (v, Some(b.to_string())),
            None => (stripped, None),
        };

        let core_len = core_length(version_part);
        let (core_part, rest) = version_part.split_at(core_len);
        let prerelease = match rest.strip_prefix('-').unwrap_or(rest) {
            "" => None,
            tag if tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-') => {
                Some(tag.to_string())
            },
            tag => {
                return Err(VersionError::InvalidPrerelease {
                    prerelease: tag.to_string(),
                })
            },
        };

        let (major, minor, patch) = parse_core(core_part, trimmed)?;
        Ok(Version {
            major,
            minor,
            patch,
            prerelease,
            build,
        })
    }
}

/// Length of the leading `digits.digits.digits` run
fn core_length(input: &str) -> usize {
    let mut dots = 0;
    for (idx, c) in input.char_indices() {
        match c {
            '0'..='9' => {},
            '.' if dots < 2 => dots += 1,
            _ => return idx,
        }
    }
    input.len()
}

fn parse_core(core: &str, input: &str) -> Result<(u64, u64, u64), VersionError> {
    let parts: Vec<&str> = core.split('.').collect();
    if parts.len() != 3 {
        return Err(VersionError::InvalidFormat {
            input: input.to_string(),
        });
    }

    let number = |component: &str| {
        component.parse::<u64>().map_err(|_| VersionError::InvalidNumber {
            component: component.to_string(),
        })
    };

    Ok((number(parts[0])?, number(parts[1])?, number(parts[2])?))
}

/// Render a version label in canonical semver form.
///
/// Returns `None` when the label cannot be read even leniently.
pub fn clean_version(input: &str) -> Option<String> {
    Version::parse_loose(input).ok().map(|v| v.to_string())
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;

        if let Some(ref pre) = self.prerelease {
            write!(f, "-{}", pre)?;
        }

        if let Some(ref build) = self.build {
            write!(f, "+{}", build)?;
        }

        Ok(())
    }
}
