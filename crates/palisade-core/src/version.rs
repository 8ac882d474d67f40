//! Device API version specifier.
//!
//! The device reports its software version at configure time
//! (`show system info`); element shapes and field presence vary across
//! releases, so every entry codec takes an [`ApiVersion`] and gates
//! version-specific encodings on it. Wire shapes are never hard-coded
//! outside a codec.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from version parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum VersionError {
    /// The version string is not `major.minor[.patch][-hotfix]`.
    #[error("unparseable device version: '{input}'")]
    Unparseable {
        /// The rejected input.
        input: String,
    },
}

/// A device software version, ordered numerically.
///
/// Hotfix suffixes (`10.2.4-h2`) are accepted on parse and ignored for
/// ordering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct ApiVersion {
    /// Major release.
    pub major: u32,
    /// Minor release.
    pub minor: u32,
    /// Maintenance release.
    pub patch: u32,
}

impl ApiVersion {
    /// Builds a version from its parts.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// True when this version is at least `major.minor`.
    #[must_use]
    pub const fn supports(&self, major: u32, minor: u32) -> bool {
        self.major > major || (self.major == major && self.minor >= minor)
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for ApiVersion {
    type Err = VersionError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let unparseable = || VersionError::Unparseable {
            input: input.to_string(),
        };

        // "10.2.4-h2" -> "10.2.4"
        let base = input.trim().split('-').next().ok_or_else(unparseable)?;
        let mut parts = base.split('.');
        let major = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(unparseable)?;
        let minor = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(unparseable)?;
        let patch = match parts.next() {
            Some(p) => p.parse().map_err(|_| unparseable())?,
            None => 0,
        };
        if parts.next().is_some() {
            return Err(unparseable());
        }
        Ok(Self {
            major,
            minor,
            patch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_version() {
        assert_eq!("10.1.3".parse::<ApiVersion>(), Ok(ApiVersion::new(10, 1, 3)));
    }

    #[test]
    fn test_parse_hotfix_suffix_ignored() {
        assert_eq!(
            "10.2.4-h2".parse::<ApiVersion>(),
            Ok(ApiVersion::new(10, 2, 4))
        );
    }

    #[test]
    fn test_parse_two_part_version() {
        assert_eq!("9.1".parse::<ApiVersion>(), Ok(ApiVersion::new(9, 1, 0)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<ApiVersion>().is_err());
        assert!("ten.one".parse::<ApiVersion>().is_err());
        assert!("10.1.3.7".parse::<ApiVersion>().is_err());
    }

    #[test]
    fn test_ordering_and_supports() {
        let v = ApiVersion::new(10, 1, 3);
        assert!(v > ApiVersion::new(9, 9, 9));
        assert!(v.supports(10, 1));
        assert!(v.supports(9, 0));
        assert!(!v.supports(10, 2));
    }
}
