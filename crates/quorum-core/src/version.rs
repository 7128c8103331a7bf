//! Semantic versions and the version-bump law for plugin releases
//!
//! A release sequence starts at `0.0.0` (nothing published) and every new
//! version must be exactly one adjacent bump of the latest one:
//!
//! ```text
//! patch: (M, m, p) → (M, m, p + 1)
//! minor: (M, m, p) → (M, m + 1, 0)
//! major: (M, m, p) → (M + 1, 0, 0)
//! ```
//!
//! Anything else (decrease, skip, multi-component change, equal version) is
//! rejected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A `major.minor.patch` triple
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Version {
    /// Incompatible release line
    pub major: u16,
    /// Backwards-compatible feature release
    pub minor: u16,
    /// Backwards-compatible fix
    pub patch: u16,
}

/// Which component a valid bump increments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BumpKind {
    /// `major + 1`, minor and patch reset
    Major,
    /// `minor + 1`, patch reset
    Minor,
    /// `patch + 1`
    Patch,
}

impl Version {
    /// The implicit version before any release
    pub const ZERO: Version = Version::new(0, 0, 0);

    /// Create a version
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Classify `next` as a bump of `self`, if it is one
    pub fn bump_kind(&self, next: &Version) -> Option<BumpKind> {
        let major_step = self.major.checked_add(1);
        let minor_step = self.minor.checked_add(1);
        let patch_step = self.patch.checked_add(1);

        if Some(next.major) == major_step && next.minor == 0 && next.patch == 0 {
            return Some(BumpKind::Major);
        }
        if next.major == self.major {
            if Some(next.minor) == minor_step && next.patch == 0 {
                return Some(BumpKind::Minor);
            }
            if next.minor == self.minor && Some(next.patch) == patch_step {
                return Some(BumpKind::Patch);
            }
        }
        None
    }

    /// Components as an array
    pub fn to_array(&self) -> [u16; 3] {
        [self.major, self.minor, self.patch]
    }
}

/// Whether `proposed` is exactly one adjacent bump of `current`
pub fn is_valid_bump(current: &Version, proposed: &Version) -> bool {
    current.bump_kind(proposed).is_some()
}

impl From<[u16; 3]> for Version {
    fn from([major, minor, patch]: [u16; 3]) -> Self {
        Self::new(major, minor, patch)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Error parsing a `major.minor.patch` string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid version string: {input}")]
pub struct ParseVersionError {
    /// The rejected input
    pub input: String,
}

impl FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseVersionError {
            input: s.to_string(),
        };
        let mut parts = s.trim().split('.');
        let mut next = || -> Result<u16, ParseVersionError> {
            parts
                .next()
                .ok_or_else(err)?
                .parse::<u16>()
                .map_err(|_| err())
        };
        let version = Version::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(err());
        }
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn v(parts: [u16; 3]) -> Version {
        Version::from(parts)
    }

    #[test]
    fn test_bump_law_examples() {
        assert!(is_valid_bump(&v([1, 4, 7]), &v([2, 0, 0])));
        assert!(is_valid_bump(&v([1, 4, 7]), &v([1, 5, 0])));
        assert!(is_valid_bump(&v([1, 4, 7]), &v([1, 4, 8])));
        assert!(!is_valid_bump(&v([0, 1, 2]), &v([1, 1, 2])));
        assert!(!is_valid_bump(&v([0, 0, 65535]), &v([0, 0, 65534])));
        assert!(!is_valid_bump(&v([1, 4, 7]), &v([1, 5, 7])));
        assert!(!is_valid_bump(&v([1, 4, 7]), &v([3, 0, 0])));
    }

    #[test]
    fn test_first_release_must_be_adjacent_to_zero() {
        assert!(is_valid_bump(&Version::ZERO, &v([0, 0, 1])));
        assert!(is_valid_bump(&Version::ZERO, &v([0, 1, 0])));
        assert!(is_valid_bump(&Version::ZERO, &v([1, 0, 0])));
        assert!(!is_valid_bump(&Version::ZERO, &v([0, 1, 1])));
        assert!(!is_valid_bump(&Version::ZERO, &v([2, 0, 0])));
    }

    #[test]
    fn test_overflowing_component_is_never_a_bump() {
        assert!(!is_valid_bump(&v([0, 0, u16::MAX]), &v([0, 0, 0])));
        assert_eq!(v([u16::MAX, 0, 0]).bump_kind(&v([0, 0, 0])), None);
    }

    #[test]
    fn test_parse_and_display() {
        let version: Version = "1.4.7".parse().unwrap();
        assert_eq!(version, v([1, 4, 7]));
        assert_eq!(version.to_string(), "1.4.7");
        assert!("1.4".parse::<Version>().is_err());
        assert!("1.4.7.1".parse::<Version>().is_err());
        assert!("1.x.7".parse::<Version>().is_err());
    }

    proptest! {
        #[test]
        fn prop_version_is_never_a_bump_of_itself(major: u16, minor: u16, patch: u16) {
            let version = v([major, minor, patch]);
            prop_assert!(!is_valid_bump(&version, &version));
        }

        #[test]
        fn prop_valid_bump_is_strictly_greater(
            current in any::<[u16; 3]>(),
            proposed in any::<[u16; 3]>(),
        ) {
            if is_valid_bump(&v(current), &v(proposed)) {
                prop_assert!(v(proposed) > v(current));
            }
        }

        #[test]
        fn prop_decrease_is_never_valid(
            current in any::<[u16; 3]>(),
            proposed in any::<[u16; 3]>(),
        ) {
            if v(proposed) <= v(current) {
                prop_assert!(!is_valid_bump(&v(current), &v(proposed)));
            }
        }
    }
}
