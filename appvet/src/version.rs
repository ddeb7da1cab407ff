//! Certification version handling.
//!
//! Checks can declare an inclusive version range; a validation run targets a
//! single version and only runs the checks whose range contains it. Versions
//! are dotted numeric tuples (`1.5.3`) and compare component-wise, so `1.10`
//! sorts after `1.9`.

use crate::error::AppVetError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A certification version: a dotted tuple of numeric components.
///
/// Comparison is lexicographic over the numeric components with missing
/// trailing components treated as zero, so `1.5` == `1.5.0` and
/// `1.10` > `1.9`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CertVersion {
    components: Vec<u64>,
}

impl PartialEq for CertVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for CertVersion {}

impl CertVersion {
    /// Creates a version from explicit numeric components.
    pub fn new(components: impl Into<Vec<u64>>) -> Self {
        Self {
            components: components.into(),
        }
    }

    /// Returns the numeric components of this version.
    pub fn components(&self) -> &[u64] {
        &self.components
    }
}

impl FromStr for CertVersion {
    type Err = AppVetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AppVetError::InvalidVersion(s.to_string()));
        }
        let components = trimmed
            .split('.')
            .map(|part| {
                part.parse::<u64>()
                    .map_err(|_| AppVetError::InvalidVersion(s.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { components })
    }
}

impl TryFrom<String> for CertVersion {
    type Error = AppVetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CertVersion> for String {
    fn from(version: CertVersion) -> Self {
        version.to_string()
    }
}

impl fmt::Display for CertVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.components.iter().map(u64::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

impl Ord for CertVersion {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            let a = self.components.get(i).copied().unwrap_or(0);
            let b = other.components.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                std::cmp::Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        std::cmp::Ordering::Equal
    }
}

impl PartialOrd for CertVersion {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> CertVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display_round_trip() {
        assert_eq!(v("1.5.3").to_string(), "1.5.3");
        assert_eq!(v(" 2.0 ").to_string(), "2.0");
        assert_eq!(v("7").components(), &[7]);
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        assert!("1.5-beta".parse::<CertVersion>().is_err());
        assert!("".parse::<CertVersion>().is_err());
        assert!("1..2".parse::<CertVersion>().is_err());
    }

    #[test]
    fn test_numeric_tuple_ordering() {
        assert!(v("1.10") > v("1.9"));
        assert!(v("1.5") < v("2.0"));
        assert_eq!(v("1.5"), v("1.5"));
        // Missing trailing components are zero
        assert!(v("1.5.0") >= v("1.5"));
        assert!(v("1.5.1") > v("1.5"));
    }
}
