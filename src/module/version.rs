//! Host version numbers
//!
//! Modules declare the minimum host version they were built against. The
//! loader compares it with the compatibility threshold to decide whether a
//! group needs the relaxed symbol visibility of compatibility mode.
//!
//! Accepted format: `major[.minor[.patch[.build]]][-qualifier]`, missing
//! numeric components are zero (`5.2` equals `5.2.0.0`).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::module::traits::ModuleError;

/// Compatibility threshold used when no configuration overrides it
pub const DEFAULT_COMPATIBILITY_THRESHOLD: HostVersion = HostVersion {
    numbers: [5, 2, 0, 0],
    qualifier: None,
};

/// A host version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HostVersion {
    numbers: [u32; 4],
    qualifier: Option<String>,
}

impl HostVersion {
    /// Create a release version without build number or qualifier
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            numbers: [major, minor, patch, 0],
            qualifier: None,
        }
    }

    /// Attach a qualifier such as `SNAPSHOT` or `RC1`
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    pub fn major(&self) -> u32 {
        self.numbers[0]
    }

    pub fn minor(&self) -> u32 {
        self.numbers[1]
    }

    pub fn patch(&self) -> u32 {
        self.numbers[2]
    }

    pub fn build(&self) -> u32 {
        self.numbers[3]
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// Compare numeric components only
    ///
    /// `5.2-SNAPSHOT` and `5.2` are equal under this comparison, which is the
    /// one used against the compatibility threshold.
    pub fn compare_ignoring_qualifier(&self, other: &HostVersion) -> Ordering {
        self.numbers.cmp(&other.numbers)
    }

    /// Parse a version string
    pub fn parse(version: &str) -> Result<Self, ModuleError> {
        let trimmed = version.trim();
        if trimmed.is_empty() {
            return Err(ModuleError::InvalidVersion("empty version".to_string()));
        }

        let (base, qualifier) = match trimmed.split_once('-') {
            Some((base, qualifier)) => {
                if qualifier.is_empty() {
                    return Err(ModuleError::InvalidVersion(format!(
                        "{}: empty qualifier",
                        version
                    )));
                }
                (base, Some(qualifier.to_string()))
            }
            None => (trimmed, None),
        };

        let parts: Vec<&str> = base.split('.').collect();
        if parts.len() > 4 {
            return Err(ModuleError::InvalidVersion(format!(
                "{}: at most four numeric components are allowed",
                version
            )));
        }

        let mut numbers = [0u32; 4];
        for (slot, part) in numbers.iter_mut().zip(parts.iter()) {
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(ModuleError::InvalidVersion(format!(
                    "{}: component '{}' is not a number",
                    version, part
                )));
            }
            *slot = part.parse().map_err(|e| {
                ModuleError::InvalidVersion(format!("{}: {}", version, e))
            })?;
        }

        Ok(Self { numbers, qualifier })
    }
}

impl PartialOrd for HostVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HostVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.compare_ignoring_qualifier(other) {
            Ordering::Equal => {}
            ordering => return ordering,
        }

        // A qualified version precedes the release it qualifies
        match (&self.qualifier, &other.qualifier) {
            (None, None) => Ordering::Equal,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp(b),
        }
    }
}

impl fmt::Display for HostVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [major, minor, patch, build] = self.numbers;
        write!(f, "{}.{}", major, minor)?;
        if patch != 0 || build != 0 {
            write!(f, ".{}", patch)?;
        }
        if build != 0 {
            write!(f, ".{}", build)?;
        }
        if let Some(ref qualifier) = self.qualifier {
            write!(f, "-{}", qualifier)?;
        }
        Ok(())
    }
}

impl FromStr for HostVersion {
    type Err = ModuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for HostVersion {
    type Error = ModuleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HostVersion> for String {
    fn from(version: HostVersion) -> Self {
        version.to_string()
    }
}
