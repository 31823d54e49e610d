//! Search engine version parsing.
//!
//! Versions are written `<FAMILY>_<major>.<minor>`, where the family is `ES`
//! (Elasticsearch) or `OS` (OpenSearch). No other casing or separator is
//! accepted.

use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use std::sync::LazyLock;
use strum::{Display, EnumString};

static ENGINE_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(ES|OS)_(\d+)\.(\d+)$").expect("engine version pattern is valid")
});

/// Engine family token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum EngineFamily {
    #[strum(serialize = "ES")]
    Elasticsearch,
    #[strum(serialize = "OS")]
    OpenSearch,
}

/// A parsed engine version such as `OS_2.9` or `ES_7.10`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineVersion {
    pub family: EngineFamily,
    pub major: u32,
    pub minor: u32,
}

/// Why an engine version string was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineVersionError {
    Malformed(String),
    /// Well-formed, but a component does not fit in a `u32`
    OutOfRange(String),
}

impl fmt::Display for EngineVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(s) => write!(
                f,
                "'{s}' does not match <ES|OS>_<major>.<minor> (e.g. OS_2.9, ES_7.10)"
            ),
            Self::OutOfRange(s) => write!(
                f,
                "'{s}' has a version component out of range (max {})",
                u32::MAX
            ),
        }
    }
}

impl std::error::Error for EngineVersionError {}

impl EngineVersion {
    pub const fn new(family: EngineFamily, major: u32, minor: u32) -> Self {
        Self {
            family,
            major,
            minor,
        }
    }
}

impl FromStr for EngineVersion {
    type Err = EngineVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = ENGINE_VERSION
            .captures(s)
            .ok_or_else(|| EngineVersionError::Malformed(s.to_string()))?;

        let family = caps[1]
            .parse::<EngineFamily>()
            .map_err(|_| EngineVersionError::Malformed(s.to_string()))?;
        // Digits-only by the pattern, so this only fails on overflow
        let out_of_range = |_: ParseIntError| EngineVersionError::OutOfRange(s.to_string());
        let major = caps[2].parse::<u32>().map_err(out_of_range)?;
        let minor = caps[3].parse::<u32>().map_err(out_of_range)?;

        Ok(Self::new(family, major, minor))
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}.{}", self.family, self.major, self.minor)
    }
}

impl Serialize for EngineVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
