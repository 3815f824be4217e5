use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    static ref VERSION_REGEX: Regex = Regex::new(r"^[0-9]+\.[0-9]+(\.[0-9]+)?$").unwrap();
}

/// Checks a directory or request version string against the accepted shape: two or three
///  dot-separated numeric components and nothing else.
pub fn is_valid_version(s: &str) -> bool {
    VERSION_REGEX.is_match(s)
}

#[derive(Debug, Error, Eq, PartialEq)]
#[error("not a valid version: {0:?}")]
pub struct InvalidVersion(pub String);

/// A validated version identifier, e.g. "1.21.8" or "1.20".
///
/// Ordering is numeric per component with a missing third component counting as 0, so
///  "1.20" == "1.20.0" for sorting purposes. The string as given is kept because it is the
///  upstream directory name.
#[derive(Debug, Clone)]
pub struct ModsVersion {
    raw: String,
    components: [u64; 3],
}
impl ModsVersion {
    pub fn parse(s: &str) -> Result<ModsVersion, InvalidVersion> {
        if !is_valid_version(s) {
            return Err(InvalidVersion(s.to_string()));
        }

        let mut components = [0u64; 3];
        for (i, part) in s.split('.').enumerate() {
            // the regex guarantees digits only, so the only possible failure is overflow
            components[i] = part.parse::<u64>().unwrap_or(u64::MAX);
        }

        Ok(ModsVersion {
            raw: s.to_string(),
            components,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Display for ModsVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for ModsVersion {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}
impl Eq for ModsVersion {}

impl PartialOrd for ModsVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for ModsVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components.cmp(&other.components)
    }
}
