//! Scenario versions.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// The version a scenario was written against, or the open-ended `latest`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Version {
    Concrete { major: u64, minor: u64, patch: u64 },
    /// Compares greater than every concrete version.
    Latest,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Version {
        Version::Concrete {
            major,
            minor,
            patch,
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Version) -> Ordering {
        match (self, other) {
            (Version::Latest, Version::Latest) => Ordering::Equal,
            (Version::Latest, Version::Concrete { .. }) => Ordering::Greater,
            (Version::Concrete { .. }, Version::Latest) => Ordering::Less,
            (
                Version::Concrete {
                    major: a0,
                    minor: a1,
                    patch: a2,
                },
                Version::Concrete {
                    major: b0,
                    minor: b1,
                    patch: b2,
                },
            ) => (a0, a1, a2).cmp(&(b0, b1, b2)),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Version) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Concrete {
                major,
                minor,
                patch,
            } => write!(f, "{major}.{minor}.{patch}"),
            Version::Latest => write!(f, "latest"),
        }
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseVersionError {
    pub text: String,
}

impl fmt::Display for ParseVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid version `{}`, expected `<major>.<minor>.<patch>` or `latest`",
            self.text
        )
    }
}

impl std::error::Error for ParseVersionError {}

impl FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(text: &str) -> Result<Version, ParseVersionError> {
        if text == "latest" {
            return Ok(Version::Latest);
        }

        let error = || ParseVersionError {
            text: text.to_owned(),
        };
        let mut parts = text.split('.').map(|part| {
            // `u64::from_str` accepts a leading `+`, which versions do not
            match part.bytes().all(|b| b.is_ascii_digit()) && !part.is_empty() {
                true => part.parse::<u64>().map_err(|_| error()),
                false => Err(error()),
            }
        });

        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(major), Some(minor), Some(patch), None) => {
                Ok(Version::new(major?, minor?, patch?))
            }
            _ => Err(error()),
        }
    }
}
