//! Runtime version probing and version-gated behavior.

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use crate::error::{Result, RuntimeError};

/// First version able to read a registry password from stdin
/// (`login --password-stdin`).
pub const PASSWORD_STDIN_MIN: RuntimeVersion = RuntimeVersion::new(17, 7, 0);

/// First version in which `tag -f` no longer exists.
pub const TAG_FORCE_REMOVED: RuntimeVersion = RuntimeVersion::new(1, 12, 0);

static VERSION_PATTERN: OnceLock<Regex> = OnceLock::new();

fn version_pattern() -> &'static Regex {
    VERSION_PATTERN.get_or_init(|| {
        Regex::new(r"v?(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:-([0-9A-Za-z][0-9A-Za-z.\-~]*))?")
            .expect("Invalid version regex")
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuntimeVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Option<String>,
}

impl RuntimeVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
        }
    }

    /// Extract the first version-shaped substring of `text`, e.g. from
    /// `podman version 4.9.3`.
    pub fn parse_output(text: &str) -> Result<Self> {
        let caps = version_pattern()
            .captures(text)
            .ok_or_else(|| RuntimeError::parse("version", text.trim()))?;

        let number = |i: usize| -> Result<u64> {
            caps.get(i)
                .map(|m| m.as_str().parse::<u64>())
                .transpose()
                .map(|n| n.unwrap_or(0))
                .map_err(|_| RuntimeError::parse("version", text.trim()))
        };

        Ok(Self {
            major: number(1)?,
            minor: number(2)?,
            patch: number(3)?,
            pre: caps.get(4).map(|m| m.as_str().to_string()),
        })
    }
}

impl Ord for RuntimeVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                // A pre-release sorts before its release
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for RuntimeVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}

/// Whether `login` must deliver the password on stdin instead of `-p`.
pub fn password_via_stdin(running: &RuntimeVersion) -> bool {
    *running >= PASSWORD_STDIN_MIN
}

/// What to do with a `force` request when tagging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagForce {
    NotRequested,
    /// Pass `-f`
    Flag,
    /// The runtime no longer knows `-f`; tag without it
    Ignored,
}

pub fn tag_force_flag(running: &RuntimeVersion, force: bool) -> TagForce {
    if !force {
        TagForce::NotRequested
    } else if *running < TAG_FORCE_REMOVED {
        TagForce::Flag
    } else {
        TagForce::Ignored
    }
}
