//! Engine version strings.
//!
//! Serialized files and bundles record the engine version that wrote them as
//! free text (`2019.4.31f1`). Several field layouts change at specific
//! releases, so the text is parsed into a totally ordered [`UnityVersion`].

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Release channel letter of a version string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReleaseKind {
    Alpha,
    Beta,
    China,
    Final,
    Patch,
    Experimental,
}

impl ReleaseKind {
    fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'a' => Self::Alpha,
            'b' => Self::Beta,
            'c' => Self::China,
            'f' => Self::Final,
            'p' => Self::Patch,
            'x' => Self::Experimental,
            _ => return None,
        })
    }

    fn as_char(self) -> char {
        match self {
            Self::Alpha => 'a',
            Self::Beta => 'b',
            Self::China => 'c',
            Self::Final => 'f',
            Self::Patch => 'p',
            Self::Experimental => 'x',
        }
    }
}

/// A parsed engine version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnityVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub kind: ReleaseKind,
    pub build: u32,
}

impl UnityVersion {
    /// The "unknown" sentinel.
    pub const MIN: Self = Self::new(0, 0, 0);

    pub const V2_6: Self = Self::new(2, 6, 0);
    pub const V3_0: Self = Self::new(3, 0, 0);
    pub const V3_5: Self = Self::new(3, 5, 0);
    pub const V4_1: Self = Self::new(4, 1, 0);
    pub const V4_3: Self = Self::new(4, 3, 0);
    pub const V5_0: Self = Self::new(5, 0, 0);
    pub const V5_1: Self = Self::new(5, 1, 0);
    pub const V5_2: Self = Self::new(5, 2, 0);
    pub const V5_3: Self = Self::new(5, 3, 0);
    pub const V5_5: Self = Self::new(5, 5, 0);
    pub const V5_6: Self = Self::new(5, 6, 0);
    pub const V2017_1: Self = Self::new(2017, 1, 0);
    pub const V2017_3: Self = Self::new(2017, 3, 0);
    pub const V2018_2: Self = Self::new(2018, 2, 0);
    pub const V2019_3: Self = Self::new(2019, 3, 0);
    pub const V2020_1: Self = Self::new(2020, 1, 0);
    pub const V2020_2: Self = Self::new(2020, 2, 0);
    pub const V2021_1: Self = Self::new(2021, 1, 0);
    pub const V2021_3: Self = Self::new(2021, 3, 0);

    /// Threshold constructor: the earliest build of `major.minor.patch`.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            kind: ReleaseKind::Alpha,
            build: 0,
        }
    }

    /// Parse a version string, returning `None` for anything malformed
    /// (`5.x.x` placeholders included).
    pub fn parse_safe(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    /// Whether this is the all-zero version written when the real one was
    /// stripped.
    pub fn is_unknown(&self) -> bool {
        self.major == 0 && self.minor == 0 && self.patch == 0
    }
}

impl Default for UnityVersion {
    fn default() -> Self {
        Self::MIN
    }
}

impl PartialOrd for UnityVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for UnityVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch, self.kind, self.build).cmp(&(
            other.major,
            other.minor,
            other.patch,
            other.kind,
            other.build,
        ))
    }
}

/// Error returned when a version string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseVersionError;

impl fmt::Display for ParseVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed engine version")
    }
}

impl std::error::Error for ParseVersionError {}

impl FromStr for UnityVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().splitn(3, '.');
        let major = parts.next().ok_or(ParseVersionError)?;
        let minor = parts.next().ok_or(ParseVersionError)?;
        let major = major.parse().map_err(|_| ParseVersionError)?;
        let minor = minor.parse().map_err(|_| ParseVersionError)?;

        let Some(rest) = parts.next() else {
            return Ok(Self {
                major,
                minor,
                patch: 0,
                kind: ReleaseKind::Final,
                build: 0,
            });
        };

        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let patch = rest[..digits].parse().map_err(|_| ParseVersionError)?;
        let tail = &rest[digits..];
        let (kind, build) = match tail.chars().next() {
            None => (ReleaseKind::Final, 0),
            Some(c) => {
                let kind = ReleaseKind::from_char(c).ok_or(ParseVersionError)?;
                // builds may carry a suffix such as `f1c1`
                let num = &tail[1..];
                let end = num.find(|c: char| !c.is_ascii_digit()).unwrap_or(num.len());
                (kind, num[..end].parse().unwrap_or(0))
            }
        };

        Ok(Self {
            major,
            minor,
            patch,
            kind,
            build,
        })
    }
}

impl fmt::Display for UnityVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}{}{}",
            self.major,
            self.minor,
            self.patch,
            self.kind.as_char(),
            self.build
        )
    }
}
