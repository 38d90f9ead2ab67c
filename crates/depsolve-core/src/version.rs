//! Total order on package versions.
//!
//! Grammar: `[epoch:]version[_revision[,portrevision]]`. `version` is split
//! on `.` into components; each component is a sequence of runs, where a run
//! is a maximal digit span, a maximal non-digit/non-tilde span, or a single
//! `~`. Epoch dominates unconditionally; revision/portrevision are only
//! consulted once `version` compares equal.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A single lexical run inside a dot-separated version component.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Run {
    /// A `~` marker. Sorts below everything, including the end of a
    /// component (a pre-release always loses to its release).
    Tilde,
    /// A maximal run of ASCII digits, compared as an integer.
    Numeric(u64),
    /// A maximal run of any other character, compared lexicographically.
    /// Numeric runs always outrank alpha runs at the same position.
    Alpha(String),
}

impl Run {
    /// Relative rank used to compare runs of different kinds: tilde lowest,
    /// then "nothing" (handled by the caller padding short sequences), then
    /// alpha, then numeric.
    const fn rank(&self) -> u8 {
        match self {
            Self::Tilde => 0,
            Self::Alpha(_) => 2,
            Self::Numeric(_) => 3,
        }
    }
}

/// Sentinel rank for "this component ran out of runs", strictly between
/// `Run::Tilde` and every other run kind.
const END_RANK: u8 = 1;

fn tokenize(component: &str) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut chars = component.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c == '~' {
            chars.next();
            runs.push(Run::Tilde);
        } else if c.is_ascii_digit() {
            let mut s = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() {
                    s.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            // Leading zeros don't affect numeric value but we keep the
            // parse infallible by capping at u64::MAX on overflow.
            let n = s.parse::<u64>().unwrap_or(u64::MAX);
            runs.push(Run::Numeric(n));
        } else {
            let mut s = String::new();
            while let Some(&d) = chars.peek() {
                if d == '~' || d.is_ascii_digit() {
                    break;
                }
                s.push(d);
                chars.next();
            }
            runs.push(Run::Alpha(s));
        }
    }

    runs
}

fn cmp_run(a: &Run, b: &Run) -> Ordering {
    match (a, b) {
        (Run::Numeric(x), Run::Numeric(y)) => x.cmp(y),
        (Run::Alpha(x), Run::Alpha(y)) => x.cmp(y),
        (Run::Tilde, Run::Tilde) => Ordering::Equal,
        _ => a.rank().cmp(&b.rank()),
    }
}

fn cmp_component(a: &str, b: &str) -> Ordering {
    let ra = tokenize(a);
    let rb = tokenize(b);
    let len = ra.len().max(rb.len());

    for i in 0..len {
        let ord = match (ra.get(i), rb.get(i)) {
            (Some(x), Some(y)) => cmp_run(x, y),
            (Some(x), None) => x.rank().cmp(&END_RANK),
            (None, Some(y)) => END_RANK.cmp(&y.rank()),
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    Ordering::Equal
}

fn cmp_components(a: &[String], b: &[String]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let ord = match (a.get(i).map(String::as_str), b.get(i).map(String::as_str)) {
            (Some(x), Some(y)) => cmp_component(x, y),
            (Some(x), None) => cmp_component(x, ""),
            (None, Some(y)) => cmp_component("", y),
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// A parsed package version, ready for repeated comparison without
/// re-parsing.
#[derive(Debug, Clone)]
pub struct PkgVersion {
    raw: String,
    epoch: u64,
    components: Vec<String>,
    revision: Option<u64>,
    portrevision: Option<u64>,
}

impl PkgVersion {
    /// Parse a version string of the form `[epoch:]version[_revision[,portrevision]]`.
    pub fn parse(s: &str) -> Result<Self, Error> {
        if s.is_empty() {
            return Err(Error::InvalidVersion {
                input: s.to_string(),
            });
        }

        let (epoch, rest) = match s.split_once(':') {
            Some((e, r)) => {
                let epoch = e.parse::<u64>().map_err(|_| Error::InvalidVersion {
                    input: s.to_string(),
                })?;
                (epoch, r)
            }
            None => (0, s),
        };

        if rest.is_empty() {
            return Err(Error::InvalidVersion {
                input: s.to_string(),
            });
        }

        let (version_part, revision, portrevision) = split_revision(rest);

        let components = version_part.split('.').map(str::to_string).collect();

        Ok(Self {
            raw: s.to_string(),
            epoch,
            components,
            revision,
            portrevision,
        })
    }

    /// The original, unparsed version string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Compare two parsed versions per spec.md §4.A: epoch dominates
    /// unconditionally, then version components, then revision/portrevision
    /// only once the version proper is equal.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        if self.epoch != other.epoch {
            return self.epoch.cmp(&other.epoch);
        }

        let vc = cmp_components(&self.components, &other.components);
        if vc != Ordering::Equal {
            return vc;
        }

        let rev = self.revision.unwrap_or(0).cmp(&other.revision.unwrap_or(0));
        if rev != Ordering::Equal {
            return rev;
        }

        self.portrevision
            .unwrap_or(0)
            .cmp(&other.portrevision.unwrap_or(0))
    }
}

fn split_revision(s: &str) -> (&str, Option<u64>, Option<u64>) {
    let Some(us_idx) = s.rfind('_') else {
        return (s, None, None);
    };

    let suffix = &s[us_idx + 1..];
    let (rev_str, port_str) = match suffix.split_once(',') {
        Some((r, p)) => (r, Some(p)),
        None => (suffix, None),
    };

    let Ok(revision) = rev_str.parse::<u64>() else {
        return (s, None, None);
    };

    let portrevision = match port_str {
        Some(p) => match p.parse::<u64>() {
            Ok(v) => Some(v),
            Err(_) => return (s, None, None),
        },
        None => None,
    };

    (&s[..us_idx], Some(revision), portrevision)
}

/// Parse-then-compare convenience matching spec.md's `cmp(a, b)` signature.
pub fn cmp(a: &str, b: &str) -> Result<Ordering, Error> {
    Ok(PkgVersion::parse(a)?.compare(&PkgVersion::parse(b)?))
}

impl PartialEq for PkgVersion {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for PkgVersion {}

impl PartialOrd for PkgVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl Ord for PkgVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl fmt::Display for PkgVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for PkgVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for PkgVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for PkgVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
