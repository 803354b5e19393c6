//! Version signal parsing and track classification.
//!
//! The CKAN version under test arrives as a free-form string: either the
//! development marker (`master`) or a dotted release such as `2.9`. The
//! invoker only cares about one integer extracted from it and whether that
//! integer clears the modern-framework threshold.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Literal signal for the unreleased development track.
pub const DEVELOPMENT_MARKER: &str = "master";

/// Minor version assigned to the development marker. It is larger than any
/// release boundary so the marker always selects the modern track.
pub const DEVELOPMENT_MINOR: i64 = 100;

/// Lowest minor version that runs under the modern test framework.
pub const MODERN_THRESHOLD: i64 = 9;

/// Delimiter between version components.
const DELIMITER: char = '.';

/// Which dotted component supplies the minor version.
///
/// [`SegmentPolicy::Last`] reproduces the historical behaviour of taking
/// whatever follows the final delimiter. For a three-part release such as
/// `2.9.1` that yields the patch number (`1`), not the minor version, and so
/// selects the legacy track. The rule is kept as the default for
/// compatibility with existing CI matrices; [`SegmentPolicy::Second`] opts
/// into the conventional minor position.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SegmentPolicy {
    /// Use the segment after the last delimiter.
    #[default]
    Last,
    /// Use the second dotted component.
    Second,
}

impl SegmentPolicy {
    /// Returns the configuration name for the policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Last => "last",
            Self::Second => "second",
        }
    }

    fn select(self, signal: &str) -> Option<&str> {
        match self {
            Self::Last => signal.rsplit(DELIMITER).next(),
            Self::Second => signal.split(DELIMITER).nth(1),
        }
    }
}

impl fmt::Display for SegmentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SegmentPolicy {
    type Err = VersionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "last" => Ok(Self::Last),
            "second" => Ok(Self::Second),
            other => Err(VersionError::UnknownPolicy {
                name: other.to_owned(),
            }),
        }
    }
}

/// Test framework generation selected for a run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Track {
    /// `pytest` with the CKAN plugin.
    Modern,
    /// `nosetests` with the Pylons adapter.
    Legacy,
}

impl Track {
    /// Classifies a minor version against [`MODERN_THRESHOLD`].
    #[must_use]
    pub const fn for_minor(minor: i64) -> Self {
        if minor >= MODERN_THRESHOLD {
            Self::Modern
        } else {
            Self::Legacy
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Modern => f.write_str("modern"),
            Self::Legacy => f.write_str("legacy"),
        }
    }
}

/// Outcome of classifying a version signal.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Classification {
    /// Minor version derived from the signal.
    pub minor: i64,
    /// Track selected for the minor version.
    pub track: Track,
}

/// Errors raised while interpreting the version signal.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum VersionError {
    /// The signal was absent or blank.
    #[error("CKAN version is not set: export CKANVERSION or pass --ckan-version")]
    Missing,
    /// The selected segment is not an integer.
    #[error("CKAN version {signal:?} is malformed: segment {segment:?} is not an integer")]
    Malformed {
        /// Signal as supplied.
        signal: String,
        /// Segment chosen by the policy.
        segment: String,
    },
    /// The configured segment policy name is not recognised.
    #[error("unknown version segment policy {name:?}: expected \"last\" or \"second\"")]
    UnknownPolicy {
        /// Name that failed to parse.
        name: String,
    },
}

/// Derives the minor version from `signal` using `policy`.
///
/// # Errors
///
/// Returns [`VersionError::Missing`] for an absent or blank signal and
/// [`VersionError::Malformed`] when the selected segment does not parse.
///
/// # Examples
///
/// ```
/// use archiver_ci::version::{SegmentPolicy, minor_version};
///
/// assert_eq!(minor_version(Some("master"), SegmentPolicy::Last), Ok(100));
/// assert_eq!(minor_version(Some("2.10"), SegmentPolicy::Last), Ok(10));
/// assert_eq!(minor_version(Some("2.9.1"), SegmentPolicy::Last), Ok(1));
/// assert_eq!(minor_version(Some("2.9.1"), SegmentPolicy::Second), Ok(9));
/// ```
pub fn minor_version(signal: Option<&str>, policy: SegmentPolicy) -> Result<i64, VersionError> {
    let signal = match signal {
        Some(value) if !value.trim().is_empty() => value,
        _ => return Err(VersionError::Missing),
    };

    if signal == DEVELOPMENT_MARKER {
        return Ok(DEVELOPMENT_MINOR);
    }

    let segment = policy.select(signal).unwrap_or_default();
    segment
        .parse::<i64>()
        .map_err(|_| VersionError::Malformed {
            signal: signal.to_owned(),
            segment: segment.to_owned(),
        })
}

/// Classifies `signal` into a [`Classification`].
///
/// # Errors
///
/// Propagates any error from [`minor_version`].
pub fn classify(signal: Option<&str>, policy: SegmentPolicy) -> Result<Classification, VersionError> {
    let minor = minor_version(signal, policy)?;
    Ok(Classification {
        minor,
        track: Track::for_minor(minor),
    })
}
