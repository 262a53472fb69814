//! Process-start build stamp.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Format used when a stamp is rendered into an image name.
///
/// Lexicographic order of rendered stamps matches chronological order, and
/// the character set is accepted by cloud image naming rules.
pub const STAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%SZ";

/// A UTC instant captured once when the process starts.
///
/// Every plan generated in one invocation carries the same stamp, so it is
/// created at the entry point and passed down explicitly.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildStamp(DateTime<Utc>);

impl BuildStamp {
    /// Capture the current time.
    pub fn now() -> Self {
        // Image names only carry second precision.
        let now = Utc::now();
        Self(now - chrono::Duration::nanoseconds(i64::from(now.timestamp_subsec_nanos())))
    }

    /// From a DateTime.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get the inner DateTime.
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for BuildStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(STAMP_FORMAT))
    }
}

impl fmt::Debug for BuildStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BuildStamp({})", self)
    }
}

impl FromStr for BuildStamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDateTime::parse_from_str(s, STAMP_FORMAT)
            .map(|naive| Self(naive.and_utc()))
            .map_err(|e| Error::config(format!("invalid build stamp '{s}': {e}")))
    }
}
