//! Three-part filter identifiers: facility, instrument and filter name.
//!
//! The public grammar accepts `/` and `.` interchangeably as separators, so
//! `HST/WFPC2.F218W`, `HST.WFPC2/F218W` and `HST/WFPC2/F218W` all name the
//! same filter. The remote archive uses the `facility/instrument.name` form.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PhotometryError;

/// Extension of cached transmission tables
pub const TABLE_EXTENSION: &str = "json";

/// Canonical filter identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FilterId {
    facility: String,
    instrument: String,
    name: String,
}

impl FilterId {
    /// # Errors
    /// `InvalidInput` if any component is empty or contains a separator.
    pub fn new(
        facility: impl Into<String>,
        instrument: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, PhotometryError> {
        let id = Self {
            facility: facility.into(),
            instrument: instrument.into(),
            name: name.into(),
        };
        for part in [&id.facility, &id.instrument, &id.name] {
            if part.is_empty() || part.contains(['/', '.']) {
                return Err(invalid(&format!("{}/{}/{}", id.facility, id.instrument, id.name)));
            }
        }
        Ok(id)
    }

    pub fn facility(&self) -> &str {
        &self.facility
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The archive's own spelling, `facility/instrument.name`.
    pub fn svo_id(&self) -> String {
        format!("{}/{}.{}", self.facility, self.instrument, self.name)
    }

    /// Location of the cached table relative to the cache root.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(&self.facility)
            .join(&self.instrument)
            .join(format!("{}.{TABLE_EXTENSION}", self.name))
    }
}

fn invalid(raw: &str) -> PhotometryError {
    PhotometryError::InvalidInput(format!(
        "invalid filter id '{raw}': expected facility/instrument/name with '/' or '.' separators \
         (e.g. HST/WFPC2.F218W)"
    ))
}

impl FromStr for FilterId {
    type Err = PhotometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(['/', '.']).collect();
        match parts.as_slice() {
            [facility, instrument, name] => {
                Self::new(*facility, *instrument, *name).map_err(|_| invalid(s))
            }
            _ => Err(invalid(s)),
        }
    }
}

impl TryFrom<String> for FilterId {
    type Error = PhotometryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FilterId> for String {
    fn from(value: FilterId) -> Self {
        value.to_string()
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.facility, self.instrument, self.name)
    }
}
