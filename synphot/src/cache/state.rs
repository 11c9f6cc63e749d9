//! Cache bookkeeping: when the cache was last brought in line with the archive.
//!
//! The date is stored as `YYYY-MM-DD` text in `cache_state.json` at the cache
//! root. Hand-edited or corrupted values are not fatal: an unparseable date,
//! a date in the future, or a missing date on a non-empty cache is replaced
//! by the modification date of the cached index.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// File name of the bookkeeping record at the cache root
pub const STATE_FILE: &str = "cache_state.json";

/// Date format of the recorded update date
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Persisted cache bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheState {
    /// Raw recorded date; kept as text so malformed values can be detected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

/// Interpretation of the recorded update date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedDate {
    Absent,
    Valid(NaiveDate),
    Invalid(String),
}

impl CacheState {
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            last_updated: Some(date.format(DATE_FORMAT).to_string()),
        }
    }

    /// Read the state file under `root`; a missing file is an empty state.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(STATE_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)?;
        match serde_json::from_str(&text) {
            Ok(state) => Ok(state),
            Err(e) => {
                log::warn!("Ignoring unreadable {}: {e}", path.display());
                Ok(Self {
                    last_updated: Some(text),
                })
            }
        }
    }

    /// Write the state file under `root`, creating the directory if needed.
    pub fn save(&self, root: &Path) -> Result<()> {
        fs::create_dir_all(root)?;
        fs::write(root.join(STATE_FILE), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn recorded_date(&self) -> RecordedDate {
        match &self.last_updated {
            None => RecordedDate::Absent,
            Some(text) => match NaiveDate::parse_from_str(text.trim(), DATE_FORMAT) {
                Ok(date) => RecordedDate::Valid(date),
                Err(_) => RecordedDate::Invalid(text.clone()),
            },
        }
    }
}

/// Outcome of validating a recorded date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rectification {
    pub date: Option<NaiveDate>,
    /// Why the recorded value was replaced, if it was
    pub reason: Option<&'static str>,
}

/// Validate the recorded date against `today`.
///
/// `fallback` is the modification date of the cached index; it replaces any
/// unusable value. A missing date on an empty cache is left missing.
pub fn rectify(
    recorded: &RecordedDate,
    today: NaiveDate,
    fallback: Option<NaiveDate>,
    cache_has_entries: bool,
) -> Rectification {
    let replaced = |reason| Rectification {
        date: fallback,
        reason: Some(reason),
    };
    match recorded {
        RecordedDate::Absent if cache_has_entries => {
            replaced("no update date recorded although the cache holds data")
        }
        RecordedDate::Absent => Rectification {
            date: None,
            reason: None,
        },
        RecordedDate::Invalid(_) => replaced("recorded update date is not a valid YYYY-MM-DD date"),
        RecordedDate::Valid(date) if *date > today => replaced("recorded update date lies in the future"),
        RecordedDate::Valid(date) => Rectification {
            date: Some(*date),
            reason: None,
        },
    }
}

/// How current the cache is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    /// Nothing cached and nothing recorded
    Empty,
    /// Entries exist but no update was ever recorded
    NeverUpdated,
    Fresh { age_days: i64 },
    Stale { age_days: i64 },
}

impl Staleness {
    pub fn assess(
        last_updated: Option<NaiveDate>,
        today: NaiveDate,
        stale_after_days: i64,
        cache_has_entries: bool,
    ) -> Self {
        match last_updated {
            None if cache_has_entries => Staleness::NeverUpdated,
            None => Staleness::Empty,
            Some(date) => {
                let age_days = (today - date).num_days();
                if age_days > stale_after_days {
                    Staleness::Stale { age_days }
                } else {
                    Staleness::Fresh { age_days }
                }
            }
        }
    }

    pub fn needs_update(self) -> bool {
        matches!(self, Staleness::Stale { .. } | Staleness::NeverUpdated)
    }
}
