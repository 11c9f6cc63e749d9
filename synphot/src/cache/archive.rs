//! Remote filter archive seam.
//!
//! The cache only consumes tabular results from the archive: index rows
//! (identifier plus effective wavelength) and per-filter transmission
//! tables. Transport is left to implementors of [`ArchiveClient`];
//! [`StaticArchive`] serves a fixed in-memory catalogue.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::filter_id::FilterId;
use crate::photometry::curve::DetectorType;
use crate::units::WavelengthUnit;

/// Errors reported by an archive client
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The query was valid but matched nothing
    #[error("archive returned no data for {0}")]
    NoData(String),

    #[error("archive transport failed: {0}")]
    Transport(String),

    #[error("archive response could not be parsed: {0}")]
    Malformed(String),
}

/// One row of the archive's master filter list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRow {
    /// Identifier in the archive's spelling (`facility/instrument.name`)
    #[serde(rename = "filterID")]
    pub filter_id: String,

    /// Effective wavelength in Angstrom
    #[serde(rename = "WavelengthEff")]
    pub wavelength_eff: f64,

    /// Any further columns the archive provides
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl IndexRow {
    pub fn new(filter_id: &FilterId, wavelength_eff: f64) -> Self {
        Self {
            filter_id: filter_id.svo_id(),
            wavelength_eff,
            extra: BTreeMap::new(),
        }
    }

    /// Parsed identifier of the row.
    pub fn id(&self) -> crate::error::Result<FilterId> {
        self.filter_id.parse()
    }
}

/// A transmission table as fetched from the archive and persisted in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmissionTable {
    pub filter_id: FilterId,
    #[serde(default)]
    pub wavelength_unit: WavelengthUnit,
    pub detector_type: DetectorType,
    pub wavelength: Vec<f64>,
    pub transmission: Vec<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl TransmissionTable {
    /// Table in Angstrom with no extra metadata.
    pub fn new(
        filter_id: FilterId,
        detector_type: DetectorType,
        wavelength: Vec<f64>,
        transmission: Vec<f64>,
    ) -> Self {
        Self {
            filter_id,
            wavelength_unit: WavelengthUnit::Angstrom,
            detector_type,
            wavelength,
            transmission,
            metadata: BTreeMap::new(),
        }
    }
}

/// Source of filter metadata and transmission tables.
pub trait ArchiveClient {
    /// Smallest and largest effective wavelength (Angstrom) the archive accepts.
    fn wavelength_eff_range(&self) -> Result<(f64, f64), ArchiveError>;

    /// Index rows whose effective wavelength lies in `[min, max]`.
    ///
    /// An empty range is reported as [`ArchiveError::NoData`].
    fn filter_index(&self, wavelength_eff_min: f64, wavelength_eff_max: f64)
        -> Result<Vec<IndexRow>, ArchiveError>;

    /// Transmission table of one filter, looked up by exact identifier.
    fn transmission(&self, filter_id: &FilterId) -> Result<TransmissionTable, ArchiveError>;

    /// Index rows of one facility, optionally restricted to one instrument.
    fn filter_list(
        &self,
        facility: &str,
        instrument: Option<&str>,
    ) -> Result<Vec<IndexRow>, ArchiveError>;
}

/// In-memory archive with a fixed catalogue.
#[derive(Debug, Clone, Default)]
pub struct StaticArchive {
    rows: Vec<IndexRow>,
    tables: HashMap<FilterId, TransmissionTable>,
}

impl StaticArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter with its transmission table.
    pub fn with_filter(mut self, table: TransmissionTable, wavelength_eff: f64) -> Self {
        self.insert(table, wavelength_eff);
        self
    }

    /// Add an index row with no transmission table behind it.
    pub fn with_index_row(mut self, row: IndexRow) -> Self {
        self.rows.push(row);
        self
    }

    pub fn insert(&mut self, table: TransmissionTable, wavelength_eff: f64) {
        self.rows.push(IndexRow::new(&table.filter_id, wavelength_eff));
        self.tables.insert(table.filter_id.clone(), table);
    }

    /// Drop a filter from both the index and the tables.
    pub fn remove(&mut self, filter_id: &FilterId) {
        self.rows
            .retain(|row| row.id().map(|id| &id != filter_id).unwrap_or(true));
        self.tables.remove(filter_id);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl ArchiveClient for StaticArchive {
    fn wavelength_eff_range(&self) -> Result<(f64, f64), ArchiveError> {
        let mut values = self.rows.iter().map(|row| row.wavelength_eff);
        let first = values
            .next()
            .ok_or_else(|| ArchiveError::NoData("an empty catalogue".to_string()))?;
        Ok(values.fold((first, first), |(lo, hi), w| (lo.min(w), hi.max(w))))
    }

    fn filter_index(
        &self,
        wavelength_eff_min: f64,
        wavelength_eff_max: f64,
    ) -> Result<Vec<IndexRow>, ArchiveError> {
        let rows: Vec<IndexRow> = self
            .rows
            .iter()
            .filter(|row| {
                row.wavelength_eff >= wavelength_eff_min && row.wavelength_eff <= wavelength_eff_max
            })
            .cloned()
            .collect();
        if rows.is_empty() {
            return Err(ArchiveError::NoData(format!(
                "WavelengthEff in [{wavelength_eff_min}, {wavelength_eff_max}]"
            )));
        }
        Ok(rows)
    }

    fn transmission(&self, filter_id: &FilterId) -> Result<TransmissionTable, ArchiveError> {
        self.tables
            .get(filter_id)
            .cloned()
            .ok_or_else(|| ArchiveError::NoData(filter_id.svo_id()))
    }

    fn filter_list(
        &self,
        facility: &str,
        instrument: Option<&str>,
    ) -> Result<Vec<IndexRow>, ArchiveError> {
        let rows: Vec<IndexRow> = self
            .rows
            .iter()
            .filter(|row| match row.id() {
                Ok(id) => {
                    id.facility() == facility && instrument.map_or(true, |i| id.instrument() == i)
                }
                Err(_) => false,
            })
            .cloned()
            .collect();
        if rows.is_empty() {
            return Err(ArchiveError::NoData(format!("facility {facility}")));
        }
        Ok(rows)
    }
}
