//! Crate-wide error taxonomy.
//!
//! Every variant that reports missing state names the call that fixes it.

use std::path::PathBuf;

use thiserror::Error;

use crate::cache::archive::ArchiveError;
use crate::photometry::calibration::CalibrationError;
use crate::photometry::interpolation::InterpolationError;

/// Errors produced by filter curves, photometry and the filter cache
#[derive(Debug, Error)]
pub enum PhotometryError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(
        "Filter '{filter_id}' does not exist in the archive index. Check the ID against \
         list_filters(), or refresh the index with FilterCache::download_index()"
    )]
    NotFound { filter_id: String },

    #[error(
        "Filter '{filter_id}' is listed in the archive index but has no transmission data in \
         the cache directory ({cache_dir}). Use FilterCache::download_transmission() to \
         download it to the cache"
    )]
    NotCached { filter_id: String, cache_dir: PathBuf },

    #[error("Length mismatch: expected {expected} values, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error(
        "Vega calibration spectrum not found at {path}. Download it from {url} and place it \
         at that path, or point the filter at another file"
    )]
    MissingReferenceFile { path: PathBuf, url: String },

    #[error(
        "Archive filter index does not exist in the cache directory: {0}. Make sure you have \
         already downloaded it with FilterCache::download_index() (or download_all())"
    )]
    IndexMissing(PathBuf),

    #[error(
        "Cache directory {0} does not exist. Populate it with FilterCache::download_all() or \
         FilterCache::download_transmission()"
    )]
    CacheDirMissing(PathBuf),

    #[error(transparent)]
    Interpolation(#[from] InterpolationError),

    #[error("Archive request failed: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Calibration file could not be read: {0}")]
    Calibration(#[from] CalibrationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed cache file: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PhotometryError>;
