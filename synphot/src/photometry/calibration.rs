//! Vega reference spectrum used for Vega-system zero points.
//!
//! The reference is a two-column table: `wavelength` in Angstrom and `flux`
//! in erg s⁻¹ cm⁻² Å⁻¹. CSV files are always supported; FITS binary tables
//! are read with `fitsio` when the `fits` feature is enabled.
//!
//! A missing file is never fetched implicitly. Callers receive
//! [`PhotometryError::MissingReferenceFile`] naming the expected path and the
//! upstream location of the file.

use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::spectrum::SampledSpectrum;
use crate::error::{PhotometryError, Result};
use crate::units::Wavelengths;

/// File stem of the default Vega model (CALSPEC alpha Lyr model 002)
pub const VEGA_FILE_STEM: &str = "alpha_lyr_mod_002";

/// Upstream location of the default Vega model
pub const VEGA_SOURCE_URL: &str = "ftp://ftp.stsci.edu/cdbs/calspec/alpha_lyr_mod_002.fits";

/// Environment variable overriding the calibration directory
pub const CALIBRATION_DIR_ENV: &str = "SYNPHOT_CALIBRATION_DIR";

/// Errors that can occur while reading a calibration table
#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[cfg(feature = "fits")]
    #[error("FITS error in {path}: {source}")]
    Fits {
        path: PathBuf,
        #[source]
        source: fitsio::errors::Error,
    },

    #[error("Unsupported calibration file format: {0} (expected .csv or .fits)")]
    UnsupportedFormat(PathBuf),

    #[error("Calibration table {0} contains no rows")]
    Empty(PathBuf),
}

#[derive(Debug, Deserialize)]
struct CalibrationRow {
    wavelength: f64,
    flux: f64,
}

/// Where calibration reference files live on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationConfig {
    pub dir: PathBuf,
}

impl CalibrationConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Resolve the calibration directory from `SYNPHOT_CALIBRATION_DIR`,
    /// falling back to `$HOME/.cache/synphot/calibration`.
    pub fn from_env() -> Self {
        if let Ok(dir) = env::var(CALIBRATION_DIR_ENV) {
            return Self::new(dir);
        }
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Self::new(
            PathBuf::from(home)
                .join(".cache")
                .join("synphot")
                .join("calibration"),
        )
    }

    /// Path of the default Vega model inside the calibration directory.
    pub fn vega_path(&self) -> PathBuf {
        let extension = if cfg!(feature = "fits") { "fits" } else { "csv" };
        self.dir.join(format!("{VEGA_FILE_STEM}.{extension}"))
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Read a calibration spectrum (Angstrom grid, F_λ flux) from disk.
///
/// # Errors
/// - `MissingReferenceFile` if `path` does not exist
/// - `Calibration` if the table cannot be parsed or has no rows
pub fn read_calibration_spectrum(path: &Path) -> Result<SampledSpectrum> {
    if !path.exists() {
        return Err(PhotometryError::MissingReferenceFile {
            path: path.to_path_buf(),
            url: VEGA_SOURCE_URL.to_string(),
        });
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let (wavelength, flux) = match extension.as_deref() {
        Some("csv") | Some("txt") => read_csv_table(path)?,
        #[cfg(feature = "fits")]
        Some("fits") | Some("fit") => read_fits_table(path)?,
        _ => {
            return Err(CalibrationError::UnsupportedFormat(path.to_path_buf()).into());
        }
    };

    if wavelength.is_empty() {
        return Err(CalibrationError::Empty(path.to_path_buf()).into());
    }

    log::debug!(
        "Loaded calibration spectrum {} ({} samples)",
        path.display(),
        wavelength.len()
    );
    SampledSpectrum::new(Wavelengths::angstrom(wavelength), flux)
}

/// Load the Vega reference, from `path` if given, otherwise from the default
/// calibration directory.
pub fn load_vega(path: Option<&Path>) -> Result<SampledSpectrum> {
    match path {
        Some(path) => read_calibration_spectrum(path),
        None => read_calibration_spectrum(&CalibrationConfig::from_env().vega_path()),
    }
}

fn read_csv_table(path: &Path) -> std::result::Result<(Vec<f64>, Vec<f64>), CalibrationError> {
    let csv_error = |source| CalibrationError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_path(path)
        .map_err(csv_error)?;

    let mut wavelength = Vec::new();
    let mut flux = Vec::new();
    for row in reader.deserialize::<CalibrationRow>() {
        let row = row.map_err(csv_error)?;
        wavelength.push(row.wavelength);
        flux.push(row.flux);
    }
    Ok((wavelength, flux))
}

#[cfg(feature = "fits")]
fn read_fits_table(path: &Path) -> std::result::Result<(Vec<f64>, Vec<f64>), CalibrationError> {
    use fitsio::FitsFile;

    let fits_error = |source| CalibrationError::Fits {
        path: path.to_path_buf(),
        source,
    };

    let mut fptr = FitsFile::open(path).map_err(fits_error)?;
    // The spectrum lives in the first extension, after the empty primary HDU
    let hdu = fptr.hdu(1).map_err(fits_error)?;
    let wavelength: Vec<f64> = hdu.read_col(&mut fptr, "wavelength").map_err(fits_error)?;
    let flux: Vec<f64> = hdu.read_col(&mut fptr, "flux").map_err(fits_error)?;
    Ok((wavelength, flux))
}
