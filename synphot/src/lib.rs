//! Synthetic photometry through cached filter transmission curves
//!
//! This crate turns source spectra into AB and Vega magnitudes (and back)
//! using filter transmission curves, with detector-aware photometric
//! integrals. Transmission curves come from a local cache that mirrors a
//! remote filter archive and stays reconciled with the archive's index.

pub mod cache;
pub mod error;
pub mod photometry;
pub mod units;

// Re-exports for easier access
pub use cache::{ArchiveClient, CacheConfig, FilterCache, FilterId, StaticArchive};
pub use error::{PhotometryError, Result};
pub use photometry::{
    DetectorType, FilterCollection, MagnitudeSpectralModel, MagnitudeSystem,
    ObservedMagnitudeSet, PhotometricFilter, SampledSpectrum, TransmissionCurve,
};
pub use units::{Length, LengthExt, WavelengthUnit, Wavelengths};
