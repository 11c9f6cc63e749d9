//! Ordered groups of filters and observed magnitudes.
//!
//! [`FilterCollection`] runs the per-filter photometry of
//! [`PhotometricFilter`] over a list of filters, preserving the input order
//! in every output. [`ObservedMagnitudeSet`] pairs a collection with one
//! observed magnitude (and optionally one uncertainty) per filter.

use std::ops::Index;
use std::sync::Arc;

use super::filters::{MagnitudeSystem, PhotometricFilter};
use super::spectrum::SampledSpectrum;
use crate::cache::FilterCache;
use crate::error::{PhotometryError, Result};
use crate::units::Length;

/// Asymmetric flux errors obtained by pushing magnitudes through `m ± σ`.
#[derive(Debug, Clone, PartialEq)]
pub struct AsymmetricUncertainty {
    /// |F(m + σ) − F(m)| per filter (the fainter side)
    pub positive: Vec<f64>,
    /// |F(m − σ) − F(m)| per filter (the brighter side)
    pub negative: Vec<f64>,
}

/// A non-empty, ordered list of photometric filters.
#[derive(Debug, Clone)]
pub struct FilterCollection {
    filters: Vec<PhotometricFilter>,
}

impl FilterCollection {
    /// # Errors
    /// `InvalidInput` if `filters` is empty.
    pub fn new(filters: Vec<PhotometricFilter>) -> Result<Self> {
        if filters.is_empty() {
            return Err(PhotometryError::InvalidInput(
                "a filter collection needs at least one filter".to_string(),
            ));
        }
        Ok(Self { filters })
    }

    /// Load every id from the cache, in order.
    ///
    /// Fails on the first id that cannot be loaded, with that id's error.
    pub fn from_ids<S: AsRef<str>>(cache: &FilterCache, ids: &[S]) -> Result<Self> {
        let filters = ids
            .iter()
            .map(|id| PhotometricFilter::load(cache, id.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(filters)
    }

    /// Share one Vega reference across every filter of the collection.
    pub fn with_vega_spectrum(self, vega: Arc<SampledSpectrum>) -> Self {
        Self {
            filters: self
                .filters
                .into_iter()
                .map(|f| f.with_vega_spectrum(Arc::clone(&vega)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PhotometricFilter> {
        self.filters.get(index)
    }

    pub fn first(&self) -> &PhotometricFilter {
        &self.filters[0]
    }

    pub fn last(&self) -> &PhotometricFilter {
        &self.filters[self.filters.len() - 1]
    }

    /// A fresh iterator in collection order; call again to restart.
    pub fn iter(&self) -> std::slice::Iter<'_, PhotometricFilter> {
        self.filters.iter()
    }

    pub fn ab_magnitudes(&self, spectrum: &SampledSpectrum) -> Result<Vec<f64>> {
        self.iter().map(|f| f.ab_magnitude(spectrum)).collect()
    }

    pub fn vega_magnitudes(&self, spectrum: &SampledSpectrum) -> Result<Vec<f64>> {
        self.iter().map(|f| f.vega_magnitude(spectrum)).collect()
    }

    pub fn magnitudes(&self, system: MagnitudeSystem, spectrum: &SampledSpectrum) -> Result<Vec<f64>> {
        self.iter().map(|f| f.magnitude(system, spectrum)).collect()
    }

    pub fn f_lambda_values(&self, spectrum: &SampledSpectrum) -> Result<Vec<f64>> {
        self.iter().map(|f| f.f_lambda(spectrum)).collect()
    }

    pub fn pivot_wavelengths(&self) -> Vec<Length> {
        self.iter().map(|f| f.pivot_wavelength()).collect()
    }

    fn check_len(&self, values: &[f64]) -> Result<()> {
        if values.len() != self.len() {
            return Err(PhotometryError::LengthMismatch {
                expected: self.len(),
                actual: values.len(),
            });
        }
        Ok(())
    }

    /// F_λ for one magnitude per filter in `system`.
    ///
    /// # Errors
    /// `LengthMismatch` unless there is exactly one magnitude per filter.
    pub fn convert_magnitudes_to_f_lambda(
        &self,
        system: MagnitudeSystem,
        magnitudes: &[f64],
    ) -> Result<Vec<f64>> {
        self.check_len(magnitudes)?;
        self.iter()
            .zip(magnitudes)
            .map(|(f, &m)| f.flux_from_magnitude(system, m))
            .collect()
    }

    pub fn convert_ab_magnitudes_to_f_lambda(&self, magnitudes: &[f64]) -> Result<Vec<f64>> {
        self.convert_magnitudes_to_f_lambda(MagnitudeSystem::Ab, magnitudes)
    }

    pub fn convert_vega_magnitudes_to_f_lambda(&self, magnitudes: &[f64]) -> Result<Vec<f64>> {
        self.convert_magnitudes_to_f_lambda(MagnitudeSystem::Vega, magnitudes)
    }

    /// Propagate magnitude uncertainties to F_λ by evaluating the flux at
    /// `m + σ` and `m − σ` and differencing against the flux at `m`.
    ///
    /// # Errors
    /// `LengthMismatch` if either slice does not have one entry per filter.
    pub fn convert_magnitude_uncertainties_to_f_lambda_uncertainties(
        &self,
        system: MagnitudeSystem,
        magnitudes: &[f64],
        uncertainties: &[f64],
    ) -> Result<AsymmetricUncertainty> {
        self.check_len(magnitudes)?;
        self.check_len(uncertainties)?;

        let mut positive = Vec::with_capacity(self.len());
        let mut negative = Vec::with_capacity(self.len());
        for ((filter, &m), &sigma) in self.iter().zip(magnitudes).zip(uncertainties) {
            let central = filter.flux_from_magnitude(system, m)?;
            let fainter = filter.flux_from_magnitude(system, m + sigma)?;
            let brighter = filter.flux_from_magnitude(system, m - sigma)?;
            positive.push((fainter - central).abs());
            negative.push((brighter - central).abs());
        }
        Ok(AsymmetricUncertainty { positive, negative })
    }

    pub fn convert_ab_magnitude_uncertainties_to_f_lambda_uncertainties(
        &self,
        magnitudes: &[f64],
        uncertainties: &[f64],
    ) -> Result<AsymmetricUncertainty> {
        self.convert_magnitude_uncertainties_to_f_lambda_uncertainties(
            MagnitudeSystem::Ab,
            magnitudes,
            uncertainties,
        )
    }

    pub fn convert_vega_magnitude_uncertainties_to_f_lambda_uncertainties(
        &self,
        magnitudes: &[f64],
        uncertainties: &[f64],
    ) -> Result<AsymmetricUncertainty> {
        self.convert_magnitude_uncertainties_to_f_lambda_uncertainties(
            MagnitudeSystem::Vega,
            magnitudes,
            uncertainties,
        )
    }
}

impl Index<usize> for FilterCollection {
    type Output = PhotometricFilter;

    fn index(&self, index: usize) -> &Self::Output {
        &self.filters[index]
    }
}

impl<'a> IntoIterator for &'a FilterCollection {
    type Item = &'a PhotometricFilter;
    type IntoIter = std::slice::Iter<'a, PhotometricFilter>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.iter()
    }
}

/// Observed magnitudes, one per filter of a collection.
#[derive(Debug, Clone)]
pub struct ObservedMagnitudeSet {
    filters: FilterCollection,
    magnitudes: Vec<f64>,
    magnitude_uncertainties: Option<Vec<f64>>,
}

impl ObservedMagnitudeSet {
    /// # Errors
    /// `LengthMismatch` if the magnitudes, or the uncertainties when given,
    /// do not have one entry per filter.
    pub fn new(
        filters: FilterCollection,
        magnitudes: Vec<f64>,
        magnitude_uncertainties: Option<Vec<f64>>,
    ) -> Result<Self> {
        filters.check_len(&magnitudes)?;
        if let Some(uncertainties) = &magnitude_uncertainties {
            filters.check_len(uncertainties)?;
        }
        Ok(Self {
            filters,
            magnitudes,
            magnitude_uncertainties,
        })
    }

    /// Load the filters by id and attach magnitudes.
    pub fn from_ids<S: AsRef<str>>(
        cache: &FilterCache,
        ids: &[S],
        magnitudes: Vec<f64>,
        magnitude_uncertainties: Option<Vec<f64>>,
    ) -> Result<Self> {
        Self::new(
            FilterCollection::from_ids(cache, ids)?,
            magnitudes,
            magnitude_uncertainties,
        )
    }

    pub fn filters(&self) -> &FilterCollection {
        &self.filters
    }

    pub fn magnitudes(&self) -> &[f64] {
        &self.magnitudes
    }

    pub fn magnitude_uncertainties(&self) -> Option<&[f64]> {
        self.magnitude_uncertainties.as_deref()
    }

    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PhotometricFilter> {
        self.filters.iter()
    }

    /// Observed magnitudes as F_λ, assuming they are in `system`.
    pub fn f_lambda(&self, system: MagnitudeSystem) -> Result<Vec<f64>> {
        self.filters
            .convert_magnitudes_to_f_lambda(system, &self.magnitudes)
    }

    /// Flux uncertainties for the observed magnitudes, if any were given.
    pub fn f_lambda_uncertainties(
        &self,
        system: MagnitudeSystem,
    ) -> Result<Option<AsymmetricUncertainty>> {
        self.magnitude_uncertainties
            .as_deref()
            .map(|sigma| {
                self.filters
                    .convert_magnitude_uncertainties_to_f_lambda_uncertainties(
                        system,
                        &self.magnitudes,
                        sigma,
                    )
            })
            .transpose()
    }

    /// Observed minus synthetic magnitudes of `spectrum`, per filter.
    pub fn residuals(&self, system: MagnitudeSystem, spectrum: &SampledSpectrum) -> Result<Vec<f64>> {
        let synthetic = self.filters.magnitudes(system, spectrum)?;
        Ok(self
            .magnitudes
            .iter()
            .zip(synthetic)
            .map(|(observed, model)| observed - model)
            .collect())
    }
}

impl Index<usize> for ObservedMagnitudeSet {
    type Output = PhotometricFilter;

    fn index(&self, index: usize) -> &Self::Output {
        &self.filters[index]
    }
}
