//! Coarse spectra reconstructed from broadband magnitudes.
//!
//! Each observed magnitude becomes one flux knot at its filter's pivot
//! wavelength. Optional end points pin the model to `end_point_flux` at the
//! first and last transmitting wavelength of the bluest and reddest filter,
//! and the knots are interpolated (cubic spline by default) onto a sampling
//! grid. Outside the knots the model is zero.

use super::collection::{AsymmetricUncertainty, ObservedMagnitudeSet};
use super::filters::MagnitudeSystem;
use super::interpolation::{InterpolationKind, Interpolator};
use super::spectrum::SampledSpectrum;
use crate::error::{PhotometryError, Result};
use crate::units::{LengthExt, WavelengthUnit, Wavelengths};

/// Options controlling how knots are built and joined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralModelOptions {
    pub interpolation_kind: InterpolationKind,
    /// Flux at the outer end points; `None` disables them
    pub end_point_flux: Option<f64>,
}

impl Default for SpectralModelOptions {
    fn default() -> Self {
        Self {
            interpolation_kind: InterpolationKind::Cubic,
            end_point_flux: Some(0.0),
        }
    }
}

/// A sampled spectrum interpolated through magnitude-derived flux knots.
#[derive(Debug, Clone)]
pub struct MagnitudeSpectralModel {
    magnitude_set: ObservedMagnitudeSet,
    system: MagnitudeSystem,
    knots: Wavelengths,
    flux_knots: Vec<f64>,
    flux_uncertainty: Option<AsymmetricUncertainty>,
    interpolator: Interpolator,
    spectrum: SampledSpectrum,
}

impl MagnitudeSpectralModel {
    pub fn new(magnitude_set: ObservedMagnitudeSet, system: MagnitudeSystem) -> Result<Self> {
        Self::with_options(magnitude_set, system, SpectralModelOptions::default())
    }

    /// # Errors
    /// - `MissingReferenceFile` for Vega magnitudes without a Vega reference
    /// - `InvalidInput` if an end point is requested for a filter that transmits nowhere
    /// - `Interpolation` if the knots are too few for the kind, or not ascending
    pub fn with_options(
        magnitude_set: ObservedMagnitudeSet,
        system: MagnitudeSystem,
        options: SpectralModelOptions,
    ) -> Result<Self> {
        let filters = magnitude_set.filters();
        let mut knots: Vec<f64> = filters
            .pivot_wavelengths()
            .iter()
            .map(|p| p.as_angstroms())
            .collect();
        let mut flux_knots = magnitude_set.f_lambda(system)?;
        let flux_uncertainty = magnitude_set.f_lambda_uncertainties(system)?;

        if let Some(end_flux) = options.end_point_flux {
            let start = filters.first().first_transmitting_wavelength().ok_or_else(|| {
                PhotometryError::InvalidInput(
                    "first filter has no transmitting wavelength for the blue end point".to_string(),
                )
            })?;
            let end = filters.last().last_transmitting_wavelength().ok_or_else(|| {
                PhotometryError::InvalidInput(
                    "last filter has no transmitting wavelength for the red end point".to_string(),
                )
            })?;
            knots.insert(0, start.as_angstroms());
            knots.push(end.as_angstroms());
            flux_knots.insert(0, end_flux);
            flux_knots.push(end_flux);
        }

        let interpolator = Interpolator::new(
            knots.clone(),
            flux_knots.clone(),
            options.interpolation_kind,
        )?;
        let knots = Wavelengths::angstrom(knots);
        let spectrum = SampledSpectrum::new(knots.clone(), flux_knots.clone())?;

        log::debug!(
            "Built {:?} spectral model from {} magnitudes ({} knots)",
            system,
            magnitude_set.len(),
            knots.len()
        );

        Ok(Self {
            magnitude_set,
            system,
            knots,
            flux_knots,
            flux_uncertainty,
            interpolator,
            spectrum,
        })
    }

    /// Resample the model onto `wavelength`.
    pub fn with_wavelength(mut self, wavelength: Wavelengths) -> Result<Self> {
        let flux = self.interpolate(&wavelength);
        self.spectrum = SampledSpectrum::new(wavelength, flux)?;
        Ok(self)
    }

    pub fn magnitude_set(&self) -> &ObservedMagnitudeSet {
        &self.magnitude_set
    }

    pub fn system(&self) -> MagnitudeSystem {
        self.system
    }

    pub fn knots(&self) -> &Wavelengths {
        &self.knots
    }

    pub fn flux_knots(&self) -> &[f64] {
        &self.flux_knots
    }

    /// F_λ uncertainties at the pivot knots (end points carry none).
    pub fn flux_uncertainty(&self) -> Option<&AsymmetricUncertainty> {
        self.flux_uncertainty.as_ref()
    }

    pub fn interpolation_kind(&self) -> InterpolationKind {
        self.interpolator.kind()
    }

    /// The model sampled on its current grid (the knots unless resampled).
    pub fn spectrum(&self) -> &SampledSpectrum {
        &self.spectrum
    }

    /// Model flux on an arbitrary grid; zero outside the knots.
    pub fn interpolate(&self, wavelength: &Wavelengths) -> Vec<f64> {
        self.interpolator
            .evaluate_many(&wavelength.values_in(WavelengthUnit::Angstrom))
    }

    /// AB magnitudes of the model through the filters of its magnitude set.
    pub fn calculate_ab_magnitudes(&self) -> Result<Vec<f64>> {
        self.magnitude_set.filters().ab_magnitudes(&self.spectrum)
    }

    /// Vega magnitudes of the model through the filters of its magnitude set.
    pub fn calculate_vega_magnitudes(&self) -> Result<Vec<f64>> {
        self.magnitude_set.filters().vega_magnitudes(&self.spectrum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photometry::collection::FilterCollection;
    use crate::photometry::curve::{DetectorType, TransmissionCurve};
    use crate::photometry::filters::PhotometricFilter;
    use approx::assert_relative_eq;

    fn box_filter(center_aa: f64) -> PhotometricFilter {
        let curve = TransmissionCurve::new(
            Wavelengths::angstrom(vec![
                center_aa - 400.0,
                center_aa - 399.0,
                center_aa + 399.0,
                center_aa + 400.0,
            ]),
            vec![0.0, 1.0, 1.0, 0.0],
            DetectorType::PhotonCounter,
        )
        .unwrap();
        PhotometricFilter::new(curve)
    }

    fn magnitude_set(uncertainties: Option<Vec<f64>>) -> ObservedMagnitudeSet {
        let filters = FilterCollection::new(vec![
            box_filter(4000.0),
            box_filter(5500.0),
            box_filter(7000.0),
        ])
        .unwrap();
        ObservedMagnitudeSet::new(filters, vec![15.0, 14.5, 14.0], uncertainties).unwrap()
    }

    #[test]
    fn test_knots_at_pivots_with_end_points() {
        let set = magnitude_set(None);
        let expected_flux = set.f_lambda(MagnitudeSystem::Ab).unwrap();
        let model = MagnitudeSpectralModel::new(set, MagnitudeSystem::Ab).unwrap();

        assert_eq!(model.interpolation_kind(), InterpolationKind::Cubic);
        assert_eq!(model.knots().len(), 5);
        // End points sit where the outer filters start and stop transmitting
        assert_relative_eq!(model.knots().values()[0], 3601.0, epsilon = 1e-9);
        assert_relative_eq!(model.knots().values()[4], 7399.0, epsilon = 1e-9);
        assert_eq!(model.flux_knots()[0], 0.0);
        assert_eq!(model.flux_knots()[4], 0.0);
        assert_eq!(&model.flux_knots()[1..4], expected_flux.as_slice());
        assert!(model.flux_uncertainty().is_none());
    }

    #[test]
    fn test_without_end_points() {
        let options = SpectralModelOptions {
            interpolation_kind: InterpolationKind::Linear,
            end_point_flux: None,
        };
        let model =
            MagnitudeSpectralModel::with_options(magnitude_set(Some(vec![0.1; 3])), MagnitudeSystem::Ab, options)
                .unwrap();
        assert_eq!(model.knots().len(), 3);
        assert_eq!(model.flux_uncertainty().unwrap().positive.len(), 3);

        let outside = model.interpolate(&Wavelengths::angstrom(vec![1000.0, 20000.0]));
        assert_eq!(outside, vec![0.0, 0.0]);
    }

    #[test]
    fn test_model_passes_through_knots() {
        let model = MagnitudeSpectralModel::new(magnitude_set(None), MagnitudeSystem::Ab).unwrap();
        let at_knots = model.interpolate(model.knots());
        for (value, knot) in at_knots.iter().zip(model.flux_knots()) {
            assert_relative_eq!(*value, *knot, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_cubic_needs_enough_knots() {
        let filters = FilterCollection::new(vec![box_filter(5500.0)]).unwrap();
        let set = ObservedMagnitudeSet::new(filters, vec![12.0], None).unwrap();
        let options = SpectralModelOptions {
            end_point_flux: None,
            ..Default::default()
        };
        assert!(matches!(
            MagnitudeSpectralModel::with_options(set, MagnitudeSystem::Ab, options),
            Err(PhotometryError::Interpolation(_))
        ));
    }

    #[test]
    fn test_resampled_model_magnitudes() {
        let grid: Vec<f64> = (0..=440).map(|i| 3500.0 + 10.0 * i as f64).collect();
        let options = SpectralModelOptions {
            interpolation_kind: InterpolationKind::Linear,
            ..Default::default()
        };
        let model = MagnitudeSpectralModel::with_options(magnitude_set(None), MagnitudeSystem::Ab, options)
            .unwrap()
            .with_wavelength(Wavelengths::angstrom(grid))
            .unwrap();
        assert_eq!(model.spectrum().len(), 441);

        let magnitudes = model.calculate_ab_magnitudes().unwrap();
        assert_eq!(magnitudes.len(), 3);
        assert!(magnitudes.iter().all(|m| m.is_finite()));
    }
}
