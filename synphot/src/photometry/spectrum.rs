//! Sampled source spectra and the physical constants used by synthetic photometry.
//!
//! A [`SampledSpectrum`] is a flux density per unit wavelength
//! (erg s⁻¹ cm⁻² Å⁻¹) sampled on a [`Wavelengths`] grid. Filters operate on
//! spectra in this form: they are interpolated onto the spectrum grid and
//! integrated with the trapezoid rule.
//!
//! The module also provides a Planck blackbody in the same units, handy as a
//! reference source when checking magnitudes and colours.

use crate::error::{PhotometryError, Result};
use crate::units::{Length, LengthExt, Temperature, TemperatureExt, WavelengthUnit, Wavelengths};

/// Physical constants in CGS units for astronomical calculations.
pub struct CGS {}

impl CGS {
    /// AB magnitude system zero-point flux density
    /// Units: 3631e-23 erg s⁻¹ cm⁻² Hz⁻¹
    pub const AB_ZERO_POINT_FLUX_DENSITY: f64 = 3631.0 * Self::JANSKY_IN_CGS;

    /// 1 Jansky in CGS units
    /// Units: 1e-23 erg s⁻¹ cm⁻² Hz⁻¹
    pub const JANSKY_IN_CGS: f64 = 1e-23;

    /// Planck's constant
    /// Units: 6.62607015e-27 erg⋅s
    pub const PLANCK_CONSTANT: f64 = 6.62607015e-27;

    /// Boltzmann's constant
    /// Units: 1.380649e-16 erg K⁻¹
    pub const BOLTZMANN_CONSTANT: f64 = 1.380649e-16;

    /// Speed of light in vacuum
    /// Units: 2.99792458e10 cm/s
    pub const SPEED_OF_LIGHT: f64 = 2.99792458e10;

    /// Speed of light in vacuum
    /// Units: 2.99792458e18 Å/s
    pub const SPEED_OF_LIGHT_ANGSTROM: f64 = 2.99792458e18;

    /// One Angstrom in centimeters
    pub const ANGSTROM_IN_CM: f64 = 1e-8;
}

/// Convert a per-frequency flux density to per-wavelength at `wavelength_aa`.
///
/// F_λ = F_ν · c / λ², giving erg s⁻¹ cm⁻² Å⁻¹ for F_ν in erg s⁻¹ cm⁻² Hz⁻¹.
pub fn f_nu_to_f_lambda(f_nu: f64, wavelength_aa: f64) -> f64 {
    f_nu * CGS::SPEED_OF_LIGHT_ANGSTROM / (wavelength_aa * wavelength_aa)
}

/// Convert a per-wavelength flux density to per-frequency at `wavelength_aa`.
pub fn f_lambda_to_f_nu(f_lambda: f64, wavelength_aa: f64) -> f64 {
    f_lambda * wavelength_aa * wavelength_aa / CGS::SPEED_OF_LIGHT_ANGSTROM
}

/// Flux density per unit wavelength sampled on a wavelength grid.
///
/// Flux values are in erg s⁻¹ cm⁻² Å⁻¹ regardless of the grid unit.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledSpectrum {
    wavelength: Wavelengths,
    flux: Vec<f64>,
}

impl SampledSpectrum {
    /// Pair a wavelength grid with flux samples.
    ///
    /// Empty spectra are representable; operations that need samples reject
    /// them with `InvalidInput`.
    ///
    /// # Errors
    /// `LengthMismatch` if the grid and flux lengths differ.
    pub fn new(wavelength: Wavelengths, flux: Vec<f64>) -> Result<Self> {
        if wavelength.len() != flux.len() {
            return Err(PhotometryError::LengthMismatch {
                expected: wavelength.len(),
                actual: flux.len(),
            });
        }
        Ok(Self { wavelength, flux })
    }

    /// Constant F_λ over the given grid.
    pub fn flat(wavelength: Wavelengths, f_lambda: f64) -> Self {
        let flux = vec![f_lambda; wavelength.len()];
        Self { wavelength, flux }
    }

    /// Constant F_ν (erg s⁻¹ cm⁻² Hz⁻¹) over the given grid, stored as F_λ.
    pub fn flat_f_nu(wavelength: Wavelengths, f_nu: f64) -> Self {
        let flux = wavelength
            .values_in(WavelengthUnit::Angstrom)
            .into_iter()
            .map(|aa| f_nu_to_f_lambda(f_nu, aa))
            .collect();
        Self { wavelength, flux }
    }

    pub fn wavelength(&self) -> &Wavelengths {
        &self.wavelength
    }

    pub fn flux(&self) -> &[f64] {
        &self.flux
    }

    pub fn len(&self) -> usize {
        self.flux.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flux.is_empty()
    }

    /// Fail with `InvalidInput` unless both wavelength and flux samples are present.
    pub fn require_samples(&self) -> Result<()> {
        if self.wavelength.is_empty() || self.flux.is_empty() {
            return Err(PhotometryError::InvalidInput(
                "spectrum needs both wavelength and flux samples".to_string(),
            ));
        }
        Ok(())
    }

    /// Multiply every flux sample by a constant.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            wavelength: self.wavelength.clone(),
            flux: self.flux.iter().map(|f| f * factor).collect(),
        }
    }
}

/// Planck spectral radiance per unit wavelength.
///
/// # Returns
/// B_λ in erg s⁻¹ cm⁻² Å⁻¹ sr⁻¹ for every wavelength of the grid
pub fn blackbody_lambda(wavelength: &Wavelengths, temperature: Temperature) -> Vec<f64> {
    let t = temperature.as_kelvin();
    wavelength
        .values_in(WavelengthUnit::Centimeter)
        .into_iter()
        .map(|lambda_cm| {
            let numerator = 2.0 * CGS::PLANCK_CONSTANT * CGS::SPEED_OF_LIGHT * CGS::SPEED_OF_LIGHT;
            let exponent =
                CGS::PLANCK_CONSTANT * CGS::SPEED_OF_LIGHT / (lambda_cm * CGS::BOLTZMANN_CONSTANT * t);
            // per cm of wavelength -> per Angstrom
            numerator / (lambda_cm.powi(5) * exponent.exp_m1()) * CGS::ANGSTROM_IN_CM
        })
        .collect()
}

/// Blackbody sphere of `radius` seen from `distance`, on an Angstrom grid.
///
/// Flux is π sr · (R/d)² · B_λ, sampled from `lambda_min_aa` (inclusive) to
/// `lambda_max_aa` (exclusive) in steps of `dlambda_aa`.
///
/// # Errors
/// `InvalidInput` for a non-positive step, radius or distance, or an empty range.
pub fn blackbody_spectrum(
    temperature: Temperature,
    radius: Length,
    distance: Length,
    lambda_min_aa: f64,
    lambda_max_aa: f64,
    dlambda_aa: f64,
) -> Result<SampledSpectrum> {
    if dlambda_aa <= 0.0 || lambda_max_aa <= lambda_min_aa {
        return Err(PhotometryError::InvalidInput(format!(
            "blackbody grid needs min < max and a positive step, got {lambda_min_aa}..{lambda_max_aa} step {dlambda_aa}"
        )));
    }
    let ratio = radius.as_centimeters() / distance.as_centimeters();
    if !(ratio > 0.0) {
        return Err(PhotometryError::InvalidInput(
            "blackbody radius and distance must be positive".to_string(),
        ));
    }

    let count = ((lambda_max_aa - lambda_min_aa) / dlambda_aa).ceil() as usize;
    let grid: Vec<f64> = (0..count)
        .map(|i| lambda_min_aa + i as f64 * dlambda_aa)
        .filter(|&aa| aa < lambda_max_aa)
        .collect();
    let wavelength = Wavelengths::angstrom(grid);

    let dilution = std::f64::consts::PI * ratio * ratio;
    let flux = blackbody_lambda(&wavelength, temperature)
        .into_iter()
        .map(|b| b * dilution)
        .collect();

    SampledSpectrum::new(wavelength, flux)
}
