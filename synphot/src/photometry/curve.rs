//! Filter transmission curves.
//!
//! A [`TransmissionCurve`] holds the fraction of incident light a filter
//! passes, sampled on a wavelength grid with an explicit unit, plus the
//! [`DetectorType`] that decides how photometric integrals weight the curve.
//!
//! # Data Requirements
//! - **Wavelength ordering**: strictly ascending, positive
//! - **Sample count**: at least two, equal for wavelength and transmission
//! - **Transmission**: a [0, 1] fraction by convention, not enforced
//!
//! Interpolation onto other grids is linear by default and returns 0.0
//! outside the sampled support. The interpolator is built lazily on first
//! use and reused for the lifetime of the curve.

use std::fmt;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use super::interpolation::{InterpolationKind, Interpolator};
use super::trapezoid::trap_integrate_with;
use crate::error::{PhotometryError, Result};
use crate::units::{Length, WavelengthUnit, Wavelengths};

/// Detector class of a filter, which selects the photometric integral weights.
///
/// Photon counters record a signal proportional to the photon rate (∝ λ·F_λ),
/// energy counters one proportional to F_λ itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DetectorType {
    EnergyCounter = 0,
    PhotonCounter = 1,
}

impl TryFrom<u8> for DetectorType {
    type Error = PhotometryError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(DetectorType::EnergyCounter),
            1 => Ok(DetectorType::PhotonCounter),
            other => Err(PhotometryError::InvalidInput(format!(
                "detector type marker must be 0 (energy counter) or 1 (photon counter), got {other}"
            ))),
        }
    }
}

impl From<DetectorType> for u8 {
    fn from(value: DetectorType) -> Self {
        value as u8
    }
}

impl fmt::Display for DetectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorType::EnergyCounter => f.write_str("energy counter"),
            DetectorType::PhotonCounter => f.write_str("photon counter"),
        }
    }
}

/// Wavelength-dependent filter transmission.
#[derive(Debug, Clone)]
pub struct TransmissionCurve {
    wavelength: Wavelengths,
    transmission: Vec<f64>,
    detector_type: DetectorType,
    interpolation_kind: InterpolationKind,
    interpolator: OnceCell<Interpolator>,
}

impl TransmissionCurve {
    /// Create a transmission curve from a wavelength grid and transmission samples.
    ///
    /// # Errors
    /// `InvalidInput` if
    /// - the sequences differ in length or hold fewer than two samples
    /// - wavelengths are not strictly ascending or not positive
    pub fn new(
        wavelength: Wavelengths,
        transmission: Vec<f64>,
        detector_type: DetectorType,
    ) -> Result<Self> {
        if wavelength.len() != transmission.len() {
            return Err(PhotometryError::InvalidInput(format!(
                "wavelength ({}) and transmission ({}) must have the same length",
                wavelength.len(),
                transmission.len()
            )));
        }

        if wavelength.len() < 2 {
            return Err(PhotometryError::InvalidInput(format!(
                "a transmission curve needs at least two samples, got {}",
                wavelength.len()
            )));
        }

        let values = wavelength.values();
        if values.iter().any(|w| !w.is_finite()) {
            return Err(PhotometryError::InvalidInput(
                "wavelengths must be finite".to_string(),
            ));
        }
        // Negated so NaN pairs fail the ordering check as well
        if values.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(PhotometryError::InvalidInput(
                "wavelengths must be in strictly ascending order".to_string(),
            ));
        }

        if !(values[0] > 0.0) {
            return Err(PhotometryError::InvalidInput(
                "wavelengths must be positive".to_string(),
            ));
        }

        Ok(Self {
            wavelength,
            transmission,
            detector_type,
            interpolation_kind: InterpolationKind::default(),
            interpolator: OnceCell::new(),
        })
    }

    /// Build a curve from raw wavelength values and a unit name as recorded
    /// in table metadata (e.g. `"Angstrom"`).
    ///
    /// # Errors
    /// `InvalidInput` if the unit is not recognised, plus everything [`Self::new`] rejects.
    pub fn from_table(
        wavelength: Vec<f64>,
        unit: &str,
        transmission: Vec<f64>,
        detector_type: DetectorType,
    ) -> Result<Self> {
        Self::new(
            Wavelengths::with_unit_str(wavelength, unit)?,
            transmission,
            detector_type,
        )
    }

    /// Use a different interpolation kind for [`Self::interpolate`].
    ///
    /// # Errors
    /// `Interpolation` if the curve has too few samples for `kind`.
    pub fn with_interpolation_kind(mut self, kind: InterpolationKind) -> Result<Self> {
        kind.check_len(self.transmission.len())?;
        self.interpolation_kind = kind;
        self.interpolator = OnceCell::new();
        Ok(self)
    }

    pub fn wavelength(&self) -> &Wavelengths {
        &self.wavelength
    }

    pub fn unit(&self) -> WavelengthUnit {
        self.wavelength.unit()
    }

    pub fn transmission(&self) -> &[f64] {
        &self.transmission
    }

    pub fn detector_type(&self) -> DetectorType {
        self.detector_type
    }

    pub fn interpolation_kind(&self) -> InterpolationKind {
        self.interpolation_kind
    }

    pub fn len(&self) -> usize {
        self.transmission.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transmission.is_empty()
    }

    /// First and last sampled wavelength, in the curve's unit.
    pub fn bounds(&self) -> (f64, f64) {
        let values = self.wavelength.values();
        (values[0], values[values.len() - 1])
    }

    fn interpolator(&self) -> &Interpolator {
        self.interpolator.get_or_init(|| {
            Interpolator::from_validated(
                self.wavelength.values().to_vec(),
                self.transmission.clone(),
                self.interpolation_kind,
            )
        })
    }

    /// Transmission on another wavelength grid.
    ///
    /// The target grid is converted to the curve's native unit first.
    /// Wavelengths outside the sampled range evaluate to exactly 0.0.
    pub fn interpolate(&self, target: &Wavelengths) -> Vec<f64> {
        let converted = target.values_in(self.unit());
        self.interpolator().evaluate_many(&converted)
    }

    /// Transmission at a single wavelength.
    pub fn at(&self, wavelength: Length) -> f64 {
        self.interpolator()
            .evaluate(self.unit().value_of(wavelength))
    }

    /// Trapezoid integral of `S(λ)·f(λ)` over the native grid.
    ///
    /// The wavelength passed to `f`, and the integration variable, are both in
    /// Angstrom so that integrals from curves in different units compare.
    pub fn integrate<F>(&self, f: F) -> f64
    where
        F: Fn(f64) -> f64,
    {
        let aa = self.wavelength.values_in(WavelengthUnit::Angstrom);
        trap_integrate_with(&aa, &self.transmission, |lambda, s| s * f(lambda))
    }
}
