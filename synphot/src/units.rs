//! Type-safe physical units for wavelength grids
//!
//! Wavelengths travel through the crate as a [`Wavelengths`] grid: raw
//! samples plus the [`WavelengthUnit`] they are expressed in. Conversions
//! between units go through `uom` lengths so the scale factors live in one
//! place, and a grid without a recognised unit cannot be constructed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uom::si::length::{angstrom, centimeter, meter, micrometer, nanometer};
use uom::si::thermodynamic_temperature::kelvin;

use crate::error::PhotometryError;

/// Type alias for length measurements with convenient methods
pub type Length = uom::si::f64::Length;

/// Type alias for temperature with convenient methods
pub type Temperature = uom::si::f64::ThermodynamicTemperature;

/// Extension trait for length conversions commonly used for wavelengths
pub trait LengthExt {
    /// Create length from Angstroms
    fn from_angstroms(aa: f64) -> Self;

    /// Get length in Angstroms
    fn as_angstroms(&self) -> f64;

    /// Create length from nanometers
    fn from_nanometers(nm: f64) -> Self;

    /// Get length in nanometers
    fn as_nanometers(&self) -> f64;

    /// Create length from micrometers
    fn from_micrometers(um: f64) -> Self;

    /// Get length in micrometers
    fn as_micrometers(&self) -> f64;

    /// Get length in centimeters
    fn as_centimeters(&self) -> f64;
}

/// Extension trait for temperature conversions
pub trait TemperatureExt {
    /// Create temperature from Kelvin
    fn from_kelvin(kelvin: f64) -> Self;

    /// Get temperature in Kelvin
    fn as_kelvin(&self) -> f64;
}

impl LengthExt for Length {
    fn from_angstroms(aa: f64) -> Self {
        Length::new::<angstrom>(aa)
    }

    fn as_angstroms(&self) -> f64 {
        self.get::<angstrom>()
    }

    fn from_nanometers(nm: f64) -> Self {
        Length::new::<nanometer>(nm)
    }

    fn as_nanometers(&self) -> f64 {
        self.get::<nanometer>()
    }

    fn from_micrometers(um: f64) -> Self {
        Length::new::<micrometer>(um)
    }

    fn as_micrometers(&self) -> f64 {
        self.get::<micrometer>()
    }

    fn as_centimeters(&self) -> f64 {
        self.get::<centimeter>()
    }
}

impl TemperatureExt for Temperature {
    fn from_kelvin(k: f64) -> Self {
        Temperature::new::<kelvin>(k)
    }

    fn as_kelvin(&self) -> f64 {
        self.get::<kelvin>()
    }
}

/// Physical unit attached to a wavelength grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WavelengthUnit {
    #[default]
    Angstrom,
    Nanometer,
    Micrometer,
    Centimeter,
    Meter,
}

impl WavelengthUnit {
    /// Wrap a raw value expressed in this unit as a `Length`.
    pub fn to_length(self, value: f64) -> Length {
        match self {
            WavelengthUnit::Angstrom => Length::new::<angstrom>(value),
            WavelengthUnit::Nanometer => Length::new::<nanometer>(value),
            WavelengthUnit::Micrometer => Length::new::<micrometer>(value),
            WavelengthUnit::Centimeter => Length::new::<centimeter>(value),
            WavelengthUnit::Meter => Length::new::<meter>(value),
        }
    }

    /// Express a `Length` as a raw value in this unit.
    pub fn value_of(self, length: Length) -> f64 {
        match self {
            WavelengthUnit::Angstrom => length.get::<angstrom>(),
            WavelengthUnit::Nanometer => length.get::<nanometer>(),
            WavelengthUnit::Micrometer => length.get::<micrometer>(),
            WavelengthUnit::Centimeter => length.get::<centimeter>(),
            WavelengthUnit::Meter => length.get::<meter>(),
        }
    }

    /// Convert a raw value from this unit into `target`.
    ///
    /// Identical units return the value untouched so that grids which are
    /// already in the right unit keep their exact sample values.
    pub fn convert(self, value: f64, target: WavelengthUnit) -> f64 {
        if self == target {
            value
        } else {
            target.value_of(self.to_length(value))
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            WavelengthUnit::Angstrom => "Angstrom",
            WavelengthUnit::Nanometer => "nm",
            WavelengthUnit::Micrometer => "um",
            WavelengthUnit::Centimeter => "cm",
            WavelengthUnit::Meter => "m",
        }
    }
}

impl fmt::Display for WavelengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for WavelengthUnit {
    type Err = PhotometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "angstrom" | "angstroms" | "aa" | "a" | "å" => Ok(WavelengthUnit::Angstrom),
            "nm" | "nanometer" | "nanometers" => Ok(WavelengthUnit::Nanometer),
            "um" | "µm" | "micron" | "microns" | "micrometer" | "micrometers" => {
                Ok(WavelengthUnit::Micrometer)
            }
            "cm" | "centimeter" | "centimeters" => Ok(WavelengthUnit::Centimeter),
            "m" | "meter" | "meters" => Ok(WavelengthUnit::Meter),
            other => Err(PhotometryError::InvalidInput(format!(
                "unrecognised wavelength unit '{other}'; use Angstrom, nm, um, cm or m"
            ))),
        }
    }
}

/// A sequence of wavelength samples together with their unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wavelengths {
    values: Vec<f64>,
    unit: WavelengthUnit,
}

impl Wavelengths {
    pub fn new(values: Vec<f64>, unit: WavelengthUnit) -> Self {
        Self { values, unit }
    }

    pub fn angstrom(values: Vec<f64>) -> Self {
        Self::new(values, WavelengthUnit::Angstrom)
    }

    pub fn nanometer(values: Vec<f64>) -> Self {
        Self::new(values, WavelengthUnit::Nanometer)
    }

    /// Build a grid from a raw unit string, as recorded in table metadata.
    pub fn with_unit_str(values: Vec<f64>, unit: &str) -> Result<Self, PhotometryError> {
        Ok(Self::new(values, unit.parse()?))
    }

    /// Build a grid from typed lengths, expressed in `unit`.
    pub fn from_lengths(lengths: &[Length], unit: WavelengthUnit) -> Self {
        Self::new(lengths.iter().map(|&l| unit.value_of(l)).collect(), unit)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn unit(&self) -> WavelengthUnit {
        self.unit
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw values converted into `unit`.
    pub fn values_in(&self, unit: WavelengthUnit) -> Vec<f64> {
        self.values
            .iter()
            .map(|&v| self.unit.convert(v, unit))
            .collect()
    }

    /// The same grid re-expressed in `unit`.
    pub fn to(&self, unit: WavelengthUnit) -> Wavelengths {
        Wavelengths::new(self.values_in(unit), unit)
    }

    pub fn lengths(&self) -> Vec<Length> {
        self.values
            .iter()
            .map(|&v| self.unit.to_length(v))
            .collect()
    }
}
