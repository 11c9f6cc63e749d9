//! Filter curves and synthetic photometry

pub mod calibration;
pub mod collection;
pub mod curve;
pub mod filters;
pub mod interpolation;
pub mod spectral_model;
pub mod spectrum;
pub mod trapezoid;

pub use calibration::{load_vega, read_calibration_spectrum, CalibrationConfig};
pub use collection::{AsymmetricUncertainty, FilterCollection, ObservedMagnitudeSet};
pub use curve::{DetectorType, TransmissionCurve};
pub use filters::{MagnitudeSystem, PhotometricFilter};
pub use interpolation::{InterpolationKind, Interpolator};
pub use spectral_model::{MagnitudeSpectralModel, SpectralModelOptions};
pub use spectrum::{blackbody_lambda, blackbody_spectrum, SampledSpectrum, CGS};
pub use trapezoid::trap_integrate;
