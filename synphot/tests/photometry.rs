//! Synthetic photometry from cached filters through to magnitude sets.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use approx::assert_relative_eq;
use synphot::cache::{FilterCache, StaticArchive, TransmissionTable};
use synphot::photometry::{
    blackbody_spectrum, read_calibration_spectrum, DetectorType, SampledSpectrum,
};
use synphot::units::{Temperature, TemperatureExt};
use synphot::{
    FilterCollection, Length, LengthExt, MagnitudeSpectralModel, MagnitudeSystem,
    ObservedMagnitudeSet, PhotometricFilter, PhotometryError, Wavelengths,
};
use tempfile::TempDir;

const IDS: [&str; 3] = ["Generic/Bessell.B", "Generic/Bessell.V", "Generic/Bessell.R"];

fn ten_parsecs() -> Length {
    Length::new::<uom::si::length::centimeter>(10.0 * 3.085_677_581_491_367_3e18)
}

fn box_table(id: &str, center_aa: f64, half_width_aa: f64) -> TransmissionTable {
    let lo = center_aa - half_width_aa;
    let hi = center_aa + half_width_aa;
    TransmissionTable::new(
        id.parse().unwrap(),
        DetectorType::PhotonCounter,
        vec![lo - 10.0, lo, center_aa, hi, hi + 10.0],
        vec![0.0, 1.0, 1.0, 1.0, 0.0],
    )
}

fn populated_cache(dir: &TempDir) -> FilterCache {
    let cache = FilterCache::at(dir.path().join("filters")).with_progress(false);
    let archive = StaticArchive::new()
        .with_filter(box_table(IDS[0], 4400.0, 450.0), 4400.0)
        .with_filter(box_table(IDS[1], 5500.0, 450.0), 5500.0)
        .with_filter(box_table(IDS[2], 6500.0, 700.0), 6500.0);
    assert!(cache.download_all(&archive, None).unwrap().is_empty());
    cache
}

fn vega_grid() -> Wavelengths {
    Wavelengths::angstrom((0..=3000).map(|i| 2000.0 + 2.0 * i as f64).collect())
}

/// A stand-in Vega: a 9600 K blackbody scaled to ~3.6e-9 erg/s/cm²/Å at 5500 Å
fn write_vega_csv(path: &Path) -> SampledSpectrum {
    let bb = blackbody_spectrum(
        Temperature::from_kelvin(9600.0),
        Length::new::<uom::si::length::meter>(1.0),
        ten_parsecs(),
        2000.0,
        8002.0,
        2.0,
    )
    .unwrap();
    let at_5500 = bb.flux()[(5500.0 - 2000.0) as usize / 2];
    let vega = bb.scaled(3.6e-9 / at_5500);

    let mut csv = String::from("# synthetic reference\nwavelength,flux\n");
    for (w, f) in vega.wavelength().values().iter().zip(vega.flux()) {
        csv.push_str(&format!("{w},{f:e}\n"));
    }
    fs::write(path, csv).unwrap();
    vega
}

#[test]
fn test_vega_magnitudes_of_reference_are_zero() {
    let dir = TempDir::new().unwrap();
    let cache = populated_cache(&dir);
    let vega_path = dir.path().join("alpha_lyr_mod_002.csv");
    write_vega_csv(&vega_path);

    for id in IDS {
        let filter = PhotometricFilter::load(&cache, id)
            .unwrap()
            .with_vega_path(&vega_path);
        let vega = read_calibration_spectrum(&vega_path).unwrap();
        assert_relative_eq!(filter.vega_magnitude(&vega).unwrap(), 0.0, epsilon = 1e-10);
        assert!(filter.zp_vega_f_lambda().unwrap() > 0.0);
    }
}

#[test]
fn test_ab_and_vega_offsets_are_consistent() {
    let dir = TempDir::new().unwrap();
    let cache = populated_cache(&dir);
    let vega = Arc::new(write_vega_csv(&dir.path().join("vega.csv")));
    let filters = FilterCollection::from_ids(&cache, &IDS)
        .unwrap()
        .with_vega_spectrum(Arc::clone(&vega));

    let source = blackbody_spectrum(
        Temperature::from_kelvin(5800.0),
        Length::new::<uom::si::length::meter>(6.957e8),
        ten_parsecs(),
        2000.0,
        8002.0,
        2.0,
    )
    .unwrap();

    let ab = filters.ab_magnitudes(&source).unwrap();
    let vega_mags = filters.vega_magnitudes(&source).unwrap();
    let vega_ab = filters.ab_magnitudes(&vega).unwrap();

    // m_AB - m_Vega equals the AB magnitude of Vega, independent of the source
    for ((m_ab, m_vega), offset) in ab.iter().zip(&vega_mags).zip(&vega_ab) {
        assert_relative_eq!(m_ab - m_vega, *offset, epsilon = 1e-9);
    }
    // The Sun at 10 pc is roughly V = 4.8
    assert!((vega_mags[1] - 4.8).abs() < 0.5, "V = {}", vega_mags[1]);
}

#[test]
fn test_magnitude_set_to_spectral_model() {
    let dir = TempDir::new().unwrap();
    let cache = populated_cache(&dir);
    let vega = Arc::new(write_vega_csv(&dir.path().join("vega.csv")));

    let filters = FilterCollection::from_ids(&cache, &IDS)
        .unwrap()
        .with_vega_spectrum(vega);
    let set = ObservedMagnitudeSet::new(filters, vec![1.0, 1.0, 1.0], Some(vec![0.1, 0.1, 0.2]))
        .unwrap();

    let model = MagnitudeSpectralModel::new(set, MagnitudeSystem::Vega).unwrap();
    assert_eq!(model.knots().len(), 5);
    let uncertainty = model.flux_uncertainty().unwrap();
    assert!(uncertainty
        .negative
        .iter()
        .zip(&uncertainty.positive)
        .all(|(n, p)| n > p));

    let pivots: Vec<f64> = model
        .magnitude_set()
        .filters()
        .pivot_wavelengths()
        .iter()
        .map(|p| p.as_angstroms())
        .collect();
    assert_eq!(&model.knots().values()[1..4], pivots.as_slice());
}

#[test]
fn test_collection_surfaces_first_load_error() {
    let dir = TempDir::new().unwrap();
    let cache = populated_cache(&dir);
    let result = FilterCollection::from_ids(&cache, &["Generic/Bessell.B", "Generic/Bessell.Z"]);
    assert!(matches!(result, Err(PhotometryError::NotFound { .. })));
}

#[test]
fn test_missing_vega_names_download_location() {
    let dir = TempDir::new().unwrap();
    let cache = populated_cache(&dir);
    let filter = PhotometricFilter::load(&cache, IDS[1])
        .unwrap()
        .with_vega_path(dir.path().join("calibration/alpha_lyr_mod_002.csv"));

    let err = filter.vega_magnitude(&SampledSpectrum::flat(vega_grid(), 1e-9)).unwrap_err();
    assert!(matches!(err, PhotometryError::MissingReferenceFile { .. }));
    assert!(err.to_string().contains("ftp://ftp.stsci.edu/cdbs/calspec"));

    // AB photometry is unaffected
    let m = filter.ab_magnitude(&SampledSpectrum::flat(vega_grid(), 1e-9)).unwrap();
    assert!(m.is_finite());
}
