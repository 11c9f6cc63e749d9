//! End-to-end cache behaviour against an in-memory archive.

use std::fs;

use synphot::cache::{
    ArchiveClient, FilterCache, FilterId, IndexRow, StaticArchive, TransmissionTable,
};
use synphot::photometry::DetectorType;
use synphot::{PhotometricFilter, PhotometryError};
use tempfile::TempDir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn table(id: &str, detector_type: DetectorType) -> TransmissionTable {
    TransmissionTable::new(
        id.parse().unwrap(),
        detector_type,
        vec![3000.0, 4000.0, 5000.0, 6000.0],
        vec![0.0, 0.6, 0.9, 0.0],
    )
}

fn quiet_cache(dir: &TempDir) -> FilterCache {
    FilterCache::at(dir.path().join("filters")).with_progress(false)
}

fn ids(cache: &FilterCache) -> Vec<String> {
    cache
        .local_filter_ids()
        .unwrap()
        .iter()
        .map(FilterId::svo_id)
        .collect()
}

#[test]
fn test_update_reconciles_added_and_removed_filters() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let cache = quiet_cache(&dir);

    let before = StaticArchive::new()
        .with_filter(table("Test/Cam.A", DetectorType::PhotonCounter), 100.0)
        .with_filter(table("Test/Cam.B", DetectorType::PhotonCounter), 150.0);
    assert!(cache.download_all(&before, None).unwrap().is_empty());
    assert_eq!(ids(&cache), vec!["Test/Cam.A", "Test/Cam.B"]);

    let a: FilterId = "Test/Cam.A".parse().unwrap();
    let b: FilterId = "Test/Cam.B".parse().unwrap();
    let a_path = cache.table_path(&a);
    assert!(a_path.is_file());

    // Mark the cached B so a re-download would be visible
    let mut marked = table("Test/Cam.B", DetectorType::PhotonCounter);
    marked.transmission = vec![0.0, 0.25, 0.25, 0.0];
    let marked_json = serde_json::to_string_pretty(&marked).unwrap();
    fs::write(cache.table_path(&b), &marked_json).unwrap();

    let after = StaticArchive::new()
        .with_filter(table("Test/Cam.B", DetectorType::PhotonCounter), 150.0)
        .with_filter(table("Test/Cam.C", DetectorType::EnergyCounter), 200.0);

    assert!(cache.update(&after).unwrap());
    assert_eq!(ids(&cache), vec!["Test/Cam.B", "Test/Cam.C"]);
    assert!(!a_path.exists());
    assert_eq!(fs::read_to_string(cache.table_path(&b)).unwrap(), marked_json);
    assert_eq!(cache.load_transmission(&b).unwrap().transmission, vec![0.0, 0.25, 0.25, 0.0]);

    // Nothing left to reconcile
    assert!(!cache.update(&after).unwrap());
    assert_eq!(ids(&cache), vec!["Test/Cam.B", "Test/Cam.C"]);
    assert!(cache.last_updated().unwrap().is_some());
}

#[test]
fn test_update_prunes_emptied_directories() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let cache = quiet_cache(&dir);

    let before = StaticArchive::new()
        .with_filter(table("Old/Instrument.X", DetectorType::PhotonCounter), 5000.0)
        .with_filter(table("Generic/Bessell.V", DetectorType::EnergyCounter), 5500.0);
    cache.download_all(&before, None).unwrap();
    assert!(cache.root().join("Old/Instrument").is_dir());

    let after =
        StaticArchive::new().with_filter(table("Generic/Bessell.V", DetectorType::EnergyCounter), 5500.0);
    assert!(cache.update(&after).unwrap());
    assert!(!cache.root().join("Old").exists());
}

#[test]
fn test_not_found_versus_not_cached() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let cache = quiet_cache(&dir);

    let listed_only: FilterId = "HST/WFPC2.F218W".parse().unwrap();
    let archive = StaticArchive::new()
        .with_filter(table("Generic/Bessell.B", DetectorType::PhotonCounter), 4400.0)
        .with_index_row(IndexRow::new(&listed_only, 2180.0));

    cache.download_index(&archive).unwrap();

    match PhotometricFilter::load(&cache, "HST.WFPC2/F218W") {
        Err(PhotometryError::NotCached { filter_id, .. }) => assert_eq!(filter_id, "HST/WFPC2.F218W"),
        other => panic!("expected NotCached, got {other:?}"),
    }
    match PhotometricFilter::load(&cache, "Nowhere/Nothing.None") {
        Err(e @ PhotometryError::NotFound { .. }) => {
            assert!(e.to_string().contains("download_index"));
        }
        other => panic!("expected NotFound, got {other:?}"),
    }

    let err = PhotometricFilter::load(&cache, "HST/WFPC2.F218W").unwrap_err();
    assert!(err.to_string().contains("download_transmission"));
}

#[test]
fn test_load_roundtrip_preserves_curve_and_detector() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let cache = quiet_cache(&dir);
    let archive = StaticArchive::new()
        .with_filter(table("Generic/Bessell.B", DetectorType::PhotonCounter), 4400.0)
        .with_filter(table("Generic/Bessell.V", DetectorType::EnergyCounter), 5500.0);
    cache.download_all(&archive, None).unwrap();

    let b = PhotometricFilter::load(&cache, "Generic/Bessell/B").unwrap();
    assert_eq!(b.detector_type(), DetectorType::PhotonCounter);
    assert_eq!(b.transmission(), &[0.0, 0.6, 0.9, 0.0]);
    assert_eq!(b.filter_id().unwrap().svo_id(), "Generic/Bessell.B");

    let v = PhotometricFilter::load(&cache, "Generic.Bessell.V").unwrap();
    assert_eq!(v.detector_type(), DetectorType::EnergyCounter);

    let listing = PhotometricFilter::list_filters(&cache).unwrap();
    assert_eq!(listing.len(), 2);
}

#[test]
fn test_nanometer_table_keeps_its_unit() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let cache = quiet_cache(&dir);

    let mut nm = TransmissionTable::new(
        "Test/Nano.G".parse().unwrap(),
        DetectorType::PhotonCounter,
        vec![400.0, 500.0, 600.0],
        vec![0.0, 1.0, 0.0],
    );
    nm.wavelength_unit = synphot::WavelengthUnit::Nanometer;
    let archive = StaticArchive::new().with_filter(nm, 5000.0);
    cache.download_all(&archive, None).unwrap();

    let filter = PhotometricFilter::load(&cache, "Test/Nano.G").unwrap();
    assert_eq!(filter.curve().unit(), synphot::WavelengthUnit::Nanometer);
    let pivot = synphot::LengthExt::as_angstroms(&filter.pivot_wavelength());
    assert!((pivot - 5000.0).abs() < 50.0, "pivot {pivot}");
}

#[test]
fn test_archive_failures_are_collected() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let cache = quiet_cache(&dir);
    let archive = StaticArchive::new()
        .with_filter(table("Generic/Bessell.B", DetectorType::PhotonCounter), 4400.0)
        .with_index_row(IndexRow::new(&"Generic/Bessell.R".parse().unwrap(), 6400.0))
        .with_index_row(IndexRow::new(&"Generic/Bessell.I".parse().unwrap(), 7900.0));

    let failed = cache.download_all(&archive, None).unwrap();
    assert_eq!(failed, vec!["Generic/Bessell.R", "Generic/Bessell.I"]);
    assert_eq!(ids(&cache), vec!["Generic/Bessell.B"]);
    assert!(archive.transmission(&"Generic/Bessell.R".parse().unwrap()).is_err());
}

#[test]
fn test_update_keeps_going_past_failed_downloads() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let cache = quiet_cache(&dir);

    let before =
        StaticArchive::new().with_filter(table("Test/Cam.A", DetectorType::PhotonCounter), 100.0);
    cache.download_all(&before, None).unwrap();

    let after = StaticArchive::new()
        .with_filter(table("Test/Cam.A", DetectorType::PhotonCounter), 100.0)
        .with_filter(table("Test/Cam.C", DetectorType::PhotonCounter), 200.0)
        .with_index_row(IndexRow::new(&"Test/Cam.D".parse().unwrap(), 300.0));

    assert!(cache.update(&after).unwrap());
    assert_eq!(ids(&cache), vec!["Test/Cam.A", "Test/Cam.C"]);
    assert!(matches!(
        PhotometricFilter::load(&cache, "Test/Cam.D"),
        Err(PhotometryError::NotCached { .. })
    ));
}
