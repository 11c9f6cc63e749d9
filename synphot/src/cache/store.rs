//! On-disk filter cache.
//!
//! Layout under the cache root:
//!
//! ```text
//! <root>/svo_index.json                         archive index snapshot
//! <root>/cache_state.json                       last update date
//! <root>/<facility>/<instrument>/<name>.json    transmission tables
//! ```
//!
//! The root directory is created on first write, never at construction, and
//! nothing under it is removed except through [`FilterCache::update`] and the
//! explicit delete operations. Writes replace whole files; a single writer
//! is assumed.

use std::collections::{BTreeSet, HashSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};

use super::archive::{ArchiveClient, ArchiveError, IndexRow, TransmissionTable};
use super::filter_id::{FilterId, TABLE_EXTENSION};
use super::state::{rectify, CacheState, Staleness};
use crate::error::{PhotometryError, Result};

/// File name of the archive index snapshot
pub const INDEX_FILE: &str = "svo_index.json";

/// Environment variable overriding the cache root
pub const CACHE_DIR_ENV: &str = "SYNPHOT_CACHE_DIR";

/// Age after which the cache is reported as stale
pub const DEFAULT_STALE_AFTER_DAYS: i64 = 30;

/// Number of effective-wavelength batches used to fetch the index
pub const INDEX_BATCHES: usize = 25;

/// Lower edge (Angstrom) of the log-spaced batch bins
const BATCH_LOG_START_AA: f64 = 1e3;

const STARS: &str = "********************************************************************************";

/// Where the cache lives and when it counts as stale.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    pub root: PathBuf,
    pub stale_after_days: i64,
}

impl CacheConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            stale_after_days: DEFAULT_STALE_AFTER_DAYS,
        }
    }

    /// Resolve the cache root from `SYNPHOT_CACHE_DIR`, falling back to
    /// `$HOME/.cache/synphot/filters`.
    pub fn from_env() -> Self {
        if let Ok(dir) = env::var(CACHE_DIR_ENV) {
            return Self::new(dir);
        }
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Self::new(PathBuf::from(home).join(".cache").join("synphot").join("filters"))
    }

    pub fn with_stale_after_days(mut self, days: i64) -> Self {
        self.stale_after_days = days;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Local store of archive filter data.
#[derive(Debug, Clone)]
pub struct FilterCache {
    config: CacheConfig,
    show_progress: bool,
}

impl FilterCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            show_progress: true,
        }
    }

    /// Cache rooted at `root` with default settings.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self::new(CacheConfig::new(root))
    }

    /// Show or hide progress bars during bulk downloads.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn index_path(&self) -> PathBuf {
        self.root().join(INDEX_FILE)
    }

    pub fn table_path(&self, filter_id: &FilterId) -> PathBuf {
        self.root().join(filter_id.relative_path())
    }

    fn progress_bar(&self, len: usize, prefix: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        let style = ProgressStyle::default_bar()
            .template("{prefix} [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) ETA: {eta} {msg}")
            .map(|style| style.progress_chars("█▉▊▋▌▍▎▏ "))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb.set_prefix(prefix.to_string());
        pb
    }

    /// Fetch the archive's master filter list in effective-wavelength batches
    /// and store it at the cache root.
    ///
    /// Batches that match no filter contribute zero rows. Rows are kept in
    /// batch order; a filter sitting on a shared bin edge is kept once.
    pub fn download_index(&self, archive: &dyn ArchiveClient) -> Result<Vec<IndexRow>> {
        let (wave_min, wave_max) = archive.wavelength_eff_range()?;
        let bins = batch_edges(wave_min, wave_max, INDEX_BATCHES);
        info!(
            "Fetching archive filter index in {} batches ({:.2} - {:.2} AA)",
            INDEX_BATCHES, wave_min, wave_max
        );

        let pb = self.progress_bar(INDEX_BATCHES, "Batch");
        let mut seen = HashSet::new();
        let mut rows = Vec::new();
        for window in bins.windows(2) {
            let (lo, hi) = (window[0], window[1]);
            let fetched = match archive.filter_index(lo, hi) {
                Ok(batch) => batch,
                Err(ArchiveError::NoData(_)) => Vec::new(),
                Err(e) => {
                    pb.abandon();
                    return Err(e.into());
                }
            };
            let count = fetched.len();
            rows.extend(
                fetched
                    .into_iter()
                    .filter(|row| seen.insert(row.filter_id.clone())),
            );
            pb.set_message(format!("{count} filters in ({lo:.2}, {hi:.2}) AA"));
            pb.inc(1);
        }
        pb.finish_and_clear();

        fs::create_dir_all(self.root())?;
        fs::write(self.index_path(), serde_json::to_string_pretty(&rows)?)?;
        info!("Total {} filters in the archive index", rows.len());
        Ok(rows)
    }

    /// Fetch one filter's transmission table and store it in the cache.
    pub fn download_transmission(
        &self,
        archive: &dyn ArchiveClient,
        filter_id: &FilterId,
    ) -> Result<PathBuf> {
        let mut table = archive.transmission(filter_id)?;
        table.filter_id = filter_id.clone();

        let path = self.table_path(filter_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string(&table)?)?;
        debug!("Cached {} at {}", filter_id, path.display());
        Ok(path)
    }

    /// Download transmission tables, one filter at a time.
    ///
    /// With `None`, the index is fetched first and every filter in it is
    /// downloaded; if none fail, today is recorded as the update date.
    /// Per-filter failures are logged and returned, never raised.
    pub fn download_all(
        &self,
        archive: &dyn ArchiveClient,
        filter_ids: Option<&[FilterId]>,
    ) -> Result<Vec<String>> {
        let (ids, mut failed) = match filter_ids {
            Some(ids) => (ids.to_vec(), Vec::new()),
            None => {
                let rows = self.download_index(archive)?;
                parse_index_ids(&rows)
            }
        };

        info!("Caching transmission data for {} filters", ids.len());
        failed.extend(self.download_each(archive, &ids));

        if filter_ids.is_none() && failed.is_empty() {
            self.record_update(today())?;
        }
        Ok(failed)
    }

    fn download_each(&self, archive: &dyn ArchiveClient, ids: &[FilterId]) -> Vec<String> {
        let pb = self.progress_bar(ids.len(), "Filter ID");
        let mut failed = Vec::new();
        for id in ids {
            pb.set_message(id.svo_id());
            if let Err(e) = self.download_transmission(archive, id) {
                error!("Data for filter ID = {} could not be downloaded: {}", id, e);
                failed.push(id.svo_id());
            }
            pb.inc(1);
        }
        pb.finish_and_clear();
        failed
    }

    /// Bring the cache in line with the archive index.
    ///
    /// Cached filters missing from the fresh index are deleted, filters new to
    /// it are downloaded, the rest are left alone. The update date is
    /// recorded either way.
    ///
    /// # Returns
    /// `true` if anything was added or removed, `false` if already current
    pub fn update(&self, archive: &dyn ArchiveClient) -> Result<bool> {
        let old: BTreeSet<FilterId> = self.local_filter_ids()?.into_iter().collect();

        info!("Fetching latest archive filter index");
        let rows = self.download_index(archive)?;
        let (new_ids, invalid) = parse_index_ids(&rows);
        for raw in &invalid {
            warn!("Skipping malformed filter ID in archive index: {raw}");
        }
        let new: BTreeSet<FilterId> = new_ids.into_iter().collect();

        if old == new {
            info!("Filter data is already up-to-date");
            self.record_update(today())?;
            return Ok(false);
        }

        let to_remove: Vec<&FilterId> = old.difference(&new).collect();
        info!("Removing {} outdated filters", to_remove.len());
        for id in to_remove {
            let path = self.table_path(id);
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        self.remove_empty_dirs()?;

        let to_add: Vec<FilterId> = new.difference(&old).cloned().collect();
        info!("Caching {} new filters", to_add.len());
        let failed = self.download_each(archive, &to_add);
        if !failed.is_empty() {
            warn!(
                "{} of {} new filters failed to download: {}",
                failed.len(),
                to_add.len(),
                failed.join(", ")
            );
        }

        self.record_update(today())?;
        Ok(true)
    }

    /// Read the cached archive index.
    ///
    /// # Errors
    /// `IndexMissing` if the index has never been downloaded.
    pub fn load_index(&self) -> Result<Vec<IndexRow>> {
        let path = self.index_path();
        if !path.exists() {
            return Err(PhotometryError::IndexMissing(self.root().to_path_buf()));
        }
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }

    /// Read one cached transmission table.
    ///
    /// # Errors
    /// - `CacheDirMissing` if the cache root does not exist
    /// - `NotCached` if the index lists the filter but it was never downloaded
    /// - `NotFound` if the index does not list the filter either
    /// - `IndexMissing` if the filter is not cached and there is no index to consult
    pub fn load_transmission(&self, filter_id: &FilterId) -> Result<TransmissionTable> {
        if !self.root().is_dir() {
            return Err(PhotometryError::CacheDirMissing(self.root().to_path_buf()));
        }

        let path = self.table_path(filter_id);
        if path.exists() {
            return Ok(serde_json::from_str(&fs::read_to_string(path)?)?);
        }

        let listed = self
            .load_index()?
            .iter()
            .any(|row| row.id().map(|id| &id == filter_id).unwrap_or(false));
        if listed {
            Err(PhotometryError::NotCached {
                filter_id: filter_id.svo_id(),
                cache_dir: self.root().to_path_buf(),
            })
        } else {
            Err(PhotometryError::NotFound {
                filter_id: filter_id.svo_id(),
            })
        }
    }

    /// Identifiers of every transmission table present on disk, sorted.
    pub fn local_filter_ids(&self) -> Result<Vec<FilterId>> {
        if !self.root().is_dir() {
            return Ok(Vec::new());
        }
        let root = self.root().to_string_lossy();
        let pattern = format!("{}/*/*/*.{TABLE_EXTENSION}", glob::Pattern::escape(&root));
        let entries = glob::glob(&pattern)
            .map_err(|e| PhotometryError::InvalidInput(format!("bad cache glob {pattern}: {e}")))?;

        let mut ids = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    warn!("Skipping unreadable cache entry: {e}");
                    continue;
                }
            };
            match self.id_from_path(&path) {
                Some(id) => ids.push(id),
                None => warn!("Ignoring unexpected file in cache: {}", path.display()),
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn id_from_path(&self, path: &Path) -> Option<FilterId> {
        let relative = path.strip_prefix(self.root()).ok()?;
        let mut parts = relative.components().map(|c| c.as_os_str().to_string_lossy());
        let facility = parts.next()?;
        let instrument = parts.next()?;
        let file = parts.next()?;
        let name = file.strip_suffix(&format!(".{TABLE_EXTENSION}"))?;
        FilterId::new(facility.into_owned(), instrument.into_owned(), name).ok()
    }

    /// Remove one cached filter. Returns whether a file was removed.
    pub fn delete_filter(&self, filter_id: &FilterId) -> Result<bool> {
        let path = self.table_path(filter_id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        self.remove_empty_dirs()?;
        info!("Removed {} from the cache", filter_id);
        Ok(true)
    }

    /// Remove the whole cache directory.
    pub fn delete_all(&self) -> Result<()> {
        if self.root().exists() {
            fs::remove_dir_all(self.root())?;
            info!("Removed filter cache at {}", self.root().display());
        }
        Ok(())
    }

    /// Prune empty directories below the cache root (the root itself stays).
    pub fn remove_empty_dirs(&self) -> Result<()> {
        if self.root().is_dir() {
            prune_empty(self.root())?;
        }
        Ok(())
    }

    /// Record `date` as the last successful update.
    pub fn record_update(&self, date: NaiveDate) -> Result<()> {
        CacheState::for_date(date).save(self.root())
    }

    fn has_entries(&self) -> Result<bool> {
        if !self.root().is_dir() {
            return Ok(false);
        }
        Ok(fs::read_dir(self.root())?.next().is_some())
    }

    fn index_modified(&self) -> Option<NaiveDate> {
        let modified = fs::metadata(self.index_path()).ok()?.modified().ok()?;
        Some(DateTime::<Local>::from(modified).date_naive())
    }

    /// Last recorded update date, repairing an unusable record on the way.
    pub fn last_updated(&self) -> Result<Option<NaiveDate>> {
        self.last_updated_on(today())
    }

    fn last_updated_on(&self, today: NaiveDate) -> Result<Option<NaiveDate>> {
        let state = CacheState::load(self.root())?;
        let recorded = state.recorded_date();
        let outcome = rectify(&recorded, today, self.index_modified(), self.has_entries()?);

        if let Some(reason) = outcome.reason {
            error!(
                "\n{STARS}\n\nUnexpected cache update date: {reason}\n\nAssuming the \
                 modification date of the cached filter index instead\n\n{STARS}\n"
            );
            match outcome.date {
                Some(date) => {
                    if let Err(e) = self.record_update(date) {
                        warn!("Could not record the repaired cache update date: {e}");
                    }
                }
                None => warn!("No cached filter index to take a date from"),
            }
        }
        Ok(outcome.date)
    }

    /// How current the cache is, relative to the local date.
    pub fn check_staleness(&self) -> Result<Staleness> {
        self.check_staleness_on(today())
    }

    pub fn check_staleness_on(&self, today: NaiveDate) -> Result<Staleness> {
        let last = self.last_updated_on(today)?;
        Ok(Staleness::assess(
            last,
            today,
            self.config.stale_after_days,
            self.has_entries()?,
        ))
    }

    /// Log a prominent warning when the cache needs an update. Never fails
    /// because of staleness itself; errors come only from reading the cache.
    pub fn warn_if_stale(&self) -> Result<Staleness> {
        let staleness = self.check_staleness()?;
        match staleness {
            Staleness::Stale { age_days } => warn!(
                "\n{STARS}\n\nFilter cache at {} was last updated {age_days} days ago. Run \
                 FilterCache::update() to bring it in line with the archive\n\n{STARS}\n",
                self.root().display()
            ),
            Staleness::NeverUpdated => warn!(
                "\n{STARS}\n\nFilter cache at {} has never been fully updated. Run \
                 FilterCache::update() to bring it in line with the archive\n\n{STARS}\n",
                self.root().display()
            ),
            Staleness::Fresh { .. } | Staleness::Empty => {}
        }
        Ok(staleness)
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn parse_index_ids(rows: &[IndexRow]) -> (Vec<FilterId>, Vec<String>) {
    let mut ids = Vec::with_capacity(rows.len());
    let mut invalid = Vec::new();
    for row in rows {
        match row.id() {
            Ok(id) => ids.push(id),
            Err(_) => invalid.push(row.filter_id.clone()),
        }
    }
    (ids, invalid)
}

/// Bin edges for the batched index fetch.
///
/// Filters cluster heavily above 1000 AA, so edges are log-spaced from there
/// to `max`, and the first edge is pulled down to `min`. Ranges that do not
/// reach across 1000 AA are log-spaced over `[min, max]` directly.
pub(crate) fn batch_edges(min: f64, max: f64, batches: usize) -> Vec<f64> {
    let start = if min < BATCH_LOG_START_AA && max > BATCH_LOG_START_AA {
        BATCH_LOG_START_AA
    } else {
        min.max(f64::MIN_POSITIVE)
    };
    let (log_lo, log_hi) = (start.log10(), max.log10());
    let mut edges: Vec<f64> = (0..=batches)
        .map(|i| 10f64.powf(log_lo + (log_hi - log_lo) * i as f64 / batches as f64))
        .collect();
    edges[0] = min;
    edges[batches] = max;
    edges
}

fn prune_empty(dir: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            prune_empty(&path)?;
            if fs::read_dir(&path)?.next().is_none() {
                fs::remove_dir(&path)?;
            }
        }
    }
    Ok(())
}
