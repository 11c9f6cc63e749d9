//! Inspect and maintain the local filter cache
//!
//! Offline tool: it reads what is already cached, reports photometric
//! properties of cached filters, checks cache staleness and deletes entries.
//! Fetching from the archive is done through the library with an
//! `ArchiveClient` implementation.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use log::warn;
use synphot::cache::{CacheConfig, FilterCache, FilterId, Staleness};
use synphot::units::LengthExt;
use synphot::PhotometricFilter;

#[derive(Parser, Debug)]
#[command(name = "synphot-filters")]
#[command(about = "Inspect and maintain the local photometric filter cache")]
#[command(version)]
struct Args {
    /// Cache directory (defaults to $SYNPHOT_CACHE_DIR, then ~/.cache/synphot/filters)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List cached filters (or the cached archive index with --index)
    List {
        /// List every filter in the cached archive index instead
        #[arg(long)]
        index: bool,
    },

    /// Show photometric properties of a cached filter
    Info {
        /// Filter ID, e.g. HST/WFPC2.F218W
        filter_id: String,
    },

    /// Report when the cache was last updated and whether it is stale
    Status,

    /// Delete one cached filter, or the whole cache with --all
    Delete {
        /// Filter ID to delete
        filter_id: Option<String>,

        /// Delete the entire cache directory
        #[arg(long, conflicts_with = "filter_id")]
        all: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = match args.cache_dir {
        Some(dir) => CacheConfig::new(dir),
        None => CacheConfig::from_env(),
    };
    let cache = FilterCache::new(config);

    // Staleness is advisory; a cache that cannot be inspected still runs the command
    let staleness = match cache.warn_if_stale() {
        Ok(staleness) => Some(staleness),
        Err(e) => {
            warn!("Could not check filter cache staleness: {e}");
            None
        }
    };

    match args.command {
        Command::List { index } => list(&cache, index),
        Command::Info { filter_id } => info(&cache, &filter_id),
        Command::Status => status(&cache, staleness),
        Command::Delete { filter_id, all } => delete(&cache, filter_id, all),
    }
}

fn list(cache: &FilterCache, index: bool) -> Result<()> {
    if index {
        let rows = PhotometricFilter::list_filters(cache)?;
        for row in &rows {
            println!("{:<40} {:>12.2} AA", row.filter_id, row.wavelength_eff);
        }
        println!("{} filters in the archive index", rows.len());
    } else {
        let ids = cache.local_filter_ids()?;
        for id in &ids {
            println!("{}", id.svo_id());
        }
        println!("{} filters cached in {}", ids.len(), cache.root().display());
    }
    Ok(())
}

fn info(cache: &FilterCache, filter_id: &str) -> Result<()> {
    let filter = PhotometricFilter::load(cache, filter_id)?;
    let (lo, hi) = filter.curve().bounds();

    println!("Filter:                {filter_id}");
    println!("Detector type:         {}", filter.detector_type());
    println!(
        "Samples:               {} ({lo} - {hi} {})",
        filter.curve().len(),
        filter.curve().unit()
    );
    println!(
        "Pivot wavelength:      {:.2} AA",
        filter.pivot_wavelength().as_angstroms()
    );
    println!(
        "Weighted average:      {:.2} AA",
        filter.weighted_average_wavelength().as_angstroms()
    );
    println!(
        "Bandpass (1%-99%):     {:.2} - {:.2} AA",
        filter.wavelength_start().as_angstroms(),
        filter.wavelength_end().as_angstroms()
    );
    println!(
        "AB zero point:         {:.4e} erg/s/cm^2/AA",
        filter.zp_ab_f_lambda()
    );
    match filter.zp_vega_f_lambda() {
        Ok(zp) => println!("Vega zero point:       {zp:.4e} erg/s/cm^2/AA"),
        Err(e) => println!("Vega zero point:       unavailable ({e})"),
    }
    Ok(())
}

fn status(cache: &FilterCache, staleness: Option<Staleness>) -> Result<()> {
    println!("Cache directory: {}", cache.root().display());
    let Some(staleness) = staleness else {
        println!("Cache state could not be read");
        return Ok(());
    };
    match staleness {
        Staleness::Empty => println!("Cache is empty"),
        Staleness::NeverUpdated => println!("Cache has never been fully updated"),
        Staleness::Fresh { age_days } | Staleness::Stale { age_days } => println!(
            "Last updated {age_days} days ago (stale after {} days)",
            cache.config().stale_after_days
        ),
    }
    if staleness.needs_update() {
        println!("Run FilterCache::update() against the archive to refresh it");
    }
    println!("{} filters cached", cache.local_filter_ids()?.len());
    Ok(())
}

fn delete(cache: &FilterCache, filter_id: Option<String>, all: bool) -> Result<()> {
    if all {
        cache.delete_all()?;
        println!("Removed {}", cache.root().display());
        return Ok(());
    }
    let Some(raw) = filter_id else {
        bail!("give a filter ID to delete, or --all to delete the whole cache");
    };
    let id: FilterId = raw.parse()?;
    if cache.delete_filter(&id)? {
        println!("Removed {}", id.svo_id());
    } else {
        println!("{} is not cached", id.svo_id());
    }
    Ok(())
}
