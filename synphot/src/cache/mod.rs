//! Local cache of archive filter data
//!
//! [`FilterCache`] mirrors transmission tables from an [`ArchiveClient`] to
//! disk and reconciles them against the archive's master index.

pub mod archive;
pub mod filter_id;
pub mod state;
pub mod store;

pub use archive::{ArchiveClient, ArchiveError, IndexRow, StaticArchive, TransmissionTable};
pub use filter_id::FilterId;
pub use state::{CacheState, Staleness};
pub use store::{CacheConfig, FilterCache};
