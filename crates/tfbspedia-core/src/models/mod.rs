//! Data models shared by the caches, the store and the search engines.

mod record;
mod search;
mod species;

pub use record::{CountEntry, ExportRow, RecordDetails, RecordId, RecordScores, TfbsRecord};
pub use search::{GenomicRegion, PageWindow, SearchPage, SearchTarget};
pub use species::{EvidenceType, Species};
