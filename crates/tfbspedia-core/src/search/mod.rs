//! Search orchestration: single-target, batch, and export.

mod batch;
mod engine;
mod export;

pub use batch::{BatchRequest, BatchSearchEngine, BatchUniverse};
pub use engine::SearchEngine;
pub use export::{retain_chromosome, write_export_csv, EXPORT_HEADER};
