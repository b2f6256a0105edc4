//! API implementation submodules.
//!
//! Each submodule contains `impl TfbsApi` blocks. The struct itself lives in
//! `lib.rs`.

mod builder;
mod catalog;
mod search;

pub use builder::TfbsApiBuilder;
pub use catalog::ApiStatus;
