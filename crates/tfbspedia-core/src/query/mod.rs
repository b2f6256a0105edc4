//! Query composition and input parsing.

mod builder;
mod parse;

pub use builder::{QueryBuilder, QueryPlan, SearchConstraint, StoreQuery};
pub use parse::{is_location, parse_batch_text, parse_search_query};
