//! sitesearch-text
//!
//! Tantivy-backed implementation of the index backend traits: schema and
//! analyzer in `tantivy_utils`, writer lifecycle in `index`, point-in-time
//! searchers in `search`.

pub mod tantivy_utils;
pub mod index;
pub mod search;

pub use index::{TantivyBackend, TantivyIndexWriter};
pub use search::TantivyIndexSearcher;
