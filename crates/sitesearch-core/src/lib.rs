//! sitesearch-core
//!
//! Data model, error taxonomy and collaborator traits shared by the index
//! backend (`sitesearch-text`) and the maintenance engine
//! (`sitesearch-engine`).

pub mod config;
pub mod entity;
pub mod error;
pub mod logging;
pub mod memory;
pub mod path;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
