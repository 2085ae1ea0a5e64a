//! Common types shared across the crate.
//!
//! - Configuration constants
//! - Error types
//! - Page identifiers

pub mod config;
pub mod error;
mod page_id;

pub use error::{Error, Result};
pub use page_id::PageId;
