//! Core data types for advisories and queries.
//!
//! This module contains the fundamental types used throughout advisory-index:
//!
//! - [`OsvRecord`] - A raw record as it appears on disk (OSV schema)
//! - [`Advisory`] - The canonical, normalized advisory served to callers
//! - [`Ecosystem`] / [`SeverityLevel`] - Enumerated filter values
//! - [`AdvisoryListOptions`] / [`SearchOptions`] - Validated query options
//! - [`ListParams`] / [`SearchParams`] - Raw parameters from a transport
//!
//! # Example
//!
//! ```
//! use advisory_index::model::{Ecosystem, ListParams};
//!
//! let params = ListParams {
//!     ecosystem: Some("npm".to_string()),
//!     published: Some("2026-01-01..2026-01-31".to_string()),
//!     ..Default::default()
//! };
//! let options = params.validate().unwrap();
//! assert_eq!(options.ecosystem, Some(Ecosystem::Npm));
//! ```

mod advisory;
mod options;
mod osv;

pub use advisory::*;
pub use options::*;
pub use osv::*;
