//! Sorted, version-stamped views over the filtered employee list.
//!
//! Windowing (which rows are on screen) belongs to the renderer; this module
//! only guarantees a fully materialized order per threshold version.

mod derived;
mod sort;

pub use derived::{DerivedView, DerivedViewCache, RiskSummary};
pub use sort::{SortDirection, SortField, SortSpec, SortedRows, sort, sort_rows};
