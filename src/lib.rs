//! Library exports for the dashboard engine, its tools, benchmarks and tests.
/// Application directory resolution.
pub mod app_dirs;
/// Threshold calibration service and its observers.
pub mod calibration;
/// Persisted settings.
pub mod config;
/// Employee records and population loading.
pub mod employees;
/// Cascading facet filters.
pub mod filter;
/// Logging setup.
pub mod logging;
/// Risk tiers and threshold sets.
pub mod risk;
/// Sorted and derived list views.
pub mod view;
