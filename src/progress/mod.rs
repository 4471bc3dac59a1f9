//! Longitudinal rollups over stored measurements and the activity log.

pub mod aggregate;
pub mod config;
pub mod stats;
pub mod tracker;
pub mod trend;

pub use aggregate::Aggregator;
pub use config::ProgressConfig;
pub use tracker::ProgressTracker;
