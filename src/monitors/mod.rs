//! Metric analysis
//!
//! - [`baseline`]: adaptive per-metric reference values
//! - [`anomaly`]: spike detection against the baseline
//! - [`trend`]: drift classification against the baseline
//! - [`analysis`]: combines the three so the baseline is updated once per cycle
//! - [`patterns`]: repeated failure tracking
//! - [`collector`]: metric collection from the operating system

pub mod analysis;
pub mod anomaly;
pub mod baseline;
pub mod collector;
pub mod patterns;
pub mod trend;
