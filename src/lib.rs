//! Field extraction from financial report text and chronological chart
//! series over collections of extracted reports.

pub mod acquire;
pub mod chart;
pub mod cli;
pub mod config;
pub mod engine;
pub mod fields;
pub mod merge;
pub mod metrics;
pub mod numeric;
pub mod period;
pub mod pipeline;
pub mod postprocess;
pub mod report;
pub mod semantic;
pub mod subprocess;
pub mod util;
