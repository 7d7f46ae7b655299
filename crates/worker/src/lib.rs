//! `adfit-worker` -- batch eligibility scans over integration asset lists.
//!
//! Loads a scan file and the channel catalog, analyzes the assets in
//! bounded parallel partitions, and writes a report envelope.

pub mod config;
pub mod error;
pub mod runner;
pub mod scan;
