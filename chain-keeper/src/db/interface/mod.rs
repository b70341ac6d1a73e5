//! High-level interfaces for interacting with keeper database tables

pub mod monitored_pairs;
pub mod pair_metrics;
pub mod scan_cursor;
