//! Analysis modules.
//!
//! Aggregation of the selected sheet into averages, ratings and the grid.

pub mod aggregator;

pub use aggregator::*;
