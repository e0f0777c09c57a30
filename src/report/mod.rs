//! Report data layer
//!
//! Everything between the tabular source file and the rendered diagram:
//! - CSV ingest into validated records
//! - Flow graph construction (8-edge chain per record) + baseline totals
//! - Keyword filtering and (source, target, group) aggregation
//! - Node ordering, palette resolution, scale/highlight composition

pub mod diagram;
pub mod graph;
pub mod ingest;
pub mod palette;
