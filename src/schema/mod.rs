//! Raw location-history schema
//!
//! This module defines the export's record shapes and the adapter that reads
//! and validates them.

mod adapter;
mod raw_record;

pub use adapter::*;
pub use raw_record::*;
