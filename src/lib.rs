//! Timeline Flux - Location-history export to animated time-lapse map
//!
//! Flux transforms a raw location-history export into an animated HTML map
//! through a deterministic pipeline: record parsing → normalization → CSV
//! tables → feature collection → HTML encoding.
//!
//! ## Modules
//!
//! - **Normalization**: Visits and activities with durations and decoded coordinates
//! - **Features**: Time-stamped GeoJSON features, category colors and the legend
//! - **Encoding**: Leaflet map replaying the features with a TimeDimension player

pub mod config;
pub mod encoder;
pub mod error;
pub mod features;
pub mod location;
pub mod normalizer;
pub mod palette;
pub mod pipeline;
pub mod schema;
pub mod table;
pub mod types;

pub use config::TimelineConfig;
pub use error::TimelineError;
pub use pipeline::{location_history_to_html, RunSummary, TimelineProcessor};

// Schema exports
pub use schema::{RawRecord, RawRecordAdapter, RecordKind};

/// Flux version embedded in generated documents
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for generated documents
pub const PRODUCER_NAME: &str = "timeline-flux";
