//! Pipeline orchestration
//!
//! This module provides the public API for timeline-flux.
//! It orchestrates the full pipeline from a raw location-history export to an
//! animated HTML map, with the normalized CSV tables as the hand-off point.

use crate::config::TimelineConfig;
use crate::encoder::MapEncoder;
use crate::error::TimelineError;
use crate::features::FeatureCollectionBuilder;
use crate::normalizer::{NormalizationReport, Normalizer};
use crate::schema::RawRecordAdapter;
use crate::table::{read_tables, write_tables};
use crate::types::{NormalizedHistory, TimelineMap};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Convert a raw location-history export into an animated HTML map.
///
/// Runs entirely in memory with the default configuration; no CSV tables
/// are written.
///
/// # Arguments
/// * `raw_json` - Location-history export (JSON array or NDJSON)
///
/// # Returns
/// Complete HTML document
///
/// # Example
/// ```ignore
/// let html = location_history_to_html(export_json)?;
/// std::fs::write("map.html", html)?;
/// ```
pub fn location_history_to_html(raw_json: String) -> Result<String, TimelineError> {
    let processor = TimelineProcessor::default();
    let (history, _) = processor.normalize(&raw_json)?;
    let map = processor.build(&history)?;
    processor.encode(&map)
}

/// What a render produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSummary {
    pub visits: usize,
    pub activities: usize,
    pub features: usize,
    pub categories: usize,
    pub center: [f64; 2],
    pub output_html: PathBuf,
}

/// What a full run produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub normalization: NormalizationReport,
    pub render: RenderSummary,
}

/// Processor holding one configuration for every pipeline stage.
///
/// Stages:
/// 1. RawRecordAdapter - Parse the export into raw records
/// 2. Normalizer - Produce visit and activity rows
/// 3. table - Persist the rows as CSV and read them back
/// 4. FeatureCollectionBuilder - Features, colors, legend and center
/// 5. MapEncoder - Encode the HTML document
#[derive(Debug, Clone, Default)]
pub struct TimelineProcessor {
    config: TimelineConfig,
}

impl TimelineProcessor {
    /// Create a processor; fails if the configuration is inconsistent
    pub fn new(config: TimelineConfig) -> Result<Self, TimelineError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Parse and normalize an export held in memory
    pub fn normalize(
        &self,
        raw_json: &str,
    ) -> Result<(NormalizedHistory, NormalizationReport), TimelineError> {
        let records = RawRecordAdapter::parse(raw_json)?;
        Normalizer::new(self.config.normalizer.clone()).normalize(records)
    }

    /// Parse and normalize an export file
    pub fn normalize_file(
        &self,
        path: &Path,
    ) -> Result<(NormalizedHistory, NormalizationReport), TimelineError> {
        let raw_json = fs::read_to_string(path)?;
        self.normalize(&raw_json)
    }

    /// Write both datasets to the configured CSV paths
    pub fn write_tables(&self, history: &NormalizedHistory) -> Result<(), TimelineError> {
        write_tables(
            history,
            &self.config.paths.visits_csv,
            &self.config.paths.activities_csv,
        )
    }

    /// Read both datasets from the configured CSV paths
    pub fn read_tables(&self) -> Result<NormalizedHistory, TimelineError> {
        read_tables(
            &self.config.paths.visits_csv,
            &self.config.paths.activities_csv,
        )
    }

    pub fn build(&self, history: &NormalizedHistory) -> Result<TimelineMap, TimelineError> {
        FeatureCollectionBuilder::new(self.config.builder.clone())
            .build(&history.visits, &history.activities)
    }

    pub fn encode(&self, map: &TimelineMap) -> Result<String, TimelineError> {
        MapEncoder::new(self.config.map.clone(), self.config.animation.clone()).encode(map)
    }

    /// CSV tables → HTML file
    pub fn render(&self) -> Result<RenderSummary, TimelineError> {
        let history = self.read_tables()?;
        let map = self.build(&history)?;
        let html = self.encode(&map)?;

        let output_html = self.config.paths.output_html.clone();
        fs::write(&output_html, html)?;
        info!(output = %output_html.display(), "wrote animated map");

        Ok(RenderSummary {
            visits: history.visits.len(),
            activities: history.activities.len(),
            features: map.collection.features.len(),
            categories: map.category_colors.len(),
            center: map.center,
            output_html,
        })
    }

    /// Export file → CSV tables → HTML file
    ///
    /// The builder consumes what was read back from the tables, never the
    /// in-memory rows, so a run and a later `render` see the same data.
    pub fn run(&self) -> Result<RunSummary, TimelineError> {
        let (history, normalization) = self.normalize_file(&self.config.paths.input)?;
        self.write_tables(&history)?;
        let render = self.render()?;
        Ok(RunSummary {
            normalization,
            render,
        })
    }
}
