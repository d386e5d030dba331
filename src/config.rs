//! Pipeline configuration
//!
//! Every knob the pipeline exposes lives here: file locations, the palette and
//! its exhaustion policy, legend size, styling and animation settings. All
//! fields have defaults, so a config file only needs the values it overrides.

use crate::error::TimelineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Colors drawn for activity categories, in palette order
pub const DEFAULT_PALETTE: [&str; 13] = [
    "green",
    "orange",
    "purple",
    "cyan",
    "gray",
    "brown",
    "pink",
    "lightgreen",
    "red",
    "lightblue",
    "darkblue",
    "gold",
    "black",
];

/// Number of categories listed individually in the legend
pub const DEFAULT_LEGEND_TOP_N: usize = 5;

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub paths: PathConfig,
    pub normalizer: NormalizerConfig,
    pub builder: BuilderConfig,
    pub animation: AnimationConfig,
    pub map: MapConfig,
}

/// Input, intermediate and output file locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    pub input: PathBuf,
    pub visits_csv: PathBuf,
    pub activities_csv: PathBuf,
    pub output_html: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("location_history.json"),
            visits_csv: PathBuf::from("visits.csv"),
            activities_csv: PathBuf::from("activities.csv"),
            output_html: PathBuf::from("animated_time_lapse_with_speed.html"),
        }
    }
}

/// What to do with a record whose location string cannot be decoded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedLocationPolicy {
    /// Fail the whole run
    #[default]
    Abort,
    /// Drop the record, log a warning and count it in the report
    SkipRow,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub malformed_location: MalformedLocationPolicy,
}

/// What to do when more categories appear than the palette has colors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaletteExhaustion {
    /// Reuse palette colors in palette order
    #[default]
    Cycle,
    /// Derive a distinct hex color per overflow category
    Generate,
    /// Fail the build
    Fail,
}

/// What to center the map on when no visit carries coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroVisitsPolicy {
    /// Fail with `NoVisits`
    #[default]
    Fail,
    /// Use `fallback_center`
    Fallback,
}

/// Fixed style of visit markers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitStyle {
    pub color: String,
    pub fill_opacity: f64,
    pub radius: f64,
}

impl Default for VisitStyle {
    fn default() -> Self {
        Self {
            color: "blue".to_string(),
            fill_opacity: 0.6,
            radius: 5.0,
        }
    }
}

/// Style of activity lines; the color comes from the category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityStyle {
    pub fill_opacity: f64,
    pub radius: f64,
}

impl Default for ActivityStyle {
    fn default() -> Self {
        Self {
            fill_opacity: 0.1,
            radius: 3.0,
        }
    }
}

/// Feature Collection Builder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    pub palette: Vec<String>,
    pub palette_exhaustion: PaletteExhaustion,
    pub legend_top_n: usize,
    /// Swatch of the "Other" legend entry and color of uncategorized activities.
    /// Never drawn for a category, even when it is listed in `palette`.
    pub other_color: String,
    pub zero_visits: ZeroVisitsPolicy,
    /// `[latitude, longitude]`
    pub fallback_center: [f64; 2],
    pub visit_style: VisitStyle,
    pub activity_style: ActivityStyle,
    /// Fixes the color draw when set
    pub seed: Option<u64>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            palette_exhaustion: PaletteExhaustion::default(),
            legend_top_n: DEFAULT_LEGEND_TOP_N,
            other_color: "silver".to_string(),
            zero_visits: ZeroVisitsPolicy::default(),
            fallback_center: [0.0, 0.0],
            visit_style: VisitStyle::default(),
            activity_style: ActivityStyle::default(),
            seed: None,
        }
    }
}

/// Time slider and playback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub transition_time_ms: u32,
    #[serde(rename = "loop")]
    pub loop_playback: bool,
    pub auto_play: bool,
    pub time_slider_drag_update: bool,
    /// ISO-8601 duration between animation steps
    pub period: String,
    pub add_last_point: bool,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            transition_time_ms: 50,
            loop_playback: true,
            auto_play: true,
            time_slider_drag_update: true,
            period: "P1D".to_string(),
            add_last_point: true,
        }
    }
}

/// Base map settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub zoom_start: u8,
    pub tiles_url: String,
    pub attribution: String,
    pub legend_title: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            zoom_start: 4,
            tiles_url: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            attribution: "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors".to_string(),
            legend_title: "Activity Legend".to_string(),
        }
    }
}

impl TimelineConfig {
    /// Load a config from a JSON file and validate it
    pub fn from_json_file(path: &Path) -> Result<Self, TimelineError> {
        let content = fs::read_to_string(path)?;
        let config: TimelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values serde cannot check on its own
    pub fn validate(&self) -> Result<(), TimelineError> {
        let builder = &self.builder;

        if builder.legend_top_n == 0 {
            return Err(TimelineError::ConfigError(
                "legend_top_n must be at least 1".to_string(),
            ));
        }

        if builder.palette.is_empty() && builder.palette_exhaustion != PaletteExhaustion::Generate
        {
            return Err(TimelineError::ConfigError(
                "palette is empty; use palette_exhaustion = \"generate\" or list colors"
                    .to_string(),
            ));
        }

        for (name, opacity) in [
            ("visit_style.fill_opacity", builder.visit_style.fill_opacity),
            ("activity_style.fill_opacity", builder.activity_style.fill_opacity),
        ] {
            if !(0.0..=1.0).contains(&opacity) {
                return Err(TimelineError::ConfigError(format!(
                    "{name} must be within [0, 1], got {opacity}"
                )));
            }
        }

        if self.animation.transition_time_ms == 0 {
            return Err(TimelineError::ConfigError(
                "transition_time_ms must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
