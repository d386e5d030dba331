//! Core types for the Timeline Flux pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: normalized visit/activity rows, map features and the legend.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pass-through scalar attribute (supports the shapes exports use for it)
///
/// Exports are inconsistent about `hierarchyLevel` and `probability`: some
/// write JSON numbers, others numeric strings. The value is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Integer(i64),
    Number(f64),
    Boolean(bool),
    Text(String),
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Integer(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Number(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Text(v.to_string())
    }
}

impl AttributeValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Integer(i) => Some(*i as f64),
            AttributeValue::Number(n) => Some(*n),
            AttributeValue::Text(s) => s.trim().parse().ok(),
            AttributeValue::Boolean(_) => None,
        }
    }

    /// Infer a value from a table cell, the way a CSV reader types a column:
    /// integer first, then float, then boolean, else text.
    pub fn from_cell(cell: &str) -> Self {
        if let Ok(i) = cell.parse::<i64>() {
            AttributeValue::Integer(i)
        } else if let Ok(n) = cell.parse::<f64>() {
            AttributeValue::Number(n)
        } else {
            match cell {
                "True" | "true" => AttributeValue::Boolean(true),
                "False" | "false" => AttributeValue::Boolean(false),
                _ => AttributeValue::Text(cell.to_string()),
            }
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Integer(i) => write!(f, "{i}"),
            AttributeValue::Number(n) => write!(f, "{n:?}"),
            AttributeValue::Boolean(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            AttributeValue::Text(s) => write!(f, "{s}"),
        }
    }
}

/// A stay at a place
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitRow {
    /// Start timestamp as found in the export (ISO-8601)
    pub start_time: Option<String>,
    /// End timestamp as found in the export (ISO-8601)
    pub end_time: Option<String>,
    /// Elapsed minutes, 2 decimals; absent unless both timestamps are present
    pub duration_minutes: Option<f64>,
    pub hierarchy_level: Option<AttributeValue>,
    #[serde(rename = "placeID")]
    pub place_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub probability: Option<AttributeValue>,
}

/// A movement between two locations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRow {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration_minutes: Option<f64>,
    /// Distance covered (meters, 2 decimals)
    pub distance_meters: Option<f64>,
    /// Movement category, e.g. `WALKING` or `IN_PASSENGER_VEHICLE`
    pub activity_type: Option<String>,
    pub start_latitude: Option<f64>,
    pub start_longitude: Option<f64>,
    pub end_latitude: Option<f64>,
    pub end_longitude: Option<f64>,
}

/// The two ordered datasets produced by normalization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedHistory {
    pub visits: Vec<VisitRow>,
    pub activities: Vec<ActivityRow>,
}

/// `[longitude, latitude]`, GeoJSON axis order
pub type Position = [f64; 2];

/// GeoJSON geometry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    LineString { coordinates: Vec<Position> },
}

/// Which dataset a feature was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Visit,
    Activity,
}

/// Path style consumed by the renderer's `style` callback
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathStyle {
    pub color: String,
}

/// Circle-marker options consumed by the renderer's `pointToLayer` callback
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IconStyle {
    pub fill_color: String,
    pub fill_opacity: f64,
    pub stroke: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureProperties {
    /// Animation timestamp (the row's start time)
    pub time: Option<String>,
    pub style: PathStyle,
    pub icon: String,
    pub iconstyle: IconStyle,
}

/// One time-tagged, styled element of the animated map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoFeature {
    #[serde(rename = "type")]
    pub feature_type: &'static str,
    /// `None` when the source row lacks coordinates; serialized as `null`
    pub geometry: Option<Geometry>,
    pub properties: FeatureProperties,
    #[serde(skip)]
    pub kind: FeatureKind,
}

/// GeoJSON FeatureCollection handed to the renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub collection_type: &'static str,
    pub features: Vec<GeoFeature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<GeoFeature>) -> Self {
        Self {
            collection_type: "FeatureCollection",
            features,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub category: String,
    pub color: String,
    pub count: usize,
}

/// Aggregate for every category outside the top entries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OtherEntry {
    pub color: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Legend {
    pub entries: Vec<LegendEntry>,
    pub other: Option<OtherEntry>,
}

/// Everything needed to render one animated map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineMap {
    /// `[latitude, longitude]` of the initial view
    pub center: [f64; 2],
    pub collection: FeatureCollection,
    pub legend: Legend,
    /// Category colors in first-encounter order
    pub category_colors: Vec<(String, String)>,
}
