//! HTML encoding
//!
//! This module encodes a built timeline map into a single HTML document:
//! a Leaflet base map, a Leaflet.TimeDimension layer replaying the feature
//! collection, and a fixed-position legend overlay.

use crate::config::{AnimationConfig, MapConfig};
use crate::error::TimelineError;
use crate::types::{Legend, TimelineMap};
use crate::{FLUX_VERSION, PRODUCER_NAME};
use std::fmt::Write;
use uuid::Uuid;

const LEAFLET_CSS: &str = "https://cdn.jsdelivr.net/npm/leaflet@1.9.3/dist/leaflet.css";
const LEAFLET_JS: &str = "https://cdn.jsdelivr.net/npm/leaflet@1.9.3/dist/leaflet.js";
const ISO8601_JS: &str =
    "https://cdn.jsdelivr.net/npm/iso8601-js-period@0.2.1/iso8601.min.js";
const TIME_DIMENSION_CSS: &str =
    "https://cdn.jsdelivr.net/npm/leaflet-timedimension@1.1.1/dist/leaflet.timedimension.control.css";
const TIME_DIMENSION_JS: &str =
    "https://cdn.jsdelivr.net/npm/leaflet-timedimension@1.1.1/dist/leaflet.timedimension.min.js";

/// Encoder producing the animated map document
pub struct MapEncoder {
    instance_id: String,
    map: MapConfig,
    animation: AnimationConfig,
}

impl Default for MapEncoder {
    fn default() -> Self {
        Self::new(MapConfig::default(), AnimationConfig::default())
    }
}

impl MapEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new(map: MapConfig, animation: AnimationConfig) -> Self {
        Self {
            instance_id: Uuid::new_v4().simple().to_string(),
            map,
            animation,
        }
    }

    /// Create an encoder with a specific instance ID.
    ///
    /// The ID becomes part of JavaScript identifiers and a CSS selector, so it
    /// must be non-empty ASCII alphanumerics or `_`.
    pub fn with_instance_id(mut self, instance_id: String) -> Result<Self, TimelineError> {
        if instance_id.is_empty()
            || !instance_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(TimelineError::EncodingError(format!(
                "instance id must match [A-Za-z0-9_]+, got {instance_id:?}"
            )));
        }
        self.instance_id = instance_id;
        Ok(self)
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Encode the map into a complete HTML document
    pub fn encode(&self, timeline: &TimelineMap) -> Result<String, TimelineError> {
        let map_id = format!("map_{}", self.instance_id);
        let data = script_json(&serde_json::to_string(&timeline.collection)?);
        let center = serde_json::to_string(&timeline.center)?;
        let tiles_url = serde_json::to_string(&self.map.tiles_url)?;
        let attribution = serde_json::to_string(&self.map.attribution)?;
        let period = serde_json::to_string(&self.animation.period)?;
        let legend = self.encode_legend(&timeline.legend);

        let mut html = String::new();
        write!(
            html,
            r#"<!DOCTYPE html>
<html>
<head>
    <meta http-equiv="content-type" content="text/html; charset=UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <meta name="generator" content="{producer} {version}" />
    <link rel="stylesheet" href="{leaflet_css}" />
    <link rel="stylesheet" href="{time_dimension_css}" />
    <script src="{leaflet_js}"></script>
    <script src="{iso8601_js}"></script>
    <script src="{time_dimension_js}"></script>
    <style>
        html, body {{ width: 100%; height: 100%; margin: 0; padding: 0; }}
        #{map_id} {{ position: absolute; top: 0; bottom: 0; right: 0; left: 0; }}
    </style>
</head>
<body>
    <div id="{map_id}"></div>
{legend}
    <script>
        var {map_id} = L.map("{map_id}", {{
            center: {center},
            zoom: {zoom},
            zoomControl: true
        }});

        L.tileLayer({tiles_url}, {{
            attribution: {attribution},
            maxZoom: 19
        }}).addTo({map_id});

        {map_id}.timeDimension = L.timeDimension({{ period: {period} }});

        var player_{id} = new L.TimeDimension.Player({{
            transitionTime: {transition},
            loop: {loop_playback},
            startOver: true
        }}, {map_id}.timeDimension);

        var control_{id} = new L.Control.TimeDimension({{
            player: player_{id},
            autoPlay: {auto_play},
            loopButton: true,
            timeSliderDragUpdate: {drag_update},
            speedSlider: true,
            position: "bottomleft"
        }});
        {map_id}.addControl(control_{id});

        var data_{id} = {data};

        var geojson_{id} = L.geoJson(data_{id}, {{
            pointToLayer: function (feature, latLng) {{
                if (feature.properties.icon == "circle") {{
                    return L.circleMarker(latLng, feature.properties.iconstyle);
                }}
                return L.marker(latLng);
            }},
            style: function (feature) {{
                return feature.properties.style;
            }}
        }});

        L.timeDimension.layer.geoJson(geojson_{id}, {{
            updateTimeDimension: true,
            addlastPoint: {add_last_point},
            duration: undefined
        }}).addTo({map_id});
    </script>
</body>
</html>
"#,
            producer = PRODUCER_NAME,
            version = FLUX_VERSION,
            leaflet_css = LEAFLET_CSS,
            leaflet_js = LEAFLET_JS,
            iso8601_js = ISO8601_JS,
            time_dimension_css = TIME_DIMENSION_CSS,
            time_dimension_js = TIME_DIMENSION_JS,
            map_id = map_id,
            id = self.instance_id,
            legend = legend,
            center = center,
            zoom = self.map.zoom_start,
            tiles_url = tiles_url,
            attribution = attribution,
            period = period,
            transition = self.animation.transition_time_ms,
            loop_playback = self.animation.loop_playback,
            auto_play = self.animation.auto_play,
            drag_update = self.animation.time_slider_drag_update,
            data = data,
            add_last_point = self.animation.add_last_point,
        )
        .map_err(|e| TimelineError::EncodingError(e.to_string()))?;

        Ok(html)
    }

    /// Fixed-position legend overlay: top categories, then "Other" if any
    fn encode_legend(&self, legend: &Legend) -> String {
        let mut html = String::new();
        html.push_str(
            "    <div class=\"timeline-legend\" style=\"position: fixed; bottom: 20px; right: 20px; \
             width: 150px; height: auto; background-color: rgba(255, 255, 255, 0.7); \
             z-index: 9999; border: 2px solid grey; padding: 10px; border-radius: 5px;\">\n",
        );
        html.push_str(&format!(
            "        <h4>{}</h4>\n",
            escape_html(&self.map.legend_title)
        ));

        for entry in &legend.entries {
            html.push_str(&legend_row(&entry.color, &entry.category));
        }
        if let Some(other) = &legend.other {
            html.push_str(&legend_row(&other.color, "Other"));
        }

        html.push_str("    </div>");
        html
    }
}

fn legend_row(color: &str, label: &str) -> String {
    format!(
        "        <i style=\"background: {}; width: 20px; height: 20px; display: inline-block;\"></i> {}<br>\n",
        escape_html(color),
        escape_html(label)
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Keep embedded JSON from closing the surrounding `<script>` element
fn script_json(json: &str) -> String {
    json.replace("</", "<\\/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureCollectionBuilder;
    use crate::types::{ActivityRow, LegendEntry, OtherEntry, VisitRow};
    use crate::config::BuilderConfig;

    fn make_timeline() -> TimelineMap {
        let visits = vec![VisitRow {
            start_time: Some("2024-01-01T10:00:00".to_string()),
            latitude: Some(40.0),
            longitude: Some(-70.0),
            ..Default::default()
        }];
        let activities = vec![ActivityRow {
            start_time: Some("2024-01-01T11:00:00".to_string()),
            activity_type: Some("WALKING".to_string()),
            start_latitude: Some(40.0),
            start_longitude: Some(-70.0),
            end_latitude: Some(40.5),
            end_longitude: Some(-70.5),
            ..Default::default()
        }];
        FeatureCollectionBuilder::new(BuilderConfig {
            seed: Some(2),
            ..Default::default()
        })
        .build(&visits, &activities)
        .unwrap()
    }

    #[test]
    fn test_encode_document() {
        let encoder = MapEncoder::default()
            .with_instance_id("abc123".to_string())
            .unwrap();
        let html = encoder.encode(&make_timeline()).unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<div id=\"map_abc123\"></div>"));
        assert!(html.contains("center: [40.0,-70.0]"));
        assert!(html.contains("zoom: 4"));
        assert!(html.contains("transitionTime: 50"));
        assert!(html.contains("loop: true"));
        assert!(html.contains("autoPlay: true"));
        assert!(html.contains("timeSliderDragUpdate: true"));
        assert!(html.contains("\"type\":\"FeatureCollection\""));
        assert!(html.contains("\"coordinates\":[-70.0,40.0]"));
        assert!(html.contains("Activity Legend"));
        assert!(html.contains("WALKING<br>"));
        assert!(!html.contains("Other<br>"));
    }

    #[test]
    fn test_instance_id_must_be_identifier_safe() {
        for bad in ["", "a-b", "x\"); alert(1); //", "map id"] {
            let err = MapEncoder::default()
                .with_instance_id(bad.to_string())
                .err()
                .unwrap();
            assert!(matches!(err, TimelineError::EncodingError(_)));
        }
        assert!(MapEncoder::default()
            .with_instance_id("Map_01".to_string())
            .is_ok());
    }

    #[test]
    fn test_instance_ids_are_unique() {
        assert_ne!(
            MapEncoder::default().instance_id(),
            MapEncoder::default().instance_id()
        );
    }

    #[test]
    fn test_legend_escapes_and_lists_other() {
        let encoder = MapEncoder::default();
        let legend = Legend {
            entries: vec![LegendEntry {
                category: "<script>".to_string(),
                color: "red".to_string(),
                count: 2,
            }],
            other: Some(OtherEntry {
                color: "gray".to_string(),
                count: 1,
            }),
        };

        let html = encoder.encode_legend(&legend);
        assert!(html.contains("&lt;script&gt;<br>"));
        assert!(html.contains("background: gray;"));
        assert!(html.contains("Other<br>"));
        assert!(html.contains("position: fixed"));
    }

    #[test]
    fn test_script_json_escapes_closing_tags() {
        assert_eq!(
            script_json(r#"{"time":"</script>"}"#),
            r#"{"time":"<\/script>"}"#
        );
    }
}
