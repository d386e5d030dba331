//! Feature collection building
//!
//! This module turns the normalized datasets into the animated map's content:
//! - One circle-marker point per visit, in a fixed style
//! - One two-point line per activity, colored by its category
//! - A legend of the most frequent categories plus an "Other" bucket
//! - The map center (mean visit position)
//!
//! Features are emitted visits first, then activities, each in dataset order.

use crate::config::{ActivityStyle, BuilderConfig, VisitStyle, ZeroVisitsPolicy};
use crate::error::TimelineError;
use crate::palette::{CategoryColors, ColorAssigner, Palette};
use crate::types::{
    ActivityRow, FeatureCollection, FeatureKind, FeatureProperties, GeoFeature, Geometry,
    IconStyle, Legend, LegendEntry, OtherEntry, PathStyle, Position, TimelineMap, VisitRow,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

const MARKER_ICON: &str = "circle";

/// Builder for the map's feature collection, legend and framing
pub struct FeatureCollectionBuilder {
    config: BuilderConfig,
    palette: Palette,
}

impl Default for FeatureCollectionBuilder {
    fn default() -> Self {
        Self::new(BuilderConfig::default())
    }
}

impl FeatureCollectionBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        let palette = Palette::new(config.palette.clone(), config.palette_exhaustion)
            .without(&config.other_color);
        Self { config, palette }
    }

    /// Build with the configured seed, or fresh entropy when there is none
    pub fn build(
        &self,
        visits: &[VisitRow],
        activities: &[ActivityRow],
    ) -> Result<TimelineMap, TimelineError> {
        let rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.build_with_rng(visits, activities, rng)
    }

    /// Build drawing category colors from `rng`
    pub fn build_with_rng<R: Rng>(
        &self,
        visits: &[VisitRow],
        activities: &[ActivityRow],
        rng: R,
    ) -> Result<TimelineMap, TimelineError> {
        let center = map_center(visits, self.config.zero_visits, self.config.fallback_center)?;

        let mut features: Vec<GeoFeature> = visits
            .iter()
            .map(|row| visit_feature(row, &self.config.visit_style))
            .collect();

        let mut assigner = ColorAssigner::new(&self.palette, rng);
        for row in activities {
            let color = match &row.activity_type {
                Some(category) => assigner.color_for(category)?,
                None => self.config.other_color.clone(),
            };
            features.push(activity_feature(row, &color, &self.config.activity_style));
        }
        let colors = assigner.into_colors();

        let legend = build_legend(
            &category_counts(activities),
            &colors,
            self.config.legend_top_n,
            &self.config.other_color,
        );

        info!(
            points = visits.len(),
            lines = activities.len(),
            categories = colors.len(),
            "built feature collection"
        );

        Ok(TimelineMap {
            center,
            collection: FeatureCollection::new(features),
            legend,
            category_colors: colors.into_vec(),
        })
    }
}

/// Point feature for a visit
pub fn visit_feature(row: &VisitRow, style: &VisitStyle) -> GeoFeature {
    let geometry = position(row.longitude, row.latitude)
        .map(|coordinates| Geometry::Point { coordinates });

    GeoFeature {
        feature_type: "Feature",
        geometry,
        properties: FeatureProperties {
            time: row.start_time.clone(),
            style: PathStyle {
                color: style.color.clone(),
            },
            icon: MARKER_ICON.to_string(),
            iconstyle: IconStyle {
                fill_color: style.color.clone(),
                fill_opacity: style.fill_opacity,
                stroke: false,
                stroke_color: None,
                radius: style.radius,
            },
        },
        kind: FeatureKind::Visit,
    }
}

/// Line feature for an activity, from its start to its end location
pub fn activity_feature(row: &ActivityRow, color: &str, style: &ActivityStyle) -> GeoFeature {
    let geometry = match (
        position(row.start_longitude, row.start_latitude),
        position(row.end_longitude, row.end_latitude),
    ) {
        (Some(start), Some(end)) => Some(Geometry::LineString {
            coordinates: vec![start, end],
        }),
        _ => None,
    };

    GeoFeature {
        feature_type: "Feature",
        geometry,
        properties: FeatureProperties {
            time: row.start_time.clone(),
            style: PathStyle {
                color: color.to_string(),
            },
            icon: MARKER_ICON.to_string(),
            iconstyle: IconStyle {
                fill_color: color.to_string(),
                fill_opacity: style.fill_opacity,
                stroke: true,
                stroke_color: Some(color.to_string()),
                radius: style.radius,
            },
        },
        kind: FeatureKind::Activity,
    }
}

fn position(longitude: Option<f64>, latitude: Option<f64>) -> Option<Position> {
    match (longitude, latitude) {
        (Some(lon), Some(lat)) => Some([lon, lat]),
        _ => None,
    }
}

/// Row count per category, in first-encounter order.
///
/// Rows without a category are not counted.
pub fn category_counts(activities: &[ActivityRow]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();

    for category in activities.iter().filter_map(|row| row.activity_type.as_deref()) {
        match counts.iter_mut().find(|(c, _)| c == category) {
            Some((_, count)) => *count += 1,
            None => counts.push((category.to_string(), 1)),
        }
    }

    counts
}

/// Legend of the `top_n` most frequent categories plus an "Other" bucket.
///
/// Ties keep first-encounter order. "Other" is present only when the
/// remaining categories hold at least one row.
pub fn build_legend(
    counts: &[(String, usize)],
    colors: &CategoryColors,
    top_n: usize,
    other_color: &str,
) -> Legend {
    let mut ranked: Vec<&(String, usize)> = counts.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let entries = ranked
        .iter()
        .take(top_n)
        .map(|(category, count)| LegendEntry {
            category: category.clone(),
            color: colors.get(category).unwrap_or(other_color).to_string(),
            count: *count,
        })
        .collect();

    let other_count: usize = ranked.iter().skip(top_n).map(|(_, count)| count).sum();
    let other = (other_count > 0).then(|| OtherEntry {
        color: other_color.to_string(),
        count: other_count,
    });

    Legend { entries, other }
}

/// Mean `[latitude, longitude]` of the visits that carry both coordinates
pub fn map_center(
    visits: &[VisitRow],
    policy: ZeroVisitsPolicy,
    fallback: [f64; 2],
) -> Result<[f64; 2], TimelineError> {
    let located: Vec<(f64, f64)> = visits
        .iter()
        .filter_map(|v| Some((v.latitude?, v.longitude?)))
        .collect();

    if located.is_empty() {
        return match policy {
            ZeroVisitsPolicy::Fail => Err(TimelineError::NoVisits),
            ZeroVisitsPolicy::Fallback => Ok(fallback),
        };
    }

    let n = located.len() as f64;
    let lat = located.iter().map(|(lat, _)| lat).sum::<f64>() / n;
    let lon = located.iter().map(|(_, lon)| lon).sum::<f64>() / n;
    Ok([lat, lon])
}
