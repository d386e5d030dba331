//! Record normalization
//!
//! This module turns raw history records into the two normalized datasets.
//! - Durations derived from start/end timestamps (minutes, 2 decimals)
//! - Encoded locations decoded into coordinate pairs
//! - Unrecognized record shapes dropped and counted

use crate::config::{MalformedLocationPolicy, NormalizerConfig};
use crate::error::TimelineError;
use crate::location::extract_lat_lon;
use crate::schema::{RawActivity, RawRecord, RawVisit, RecordKind, TimeSpan};
use crate::types::{ActivityRow, AttributeValue, NormalizedHistory, VisitRow};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Counts gathered while normalizing one history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationReport {
    pub total_records: usize,
    pub visits: usize,
    pub activities: usize,
    /// Records that were neither a visit nor an activity
    pub unrecognized: usize,
    /// Records dropped under `MalformedLocationPolicy::SkipRow`
    pub skipped_malformed: usize,
}

/// Outcome of normalizing a single record
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedRecord {
    Visit(VisitRow),
    Activity(ActivityRow),
    Unrecognized,
}

/// Normalizer for converting raw records to visit and activity rows
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Normalize a whole history, preserving input order within each dataset
    pub fn normalize(
        &self,
        records: Vec<RawRecord>,
    ) -> Result<(NormalizedHistory, NormalizationReport), TimelineError> {
        let mut history = NormalizedHistory::default();
        let mut report = NormalizationReport {
            total_records: records.len(),
            ..Default::default()
        };

        for (index, record) in records.into_iter().enumerate() {
            match normalize_record(record) {
                Ok(NormalizedRecord::Visit(row)) => history.visits.push(row),
                Ok(NormalizedRecord::Activity(row)) => history.activities.push(row),
                Ok(NormalizedRecord::Unrecognized) => {
                    debug!(index, "record is neither a visit nor an activity, dropping");
                    report.unrecognized += 1;
                }
                Err(TimelineError::MalformedLocation(location))
                    if self.config.malformed_location == MalformedLocationPolicy::SkipRow =>
                {
                    warn!(index, %location, "skipping record with malformed location");
                    report.skipped_malformed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        report.visits = history.visits.len();
        report.activities = history.activities.len();

        info!(
            records = report.total_records,
            visits = report.visits,
            activities = report.activities,
            unrecognized = report.unrecognized,
            skipped = report.skipped_malformed,
            "normalized location history"
        );

        Ok((history, report))
    }
}

/// Normalize one record according to its classified shape
pub fn normalize_record(record: RawRecord) -> Result<NormalizedRecord, TimelineError> {
    let (span, kind) = record.classify();

    match kind {
        RecordKind::Visit(visit) => normalize_visit(span, visit).map(NormalizedRecord::Visit),
        RecordKind::Activity(activity) => {
            normalize_activity(span, activity).map(NormalizedRecord::Activity)
        }
        RecordKind::Unrecognized => Ok(NormalizedRecord::Unrecognized),
    }
}

fn normalize_visit(span: TimeSpan, visit: RawVisit) -> Result<VisitRow, TimelineError> {
    let duration_minutes =
        compute_duration_minutes(span.start_time.as_deref(), span.end_time.as_deref())?;
    let candidate = visit.top_candidate;
    let (latitude, longitude) = extract_lat_lon(candidate.place_location.as_deref())?;

    Ok(VisitRow {
        start_time: span.start_time,
        end_time: span.end_time,
        duration_minutes,
        hierarchy_level: visit.hierarchy_level,
        place_id: candidate.place_id,
        latitude,
        longitude,
        probability: candidate.probability,
    })
}

fn normalize_activity(span: TimeSpan, activity: RawActivity) -> Result<ActivityRow, TimelineError> {
    let duration_minutes =
        compute_duration_minutes(span.start_time.as_deref(), span.end_time.as_deref())?;
    let (start_latitude, start_longitude) = extract_lat_lon(activity.start.as_deref())?;
    let (end_latitude, end_longitude) = extract_lat_lon(activity.end.as_deref())?;
    let distance_meters = coerce_distance(activity.distance_meters.as_ref())?;

    Ok(ActivityRow {
        start_time: span.start_time,
        end_time: span.end_time,
        duration_minutes,
        distance_meters,
        activity_type: activity.top_candidate.activity_type,
        start_latitude,
        start_longitude,
        end_latitude,
        end_longitude,
    })
}

/// Elapsed minutes between two ISO-8601 timestamps, rounded to 2 decimals.
///
/// Absent (or empty) on either side means no duration, which is distinct
/// from a zero duration.
pub fn compute_duration_minutes(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<Option<f64>, TimelineError> {
    let (start, end) = match (start, end) {
        (Some(s), Some(e)) if !s.is_empty() && !e.is_empty() => (s, e),
        _ => return Ok(None),
    };

    let elapsed = match (parse_timestamp(start)?, parse_timestamp(end)?) {
        (Timestamp::Aware(s), Timestamp::Aware(e)) => e - s,
        (Timestamp::Naive(s), Timestamp::Naive(e)) => e - s,
        _ => {
            return Err(TimelineError::DateParseError(format!(
                "cannot subtract timestamps with and without offset: {start:?}, {end:?}"
            )))
        }
    };

    let seconds = elapsed
        .num_microseconds()
        .map(|us| us as f64 / 1_000_000.0)
        .unwrap_or_else(|| elapsed.num_seconds() as f64);

    Ok(Some(round2(seconds / 60.0)))
}

/// Coerce a distance given as a number or numeric string, rounded to 2 decimals
pub fn coerce_distance(value: Option<&AttributeValue>) -> Result<Option<f64>, TimelineError> {
    let Some(value) = value else {
        return Ok(None);
    };

    value
        .as_f64()
        .map(|d| Some(round2(d)))
        .ok_or_else(|| TimelineError::InvalidNumber {
            field: "distanceMeters".to_string(),
            value: value.to_string(),
        })
}

/// Round to 2 decimal places.
///
/// Goes through exact decimal formatting so ties resolve on the true binary
/// value (`round2(2.675) == 2.67`, as 2.675 is stored slightly below).
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{value:.2}").parse().unwrap_or(value)
}

/// A parsed timestamp, with or without a UTC offset
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Timestamp {
    Aware(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

/// Parse the ISO-8601 forms found in exports
pub fn parse_timestamp(value: &str) -> Result<Timestamp, TimelineError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(Timestamp::Aware(dt));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Ok(Timestamp::Aware(dt));
        }
    }

    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(Timestamp::Naive(dt));
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(Timestamp::Naive)
        .ok_or_else(|| TimelineError::DateParseError(format!("invalid timestamp: {value:?}")))
}
