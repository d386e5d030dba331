//! Parsing and validation of raw history files
//!
//! Exports are normally a single JSON array; newline-delimited JSON is
//! accepted too so that large histories can be streamed through other tools.

use crate::error::TimelineError;
use crate::location::extract_lat_lon;
use crate::normalizer::{coerce_distance, compute_duration_minutes};
use crate::schema::raw_record::*;
use serde::Serialize;

/// Adapter for reading raw records
pub struct RawRecordAdapter;

impl RawRecordAdapter {
    /// Parse a JSON string containing an array of RawRecords
    pub fn parse_array(json: &str) -> Result<Vec<RawRecord>, TimelineError> {
        let records: Vec<RawRecord> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON) containing RawRecords
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<RawRecord>, TimelineError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<RawRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(TimelineError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Parse either form, choosing by the first non-blank character
    pub fn parse(input: &str) -> Result<Vec<RawRecord>, TimelineError> {
        if input.trim_start().starts_with('[') {
            Self::parse_array(input)
        } else {
            Self::parse_ndjson(input)
        }
    }

    /// Check every record without stopping at the first problem.
    ///
    /// Returns one entry per problematic record. Records that are neither a
    /// visit nor an activity are ignored by normalization and never reported.
    pub fn validate_records(records: &[RawRecord]) -> Vec<ValidationResult> {
        records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                let issues = record_issues(record);
                if issues.is_empty() {
                    None
                } else {
                    Some(ValidationResult {
                        index,
                        kind: record.kind_name(),
                        issues,
                    })
                }
            })
            .collect()
    }

    /// Number of records that are neither a visit nor an activity
    pub fn count_unrecognized(records: &[RawRecord]) -> usize {
        records
            .iter()
            .filter(|record| record.visit.is_none() && record.activity.is_none())
            .count()
    }
}

/// Problems found in one record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub index: usize,
    pub kind: &'static str,
    pub issues: Vec<String>,
}

fn record_issues(record: &RawRecord) -> Vec<String> {
    if record.visit.is_none() && record.activity.is_none() {
        return Vec::new();
    }

    let mut issues = Vec::new();

    if let Err(e) =
        compute_duration_minutes(record.start_time.as_deref(), record.end_time.as_deref())
    {
        issues.push(e.to_string());
    }

    let locations: Vec<Option<&str>> = match (&record.visit, &record.activity) {
        (Some(visit), _) => vec![visit.top_candidate.place_location.as_deref()],
        (None, Some(activity)) => {
            if let Err(e) = coerce_distance(activity.distance_meters.as_ref()) {
                issues.push(e.to_string());
            }
            vec![activity.start.as_deref(), activity.end.as_deref()]
        }
        (None, None) => Vec::new(),
    };

    for location in locations {
        if let Err(e) = extract_lat_lon(location) {
            issues.push(e.to_string());
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_array() -> &'static str {
        r#"[
            {"startTime": "2024-01-01T10:00:00", "endTime": "2024-01-01T10:30:00",
             "visit": {"topCandidate": {"placeLocation": "geo:40.0,-70.0"}}},
            {"startTime": "2024-01-01T10:30:00", "endTime": "2024-01-01T11:00:00",
             "activity": {"start": "geo:40.0,-70.0", "end": "geo:41.0,-71.0",
                          "distanceMeters": 1000, "topCandidate": {"type": "WALKING"}}}
        ]"#
    }

    #[test]
    fn test_parse_array() {
        let records = RawRecordAdapter::parse_array(sample_array()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind_name(), "visit");
        assert_eq!(records[1].kind_name(), "activity");
    }

    #[test]
    fn test_parse_ndjson() {
        let ndjson = "{\"visit\": {}}\n\n{\"activity\": {}}\n";
        let records = RawRecordAdapter::parse_ndjson(ndjson).unwrap();
        assert_eq!(records.len(), 2);

        let err = RawRecordAdapter::parse_ndjson("{\"visit\": {}}\nnot json\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_detects_format() {
        assert_eq!(RawRecordAdapter::parse(sample_array()).unwrap().len(), 2);
        assert_eq!(
            RawRecordAdapter::parse("{\"visit\": {}}\n{\"visit\": {}}").unwrap().len(),
            2
        );
    }

    #[test]
    fn test_validate_records() {
        let json = r#"[
            {"visit": {"topCandidate": {"placeLocation": "geo:40.0,-70.0"}}},
            {"visit": {"topCandidate": {"placeLocation": "40.0,-70.0"}}},
            {"startTime": "soon", "endTime": "2024-01-01T10:00:00",
             "activity": {"start": "geo:1,2", "end": "a:b:c", "distanceMeters": "far"}},
            {"timelinePath": []}
        ]"#;
        let records = RawRecordAdapter::parse_array(json).unwrap();

        let results = RawRecordAdapter::validate_records(&records);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].index, 1);
        assert_eq!(results[0].kind, "visit");
        assert_eq!(results[1].index, 2);
        assert_eq!(results[1].issues.len(), 3);
        assert_eq!(RawRecordAdapter::count_unrecognized(&records), 1);
    }

    #[test]
    fn test_unrecognized_records_are_not_issues() {
        let json = r#"[
            {"startTime": "2024-01-01T10:00:00", "endTime": "2024-01-01T10:30:00",
             "visit": {"topCandidate": {"placeLocation": "Home:40.0,-70.0"}}},
            {"startTime": "2024-01-01T10:30:00", "endTime": "2024-01-01T11:00:00",
             "timelinePath": [{"point": "geo:40.0,-70.0"}]}
        ]"#;
        let records = RawRecordAdapter::parse_array(json).unwrap();

        assert!(RawRecordAdapter::validate_records(&records).is_empty());
        assert_eq!(RawRecordAdapter::count_unrecognized(&records), 1);
    }
}
