//! Raw location-history record definition
//!
//! One entry of the on-device Timeline export. Every record carries an
//! optional `startTime`/`endTime` and at most one of a `visit` or an
//! `activity` sub-record; other shapes (`timelinePath`, `timelineMemory`, ...)
//! are not interpreted here.

use crate::types::AttributeValue;
use serde::{Deserialize, Serialize};

/// Most likely interpretation of a visit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitCandidate {
    #[serde(rename = "placeID", default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    /// Encoded place location, `"<label>:<lat>,<lon>"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<AttributeValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_type: Option<String>,
}

/// Visit sub-record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVisit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hierarchy_level: Option<AttributeValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<AttributeValue>,
    #[serde(default)]
    pub top_candidate: VisitCandidate,
}

/// Most likely interpretation of an activity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityCandidate {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<AttributeValue>,
}

/// Activity sub-record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawActivity {
    /// Encoded start location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    /// Encoded end location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    /// Number or numeric string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<AttributeValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<AttributeValue>,
    #[serde(default)]
    pub top_candidate: ActivityCandidate,
}

/// A record as it appears in the export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visit: Option<RawVisit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<RawActivity>,
}

/// Time bounds shared by every record shape
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSpan {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

/// Classified record shape
#[derive(Debug, Clone, PartialEq)]
pub enum RecordKind {
    Visit(RawVisit),
    Activity(RawActivity),
    /// Neither a visit nor an activity
    Unrecognized,
}

impl RawRecord {
    /// Create a visit record
    pub fn visit(start_time: &str, end_time: &str, visit: RawVisit) -> Self {
        RawRecord {
            start_time: Some(start_time.to_string()),
            end_time: Some(end_time.to_string()),
            visit: Some(visit),
            activity: None,
        }
    }

    /// Create an activity record
    pub fn activity(start_time: &str, end_time: &str, activity: RawActivity) -> Self {
        RawRecord {
            start_time: Some(start_time.to_string()),
            end_time: Some(end_time.to_string()),
            visit: None,
            activity: Some(activity),
        }
    }

    /// Classify the record. A visit wins when both sub-records are present.
    pub fn classify(self) -> (TimeSpan, RecordKind) {
        let span = TimeSpan {
            start_time: self.start_time,
            end_time: self.end_time,
        };

        let kind = match (self.visit, self.activity) {
            (Some(visit), _) => RecordKind::Visit(visit),
            (None, Some(activity)) => RecordKind::Activity(activity),
            (None, None) => RecordKind::Unrecognized,
        };

        (span, kind)
    }

    pub fn kind_name(&self) -> &'static str {
        match (&self.visit, &self.activity) {
            (Some(_), _) => "visit",
            (None, Some(_)) => "activity",
            (None, None) => "unrecognized",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_visit_record() {
        let json = r#"{
            "startTime": "2024-01-01T10:00:00",
            "endTime": "2024-01-01T10:30:00",
            "visit": {
                "topCandidate": {"placeLocation": "Home:40.0,-70.0", "placeID": "p1", "probability": 0.9},
                "hierarchyLevel": 1
            }
        }"#;

        let record: RawRecord = serde_json::from_str(json).unwrap();
        let (span, kind) = record.classify();

        assert_eq!(span.start_time.as_deref(), Some("2024-01-01T10:00:00"));
        match kind {
            RecordKind::Visit(visit) => {
                assert_eq!(visit.hierarchy_level, Some(AttributeValue::Integer(1)));
                assert_eq!(visit.top_candidate.place_id.as_deref(), Some("p1"));
                assert_eq!(
                    visit.top_candidate.place_location.as_deref(),
                    Some("Home:40.0,-70.0")
                );
            }
            other => panic!("expected visit, got {other:?}"),
        }
    }

    #[test]
    fn test_deserialize_activity_record_with_string_numbers() {
        let json = r#"{
            "startTime": "2024-01-01T11:00:00.000+01:00",
            "endTime": "2024-01-01T11:20:00.000+01:00",
            "activity": {
                "start": "geo:40.0,-70.0",
                "end": "geo:40.1,-70.1",
                "distanceMeters": "1523.456",
                "probability": "0.97",
                "topCandidate": {"type": "walking", "probability": "0.0"}
            }
        }"#;

        let record: RawRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.kind_name(), "activity");

        let (_, kind) = record.classify();
        let RecordKind::Activity(activity) = kind else {
            panic!("expected activity");
        };
        assert_eq!(activity.top_candidate.activity_type.as_deref(), Some("walking"));
        assert_eq!(
            activity.distance_meters.and_then(|d| d.as_f64()),
            Some(1523.456)
        );
    }

    #[test]
    fn test_unrecognized_record() {
        let json = r#"{
            "startTime": "2024-01-01T11:00:00Z",
            "endTime": "2024-01-01T13:00:00Z",
            "timelinePath": [{"point": "geo:1.0,2.0", "durationMinutesOffsetFromStartTime": "5"}]
        }"#;

        let record: RawRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.kind_name(), "unrecognized");
        let (_, kind) = record.classify();
        assert_eq!(kind, RecordKind::Unrecognized);
    }

    #[test]
    fn test_visit_without_top_candidate() {
        let record: RawRecord = serde_json::from_str(r#"{"visit": {"hierarchyLevel": "0"}}"#).unwrap();
        let (span, kind) = record.classify();
        assert!(span.start_time.is_none());
        let RecordKind::Visit(visit) = kind else {
            panic!("expected visit");
        };
        assert_eq!(visit.top_candidate, VisitCandidate::default());
    }
}
