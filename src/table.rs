//! Tabular persistence of the normalized datasets
//!
//! Visits and activities are stored as two CSV files with a fixed header.
//! Absent values are written as empty cells and read back as absent; floats
//! are written in shortest round-trip form, so the 2-decimal rounding done by
//! the normalizer survives a write/read cycle unchanged.

use crate::error::TimelineError;
use crate::types::{ActivityRow, AttributeValue, NormalizedHistory, VisitRow};
use csv::StringRecord;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// Header of the visits table
pub const VISIT_COLUMNS: [&str; 9] = [
    "startTime",
    "endTime",
    "duration (minutes)",
    "type",
    "hierarchyLevel",
    "placeID",
    "latitude",
    "longitude",
    "probability",
];

/// Header of the activities table
pub const ACTIVITY_COLUMNS: [&str; 10] = [
    "startTime",
    "endTime",
    "duration (minutes)",
    "type",
    "distanceMeters",
    "activityType",
    "startLatitude",
    "startLongitude",
    "endLatitude",
    "endLongitude",
];

/// Write visit rows as CSV, header included even when there are no rows
pub fn write_visits<W: Write>(rows: &[VisitRow], writer: W) -> Result<(), TimelineError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(VISIT_COLUMNS)?;

    for row in rows {
        writer.write_record([
            text_cell(&row.start_time),
            text_cell(&row.end_time),
            float_cell(row.duration_minutes),
            "visit".to_string(),
            attribute_cell(&row.hierarchy_level),
            text_cell(&row.place_id),
            float_cell(row.latitude),
            float_cell(row.longitude),
            attribute_cell(&row.probability),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write activity rows as CSV, header included even when there are no rows
pub fn write_activities<W: Write>(rows: &[ActivityRow], writer: W) -> Result<(), TimelineError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(ACTIVITY_COLUMNS)?;

    for row in rows {
        writer.write_record([
            text_cell(&row.start_time),
            text_cell(&row.end_time),
            float_cell(row.duration_minutes),
            "activity".to_string(),
            float_cell(row.distance_meters),
            text_cell(&row.activity_type),
            float_cell(row.start_latitude),
            float_cell(row.start_longitude),
            float_cell(row.end_latitude),
            float_cell(row.end_longitude),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Read visit rows back from CSV
pub fn read_visits<R: Read>(reader: R) -> Result<Vec<VisitRow>, TimelineError> {
    let mut reader = csv::Reader::from_reader(reader);
    let Some(columns) = Columns::from_headers(reader.headers()?, &VISIT_COLUMNS)? else {
        return Ok(Vec::new());
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(VisitRow {
            start_time: columns.text(&record, "startTime"),
            end_time: columns.text(&record, "endTime"),
            duration_minutes: columns.float(&record, "duration (minutes)")?,
            hierarchy_level: columns.attribute(&record, "hierarchyLevel"),
            place_id: columns.text(&record, "placeID"),
            latitude: columns.float(&record, "latitude")?,
            longitude: columns.float(&record, "longitude")?,
            probability: columns.attribute(&record, "probability"),
        });
    }

    Ok(rows)
}

/// Read activity rows back from CSV
pub fn read_activities<R: Read>(reader: R) -> Result<Vec<ActivityRow>, TimelineError> {
    let mut reader = csv::Reader::from_reader(reader);
    let Some(columns) = Columns::from_headers(reader.headers()?, &ACTIVITY_COLUMNS)? else {
        return Ok(Vec::new());
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(ActivityRow {
            start_time: columns.text(&record, "startTime"),
            end_time: columns.text(&record, "endTime"),
            duration_minutes: columns.float(&record, "duration (minutes)")?,
            distance_meters: columns.float(&record, "distanceMeters")?,
            activity_type: columns.text(&record, "activityType"),
            start_latitude: columns.float(&record, "startLatitude")?,
            start_longitude: columns.float(&record, "startLongitude")?,
            end_latitude: columns.float(&record, "endLatitude")?,
            end_longitude: columns.float(&record, "endLongitude")?,
        });
    }

    Ok(rows)
}

/// Write both datasets to their files
pub fn write_tables(
    history: &NormalizedHistory,
    visits_path: &Path,
    activities_path: &Path,
) -> Result<(), TimelineError> {
    write_visits(&history.visits, File::create(visits_path)?)?;
    write_activities(&history.activities, File::create(activities_path)?)?;
    debug!(
        visits = %visits_path.display(),
        activities = %activities_path.display(),
        "wrote normalized tables"
    );
    Ok(())
}

/// Read both datasets from their files
pub fn read_tables(
    visits_path: &Path,
    activities_path: &Path,
) -> Result<NormalizedHistory, TimelineError> {
    Ok(NormalizedHistory {
        visits: read_visits(File::open(visits_path)?)?,
        activities: read_activities(File::open(activities_path)?)?,
    })
}

fn text_cell(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn float_cell(value: Option<f64>) -> String {
    value.map(|v| format!("{v:?}")).unwrap_or_default()
}

fn attribute_cell(value: &Option<AttributeValue>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

/// Header name → column index
struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    /// `None` for a file without any header (nothing was ever written)
    fn from_headers(
        headers: &StringRecord,
        required: &[&str],
    ) -> Result<Option<Self>, TimelineError> {
        if headers.is_empty() {
            return Ok(None);
        }

        let index: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), i))
            .collect();

        if let Some(missing) = required.iter().find(|name| !index.contains_key(**name)) {
            return Err(TimelineError::MissingColumn(missing.to_string()));
        }

        Ok(Some(Self { index }))
    }

    fn cell<'r>(&self, record: &'r StringRecord, name: &str) -> Option<&'r str> {
        self.index
            .get(name)
            .and_then(|&i| record.get(i))
            .filter(|cell| !cell.is_empty())
    }

    fn text(&self, record: &StringRecord, name: &str) -> Option<String> {
        self.cell(record, name).map(str::to_string)
    }

    fn attribute(&self, record: &StringRecord, name: &str) -> Option<AttributeValue> {
        self.cell(record, name).map(AttributeValue::from_cell)
    }

    fn float(&self, record: &StringRecord, name: &str) -> Result<Option<f64>, TimelineError> {
        self.cell(record, name)
            .map(|cell| {
                cell.parse::<f64>().map_err(|_| TimelineError::InvalidNumber {
                    field: name.to_string(),
                    value: cell.to_string(),
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn make_visit() -> VisitRow {
        VisitRow {
            start_time: Some("2024-01-01T10:00:00".to_string()),
            end_time: Some("2024-01-01T10:30:00".to_string()),
            duration_minutes: Some(30.0),
            hierarchy_level: Some(AttributeValue::Integer(1)),
            place_id: Some("p1".to_string()),
            latitude: Some(40.0),
            longitude: Some(-70.0),
            probability: Some(AttributeValue::Number(0.9)),
        }
    }

    fn make_activity() -> ActivityRow {
        ActivityRow {
            start_time: Some("2024-01-01T11:00:00.000+01:00".to_string()),
            end_time: None,
            duration_minutes: None,
            distance_meters: Some(1523.46),
            activity_type: Some("IN_PASSENGER_VEHICLE".to_string()),
            start_latitude: Some(40.0),
            start_longitude: Some(-70.0),
            end_latitude: None,
            end_longitude: None,
        }
    }

    #[test]
    fn test_visit_csv_layout() {
        let mut buffer = Vec::new();
        write_visits(&[make_visit()], &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("startTime,endTime,duration (minutes),type,hierarchyLevel,placeID,latitude,longitude,probability")
        );
        assert_eq!(
            lines.next(),
            Some("2024-01-01T10:00:00,2024-01-01T10:30:00,30.0,visit,1,p1,40.0,-70.0,0.9")
        );
    }

    #[test]
    fn test_visits_round_trip() {
        let rows = vec![make_visit(), VisitRow::default()];
        let mut buffer = Vec::new();
        write_visits(&rows, &mut buffer).unwrap();

        let read = read_visits(buffer.as_slice()).unwrap();
        assert_eq!(read, rows);
    }

    #[test]
    fn test_activities_round_trip() {
        let rows = vec![make_activity(), ActivityRow::default()];
        let mut buffer = Vec::new();
        write_activities(&rows, &mut buffer).unwrap();

        let read = read_activities(buffer.as_slice()).unwrap();
        assert_eq!(read, rows);
    }

    #[test]
    fn test_empty_tables_keep_header() {
        let mut buffer = Vec::new();
        write_activities(&[], &mut buffer).unwrap();
        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.starts_with("startTime,endTime,duration (minutes),type,distanceMeters"));

        assert!(read_activities(buffer.as_slice()).unwrap().is_empty());
        assert!(read_visits(&b""[..]).unwrap().is_empty());
    }

    #[test]
    fn test_missing_column() {
        let csv = "startTime,endTime\n2024-01-01T10:00:00,\n";
        let err = read_visits(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, TimelineError::MissingColumn(ref c) if c == "duration (minutes)"));
    }

    #[test]
    fn test_invalid_float_cell() {
        let csv = "startTime,endTime,duration (minutes),type,hierarchyLevel,placeID,latitude,longitude,probability\n,,abc,visit,,,,,\n";
        let err = read_visits(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, TimelineError::InvalidNumber { .. }));
    }

    #[test]
    fn test_write_and_read_tables_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let visits_path = dir.path().join("visits.csv");
        let activities_path = dir.path().join("activities.csv");
        let history = NormalizedHistory {
            visits: vec![make_visit()],
            activities: vec![make_activity()],
        };

        write_tables(&history, &visits_path, &activities_path).unwrap();
        let read = read_tables(&visits_path, &activities_path).unwrap();

        assert_eq!(read, history);
    }
}
