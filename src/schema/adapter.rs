//! Adapter for converting export rows into typed activity records

use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::ComputeError;
use crate::schema::raw_record::*;
use crate::types::ActivityRecord;

/// Adapter for parsing and validating export rows
pub struct RecordAdapter;

impl RecordAdapter {
    /// Parse a JSON string containing an array of rows
    pub fn parse_array(json: &str) -> Result<Vec<RawActivityRecord>, ComputeError> {
        let rows: Vec<RawActivityRecord> = serde_json::from_str(json)?;
        Ok(rows)
    }

    /// Parse NDJSON (newline-delimited JSON) containing rows
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<RawActivityRecord>, ComputeError> {
        let mut rows = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<RawActivityRecord>(trimmed) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(rows)
    }

    /// Convert rows to typed records, failing on the first invalid row
    pub fn to_records(rows: &[RawActivityRecord]) -> Result<Vec<ActivityRecord>, ComputeError> {
        let records = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                row.to_record().map_err(|e| {
                    ComputeError::ParseError(format!("Invalid record at index {}: {}", idx, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(records = records.len(), "converted export rows");
        Ok(records)
    }

    /// Validate a batch of rows
    pub fn validate_records(rows: &[RawActivityRecord]) -> Vec<ValidationResult> {
        rows.iter()
            .enumerate()
            .filter_map(|(idx, row)| {
                row.validate().err().map(|error| ValidationResult {
                    index: idx,
                    owner_id: row.employee_id.clone(),
                    error,
                })
            })
            .collect()
    }
}

/// A row that failed validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub index: usize,
    pub owner_id: String,
    pub error: ValidationError,
}

/// Sorted distinct dates on which `owner_id` has records
pub fn available_dates(records: &[ActivityRecord], owner_id: &str) -> Vec<NaiveDate> {
    records
        .iter()
        .filter(|r| r.owner_id == owner_id)
        .map(ActivityRecord::date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_array_json() -> &'static str {
        r#"[
            {"employee_id": "E1", "start_time": "2025-08-28T09:00:00Z", "duration_seconds": "3600", "is_afk": "false"},
            {"employee_id": "E1", "start_time": "2025-08-27T09:00:00Z", "duration_seconds": "1800", "is_afk": "true"},
            {"employee_id": "E2", "start_time": "2025-08-26T09:00:00Z", "duration_seconds": "60", "is_afk": "false"},
            {"employee_id": "E1", "start_time": "2025-08-27T15:00:00Z", "duration_seconds": "600", "is_afk": "false"}
        ]"#
    }

    #[test]
    fn test_parse_array_and_convert() {
        let rows = RecordAdapter::parse_array(sample_array_json()).unwrap();
        assert_eq!(rows.len(), 4);

        let records = RecordAdapter::to_records(&rows).unwrap();
        assert_eq!(records[1].owner_id, "E1");
        assert_eq!(records[1].date(), NaiveDate::from_ymd_opt(2025, 8, 27).unwrap());
    }

    #[test]
    fn test_parse_ndjson() {
        let ndjson = "\n{\"employee_id\": \"E1\", \"start_time\": \"2025-08-27T09:00:00\", \"duration_seconds\": \"1\", \"is_afk\": \"0\"}\n\n";
        let rows = RecordAdapter::parse_ndjson(ndjson).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let ndjson = "{\"employee_id\": \"E1\", \"start_time\": \"2025-08-27T09:00:00\", \"duration_seconds\": \"1\", \"is_afk\": \"0\"}\nnot json\n";
        match RecordAdapter::parse_ndjson(ndjson) {
            Err(ComputeError::ParseError(msg)) => assert!(msg.contains("line 2"), "{}", msg),
            other => panic!("expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            RecordAdapter::parse_array("not valid json"),
            Err(ComputeError::JsonError(_))
        ));
    }

    #[test]
    fn test_validate_records() {
        let mut rows = RecordAdapter::parse_array(sample_array_json()).unwrap();
        rows[2].start_time = "27/08/2025".to_string();

        let failures = RecordAdapter::validate_records(&rows);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].index, 2);
        assert_eq!(failures[0].owner_id, "E2");

        assert!(matches!(
            RecordAdapter::to_records(&rows),
            Err(ComputeError::ParseError(_))
        ));
    }

    #[test]
    fn test_available_dates_sorted_and_distinct() {
        let rows = RecordAdapter::parse_array(sample_array_json()).unwrap();
        let records = RecordAdapter::to_records(&rows).unwrap();

        let dates: Vec<String> = available_dates(&records, "E1")
            .iter()
            .map(|d| d.to_string())
            .collect();
        assert_eq!(dates, vec!["2025-08-27", "2025-08-28"]);
        assert!(available_dates(&records, "nobody").is_empty());
    }
}
