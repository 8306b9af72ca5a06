//! Event log export — turns captured event records into JSON or CSV files.

use std::path::Path;
use thiserror::Error;
use webpilot_application::events::EventLogEntry;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("could not write export file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not serialize entries: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not write csv: {0}")]
    Csv(#[from] csv::Error),
}

/// Writes captured event records as files an operator can inspect.
///
/// Works on the snapshots returned by
/// [`LoggingHandler::entries`](webpilot_application::LoggingHandler::entries).
pub struct EventLogExporter;

impl EventLogExporter {
    /// Pretty-printed JSON array of every entry.
    pub fn write_json(
        entries: &[EventLogEntry],
        path: impl AsRef<Path>,
    ) -> Result<(), ExportError> {
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Flat CSV with one row per entry; payloads are embedded as JSON text.
    pub fn write_csv(
        entries: &[EventLogEntry],
        path: impl AsRef<Path>,
    ) -> Result<(), ExportError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["occurred_at", "name", "aggregate_id", "version", "payload"])?;
        for entry in entries {
            writer.write_record([
                entry.occurred_at.to_rfc3339(),
                entry.name.clone(),
                entry.aggregate_id.clone(),
                entry.version.to_string(),
                entry.payload.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn entries() -> Vec<EventLogEntry> {
        vec![
            EventLogEntry {
                name: "workflow:started".to_string(),
                aggregate_id: "wf-1".to_string(),
                version: 1,
                occurred_at: Utc::now(),
                payload: json!({"goal": "Find cheap wireless headphones"}),
            },
            EventLogEntry {
                name: "task:completed".to_string(),
                aggregate_id: "wf-1".to_string(),
                version: 2,
                occurred_at: Utc::now(),
                payload: json!({"task_id": "t-1", "note": "has, commas \"and\" quotes"}),
            },
        ]
    }

    #[test]
    fn test_json_export_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");

        EventLogExporter::write_json(&entries(), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        let array = parsed.as_array().unwrap();
        assert_eq!(array.len(), 2);
        assert_eq!(array[0]["name"], "workflow:started");
        assert_eq!(array[1]["payload"]["task_id"], "t-1");
    }

    #[test]
    fn test_csv_export_quotes_awkward_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.csv");

        EventLogExporter::write_csv(&entries(), &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][1], "workflow:started");
        assert_eq!(&rows[1][2], "wf-1");
        // The payload column survives commas and quotes intact
        let payload: serde_json::Value = serde_json::from_str(&rows[1][4]).unwrap();
        assert_eq!(payload["note"], "has, commas \"and\" quotes");
    }

    #[test]
    fn test_empty_log_still_writes_csv_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");

        EventLogExporter::write_csv(&[], &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("occurred_at,name,aggregate_id"));
    }
}
