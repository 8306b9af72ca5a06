//! JSONL file writer for domain events.
//!
//! Each published event becomes a single JSON line: the serialized
//! [`DomainEvent`] plus its flat `category:event` name, appended through a
//! buffered writer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;
use webpilot_application::{EventHandler, HandlerResult};
use webpilot_domain::DomainEvent;

/// JSONL event sink that writes one JSON object per line.
///
/// Registered on the event bus like any other handler. Thread-safe via
/// `Mutex<BufWriter<File>>`; flushes on every write and on `Drop`.
pub struct JsonlEventSink {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlEventSink {
    /// Create a new sink writing to the given path.
    ///
    /// Missing parent directories are created. Returns `None` when the
    /// file cannot be opened, so callers can run without an event log.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create event log directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match File::create(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not create event log file {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    /// Path the sink writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventHandler for JsonlEventSink {
    fn name(&self) -> &str {
        "jsonl-sink"
    }

    fn handle(&self, event: &DomainEvent) -> HandlerResult {
        let mut record = serde_json::to_value(event)?;
        if let serde_json::Value::Object(map) = &mut record {
            // Flat name alongside the snake_case kind, for grep and jq
            map.insert(
                "name".to_string(),
                serde_json::Value::String(event.kind.name().to_string()),
            );
        }
        let line = serde_json::to_string(&record)?;

        let mut writer = self.writer.lock().map_err(|_| "event log lock poisoned")?;
        writeln!(writer, "{line}")?;
        // Flush per event so a crash loses at most the line in flight
        writer.flush()?;
        Ok(())
    }
}

impl Drop for JsonlEventSink {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}
