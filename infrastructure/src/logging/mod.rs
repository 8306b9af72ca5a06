//! Logging infrastructure — event persistence to files.
//!
//! Provides [`JsonlEventSink`], a JSONL writer registered on the event bus
//! as a handler, and [`EventLogExporter`] for one-shot JSON/CSV exports of
//! captured event records.

mod export;
mod jsonl_sink;

pub use export::{EventLogExporter, ExportError};
pub use jsonl_sink::JsonlEventSink;
