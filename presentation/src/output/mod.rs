//! Output formatting for run results

pub mod console;

pub use console::ConsoleFormatter;
