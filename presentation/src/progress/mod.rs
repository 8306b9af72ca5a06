//! Progress reporters for the terminal

pub mod reporter;

pub use reporter::{ConsoleReporter, PlainReporter};
