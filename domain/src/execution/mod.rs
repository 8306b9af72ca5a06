//! Execution domain module
//!
//! The mutable context the run happens in, and the immutable record of
//! every browser action taken.

pub mod aggregate;
pub mod context;
pub mod result;

pub use aggregate::ExecutionAggregate;
pub use context::{BrowserStorage, ExecutionContext};
pub use result::{Evidence, EvidenceKind, ExecutionResult, TaskOutcome};
