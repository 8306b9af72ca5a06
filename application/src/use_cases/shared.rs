//! Shared utilities for use cases.
//!
//! Currently just cancellation checking; the run loop calls this at every
//! suspension point so an abort lands between browser/model calls, never
//! in the middle of one.

use crate::use_cases::run_workflow::WorkflowError;
use tokio_util::sync::CancellationToken;

/// Check if cancellation has been requested.
///
/// Returns `Err(WorkflowError::Cancelled)` if the token exists and is cancelled.
pub(crate) fn check_cancelled(token: &Option<CancellationToken>) -> Result<(), WorkflowError> {
    if let Some(token) = token
        && token.is_cancelled()
    {
        return Err(WorkflowError::Cancelled);
    }
    Ok(())
}
