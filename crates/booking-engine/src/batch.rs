//! Best-effort batch results.

use serde::Serialize;

/// Outcome of a batch where each item is attempted independently.
///
/// A failing item never aborts the batch; it is recorded in `failed`
/// together with the reason it was rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutcome<T, I> {
    pub succeeded: Vec<T>,
    pub failed: Vec<BatchFailure<I>>,
}

/// A rejected batch item and the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure<I> {
    pub item: I,
    pub reason: String,
}

impl<T, I> BatchOutcome<T, I> {
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// True when no item failed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub(crate) fn push_failure(&mut self, item: I, reason: impl ToString) {
        self.failed.push(BatchFailure {
            item,
            reason: reason.to_string(),
        });
    }
}

impl<T, I> Default for BatchOutcome<T, I> {
    fn default() -> Self {
        Self::new()
    }
}
