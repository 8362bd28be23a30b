//! One-shot hand-off of an analysis result between screens
//!
//! The upload step deposits its completed result here; the intake form
//! consumes it exactly once. Reading clears the slot, so a reload or
//! back-navigation cannot redeliver the same result.

use crate::services::AnalysisResult;
use std::sync::Mutex;

/// Single-use message slot for the upload → intake hand-off
#[derive(Debug, Default)]
pub struct AnalysisHandoff {
    slot: Mutex<Option<AnalysisResult>>,
}

impl AnalysisHandoff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deposit a completed analysis result
    ///
    /// A later analysis silently replaces any undelivered earlier one.
    pub fn deposit(&self, result: AnalysisResult) {
        *self.lock() = Some(result);
    }

    /// Consume the pending result, clearing the slot
    pub fn take(&self) -> Option<AnalysisResult> {
        self.lock().take()
    }

    /// Whether a result is waiting to be consumed
    pub fn is_pending(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<AnalysisResult>> {
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
