//! Shared failure policy for the tree walkers.
//!
//! A non-cancellation error either aborts the walk (the default) or, in
//! failure-tolerant mode, is logged, recorded as a partial failure and
//! skipped. Cancellations always abort and are never counted.

use tracing::error;

use crate::errors::ShuttleError;
use crate::outcome::Outcome;

/// What the walker should do after an error was absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Go on with the next entry.
    Continue,
    /// Do not descend into the directory that failed.
    SkipSubtree,
}

#[derive(Debug, Clone, Copy)]
pub struct FailurePolicy {
    pub skip_failed: bool,
    /// Value of the `op` log field.
    pub op: &'static str,
}

impl FailurePolicy {
    pub fn new(skip_failed: bool, op: &'static str) -> Self {
        Self { skip_failed, op }
    }

    /// Absorb `err` or hand it back. `is_dir` tells whether the failing entry
    /// is a directory that was just visited (its subtree gets skipped).
    pub fn handle(
        &self,
        err: ShuttleError,
        is_dir: bool,
        outcome: &mut Outcome,
    ) -> Result<Flow, ShuttleError> {
        if err.is_cancelled() || !self.skip_failed {
            return Err(err);
        }

        outcome.has_partial_failures = true;
        error!(
            op = self.op,
            error = %err,
            kind = err.kind(),
            integrity = err.is_integrity(),
            reason = "error_occurred",
            "path skipped"
        );

        Ok(if is_dir { Flow::SkipSubtree } else { Flow::Continue })
    }
}
