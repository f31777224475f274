//! Component J (orchestrator) plus the shared fail-fast tracker used by the
//! node and rel builders (spec §5: "the first error from any worker is
//! captured... a stop flag is set").

pub mod column;
pub mod node_builder;
pub mod orchestrator;
pub mod rel_builder;

use parking_lot::Mutex;

use crate::error::{LoadError, Result};

/// Captures the first fatal error raised by any parallel block task.
/// Cooperative cancellation (spec §5) is approximated here by simply letting
/// in-flight tasks finish their current line; `into_result` surfaces only
/// the first failure, matching the orchestrator's propagation contract.
#[derive(Default)]
pub struct FailTracker {
    first: Mutex<Option<LoadError>>,
}

impl FailTracker {
    pub fn record(&self, err: LoadError) {
        let mut guard = self.first.lock();
        if guard.is_none() {
            *guard = Some(err);
        }
    }

    pub fn failed(&self) -> bool {
        self.first.lock().is_some()
    }

    /// Takes the first recorded error, if any, leaving the tracker clear for
    /// reuse across a later phase.
    pub fn take(&self) -> Option<LoadError> {
        self.first.lock().take()
    }

    /// Returns `Err` if a failure was recorded and clears the tracker, or
    /// `Ok(())` otherwise. Use between sequential phases that share one
    /// tracker; unlike the old by-value form this does not consume `self`.
    pub fn check(&self) -> Result<()> {
        match self.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn into_result(self) -> Result<()> {
        match self.first.into_inner() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

pub use column::Column;
pub use node_builder::{build_node_label, NodeBuildOutput};
pub use orchestrator::{run, RunOutput};
pub use rel_builder::{build_rel_label, RelBuildOutput};
