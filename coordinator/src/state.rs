use std::{fmt, time::Instant};

use crate::MetricRecord;

/// Why a run was stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// More minibatches than the budget were reported.
    Budget,
    /// The validation error didn't improve for longer than the patience.
    Patience,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Budget => f.write_str("max minibatches"),
            StopReason::Patience => f.write_str("patience"),
        }
    }
}

/// The mutable control state of a coordinator, only touched while handling a request.
#[derive(Debug, Default)]
pub(crate) struct CoordinatorState {
    pub completed_minibatches: u64,
    /// Advisory, never drives a decision.
    pub epoch_index: u64,
    pub bad_steps: usize,
    pub pending_validation: bool,
    /// The last report answered with `best`.
    pub best: Option<MetricRecord>,
    pub stop_reason: Option<StopReason>,
    pub started_at: Option<Instant>,
    pub stopped_at: Option<Instant>,
}

impl CoordinatorState {
    pub fn is_terminated(&self) -> bool {
        self.stop_reason.is_some()
    }
}
