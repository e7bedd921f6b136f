use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// The specification of a worker's optimization loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkerSpec {
    /// Local minibatch steps between two synchronizations with the master parameters.
    pub minibatches_per_sync: NonZeroUsize,
    pub learning_rate: f32,
    pub batch_size: NonZeroUsize,
    pub seed: Option<u64>,
}

impl Default for WorkerSpec {
    fn default() -> Self {
        Self {
            minibatches_per_sync: NonZeroUsize::MIN.saturating_add(9),
            learning_rate: 0.01,
            batch_size: NonZeroUsize::MIN.saturating_add(9),
            seed: None,
        }
    }
}
