use std::num::NonZeroUsize;

use comms::specs::worker::WorkerSpec;

/// Immutable execution bounds for a worker instance.
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    minibatches_per_sync: NonZeroUsize,
}

impl WorkerConfig {
    /// Creates a new worker configuration.
    ///
    /// # Args
    /// * `minibatches_per_sync` - Local steps to run for every `train` directive.
    ///
    /// # Returns
    /// A `WorkerConfig` instance.
    pub fn new(minibatches_per_sync: NonZeroUsize) -> Self {
        Self {
            minibatches_per_sync,
        }
    }

    /// Returns the amount of local steps between two synchronizations.
    pub fn minibatches_per_sync(&self) -> usize {
        self.minibatches_per_sync.get()
    }
}

impl From<&WorkerSpec> for WorkerConfig {
    fn from(spec: &WorkerSpec) -> Self {
        Self::new(spec.minibatches_per_sync)
    }
}
