use std::num::{NonZeroU64, NonZeroUsize};

use comms::specs::coordinator::{BudgetSpec, CoordinatorSpec};

use crate::{ConfigErr, Result};

/// Immutable control parameters of a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    max_minibatches: u64,
    patience: NonZeroUsize,
    validation_interval: NonZeroU64,
}

impl CoordinatorConfig {
    /// Creates a new coordinator configuration.
    ///
    /// # Arguments
    /// * `max_minibatches` - Training stops once more minibatches than this are reported.
    /// * `patience` - Non-improving validation rounds tolerated before stopping.
    /// * `validation_interval` - Minibatch-count modulus that triggers a validation round.
    ///
    /// # Returns
    /// The configuration or a `ConfigErr` if `patience` or `validation_interval` are zero.
    pub fn new(max_minibatches: u64, patience: usize, validation_interval: u64) -> Result<Self> {
        let patience = NonZeroUsize::new(patience).ok_or(ConfigErr::ZeroPatience)?;
        let validation_interval =
            NonZeroU64::new(validation_interval).ok_or(ConfigErr::ZeroValidationInterval)?;

        Ok(Self {
            max_minibatches,
            patience,
            validation_interval,
        })
    }

    pub fn max_minibatches(&self) -> u64 {
        self.max_minibatches
    }

    pub fn patience(&self) -> usize {
        self.patience.get()
    }

    pub fn validation_interval(&self) -> u64 {
        self.validation_interval.get()
    }
}

/// Resolves the hard minibatch budget of a run.
fn minibatch_budget(budget: BudgetSpec) -> Result<u64> {
    match budget {
        BudgetSpec::Minibatches { max_minibatches } => Ok(max_minibatches),
        BudgetSpec::Epochs {
            epochs,
            dataset_size,
            batch_size,
        } => {
            if epochs == 0 || dataset_size == 0 || batch_size == 0 {
                return Err(ConfigErr::InvalidBudget(format!(
                    "epochs ({epochs}), dataset size ({dataset_size}) and batch size ({batch_size}) must be non zero"
                )));
            }

            let samples = epochs.checked_mul(dataset_size).ok_or_else(|| {
                ConfigErr::InvalidBudget(format!("{epochs} epochs of {dataset_size} samples overflow"))
            })?;

            Ok(samples / batch_size)
        }
    }
}

impl TryFrom<CoordinatorSpec> for CoordinatorConfig {
    type Error = ConfigErr;

    fn try_from(spec: CoordinatorSpec) -> Result<Self> {
        let max_minibatches = minibatch_budget(spec.budget)?;
        Self::new(max_minibatches, spec.patience, spec.validation_interval)
    }
}
