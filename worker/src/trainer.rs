use comms::msg::{Minibatch, Validation};

use crate::Result;

/// A local optimizer over a set of parameter tensors.
///
/// Calls are CPU-bound and blocking, the worker moves them off the async runtime.
pub trait Trainer: Send {
    /// Returns a fresh set of parameters with the shapes this trainer expects.
    fn init_params(&self) -> Vec<Vec<f32>>;

    /// Runs `minibatches` optimization steps on `params` in place.
    ///
    /// # Returns
    /// An error if `params` doesn't have the expected shapes.
    fn train(&mut self, params: &mut [Vec<f32>], minibatches: usize) -> Result<()>;

    /// Runs a single optimization step on a minibatch received from a dispatcher.
    ///
    /// # Returns
    /// An error if `params` or `batch` don't have the expected shapes.
    fn train_on(&mut self, params: &mut [Vec<f32>], batch: &Minibatch) -> Result<()>;

    /// Computes the validation and test errors of `params`.
    fn evaluate(&self, params: &[Vec<f32>]) -> Result<Validation>;
}
