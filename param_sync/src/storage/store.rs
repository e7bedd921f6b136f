use crate::{Result, SyncRule};

/// Owns the master parameters shared by every worker of a run.
///
/// Implementations decide the concurrency discipline of `sync`, they live as long
/// as the process and any holder may mutate them through `sync`.
pub trait Store: Send + Sync {
    /// Returns the element count of every master tensor, in order.
    fn shapes(&self) -> Vec<usize>;

    /// Returns the total amount of scalar parameters.
    fn len(&self) -> usize {
        self.shapes().iter().sum()
    }

    /// Copies the master parameters into `out`.
    ///
    /// # Returns
    /// A `SyncErr` if `out` doesn't match the master shapes.
    fn pull_params(&self, out: &mut [Vec<f32>]) -> Result<()>;

    /// Synchronizes `local` with the master parameters following `rule`.
    ///
    /// # Arguments
    /// * `rule` - The synchronization rule.
    /// * `local` - The worker's parameters, updated in place.
    ///
    /// # Returns
    /// A `SyncErr` if `local` doesn't match the master shapes, nothing is updated then.
    fn sync(&self, rule: &dyn SyncRule, local: &mut [Vec<f32>]) -> Result<()>;

    /// Returns an owned copy of the master parameters.
    fn snapshot(&self) -> Vec<Vec<f32>> {
        let mut out: Vec<_> = self.shapes().into_iter().map(|n| vec![0.; n]).collect();

        let res = self.pull_params(&mut out);
        debug_assert!(res.is_ok(), "store rejected its own shapes: {res:?}");
        out
    }
}
