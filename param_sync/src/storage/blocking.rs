use parking_lot::RwLock;

use crate::{Result, Store, SyncRule, check_shapes};

/// Master parameters guarded by a single lock over the whole parameter set.
///
/// Every `sync` is atomic with respect to the others, results are reproducible
/// for a given arrival order at the cost of contention between workers.
#[derive(Debug)]
pub struct BlockingStore {
    shapes: Vec<usize>,
    params: RwLock<Vec<Vec<f32>>>,
}

impl BlockingStore {
    /// Creates a new `BlockingStore`.
    ///
    /// # Arguments
    /// * `params` - The initial state of the master parameters.
    ///
    /// # Returns
    /// A new `BlockingStore` instance.
    pub fn new(params: Vec<Vec<f32>>) -> Self {
        Self {
            shapes: params.iter().map(Vec::len).collect(),
            params: RwLock::new(params),
        }
    }
}

impl Store for BlockingStore {
    fn shapes(&self) -> Vec<usize> {
        self.shapes.clone()
    }

    fn pull_params(&self, out: &mut [Vec<f32>]) -> Result<()> {
        check_shapes(out.iter().map(Vec::len), self.shapes.iter().copied())?;

        let params = self.params.read();
        out.iter_mut()
            .zip(params.iter())
            .for_each(|(out, params)| out.copy_from_slice(params));

        Ok(())
    }

    fn sync(&self, rule: &dyn SyncRule, local: &mut [Vec<f32>]) -> Result<()> {
        let mut master = self.params.write();
        rule.update_params(local, &mut master)
    }
}
