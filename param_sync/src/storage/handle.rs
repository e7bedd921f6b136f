use std::{ops::Deref, sync::Arc};

use log::trace;
use tokio::task;

use crate::{Result, Store, SyncRule};

/// The shared interface to the master parameters.
///
/// It bridges the async runtime with the blocking CPU-bound implementation of the `Store`,
/// so it must be used from a multi-threaded runtime.
#[derive(Clone)]
pub struct StoreHandle(Arc<dyn Store>);

impl Deref for StoreHandle {
    type Target = dyn Store;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl StoreHandle {
    /// Creates a new `StoreHandle`.
    ///
    /// # Arguments
    /// * `store` - The underlying master parameter store.
    ///
    /// # Returns
    /// A new `StoreHandle` instance.
    pub fn new<S: Store + 'static>(store: S) -> Self {
        Self(Arc::new(store))
    }

    /// Async call to the synchronous implementation of `Store::sync`.
    ///
    /// # Arguments
    /// * `rule` - The synchronization rule.
    /// * `local` - The worker's parameters, updated in place.
    ///
    /// # Returns
    /// A `SyncErr` if `local` doesn't match the master shapes.
    pub async fn sync(&self, rule: &dyn SyncRule, local: &mut [Vec<f32>]) -> Result<()> {
        trace!(tensors = local.len(); "syncing with master parameters");
        task::block_in_place(|| self.0.sync(rule, local))
    }

    /// Async call to the synchronous implementation of `Store::pull_params`.
    ///
    /// # Arguments
    /// * `out` - Where the master parameters will be copied.
    ///
    /// # Returns
    /// A `SyncErr` if `out` doesn't match the master shapes.
    pub async fn pull_params(&self, out: &mut [Vec<f32>]) -> Result<()> {
        task::block_in_place(|| self.0.pull_params(out))
    }
}
