use comms::specs::sync::{StoreSpec, SyncRuleSpec};
use log::info;

use crate::{BlockingStore, Easgd, Independent, Result, StoreHandle, SyncRule, WildStore};

/// Builds synchronization rules and master stores given a specification.
#[derive(Debug, Default)]
pub struct SyncBuilder;

impl SyncBuilder {
    /// Creates a new `SyncBuilder`.
    pub fn new() -> Self {
        Self
    }

    /// Builds the `SyncRule` described by `spec`.
    ///
    /// # Returns
    /// The rule or a `SyncErr::InvalidAlpha` if the coefficient is out of range.
    pub fn build_rule(&self, spec: SyncRuleSpec) -> Result<Box<dyn SyncRule>> {
        let rule: Box<dyn SyncRule> = match spec {
            SyncRuleSpec::Easgd { alpha } => Box::new(Easgd::new(alpha)?),
            SyncRuleSpec::Independent => Box::new(Independent),
        };

        Ok(rule)
    }

    /// Builds the master `Store` described by `spec`.
    ///
    /// # Arguments
    /// * `spec` - The concurrency discipline of the store.
    /// * `params` - The initial master parameters.
    pub fn build_store(&self, spec: StoreSpec, params: Vec<Vec<f32>>) -> StoreHandle {
        let tensors = params.len();

        let handle = match spec {
            StoreSpec::Blocking => StoreHandle::new(BlockingStore::new(params)),
            StoreSpec::Wild => StoreHandle::new(WildStore::new(params)),
        };

        info!(tensors = tensors, params = handle.len(); "master parameters ready ({spec:?} store)");
        handle
    }
}
