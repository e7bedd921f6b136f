use serde::{Deserialize, Serialize};

/// The specification for the `SyncRule` trait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncRuleSpec {
    Easgd { alpha: f32 },
    Independent,
}

/// The specification for the `Store` trait holding the master parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreSpec {
    /// Every synchronization holds a lock over the whole parameter set.
    Blocking,
    /// Lock-free synchronization, concurrent updates may race per element.
    Wild,
}
