use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use super::{
    coordinator::CoordinatorSpec,
    sync::{StoreSpec, SyncRuleSpec},
    worker::WorkerSpec,
};

/// The synthetic dataset the node's workers train on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub features: NonZeroUsize,
    pub samples: NonZeroUsize,
    pub noise: f32,
    pub seed: u64,
}

impl Default for DatasetSpec {
    fn default() -> Self {
        Self {
            features: NonZeroUsize::MIN.saturating_add(7),
            samples: NonZeroUsize::MIN.saturating_add(1997),
            noise: 0.1,
            seed: 1234,
        }
    }
}

/// Where the node's workers get their minibatches from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedSpec {
    /// Every worker samples its own minibatches.
    #[default]
    Local,
    /// A dispatcher pushes minibatches to the workers through a data channel, each
    /// worker buffering at most `hwm` of them.
    Dispatch { hwm: NonZeroUsize },
}

/// Everything a single node needs to run a coordinator and its local workers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub workers: NonZeroUsize,
    pub coordinator: CoordinatorSpec,
    pub sync_rule: SyncRuleSpec,
    pub store: StoreSpec,
    pub worker: WorkerSpec,
    pub dataset: DatasetSpec,
    #[serde(default)]
    pub feed: FeedSpec,
}

impl Default for NodeSpec {
    fn default() -> Self {
        Self {
            workers: NonZeroUsize::MIN.saturating_add(3),
            coordinator: CoordinatorSpec::default(),
            sync_rule: SyncRuleSpec::Easgd { alpha: 0.5 },
            store: StoreSpec::Blocking,
            worker: WorkerSpec::default(),
            dataset: DatasetSpec::default(),
            feed: FeedSpec::default(),
        }
    }
}
