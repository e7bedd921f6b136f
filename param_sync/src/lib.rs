//! Parameter synchronization between a worker's local parameters and the shared
//! master parameters.
//!
//! A `SyncRule` says how a `(local, master)` pair moves, a `Store` owns the master
//! parameters and decides how concurrent synchronizations are serialized (or not).

mod builder;
mod error;
mod rule;
mod storage;

pub use builder::SyncBuilder;
pub use error::{Result, SyncErr};
pub use rule::{Delta, Easgd, Independent, SyncRule, check_shapes};
pub use storage::{BlockingStore, Store, StoreHandle, WildStore};
