mod easgd;
mod independent;
mod sync_rule;

pub use easgd::Easgd;
pub use independent::Independent;
pub use sync_rule::{Delta, SyncRule, check_shapes};
