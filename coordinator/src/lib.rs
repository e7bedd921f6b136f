//! The training coordinator: decides when a fleet of workers should train,
//! validate or stop, following a patience-based early-stopping protocol.

mod config;
mod coordinator;
mod error;
mod history;
mod service;
mod state;

pub use config::CoordinatorConfig;
pub use coordinator::{Coordinator, CoordinatorStatus};
pub use error::{ConfigErr, Result};
pub use history::{MetricHistory, MetricRecord};
pub use service::{ControlServer, CoordinatorHandle, Dispatcher};
pub use state::StopReason;
