//! The worker side of a training run: the control client speaking to the coordinator,
//! the local optimization loop and the trainers it drives.

mod config;
mod control;
mod error;
mod feed;
mod linear;
mod metrics;
mod trainer;
mod worker;

pub use config::WorkerConfig;
pub use control::{Control, ControlClient, poll_next};
pub use error::{Result, WorkerErr};
pub use feed::spawn_feed;
pub use linear::LinearRegression;
pub use metrics::WorkerMetrics;
pub use trainer::Trainer;
pub use worker::{Worker, WorkerReport};
