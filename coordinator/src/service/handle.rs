use std::sync::Arc;

use comms::msg::{Directive, Request};
use parking_lot::Mutex;

use crate::{Coordinator, CoordinatorStatus};

/// A cheaply clonable handle that serializes every request to a shared `Coordinator`.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    inner: Arc<Mutex<Coordinator>>,
}

impl CoordinatorHandle {
    /// Creates a new `CoordinatorHandle` owning `coordinator`.
    pub fn new(coordinator: Coordinator) -> Self {
        Self {
            inner: Arc::new(Mutex::new(coordinator)),
        }
    }

    /// Handles `req` with exclusive access to the coordinator.
    ///
    /// # Arguments
    /// * `req` - The request received from a worker.
    ///
    /// # Returns
    /// The directive for the worker, if any.
    pub fn handle(&self, req: &Request) -> Option<Directive> {
        self.inner.lock().handle(req)
    }

    pub fn status(&self) -> CoordinatorStatus {
        self.inner.lock().status()
    }
}
