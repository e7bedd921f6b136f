use std::{error::Error, fmt, io};

use comms::msg::Directive;
use param_sync::SyncErr;

/// The worker module's result type.
pub type Result<T> = std::result::Result<T, WorkerErr>;

/// Worker runtime failures.
#[derive(Debug)]
pub enum WorkerErr {
    Io(io::Error),
    Sync(SyncErr),
    /// The coordinator answered with an error frame.
    Protocol(String),
    UnexpectedDirective {
        request: &'static str,
        got: Option<Directive>,
    },
    Trainer(String),
    /// The data channel closed while the worker still expected minibatches.
    FeedClosed,
}

impl fmt::Display for WorkerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerErr::Io(e) => write!(f, "io error: {e}"),
            WorkerErr::Sync(e) => write!(f, "sync error: {e}"),
            WorkerErr::Protocol(detail) => write!(f, "coordinator rejected a request: {detail}"),
            WorkerErr::UnexpectedDirective { request, got } => match got {
                Some(directive) => write!(f, "unexpected reply to {request}: {directive}"),
                None => write!(f, "unexpected silent reply to {request}"),
            },
            WorkerErr::Trainer(detail) => write!(f, "trainer error: {detail}"),
            WorkerErr::FeedClosed => write!(f, "the data channel closed mid training"),
        }
    }
}

impl Error for WorkerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorkerErr::Io(e) => Some(e),
            WorkerErr::Sync(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for WorkerErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<SyncErr> for WorkerErr {
    fn from(value: SyncErr) -> Self {
        Self::Sync(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<WorkerErr> for io::Error {
    fn from(value: WorkerErr) -> Self {
        match value {
            WorkerErr::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
