use std::{
    error::Error,
    fmt::{self, Display},
};

/// The specific result type for parameter synchronization.
pub type Result<T> = std::result::Result<T, SyncErr>;

/// Errors raised while configuring or applying a synchronization rule.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncErr {
    /// The local and master parameter sets hold a different amount of tensors.
    PairCount { local: usize, master: usize },
    /// The tensors at `index` don't have the same amount of elements.
    ShapeMismatch {
        index: usize,
        local: usize,
        master: usize,
    },
    /// The blending coefficient is outside `[0, 1]`.
    InvalidAlpha(f32),
}

impl Display for SyncErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PairCount { local, master } => write!(
                f,
                "parameter count mismatch: {local} local tensors, {master} master tensors"
            ),
            Self::ShapeMismatch {
                index,
                local,
                master,
            } => write!(
                f,
                "shape mismatch at tensor {index}: local has {local} elements, master has {master}"
            ),
            Self::InvalidAlpha(alpha) => write!(f, "alpha must be within [0, 1], got {alpha}"),
        }
    }
}

impl Error for SyncErr {}
