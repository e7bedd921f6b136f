use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type for building a coordinator.
pub type Result<T> = std::result::Result<T, ConfigErr>;

/// Rejected coordinator configuration, caught at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigErr {
    ZeroPatience,
    ZeroValidationInterval,
    InvalidBudget(String),
}

impl Display for ConfigErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroPatience => f.write_str("patience must be greater than zero"),
            Self::ZeroValidationInterval => {
                f.write_str("validation interval must be greater than zero")
            }
            Self::InvalidBudget(detail) => write!(f, "invalid minibatch budget: {detail}"),
        }
    }
}

impl Error for ConfigErr {}

/// Boundary conversion for binaries.
impl From<ConfigErr> for io::Error {
    fn from(value: ConfigErr) -> Self {
        io::Error::new(io::ErrorKind::InvalidInput, value)
    }
}
