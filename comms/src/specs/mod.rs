pub mod coordinator;
pub mod node;
pub mod sync;
pub mod worker;

use std::{env, fs, io, path::Path};

use serde::de::DeserializeOwned;

/// Reads a JSON specification from `path`.
///
/// # Returns
/// The parsed specification or an `io::Error` if the file can't be read or parsed.
pub fn from_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> io::Result<T> {
    let raw = fs::read(path)?;
    Ok(serde_json::from_slice(&raw)?)
}

/// Reads a JSON specification from the file named by the `var` environment variable,
/// falling back to the default specification when it's unset.
pub fn from_env_or_default<T: DeserializeOwned + Default>(var: &str) -> io::Result<T> {
    match env::var_os(var) {
        Some(path) => from_file(path),
        None => Ok(T::default()),
    }
}
