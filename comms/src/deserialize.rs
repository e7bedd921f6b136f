use std::io;

/// Reads a value back from the body of a frame.
pub trait Deserialize: Sized {
    /// Decodes a value from `buf`.
    ///
    /// # Returns
    /// An `io::Error` of kind `InvalidData` if `buf` doesn't hold a valid value.
    fn deserialize(buf: &[u8]) -> io::Result<Self>;
}
