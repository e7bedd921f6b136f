use std::io;

/// Writes the body of a frame into a buffer.
pub trait Serialize {
    /// Appends the serialized form of `self` to `buf`.
    ///
    /// # Arguments
    /// * `buf` - The buffer to write into, it may already hold a prefix.
    ///
    /// # Returns
    /// An `io::Error` if the value can't be encoded.
    fn serialize(&self, buf: &mut Vec<u8>) -> io::Result<()>;
}
