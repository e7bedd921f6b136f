use std::io;

use tokio::io::AsyncWrite;

use crate::{
    OnoSender,
    msg::{Minibatch, Msg},
};

/// Pushes a minibatch through the data channel.
///
/// It may wait if batches are sent faster than the other end consumes them.
///
/// # Arguments
/// * `sender` - The sending end of the data channel.
/// * `batch` - The minibatch to send.
pub async fn send_minibatch<W: AsyncWrite + Unpin>(
    sender: &mut OnoSender<W>,
    batch: Minibatch,
) -> io::Result<()> {
    sender.send(&Msg::Batch(batch)).await
}
