use std::io;

use tokio::io::AsyncRead;

use crate::{
    OnoReceiver,
    msg::{Minibatch, Msg},
};

/// Waits for the next minibatch of the data channel.
///
/// # Returns
/// The minibatch, `None` once the sending end hung up, or an `InvalidData` error if
/// anything else than a minibatch arrives.
pub async fn recv_minibatch<R: AsyncRead + Unpin>(
    receiver: &mut OnoReceiver<R>,
) -> io::Result<Option<Minibatch>> {
    let msg: Msg = match receiver.recv().await {
        Ok(msg) => msg,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    };

    match msg {
        Msg::Batch(batch) => Ok(Some(batch)),
        msg => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("expected a minibatch, got: {msg:?}"),
        )),
    }
}
