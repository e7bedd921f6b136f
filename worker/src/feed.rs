use std::num::NonZeroUsize;

use comms::{OnoReceiver, msg::Minibatch, recv_minibatch};
use log::{debug, warn};
use tokio::{io::AsyncRead, sync::mpsc, task};

/// Spawns a task that reads minibatches from a dispatcher into a bounded queue.
///
/// The queue holds at most `hwm` batches, once it is full the task stops reading and
/// the dispatcher is held back by the transport.
///
/// # Arguments
/// * `rx` - The receiving end of the data channel.
/// * `hwm` - How many batches may be buffered ahead of the worker.
///
/// # Returns
/// The receiving end of the queue. It closes when the dispatcher hangs up, a frame
/// fails to decode or the worker drops it.
pub fn spawn_feed<R>(mut rx: OnoReceiver<R>, hwm: NonZeroUsize) -> mpsc::Receiver<Minibatch>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, feed) = mpsc::channel(hwm.get());

    task::spawn(async move {
        loop {
            match recv_minibatch(&mut rx).await {
                Ok(Some(batch)) => {
                    if tx.send(batch).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    debug!("dispatcher closed the data channel");
                    break;
                }
                Err(e) => {
                    warn!("dropping data channel: {e}");
                    break;
                }
            }
        }
    });

    feed
}
