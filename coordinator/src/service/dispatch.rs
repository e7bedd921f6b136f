use std::io;

use comms::{OnoSender, msg::Minibatch};
use log::{debug, warn};
use tokio::io::AsyncWrite;

/// Pushes minibatches to the connected workers' data channels, round robin.
///
/// A connection that fails is dropped, the others keep receiving.
pub struct Dispatcher<W: AsyncWrite + Unpin> {
    senders: Vec<OnoSender<W>>,
    next: usize,
}

impl<W: AsyncWrite + Unpin> Default for Dispatcher<W> {
    fn default() -> Self {
        Self {
            senders: Vec::new(),
            next: 0,
        }
    }
}

impl<W: AsyncWrite + Unpin> Dispatcher<W> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a new worker data channel.
    pub fn add(&mut self, sender: OnoSender<W>) {
        self.senders.push(sender);
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Sends `batch` to the next worker in turn.
    ///
    /// Waits while that worker's channel is full.
    ///
    /// # Returns
    /// A `BrokenPipe` error once every connection is gone.
    pub async fn send_mb(&mut self, batch: Minibatch) -> io::Result<()> {
        while !self.senders.is_empty() {
            let idx = self.next % self.senders.len();

            match comms::send_minibatch(&mut self.senders[idx], batch.clone()).await {
                Ok(()) => {
                    self.next = idx + 1;
                    return Ok(());
                }
                Err(e) => {
                    warn!("dropping data channel {idx}: {e}");
                    self.senders.swap_remove(idx);
                    self.next = idx;
                }
            }
        }

        debug!("no data channel left");
        Err(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "every data channel is closed",
        ))
    }
}

#[cfg(test)]
mod tests {
    use comms::msg::Array;
    use tokio::io::{self, DuplexStream, ReadHalf, WriteHalf};

    use super::*;

    fn batch(value: f32) -> Minibatch {
        Minibatch {
            arrays: vec![Array {
                shape: vec![1],
                data: vec![value],
            }],
        }
    }

    fn data_channel() -> (
        OnoSender<WriteHalf<DuplexStream>>,
        comms::OnoReceiver<ReadHalf<DuplexStream>>,
    ) {
        let (one, two) = io::duplex(4096);
        let (_, tx) = io::split(one);
        let (rx, _) = io::split(two);
        let (_, sender) = comms::channel(io::empty(), tx);
        let (receiver, _) = comms::channel(rx, io::sink());
        (sender, receiver)
    }

    async fn value(rx: &mut comms::OnoReceiver<ReadHalf<DuplexStream>>) -> f32 {
        let batch = comms::recv_minibatch(rx).await.unwrap().unwrap();
        batch.arrays[0].data[0]
    }

    #[tokio::test]
    async fn batches_go_round_robin() {
        let mut dispatcher = Dispatcher::new();
        let (tx1, mut rx1) = data_channel();
        let (tx2, mut rx2) = data_channel();
        dispatcher.add(tx1);
        dispatcher.add(tx2);

        for i in 0..4 {
            dispatcher.send_mb(batch(i as f32)).await.unwrap();
        }

        assert_eq!(value(&mut rx1).await, 0.);
        assert_eq!(value(&mut rx2).await, 1.);
        assert_eq!(value(&mut rx1).await, 2.);
        assert_eq!(value(&mut rx2).await, 3.);
    }

    #[tokio::test]
    async fn closed_channels_are_dropped() {
        let mut dispatcher = Dispatcher::new();
        let (tx1, rx1) = data_channel();
        let (tx2, mut rx2) = data_channel();
        dispatcher.add(tx1);
        dispatcher.add(tx2);
        drop(rx1);

        dispatcher.send_mb(batch(1.)).await.unwrap();
        assert_eq!(dispatcher.len(), 1);
        assert_eq!(value(&mut rx2).await, 1.);

        drop(rx2);
        let err = dispatcher.send_mb(batch(2.)).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(dispatcher.is_empty());
    }
}
