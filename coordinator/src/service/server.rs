use std::{io, net::SocketAddr, time::Duration};

use comms::{OnoReceiver, OnoSender, msg::Msg};
use log::{debug, error, info, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpListener, TcpStream},
    task::JoinSet,
    time,
};

use crate::CoordinatorHandle;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Serves the control protocol of a coordinator, one task per connected worker.
pub struct ControlServer {
    coordinator: CoordinatorHandle,
    tasks: JoinSet<io::Result<()>>,
}

impl ControlServer {
    /// Creates a new `ControlServer`.
    ///
    /// # Arguments
    /// * `coordinator` - The coordinator answering the requests.
    pub fn new(coordinator: CoordinatorHandle) -> Self {
        Self {
            coordinator,
            tasks: JoinSet::new(),
        }
    }

    pub fn coordinator(&self) -> &CoordinatorHandle {
        &self.coordinator
    }

    /// Binds a new worker connection and spawns its request loop.
    ///
    /// Each request gets exactly one reply frame. Undecodable frames are answered with
    /// an error frame and the connection stays open. The loop ends once the worker hangs up.
    ///
    /// # Arguments
    /// * `rx` - The receiving end of the communication.
    /// * `tx` - The sending end of the communication.
    pub fn spawn<R, W>(&mut self, mut rx: OnoReceiver<R>, mut tx: OnoSender<W>)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let coordinator = self.coordinator.clone();

        let task = async move {
            loop {
                let msg: Msg = match rx.recv().await {
                    Ok(msg) => msg,
                    Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
                    Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                        warn!("malformed request: {e}");
                        tx.send(&Msg::Err(e.to_string())).await?;
                        continue;
                    }
                    Err(e) => return Err(e),
                };

                let reply = match msg {
                    Msg::Request(req) => Msg::Reply(coordinator.handle(&req)),
                    msg => {
                        warn!("unexpected message kind: {msg:?}");
                        Msg::Err(format!("expected a request, got: {msg:?}"))
                    }
                };

                tx.send(&reply).await?;
            }
        };

        self.tasks.spawn(task);
    }

    /// Waits for every connected worker to hang up.
    ///
    /// # Returns
    /// The first connection error, if any.
    pub async fn run(&mut self) -> io::Result<()> {
        while let Some(res) = self.tasks.join_next().await {
            res??
        }

        Ok(())
    }

    /// Accepts workers from `listener` forever, reaping finished connections along the way.
    ///
    /// Neither a failing connection nor a failed accept brings the server down.
    pub async fn serve(&mut self, listener: TcpListener) -> io::Result<()> {
        loop {
            tokio::select! {
                accepted = listener.accept() => self.accept(accepted).await,
                Some(res) = self.tasks.join_next() => match res {
                    Ok(Ok(())) => debug!("worker disconnected"),
                    Ok(Err(e)) => warn!("worker connection failed: {e}"),
                    Err(e) => error!("worker task panicked: {e}"),
                },
            }
        }
    }

    /// Binds an accepted connection. A failed accept is logged and backed off from,
    /// so a full descriptor table doesn't spin the loop.
    pub(crate) async fn accept(&mut self, accepted: io::Result<(TcpStream, SocketAddr)>) {
        match accepted {
            Ok((stream, addr)) => {
                info!("worker connected from {addr}");

                let (rx, tx) = stream.into_split();
                let (rx, tx) = comms::channel(rx, tx);
                self.spawn(rx, tx);
            }
            Err(e) => {
                warn!("couldn't accept a worker: {e}");
                time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}
