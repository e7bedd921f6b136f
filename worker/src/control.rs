use comms::{
    OnoReceiver, OnoSender,
    msg::{Directive, Msg, Report, Request},
};
use coordinator::CoordinatorHandle;
use log::debug;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{
        TcpStream, ToSocketAddrs,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
};

use crate::{Result, WorkerErr};

/// The worker's view of the coordinator.
///
/// Every request gets at most one directive back, `None` being the silent reply.
#[trait_variant::make(Control: Send)]
pub trait LocalControl {
    /// Sends `req` to the coordinator and waits for its reply.
    ///
    /// # Arguments
    /// * `req` - The request to send.
    ///
    /// # Returns
    /// The directive for this worker, if any.
    async fn request(&mut self, req: Request) -> Result<Option<Directive>>;
}

/// Asks the coordinator for the next action to perform.
///
/// # Returns
/// The directive, a silent reply is a protocol violation.
pub async fn poll_next<C: Control>(control: &mut C) -> Result<Directive> {
    Control::request(control, Request::PollNext)
        .await?
        .ok_or(WorkerErr::UnexpectedDirective {
            request: "next",
            got: None,
        })
}

/// The network client of a coordinator's control server.
pub struct ControlClient<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    rx: OnoReceiver<R>,
    tx: OnoSender<W>,
}

impl<R, W> ControlClient<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Creates a new `ControlClient` over an already established channel.
    ///
    /// # Arguments
    /// * `rx` - The receiving end of the communication.
    /// * `tx` - The sending end of the communication.
    pub fn new(rx: OnoReceiver<R>, tx: OnoSender<W>) -> Self {
        Self { rx, tx }
    }

    pub async fn poll_next(&mut self) -> Result<Directive> {
        poll_next(self).await
    }

    /// Reports `done` freshly trained minibatches.
    pub async fn report_progress(&mut self, done: u64) -> Result<Option<Directive>> {
        Control::request(self, Request::progress(done)).await
    }

    /// Reports the errors obtained on the monitoring datasets.
    pub async fn report_validation(
        &mut self,
        valid_err: f64,
        test_err: f64,
    ) -> Result<Option<Directive>> {
        Control::request(self, Request::validation(valid_err, test_err)).await
    }

    /// Sends progress and validation in a single request, progress is evaluated first.
    pub async fn report(&mut self, report: Report) -> Result<Option<Directive>> {
        Control::request(self, Request::Report(report)).await
    }
}

impl ControlClient<OwnedReadHalf, OwnedWriteHalf> {
    /// Connects to the control server listening at `addr`.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (rx, tx) = stream.into_split();
        let (rx, tx) = comms::channel(rx, tx);
        Ok(Self::new(rx, tx))
    }
}

impl<R, W> Control for ControlClient<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn request(&mut self, req: Request) -> Result<Option<Directive>> {
        self.tx.send(&Msg::Request(req)).await?;

        match self.rx.recv().await? {
            Msg::Reply(directive) => {
                debug!("{req:?} -> {directive:?}");
                Ok(directive)
            }
            Msg::Err(detail) => Err(WorkerErr::Protocol(detail)),
            msg => Err(WorkerErr::Protocol(format!(
                "expected a reply, got: {msg:?}"
            ))),
        }
    }
}

/// In-process control, requests go straight to the shared coordinator.
impl Control for CoordinatorHandle {
    async fn request(&mut self, req: Request) -> Result<Option<Directive>> {
        Ok(self.handle(&req))
    }
}
