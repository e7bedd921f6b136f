use comms::{
    OnoReceiver, OnoSender,
    msg::{Directive, Msg, Report, Validation},
};
use coordinator::{ControlServer, Coordinator, CoordinatorConfig, CoordinatorHandle};
use tokio::io::{self, DuplexStream, ReadHalf, WriteHalf};
use worker::{ControlClient, WorkerErr};

type Channel = (
    OnoReceiver<ReadHalf<DuplexStream>>,
    OnoSender<WriteHalf<DuplexStream>>,
);

fn channel_pair() -> (Channel, Channel) {
    let (stream1, stream2) = io::duplex(4096);
    let (rx1, tx1) = io::split(stream1);
    let (rx2, tx2) = io::split(stream2);
    let chan1 = comms::channel(rx1, tx1);
    let chan2 = comms::channel(rx2, tx2);
    (chan1, chan2)
}

fn client_and_server(
    max_minibatches: u64,
) -> (
    ControlClient<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>,
    ControlServer,
) {
    let config = CoordinatorConfig::new(max_minibatches, 2, 10).unwrap();
    let mut server = ControlServer::new(CoordinatorHandle::new(Coordinator::new(config)));

    let ((wk_rx, wk_tx), (sv_rx, sv_tx)) = channel_pair();
    server.spawn(sv_rx, sv_tx);

    (ControlClient::new(wk_rx, wk_tx), server)
}

/// Answers every request with `reply`.
async fn mock_coordinator(chan: Channel, reply: Msg) -> io::Result<()> {
    let (mut rx, mut tx) = chan;
    loop {
        match rx.recv::<Msg>().await {
            Ok(_) => tx.send(&reply).await?,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e),
        }
    }
}

#[tokio::test]
async fn client_follows_the_control_protocol() {
    let (mut client, mut server) = client_and_server(25);

    assert_eq!(client.poll_next().await.unwrap(), Directive::Train);
    assert_eq!(client.report_progress(10).await.unwrap(), None);
    assert_eq!(client.poll_next().await.unwrap(), Directive::Valid);
    assert_eq!(
        client.report_validation(0.5, 0.7).await.unwrap(),
        Some(Directive::Best)
    );

    let merged = Report {
        progress: Some(20),
        validation: Some(Validation {
            valid_err: 0.1,
            test_err: 0.2,
        }),
    };
    assert_eq!(client.report(merged).await.unwrap(), Some(Directive::Stop));
    assert_eq!(client.poll_next().await.unwrap(), Directive::Stop);

    drop(client);
    server.run().await.unwrap();
}

#[tokio::test]
async fn non_finite_reports_fail_without_breaking_the_connection() {
    let (mut client, mut server) = client_and_server(25);

    assert_eq!(client.poll_next().await.unwrap(), Directive::Train);
    assert_eq!(client.report_progress(10).await.unwrap(), None);
    assert_eq!(client.poll_next().await.unwrap(), Directive::Valid);

    for bad in [f64::NAN, f64::INFINITY] {
        match client.report_validation(bad, 0.1).await {
            Err(WorkerErr::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::InvalidData),
            other => panic!("expected an encoding error, got {other:?}"),
        }
    }

    assert_eq!(
        client.report_validation(0.5, 0.7).await.unwrap(),
        Some(Directive::Best)
    );

    drop(client);
    server.run().await.unwrap();
}

#[tokio::test]
async fn error_frames_surface_as_protocol_errors() {
    let ((wk_rx, wk_tx), sv) = channel_pair();
    let mock = tokio::spawn(mock_coordinator(sv, Msg::Err("nope".into())));

    let mut client = ControlClient::new(wk_rx, wk_tx);
    let err = client.report_progress(1).await.unwrap_err();
    assert!(matches!(err, WorkerErr::Protocol(detail) if detail == "nope"));

    drop(client);
    mock.await.unwrap().unwrap();
}

#[tokio::test]
async fn silent_reply_to_next_is_rejected() {
    let ((wk_rx, wk_tx), sv) = channel_pair();
    let mock = tokio::spawn(mock_coordinator(sv, Msg::Reply(None)));

    let mut client = ControlClient::new(wk_rx, wk_tx);
    assert_eq!(client.report_progress(1).await.unwrap(), None);

    let err = client.poll_next().await.unwrap_err();
    assert!(matches!(
        err,
        WorkerErr::UnexpectedDirective {
            request: "next",
            got: None
        }
    ));

    drop(client);
    mock.await.unwrap().unwrap();
}
