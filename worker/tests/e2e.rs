use std::{num::NonZeroUsize, sync::Arc};

use comms::specs::{
    node::DatasetSpec,
    sync::{StoreSpec, SyncRuleSpec},
    worker::WorkerSpec,
};
use coordinator::{
    ControlServer, Coordinator, CoordinatorConfig, CoordinatorHandle, Dispatcher, StopReason,
};
use param_sync::{SyncBuilder, SyncRule};
use tokio::{io, task::JoinSet};
use worker::{
    ControlClient, LinearRegression, Trainer, Worker, WorkerConfig, WorkerReport, spawn_feed,
};

const WORKERS: usize = 4;
const MAX_MINIBATCHES: u64 = 2000;

fn trainer() -> LinearRegression {
    let dataset = DatasetSpec {
        features: NonZeroUsize::new(8).unwrap(),
        samples: NonZeroUsize::new(1000).unwrap(),
        noise: 0.1,
        seed: 11,
    };
    let worker = WorkerSpec {
        seed: Some(0),
        ..WorkerSpec::default()
    };
    LinearRegression::new(&dataset, &worker).unwrap()
}

fn coordinator() -> CoordinatorHandle {
    let config = CoordinatorConfig::new(MAX_MINIBATCHES, 5, 50).unwrap();
    CoordinatorHandle::new(Coordinator::new(config))
}

fn check_reports(reports: &[WorkerReport], trainer: &LinearRegression, status_total: u64) {
    let initial = trainer.evaluate(&trainer.init_params()).unwrap();

    let steps: u64 = reports.iter().map(|r| r.metrics.steps).sum();
    assert_eq!(steps, status_total);

    let best = reports
        .iter()
        .filter_map(|r| r.best_validation)
        .map(|v| v.valid_err)
        .fold(f64::INFINITY, f64::min);
    assert!(best < initial.valid_err / 10.);
}

#[tokio::test(flavor = "multi_thread")]
async fn workers_train_until_stopped_over_the_wire() -> io::Result<()> {
    let handle = coordinator();
    let mut server = ControlServer::new(handle.clone());

    let builder = SyncBuilder::new();
    let rule: Arc<dyn SyncRule> = builder
        .build_rule(SyncRuleSpec::Easgd { alpha: 0.5 })
        .unwrap()
        .into();
    let trainer = trainer();
    let master = builder.build_store(StoreSpec::Blocking, trainer.init_params());

    let mut workers = JoinSet::new();
    for id in 0..WORKERS {
        let (stream1, stream2) = io::duplex(4096);
        let (rx, tx) = io::split(stream1);
        let (sv_rx, sv_tx) = comms::channel(rx, tx);
        server.spawn(sv_rx, sv_tx);

        let (rx, tx) = io::split(stream2);
        let (rx, tx) = comms::channel(rx, tx);
        let mut client = ControlClient::new(rx, tx);

        let config = WorkerConfig::new(NonZeroUsize::new(5).unwrap());
        let (master, rule, trainer) = (master.clone(), rule.clone(), trainer.fork(id as u64));

        workers.spawn(async move {
            Worker::new(id, config)
                .run(&mut client, &master, rule.as_ref(), trainer)
                .await
        });
    }

    let mut reports = Vec::with_capacity(WORKERS);
    while let Some(res) = workers.join_next().await {
        reports.push(res??);
    }
    server.run().await?;

    let status = handle.status();
    // Patience may win once the errors flatten out.
    assert!(status.is_terminated());
    if status.stop_reason == Some(StopReason::Budget) {
        assert!(status.completed_minibatches > MAX_MINIBATCHES);
    }
    assert!(status.best.is_some());

    check_reports(&reports, &trainer, status.completed_minibatches);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn in_process_workers_share_a_wild_store() -> io::Result<()> {
    let handle = coordinator();

    let builder = SyncBuilder::new();
    let rule: Arc<dyn SyncRule> = builder
        .build_rule(SyncRuleSpec::Easgd { alpha: 0.3 })
        .unwrap()
        .into();
    let trainer = trainer();
    let master = builder.build_store(StoreSpec::Wild, trainer.init_params());

    let mut workers = JoinSet::new();
    for id in 0..WORKERS {
        let mut control = handle.clone();
        let config = WorkerConfig::new(NonZeroUsize::new(5).unwrap());
        let (master, rule, trainer) = (master.clone(), rule.clone(), trainer.fork(id as u64));

        workers.spawn(async move {
            Worker::new(id, config)
                .run(&mut control, &master, rule.as_ref(), trainer)
                .await
        });
    }

    let mut reports = Vec::with_capacity(WORKERS);
    while let Some(res) = workers.join_next().await {
        reports.push(res??);
    }

    let status = handle.status();
    assert!(status.is_terminated());
    assert!(master.snapshot().iter().flatten().all(|p| p.is_finite()));

    check_reports(&reports, &trainer, status.completed_minibatches);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn dispatched_minibatches_feed_the_workers() -> io::Result<()> {
    let handle = coordinator();

    let builder = SyncBuilder::new();
    let rule: Arc<dyn SyncRule> = builder
        .build_rule(SyncRuleSpec::Easgd { alpha: 0.5 })
        .unwrap()
        .into();
    let trainer = trainer();
    let master = builder.build_store(StoreSpec::Blocking, trainer.init_params());

    let mut dispatcher = Dispatcher::new();
    let mut workers = JoinSet::new();
    for id in 0..WORKERS {
        let (stream1, stream2) = io::duplex(1 << 16);
        let (_, tx) = io::split(stream1);
        let (_, tx) = comms::channel(io::empty(), tx);
        dispatcher.add(tx);

        let (rx, _) = io::split(stream2);
        let (rx, _) = comms::channel(rx, io::sink());
        let feed = spawn_feed(rx, NonZeroUsize::new(4).unwrap());

        let mut control = handle.clone();
        let config = WorkerConfig::new(NonZeroUsize::new(5).unwrap());
        let (master, rule, trainer) = (master.clone(), rule.clone(), trainer.fork(id as u64));

        workers.spawn(async move {
            Worker::new(id, config)
                .with_feed(feed)
                .run(&mut control, &master, rule.as_ref(), trainer)
                .await
        });
    }

    let mut sampler = trainer.fork(WORKERS as u64);
    let feeder = tokio::spawn(async move {
        while dispatcher.send_mb(sampler.sample_batch()).await.is_ok() {}
    });

    let mut reports = Vec::with_capacity(WORKERS);
    while let Some(res) = workers.join_next().await {
        reports.push(res??);
    }
    feeder.abort();

    let status = handle.status();
    assert!(status.is_terminated());

    check_reports(&reports, &trainer, status.completed_minibatches);
    Ok(())
}
