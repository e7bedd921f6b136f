use std::{env, io, num::NonZeroUsize, sync::Arc};

use comms::{
    OnoSender,
    msg::Minibatch,
    specs::{
        self,
        node::{FeedSpec, NodeSpec},
    },
};
use coordinator::{ControlServer, Coordinator, CoordinatorConfig, CoordinatorHandle, Dispatcher};
use log::{debug, error, info, warn};
use param_sync::{SyncBuilder, SyncRule};
use tokio::{
    net::{TcpListener, TcpStream, tcp::OwnedWriteHalf},
    signal,
    sync::mpsc,
    task::JoinSet,
};
use worker::{
    ControlClient, LinearRegression, Trainer, Worker, WorkerConfig, WorkerReport, spawn_feed,
};

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let spec: NodeSpec = specs::from_env_or_default("CONFIG")?;
    info!("starting node with {spec:?}");

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "5567".to_string());
    let listener = TcpListener::bind(format!("{host}:{port}")).await?;
    let addr = listener.local_addr()?;

    let data_listener = match spec.feed {
        FeedSpec::Local => None,
        FeedSpec::Dispatch { .. } => {
            let data_port = env::var("DATA_PORT").unwrap_or_else(|_| "5568".to_string());
            Some(TcpListener::bind(format!("{host}:{data_port}")).await?)
        }
    };

    let config = CoordinatorConfig::try_from(spec.coordinator)?;
    let coordinator = CoordinatorHandle::new(Coordinator::new(config));
    let mut server = ControlServer::new(coordinator.clone());
    let server = tokio::spawn(async move { server.serve(listener).await });

    let builder = SyncBuilder::new();
    let rule: Arc<dyn SyncRule> = builder
        .build_rule(spec.sync_rule)
        .map_err(worker::WorkerErr::from)?
        .into();

    let trainer = LinearRegression::new(&spec.dataset, &spec.worker)?;
    let master = builder.build_store(spec.store, trainer.init_params());
    let worker_config = WorkerConfig::from(&spec.worker);

    let mut dispatcher = Dispatcher::new();
    let mut workers = JoinSet::new();
    for id in 0..spec.workers.get() {
        let mut control = ControlClient::connect(addr).await?;
        let trainer = local_trainer(&spec, &trainer, id)?;
        let (master, rule) = (master.clone(), rule.clone());

        let mut worker = Worker::new(id, worker_config);
        if let (FeedSpec::Dispatch { hwm }, Some(data_listener)) = (spec.feed, &data_listener) {
            let (tx, feed) = data_channel(data_listener, hwm).await?;
            dispatcher.add(tx);
            worker = worker.with_feed(feed);
        }

        workers.spawn(async move {
            worker
                .run(&mut control, &master, rule.as_ref(), trainer)
                .await
        });
    }

    let feeder = if dispatcher.is_empty() {
        None
    } else {
        let mut sampler = local_trainer(&spec, &trainer, spec.workers.get())?;
        info!("dispatching minibatches to {} workers", dispatcher.len());
        Some(tokio::spawn(async move {
            while dispatcher.send_mb(sampler.sample_batch()).await.is_ok() {}
            debug!("dispatcher stopped");
        }))
    };

    let mut reports = Vec::with_capacity(spec.workers.get());
    tokio::select! {
        _ = async {
            while let Some(res) = workers.join_next().await {
                match res {
                    Ok(Ok(report)) => reports.push(report),
                    Ok(Err(e)) => error!("worker failed: {e}"),
                    Err(e) => error!("worker task panicked: {e}"),
                }
            }
        } => {}
        _ = signal::ctrl_c() => warn!("interrupted, stopping early"),
    }

    server.abort();
    if let Some(feeder) = feeder {
        feeder.abort();
    }
    summarize(&coordinator, &reports, &trainer, master.snapshot());

    Ok(())
}

/// A trainer for the `id`th local sampler, seeded from the worker spec when it has a seed.
fn local_trainer(
    spec: &NodeSpec,
    trainer: &LinearRegression,
    id: usize,
) -> io::Result<LinearRegression> {
    let trainer = match spec.worker.seed {
        Some(seed) => trainer.fork(seed.wrapping_add(id as u64)),
        None => LinearRegression::new(&spec.dataset, &spec.worker)?,
    };
    Ok(trainer)
}

/// Connects a worker's data channel through `listener`.
///
/// # Returns
/// The dispatcher's sending end and the worker's minibatch queue.
async fn data_channel(
    listener: &TcpListener,
    hwm: NonZeroUsize,
) -> io::Result<(OnoSender<OwnedWriteHalf>, mpsc::Receiver<Minibatch>)> {
    let stream = TcpStream::connect(listener.local_addr()?).await?;
    let (dispatch_side, _) = listener.accept().await?;

    let (rx, tx) = stream.into_split();
    let (rx, _) = comms::channel(rx, tx);

    let (dispatch_rx, dispatch_tx) = dispatch_side.into_split();
    let (_, tx) = comms::channel(dispatch_rx, dispatch_tx);

    Ok((tx, spawn_feed(rx, hwm)))
}

fn summarize(
    coordinator: &CoordinatorHandle,
    reports: &[WorkerReport],
    trainer: &LinearRegression,
    master: Vec<Vec<f32>>,
) {
    let status = coordinator.status();
    info!("coordinator: {status:?}");

    for report in reports {
        info!(
            worker_id = report.worker_id,
            steps = report.metrics.steps,
            syncs = report.metrics.syncs;
            "train {:?}, sync {:?}, eval {:?}",
            report.metrics.train_time,
            report.metrics.sync_time,
            report.metrics.eval_time
        );
    }

    let best = reports
        .iter()
        .filter_map(|r| r.best_validation.map(|v| (r.worker_id, v)))
        .min_by(|(_, a), (_, b)| a.valid_err.total_cmp(&b.valid_err));

    match best {
        Some((worker_id, v)) => info!(
            "best model from worker {worker_id}: valid {} test {}",
            v.valid_err, v.test_err
        ),
        None => warn!("no worker reported a best model"),
    }

    match trainer.evaluate(&master) {
        Ok(v) => info!("master parameters: valid {} test {}", v.valid_err, v.test_err),
        Err(e) => warn!("couldn't evaluate the master parameters: {e}"),
    }
}
