use std::time::Instant;

use comms::msg::{Directive, Minibatch, Request, Validation};
use log::{debug, info, warn};
use param_sync::{StoreHandle, SyncRule};
use tokio::{sync::mpsc, task};

use crate::{Control, Result, Trainer, WorkerConfig, WorkerErr, WorkerMetrics, poll_next};

/// What a worker hands back once the coordinator stops it.
#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub worker_id: usize,
    /// The local parameters at the last report the coordinator answered with `best`.
    pub best: Option<Vec<Vec<f32>>>,
    pub best_validation: Option<Validation>,
    pub params: Vec<Vec<f32>>,
    pub metrics: WorkerMetrics,
}

/// Infrastructure worker runtime.
///
/// Alternates local training with synchronizations against the master parameters,
/// following the directives of a coordinator.
pub struct Worker {
    worker_id: usize,
    config: WorkerConfig,
    feed: Option<mpsc::Receiver<Minibatch>>,
}

impl Worker {
    /// Creates a new `Worker`.
    ///
    /// # Args
    /// * `worker_id` - Identifier used for observability.
    /// * `config` - The worker's execution bounds.
    ///
    /// # Returns
    /// A new worker instance.
    pub fn new(worker_id: usize, config: WorkerConfig) -> Self {
        Self {
            worker_id,
            config,
            feed: None,
        }
    }

    /// Trains on the minibatches of a dispatcher instead of sampling them locally.
    ///
    /// # Args
    /// * `feed` - The queue filled from the data channel, see `spawn_feed`.
    pub fn with_feed(mut self, feed: mpsc::Receiver<Minibatch>) -> Self {
        self.feed = Some(feed);
        self
    }

    /// Runs the control loop until the coordinator answers with `stop`.
    ///
    /// Local parameters start as a copy of the master parameters. Must run on a
    /// multi-threaded runtime, training and synchronization block the current thread.
    ///
    /// # Args
    /// * `control` - The coordinator this worker answers to.
    /// * `master` - The shared master parameters.
    /// * `rule` - How local and master parameters move toward each other.
    /// * `trainer` - The local optimizer.
    ///
    /// # Returns
    /// The worker's report on graceful completion.
    ///
    /// # Errors
    /// Returns `WorkerErr` on I/O failures, shape mismatches or protocol violations.
    pub async fn run<C, T>(
        mut self,
        control: &mut C,
        master: &StoreHandle,
        rule: &dyn SyncRule,
        mut trainer: T,
    ) -> Result<WorkerReport>
    where
        C: Control,
        T: Trainer,
    {
        let worker_id = self.worker_id;
        let minibatches = self.config.minibatches_per_sync();

        let mut params = trainer.init_params();
        master.pull_params(&mut params).await?;

        let mut metrics = WorkerMetrics::default();
        let mut best = None;
        let mut best_validation = None;

        loop {
            match poll_next(control).await? {
                Directive::Train => {
                    let start = Instant::now();
                    match self.feed.as_mut() {
                        Some(feed) => {
                            for _ in 0..minibatches {
                                let batch = feed.recv().await.ok_or(WorkerErr::FeedClosed)?;
                                task::block_in_place(|| trainer.train_on(&mut params, &batch))?;
                            }
                        }
                        None => task::block_in_place(|| trainer.train(&mut params, minibatches))?,
                    }
                    metrics.train_time += start.elapsed();
                    metrics.add_steps(minibatches);

                    let start = Instant::now();
                    master.sync(rule, &mut params).await?;
                    metrics.sync_time += start.elapsed();
                    metrics.bump_sync();

                    let reply = control.request(Request::progress(minibatches as u64)).await?;
                    match reply {
                        None => {}
                        Some(Directive::Stop) => break,
                        got => return unexpected("done", got),
                    }
                }
                Directive::Valid => {
                    let start = Instant::now();
                    let validation = task::block_in_place(|| trainer.evaluate(&params))?;
                    metrics.eval_time += start.elapsed();
                    metrics.bump_validation();

                    let validation = reportable(worker_id, validation);
                    let Validation {
                        valid_err,
                        test_err,
                    } = validation;
                    debug!(worker_id = worker_id; "validation error {valid_err}, test error {test_err}");

                    let reply = control
                        .request(Request::validation(valid_err, test_err))
                        .await?;
                    match reply {
                        None => {}
                        Some(Directive::Best) => {
                            best = Some(params.clone());
                            best_validation = Some(validation);
                        }
                        Some(Directive::Stop) => break,
                        got => return unexpected("valid_err", got),
                    }
                }
                Directive::Stop => break,
                got => return unexpected("next", Some(got)),
            }
        }

        info!(
            worker_id = worker_id,
            steps = metrics.steps,
            syncs = metrics.syncs,
            validations = metrics.validations;
            "worker stopped"
        );

        Ok(WorkerReport {
            worker_id,
            best,
            best_validation,
            params,
            metrics,
        })
    }
}

/// Non-finite errors can't go on the wire, a diverged model reports the largest error.
fn reportable(worker_id: usize, validation: Validation) -> Validation {
    let finite = |err: f64| {
        if err.is_finite() {
            err
        } else {
            warn!(worker_id = worker_id; "reporting non-finite error {err} as {}", f64::MAX);
            f64::MAX
        }
    };

    Validation {
        valid_err: finite(validation.valid_err),
        test_err: finite(validation.test_err),
    }
}

fn unexpected<T>(request: &'static str, got: Option<Directive>) -> Result<T> {
    Err(WorkerErr::UnexpectedDirective { request, got })
}
