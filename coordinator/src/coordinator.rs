use std::time::{Duration, Instant};

use comms::msg::{Directive, Report, Request, Validation};
use log::{debug, info};

use crate::{
    CoordinatorConfig, MetricHistory, MetricRecord, StopReason, state::CoordinatorState,
};

/// A read-only snapshot of a coordinator's progress.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorStatus {
    pub completed_minibatches: u64,
    pub epoch_index: u64,
    pub bad_steps: usize,
    pub pending_validation: bool,
    pub stop_reason: Option<StopReason>,
    /// Wall-clock time since the first poll, up to the stop if there was one.
    pub elapsed: Option<Duration>,
    pub reports: usize,
    pub best: Option<MetricRecord>,
}

impl CoordinatorStatus {
    pub fn is_terminated(&self) -> bool {
        self.stop_reason.is_some()
    }
}

/// Patience-based early-stopping controller.
///
/// Answers every worker request with at most one directive. It's a plain state machine,
/// callers serving many workers must serialize the calls to `handle` (see `CoordinatorHandle`).
#[derive(Debug)]
pub struct Coordinator {
    config: CoordinatorConfig,
    state: CoordinatorState,
    history: MetricHistory,
}

impl Coordinator {
    /// Creates a new `Coordinator` in the running state.
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            config,
            state: CoordinatorState::default(),
            history: MetricHistory::new(),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn history(&self) -> &MetricHistory {
        &self.history
    }

    /// Handles a single worker request.
    ///
    /// # Arguments
    /// * `req` - The request received from a worker.
    ///
    /// # Returns
    /// The directive for the worker, `None` when the request calls for no decision.
    pub fn handle(&mut self, req: &Request) -> Option<Directive> {
        let now = Instant::now();

        let directive = match *req {
            Request::PollNext => Some(self.poll_next(now)),
            Request::Report(report) => self.report(report, now),
        };

        debug!(
            completed = self.state.completed_minibatches,
            bad_steps = self.state.bad_steps;
            "handled {req:?} -> {directive:?}"
        );

        directive
    }

    /// Returns a snapshot of the current progress.
    pub fn status(&self) -> CoordinatorStatus {
        let state = &self.state;
        let elapsed = state.started_at.map(|start| {
            let end = state.stopped_at.unwrap_or_else(Instant::now);
            end.saturating_duration_since(start)
        });

        CoordinatorStatus {
            completed_minibatches: state.completed_minibatches,
            epoch_index: state.epoch_index,
            bad_steps: state.bad_steps,
            pending_validation: state.pending_validation,
            stop_reason: state.stop_reason,
            elapsed,
            reports: self.history.len(),
            best: state.best,
        }
    }

    fn poll_next(&mut self, now: Instant) -> Directive {
        self.state.started_at.get_or_insert(now);

        if self.state.is_terminated() {
            return Directive::Stop;
        }

        if self.state.pending_validation {
            self.state.pending_validation = false;
            return Directive::Valid;
        }

        Directive::Train
    }

    /// Progress is always evaluated before validation, a budget stop wins over
    /// a patience stop and skips the validation part entirely.
    fn report(&mut self, report: Report, now: Instant) -> Option<Directive> {
        if let Some(done) = report.progress {
            if let Some(directive) = self.report_progress(done, now) {
                return Some(directive);
            }
        }

        report
            .validation
            .and_then(|validation| self.report_validation(validation, now))
    }

    fn report_progress(&mut self, done: u64, now: Instant) -> Option<Directive> {
        let state = &mut self.state;
        state.completed_minibatches = state.completed_minibatches.saturating_add(done);

        if state.is_terminated() {
            return Some(Directive::Stop);
        }

        if state.completed_minibatches > self.config.max_minibatches() {
            self.terminate(StopReason::Budget, now);
            return Some(Directive::Stop);
        }

        if state.completed_minibatches % self.config.validation_interval() == 0 {
            state.pending_validation = true;
        }

        None
    }

    fn report_validation(&mut self, validation: Validation, now: Instant) -> Option<Directive> {
        let Validation {
            valid_err,
            test_err,
        } = validation;

        let record = MetricRecord {
            valid_err,
            test_err,
        };
        self.history.push(record);

        if self.state.is_terminated() {
            return Some(Directive::Stop);
        }

        if self
            .history
            .min_valid_err()
            .is_some_and(|min| valid_err <= min)
        {
            self.state.bad_steps = 0;
            self.state.best = Some(record);
            info!("best error valid: {valid_err} test: {test_err}");
            return Some(Directive::Best);
        }

        let patience = self.config.patience();
        let threshold = self.history.min_valid_err_excluding_recent(patience);

        if threshold.is_some_and(|min| valid_err >= min) {
            self.state.bad_steps += 1;
            debug!(bad_steps = self.state.bad_steps; "no improvement over {threshold:?}");

            if self.state.bad_steps > patience {
                self.terminate(StopReason::Patience, now);
                return Some(Directive::Stop);
            }
        }

        None
    }

    fn terminate(&mut self, reason: StopReason, now: Instant) {
        let state = &mut self.state;
        state.stop_reason = Some(reason);
        state.stopped_at = Some(now);

        match state.started_at {
            Some(start) => info!(
                "training time ({reason}) {:.3}s",
                now.saturating_duration_since(start).as_secs_f64()
            ),
            None => info!("training time ({reason}) unknown, no worker polled yet"),
        }

        info!("number of samples: {}", state.completed_minibatches);
    }
}
