use std::time::Duration;

#[derive(Debug, Default, Clone)]
pub struct WorkerMetrics {
    pub train_time: Duration,
    pub sync_time: Duration,
    pub eval_time: Duration,

    pub steps: u64,
    pub syncs: u64,
    pub validations: u64,
}

impl WorkerMetrics {
    #[inline]
    pub fn add_steps(&mut self, n: usize) {
        self.steps += n as u64;
    }

    #[inline]
    pub fn bump_sync(&mut self) {
        self.syncs += 1;
    }

    #[inline]
    pub fn bump_validation(&mut self) {
        self.validations += 1;
    }
}
