use std::sync::atomic::{AtomicU32, Ordering};

use rayon::prelude::*;

use crate::{Result, Store, SyncRule, check_shapes};

/// An `f32` cell that can be read and written from many threads without locks.
#[derive(Debug)]
struct WildCell(AtomicU32);

impl WildCell {
    fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Master parameters updated without any lock.
///
/// It embraces race conditions: workers syncing at the same time read possibly
/// stale master values and their element writes may overwrite each other. Each
/// element is always a value some worker wrote, never a torn one.
#[derive(Debug)]
pub struct WildStore {
    params: Box<[Box<[WildCell]>]>,
}

impl WildStore {
    /// Creates a new `WildStore`.
    ///
    /// # Arguments
    /// * `params` - The initial state of the master parameters.
    ///
    /// # Returns
    /// A new `WildStore` instance.
    pub fn new(params: Vec<Vec<f32>>) -> Self {
        let params = params
            .into_iter()
            .map(|tensor| tensor.into_iter().map(WildCell::new).collect())
            .collect();

        Self { params }
    }
}

impl Store for WildStore {
    fn shapes(&self) -> Vec<usize> {
        self.params.iter().map(|tensor| tensor.len()).collect()
    }

    fn pull_params(&self, out: &mut [Vec<f32>]) -> Result<()> {
        check_shapes(
            out.iter().map(Vec::len),
            self.params.iter().map(|tensor| tensor.len()),
        )?;

        out.iter_mut().zip(self.params.iter()).for_each(|(out, tensor)| {
            out.iter_mut()
                .zip(tensor.iter())
                .for_each(|(o, cell)| *o = cell.load())
        });

        Ok(())
    }

    fn sync(&self, rule: &dyn SyncRule, local: &mut [Vec<f32>]) -> Result<()> {
        check_shapes(
            local.iter().map(Vec::len),
            self.params.iter().map(|tensor| tensor.len()),
        )?;

        local
            .par_iter_mut()
            .zip(self.params.par_iter())
            .for_each(|(local, tensor)| {
                let master: Vec<f32> = tensor.iter().map(WildCell::load).collect();
                let delta = rule.update_core(local, &master);

                local.iter_mut().zip(delta.local).for_each(|(p, d)| *p += d);

                tensor
                    .iter()
                    .zip(delta.master)
                    .for_each(|(cell, d)| cell.store(cell.load() + d));
            });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;
    use crate::{Easgd, Independent};

    #[test]
    fn sync_matches_blocking_when_alone() {
        let store = WildStore::new(vec![vec![0., 2.], vec![4.]]);
        let rule = Easgd::new(0.5).unwrap();
        let mut local = vec![vec![10., 2.], vec![0.]];

        store.sync(&rule, &mut local).unwrap();
        assert_eq!(local, vec![vec![5., 2.], vec![2.]]);
        assert_eq!(store.snapshot(), vec![vec![5., 2.], vec![2.]]);
    }

    #[test]
    fn independent_rule_leaves_master_untouched() {
        let store = WildStore::new(vec![vec![1., 2., 3.]]);
        let mut local = vec![vec![7., 8., 9.]];

        store.sync(&Independent, &mut local).unwrap();
        assert_eq!(local, vec![vec![7., 8., 9.]]);
        assert_eq!(store.snapshot(), vec![vec![1., 2., 3.]]);
    }

    #[test]
    fn pull_rejects_wrong_shapes() {
        let store = WildStore::new(vec![vec![1., 2., 3.]]);
        let mut out = vec![vec![0.; 2]];
        assert!(store.pull_params(&mut out).is_err());
    }

    #[test]
    fn concurrent_syncs_complete() {
        const WORKERS: usize = 8;
        const ROUNDS: usize = 200;

        let store = Arc::new(WildStore::new(vec![vec![0.; 64]]));
        let rule = Arc::new(Easgd::new(0.3).unwrap());

        let handles: Vec<_> = (0..WORKERS)
            .map(|id| {
                let store = Arc::clone(&store);
                let rule = Arc::clone(&rule);

                thread::spawn(move || {
                    let value = if id % 2 == 0 { 1. } else { 0. };
                    let mut local = vec![vec![value; 64]];
                    for _ in 0..ROUNDS {
                        store.sync(rule.as_ref(), &mut local).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let master = store.snapshot();
        assert_eq!(master[0].len(), 64);
        assert!(master[0].iter().all(|p| p.is_finite()));
    }
}
