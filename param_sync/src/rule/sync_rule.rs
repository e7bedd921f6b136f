use rayon::prelude::*;

use crate::{Result, SyncErr};

/// The updates a rule produces for one `(local, master)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Delta {
    pub local: Vec<f32>,
    pub master: Vec<f32>,
}

/// Checks that two parameter sets are position-matched with equal shapes.
///
/// # Arguments
/// * `local` - The element count of every local tensor.
/// * `master` - The element count of every master tensor.
///
/// # Returns
/// A `SyncErr` describing the first mismatch found.
pub fn check_shapes<L, M>(local: L, master: M) -> Result<()>
where
    L: ExactSizeIterator<Item = usize>,
    M: ExactSizeIterator<Item = usize>,
{
    if local.len() != master.len() {
        return Err(SyncErr::PairCount {
            local: local.len(),
            master: master.len(),
        });
    }

    for (index, (local, master)) in local.zip(master).enumerate() {
        if local != master {
            return Err(SyncErr::ShapeMismatch {
                index,
                local,
                master,
            });
        }
    }

    Ok(())
}

/// Defines how a worker's local parameters and the master parameters move toward each other.
pub trait SyncRule: Send + Sync {
    /// Computes the updates for a single pair without touching its inputs.
    ///
    /// # Arguments
    /// * `local` - The worker's tensor.
    /// * `master` - The matching master tensor, same length as `local`.
    ///
    /// # Returns
    /// The deltas to add to `local` and `master` respectively.
    fn update_core(&self, local: &[f32], master: &[f32]) -> Delta;

    /// Applies the update of a single pair in place.
    ///
    /// Both slices have the same length. Rules may override this to avoid
    /// materializing the deltas.
    fn apply(&self, local: &mut [f32], master: &mut [f32]) {
        let delta = self.update_core(local, master);

        local.iter_mut().zip(delta.local).for_each(|(p, d)| *p += d);
        master.iter_mut().zip(delta.master).for_each(|(p, d)| *p += d);
    }

    /// Computes the deltas for every pair without mutating anything.
    ///
    /// # Returns
    /// One `Delta` per pair, or a `SyncErr` if the sets aren't matched.
    fn deltas(&self, local: &[Vec<f32>], master: &[Vec<f32>]) -> Result<Vec<Delta>> {
        check_shapes(local.iter().map(Vec::len), master.iter().map(Vec::len))?;

        Ok(local
            .par_iter()
            .zip(master)
            .map(|(local, master)| self.update_core(local, master))
            .collect())
    }

    /// Updates both parameter sets in place.
    ///
    /// Shapes are checked before any pair is touched, a mismatch leaves both sets unchanged.
    fn update_params(&self, local: &mut [Vec<f32>], master: &mut [Vec<f32>]) -> Result<()> {
        check_shapes(local.iter().map(Vec::len), master.iter().map(Vec::len))?;

        local
            .par_iter_mut()
            .zip(master.par_iter_mut())
            .for_each(|(local, master)| self.apply(local, master));

        Ok(())
    }
}
