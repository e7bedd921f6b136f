use super::{Delta, SyncRule};
use crate::{Result, SyncErr};

/// Elastic averaging (EASGD) synchronization.
///
/// Every sync moves both sides toward each other by `alpha` of their difference:
///
/// ```text
/// diff   = alpha * (local - master)
/// local  = local - diff
/// master = master + diff
/// ```
///
/// The gap shrinks by a factor of `1 - 2 * alpha` per call. An `alpha` above `0.5`
/// overshoots and flips the sign of the gap, it's allowed. With `alpha = 0` every
/// worker trains on its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Easgd {
    alpha: f32,
}

impl Easgd {
    /// Creates a new `Easgd` rule.
    ///
    /// # Arguments
    /// * `alpha` - The blending coefficient, must be within `[0, 1]`.
    ///
    /// # Returns
    /// A new `Easgd` instance or `SyncErr::InvalidAlpha`.
    pub fn new(alpha: f32) -> Result<Self> {
        Self::check_alpha(alpha)?;
        Ok(Self { alpha })
    }

    /// Returns the blending coefficient.
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Replaces the blending coefficient, the previous one is kept on error.
    pub fn set_alpha(&mut self, alpha: f32) -> Result<()> {
        Self::check_alpha(alpha)?;
        self.alpha = alpha;
        Ok(())
    }

    fn check_alpha(alpha: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(SyncErr::InvalidAlpha(alpha));
        }

        Ok(())
    }
}

impl SyncRule for Easgd {
    fn update_core(&self, local: &[f32], master: &[f32]) -> Delta {
        let diff: Vec<f32> = local
            .iter()
            .zip(master)
            .map(|(l, m)| self.alpha * (l - m))
            .collect();

        Delta {
            local: diff.iter().map(|d| -d).collect(),
            master: diff,
        }
    }

    fn apply(&self, local: &mut [f32], master: &mut [f32]) {
        let alpha = self.alpha;

        for (l, m) in local.iter_mut().zip(master) {
            let diff = alpha * (*l - *m);
            *l -= diff;
            *m += diff;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_alpha_meets_at_midpoint() {
        let rule = Easgd::new(0.5).unwrap();
        let mut local = vec![vec![10.]];
        let mut master = vec![vec![0.]];

        rule.update_params(&mut local, &mut master).unwrap();
        assert_eq!(local, vec![vec![5.]]);
        assert_eq!(master, vec![vec![5.]]);
    }

    #[test]
    fn zero_alpha_leaves_params_untouched() {
        let rule = Easgd::new(0.).unwrap();
        let mut local = vec![vec![10., -3.], vec![1.]];
        let mut master = vec![vec![0., 4.], vec![2.]];

        rule.update_params(&mut local, &mut master).unwrap();
        assert_eq!(local, vec![vec![10., -3.], vec![1.]]);
        assert_eq!(master, vec![vec![0., 4.], vec![2.]]);

        let deltas = rule.deltas(&local, &master).unwrap();
        assert!(deltas
            .iter()
            .all(|d| d.local.iter().chain(&d.master).all(|x| *x == 0.)));
    }

    #[test]
    fn gap_contracts_by_one_minus_two_alpha() {
        let rule = Easgd::new(0.25).unwrap();
        let mut local = vec![vec![8.]];
        let mut master = vec![vec![0.]];

        rule.update_params(&mut local, &mut master).unwrap();
        assert_eq!(local[0][0] - master[0][0], 8. * (1. - 2. * 0.25));
    }

    #[test]
    fn overshooting_alpha_is_allowed() {
        let rule = Easgd::new(1.).unwrap();
        let mut local = vec![vec![4.]];
        let mut master = vec![vec![0.]];

        rule.update_params(&mut local, &mut master).unwrap();
        assert_eq!(local, vec![vec![0.]]);
        assert_eq!(master, vec![vec![4.]]);
    }

    #[test]
    fn alpha_round_trips() {
        let mut rule = Easgd::new(0.3).unwrap();
        assert_eq!(rule.alpha(), 0.3);

        rule.set_alpha(0.7).unwrap();
        assert_eq!(rule.alpha(), 0.7);
    }

    #[test]
    fn alpha_out_of_range_is_rejected() {
        assert_eq!(Easgd::new(-0.1), Err(SyncErr::InvalidAlpha(-0.1)));
        assert_eq!(Easgd::new(1.5), Err(SyncErr::InvalidAlpha(1.5)));
        assert!(Easgd::new(f32::NAN).is_err());

        let mut rule = Easgd::new(0.2).unwrap();
        assert!(rule.set_alpha(2.).is_err());
        assert_eq!(rule.alpha(), 0.2);
    }

    #[test]
    fn deltas_match_in_place_update() {
        let rule = Easgd::new(0.1).unwrap();
        let local = vec![vec![1., 2., 3.], vec![-1.]];
        let master = vec![vec![0., 0., 0.], vec![1.]];

        let deltas = rule.deltas(&local, &master).unwrap();

        let mut new_local = local.clone();
        let mut new_master = master.clone();
        rule.update_params(&mut new_local, &mut new_master).unwrap();

        for (i, delta) in deltas.iter().enumerate() {
            for j in 0..local[i].len() {
                assert_eq!(local[i][j] + delta.local[j], new_local[i][j]);
                assert_eq!(master[i][j] + delta.master[j], new_master[i][j]);
            }
        }
    }

    #[test]
    fn mismatched_pairs_fail_without_updating() {
        let rule = Easgd::new(0.5).unwrap();
        let mut local = vec![vec![10.], vec![1., 2.]];
        let mut master = vec![vec![0.], vec![1.]];

        let err = rule.update_params(&mut local, &mut master).unwrap_err();
        assert_eq!(
            err,
            SyncErr::ShapeMismatch {
                index: 1,
                local: 2,
                master: 1
            }
        );
        assert_eq!(local[0], vec![10.]);
        assert_eq!(master[0], vec![0.]);

        let err = rule.deltas(&local, &master[..1]).unwrap_err();
        assert_eq!(err, SyncErr::PairCount { local: 2, master: 1 });
    }
}
