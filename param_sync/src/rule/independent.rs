use super::{Delta, SyncRule};

/// A rule that never synchronizes, every worker trains on its own.
///
/// Behaves like `Easgd` with `alpha = 0` without touching memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct Independent;

impl SyncRule for Independent {
    fn update_core(&self, local: &[f32], _master: &[f32]) -> Delta {
        Delta {
            local: vec![0.; local.len()],
            master: vec![0.; local.len()],
        }
    }

    fn apply(&self, _local: &mut [f32], _master: &mut [f32]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_zero_deltas() {
        let deltas = Independent.deltas(&[vec![1., 2.]], &[vec![3., 4.]]).unwrap();
        assert_eq!(
            deltas,
            vec![Delta {
                local: vec![0., 0.],
                master: vec![0., 0.]
            }]
        );
    }

    #[test]
    fn still_checks_shapes() {
        let mut local = vec![vec![1.]];
        let mut master: Vec<Vec<f32>> = vec![];
        assert!(Independent.update_params(&mut local, &mut master).is_err());
    }
}
