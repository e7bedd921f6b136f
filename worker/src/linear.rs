use std::sync::Arc;

use comms::{
    msg::{Array, Minibatch, Validation},
    specs::{node::DatasetSpec, worker::WorkerSpec},
};
use param_sync::check_shapes;
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal};

use crate::{Result, Trainer, WorkerErr};

/// Samples as rows of features with their target.
#[derive(Debug, Default)]
struct Split {
    features: Vec<Vec<f32>>,
    targets: Vec<f32>,
}

impl Split {
    fn len(&self) -> usize {
        self.targets.len()
    }

    /// Mean squared error of the linear model `weights · x + bias`.
    fn mse(&self, weights: &[f32], bias: f32) -> f64 {
        let total: f64 = self
            .features
            .iter()
            .zip(&self.targets)
            .map(|(x, y)| {
                let err = (predict(weights, bias, x) - y) as f64;
                err * err
            })
            .sum();

        total / self.len() as f64
    }
}

#[derive(Debug)]
struct Splits {
    train: Split,
    valid: Split,
    test: Split,
}

fn predict(weights: &[f32], bias: f32, x: &[f32]) -> f32 {
    weights.iter().zip(x).map(|(w, x)| w * x).sum::<f32>() + bias
}

/// Minibatch SGD on a synthetic least-squares problem.
///
/// The targets come from a hidden random linear model plus gaussian noise, the samples
/// are split 80/10/10 into train, validation and test sets. Parameters are two tensors,
/// the weights and a single bias.
#[derive(Debug)]
pub struct LinearRegression {
    data: Arc<Splits>,
    learning_rate: f32,
    batch_size: usize,
    rng: StdRng,
}

impl LinearRegression {
    /// Creates a new `LinearRegression` generating its dataset from `dataset`.
    ///
    /// # Arguments
    /// * `dataset` - The shape, noise and seed of the synthetic samples.
    /// * `worker` - The optimizer settings, a missing seed draws one from the OS.
    ///
    /// # Returns
    /// The trainer or an error if the dataset can't fill the three splits.
    pub fn new(dataset: &DatasetSpec, worker: &WorkerSpec) -> Result<Self> {
        let data = generate(dataset)?;

        let rng = match worker.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(Self {
            data: Arc::new(data),
            learning_rate: worker.learning_rate,
            batch_size: worker.batch_size.get(),
            rng,
        })
    }

    /// Returns a trainer over the same samples with its own sampling stream.
    pub fn fork(&self, seed: u64) -> Self {
        Self {
            data: Arc::clone(&self.data),
            learning_rate: self.learning_rate,
            batch_size: self.batch_size,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn features(&self) -> usize {
        self.data.train.features.first().map_or(0, Vec::len)
    }

    /// Draws a minibatch from the train split, inputs `[batch_size, features]` then
    /// targets `[batch_size]`, for a dispatcher to push to workers.
    pub fn sample_batch(&mut self) -> Minibatch {
        let train = &self.data.train;
        let features = self.features();
        let mut x = Vec::with_capacity(self.batch_size * features);
        let mut y = Vec::with_capacity(self.batch_size);

        for _ in 0..self.batch_size {
            let i = self.rng.random_range(0..train.len());
            x.extend_from_slice(&train.features[i]);
            y.push(train.targets[i]);
        }

        Minibatch {
            arrays: vec![
                Array {
                    shape: vec![self.batch_size, features],
                    data: x,
                },
                Array {
                    shape: vec![self.batch_size],
                    data: y,
                },
            ],
        }
    }

    fn check_params(&self, params: &[Vec<f32>]) -> Result<()> {
        let expected = [self.features(), 1];
        check_shapes(params.iter().map(Vec::len), expected.into_iter())?;
        Ok(())
    }
}

fn split_params(params: &mut [Vec<f32>]) -> Result<(&mut [f32], &mut f32)> {
    match params {
        [weights, bias] if bias.len() == 1 => Ok((weights.as_mut_slice(), &mut bias[0])),
        _ => Err(WorkerErr::Trainer("expected weights and bias tensors".into())),
    }
}

/// One minibatch SGD step on the mean squared error of `samples`.
fn sgd_step<'a>(
    weights: &mut [f32],
    bias: &mut f32,
    learning_rate: f32,
    samples: impl Iterator<Item = (&'a [f32], f32)>,
) {
    let mut grad = vec![0.; weights.len()];
    let mut grad_bias = 0.;
    let mut n = 0;

    for (x, y) in samples {
        let err = predict(weights, *bias, x) - y;
        grad.iter_mut().zip(x).for_each(|(g, x)| *g += err * x);
        grad_bias += err;
        n += 1;
    }

    if n == 0 {
        return;
    }

    let scale = 2. * learning_rate / n as f32;
    weights.iter_mut().zip(&grad).for_each(|(w, g)| *w -= scale * g);
    *bias -= scale * grad_bias;
}

fn generate(spec: &DatasetSpec) -> Result<Splits> {
    let features = spec.features.get();
    let samples = spec.samples.get();

    let holdout = (samples / 10).max(1);
    if samples < 2 * holdout + 1 {
        return Err(WorkerErr::Trainer(format!(
            "{samples} samples can't fill the train, validation and test splits"
        )));
    }

    let noise = Normal::new(0., spec.noise)
        .map_err(|e| WorkerErr::Trainer(format!("invalid noise {}: {e}", spec.noise)))?;
    let unit = Normal::new(0f32, 1.).map_err(|e| WorkerErr::Trainer(e.to_string()))?;

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let weights: Vec<f32> = (0..features).map(|_| unit.sample(&mut rng)).collect();
    let bias = unit.sample(&mut rng);

    let mut split = |n: usize| {
        let mut out = Split::default();
        for _ in 0..n {
            let x: Vec<f32> = (0..features).map(|_| unit.sample(&mut rng)).collect();
            let y = predict(&weights, bias, &x) + noise.sample(&mut rng);
            out.features.push(x);
            out.targets.push(y);
        }
        out
    };

    let valid = split(holdout);
    let test = split(holdout);
    let train = split(samples - 2 * holdout);

    Ok(Splits { train, valid, test })
}

impl Trainer for LinearRegression {
    fn init_params(&self) -> Vec<Vec<f32>> {
        vec![vec![0.; self.features()], vec![0.]]
    }

    fn train(&mut self, params: &mut [Vec<f32>], minibatches: usize) -> Result<()> {
        self.check_params(params)?;

        let Self {
            data,
            learning_rate,
            batch_size,
            rng,
        } = self;
        let train = &data.train;
        let (weights, bias) = split_params(params)?;

        for _ in 0..minibatches {
            let picked: Vec<usize> = (0..*batch_size)
                .map(|_| rng.random_range(0..train.len()))
                .collect();

            let samples = picked
                .iter()
                .map(|&i| (train.features[i].as_slice(), train.targets[i]));
            sgd_step(weights, bias, *learning_rate, samples);
        }

        Ok(())
    }

    fn train_on(&mut self, params: &mut [Vec<f32>], batch: &Minibatch) -> Result<()> {
        self.check_params(params)?;

        let features = self.features();
        let [x, y] = batch.arrays.as_slice() else {
            return Err(WorkerErr::Trainer(format!(
                "expected inputs and targets, got {} arrays",
                batch.arrays.len()
            )));
        };

        let rows = y.data.len();
        if rows == 0 || x.shape != [rows, features] || y.shape != [rows] {
            return Err(WorkerErr::Trainer(format!(
                "expected shapes [n, {features}] and [n] with n > 0, got {:?} and {:?}",
                x.shape, y.shape
            )));
        }

        let (weights, bias) = split_params(params)?;
        let samples = x.data.chunks_exact(features).zip(y.data.iter().copied());
        sgd_step(weights, bias, self.learning_rate, samples);

        Ok(())
    }

    fn evaluate(&self, params: &[Vec<f32>]) -> Result<Validation> {
        self.check_params(params)?;

        let (weights, bias) = (&params[0], params[1][0]);
        Ok(Validation {
            valid_err: self.data.valid.mse(weights, bias),
            test_err: self.data.test.mse(weights, bias),
        })
    }
}
