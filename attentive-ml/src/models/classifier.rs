//! Fixed three-layer feedforward binary classifier.
//!
//! Topology is `input -> 64 (ReLU) -> 32 (ReLU) -> 1 (sigmoid)`; only the input
//! width varies. Training minimises binary cross-entropy with Adam, using
//! hand-written backpropagation through the three affine layers.

use crate::config::ClassifierConfig;
use crate::error::{MlError, ensure_finite, ensure_width};
use crate::models::sigmoid;
use crate::training::metrics::TrainingMetrics;
use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::time::Instant;

pub const HIDDEN_ONE: usize = 64;
pub const HIDDEN_TWO: usize = 32;
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Smallest log term in the loss, matching the usual BCE clamp.
const LOG_FLOOR: f64 = -100.0;

/// One affine layer, `x W + b`, with `W` stored as (inputs x outputs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
}

impl DenseLayer {
    /// Uniform `±1/sqrt(fan_in)` initialisation for weights and bias.
    fn new<R: Rng + ?Sized>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (inputs.max(1) as f64).sqrt();
        Self {
            weights: Array2::from_shape_simple_fn((inputs, outputs), || {
                rng.gen_range(-bound..=bound)
            }),
            bias: Array1::from_shape_simple_fn(outputs, || rng.gen_range(-bound..=bound)),
        }
    }

    fn affine(&self, x: &Array2<f64>) -> Array2<f64> {
        x.dot(&self.weights) + &self.bias
    }

    pub fn inputs(&self) -> usize {
        self.weights.nrows()
    }

    pub fn outputs(&self) -> usize {
        self.weights.ncols()
    }
}

/// The three affine layers of the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierParams {
    pub layers: [DenseLayer; 3],
}

struct ForwardCache {
    z1: Array2<f64>,
    a1: Array2<f64>,
    z2: Array2<f64>,
    a2: Array2<f64>,
    output: Array1<f64>,
}

impl ClassifierParams {
    pub fn new<R: Rng + ?Sized>(input: usize, rng: &mut R) -> Self {
        Self {
            layers: [
                DenseLayer::new(input, HIDDEN_ONE, rng),
                DenseLayer::new(HIDDEN_ONE, HIDDEN_TWO, rng),
                DenseLayer::new(HIDDEN_TWO, 1, rng),
            ],
        }
    }

    pub fn input_width(&self) -> usize {
        self.layers[0].inputs()
    }

    /// Check the fixed topology and that every bias matches its weight matrix.
    pub fn validate(&self) -> Result<(), MlError> {
        let expected = [
            (self.input_width(), HIDDEN_ONE),
            (HIDDEN_ONE, HIDDEN_TWO),
            (HIDDEN_TWO, 1),
        ];
        for (i, (layer, (inputs, outputs))) in self.layers.iter().zip(expected).enumerate() {
            ensure_width(&format!("classifier layer {} inputs", i + 1), inputs, layer.inputs())?;
            ensure_width(&format!("classifier layer {} outputs", i + 1), outputs, layer.outputs())?;
            ensure_width(&format!("classifier layer {} bias", i + 1), outputs, layer.bias.len())?;
        }
        Ok(())
    }

    fn forward_cached(&self, x: &Array2<f64>) -> ForwardCache {
        let z1 = self.layers[0].affine(x);
        let a1 = z1.mapv(relu);
        let z2 = self.layers[1].affine(&a1);
        let a2 = z2.mapv(relu);
        let output = self.layers[2].affine(&a2).column(0).mapv(sigmoid);
        ForwardCache {
            z1,
            a1,
            z2,
            a2,
            output,
        }
    }

    fn ensure_finite(&self) -> Result<(), MlError> {
        for (i, layer) in self.layers.iter().enumerate() {
            ensure_finite(&format!("classifier layer {} weights", i + 1), layer.weights.iter())?;
            ensure_finite(&format!("classifier layer {} bias", i + 1), layer.bias.iter())?;
        }
        Ok(())
    }
}

fn relu(x: f64) -> f64 {
    x.max(0.0)
}

fn relu_grad(z: f64) -> f64 {
    if z > 0.0 { 1.0 } else { 0.0 }
}

/// Probability of the positive class for every row, each in [0, 1].
///
/// Saturated logits round to exactly 0.0 or 1.0.
pub fn forward(params: &ClassifierParams, x: &Array2<f64>) -> Result<Array1<f64>, MlError> {
    ensure_width("classifier input width", params.input_width(), x.ncols())?;
    Ok(params.forward_cached(x).output)
}

/// Positive iff probability >= 0.5, encoded as 1.0 / 0.0.
pub fn decide(probabilities: &Array1<f64>) -> Array1<f64> {
    probabilities.mapv(|p| if p >= DECISION_THRESHOLD { 1.0 } else { 0.0 })
}

pub fn predict(params: &ClassifierParams, x: &Array2<f64>) -> Result<Array1<f64>, MlError> {
    Ok(decide(&forward(params, x)?))
}

/// Mean binary cross-entropy with logs clamped at -100.
pub fn binary_cross_entropy(probabilities: &Array1<f64>, labels: &Array1<f64>) -> f64 {
    let n = probabilities.len().max(1) as f64;
    probabilities
        .iter()
        .zip(labels.iter())
        .map(|(p, y)| {
            let log_p = p.ln().max(LOG_FLOOR);
            let log_q = (1.0 - p).ln().max(LOG_FLOOR);
            -(y * log_p + (1.0 - y) * log_q)
        })
        .sum::<f64>()
        / n
}

struct Moments {
    m: Array2<f64>,
    v: Array2<f64>,
    m_bias: Array1<f64>,
    v_bias: Array1<f64>,
}

/// Adam optimiser state for the three layers.
struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    step: i32,
    moments: Vec<Moments>,
}

impl Adam {
    fn new(params: &ClassifierParams, learning_rate: f64) -> Self {
        let moments = params
            .layers
            .iter()
            .map(|l| Moments {
                m: Array2::zeros(l.weights.raw_dim()),
                v: Array2::zeros(l.weights.raw_dim()),
                m_bias: Array1::zeros(l.bias.len()),
                v_bias: Array1::zeros(l.bias.len()),
            })
            .collect();
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            step: 0,
            moments,
        }
    }

    fn apply(&mut self, params: &mut ClassifierParams, grads: &[(Array2<f64>, Array1<f64>); 3]) {
        self.step += 1;
        let (b1, b2, eps, lr) = (self.beta1, self.beta2, self.epsilon, self.learning_rate);
        let c1 = 1.0 - b1.powi(self.step);
        let c2 = 1.0 - b2.powi(self.step);

        for ((layer, state), (gw, gb)) in params
            .layers
            .iter_mut()
            .zip(self.moments.iter_mut())
            .zip(grads.iter())
        {
            state.m.zip_mut_with(gw, |m, g| *m = b1 * *m + (1.0 - b1) * g);
            state.v.zip_mut_with(gw, |v, g| *v = b2 * *v + (1.0 - b2) * g * g);
            state.m_bias.zip_mut_with(gb, |m, g| *m = b1 * *m + (1.0 - b1) * g);
            state.v_bias.zip_mut_with(gb, |v, g| *v = b2 * *v + (1.0 - b2) * g * g);

            ndarray::Zip::from(&mut layer.weights)
                .and(&state.m)
                .and(&state.v)
                .for_each(|w, m, v| *w -= lr * (m / c1) / ((v / c2).sqrt() + eps));
            ndarray::Zip::from(&mut layer.bias)
                .and(&state.m_bias)
                .and(&state.v_bias)
                .for_each(|b, m, v| *b -= lr * (m / c1) / ((v / c2).sqrt() + eps));
        }
    }
}

/// Gradients of mean BCE for one minibatch, plus the batch loss.
fn backward(
    params: &ClassifierParams,
    x: &Array2<f64>,
    y: &Array1<f64>,
) -> (f64, [(Array2<f64>, Array1<f64>); 3]) {
    let n = x.nrows() as f64;
    let cache = params.forward_cached(x);
    let loss = binary_cross_entropy(&cache.output, y);

    // sigmoid + BCE: dL/dz3 = (p - y) / n
    let d3 = ((&cache.output - y) / n).insert_axis(Axis(1));
    let g3 = (cache.a2.t().dot(&d3), d3.sum_axis(Axis(0)));

    let d2 = d3.dot(&params.layers[2].weights.t()) * cache.z2.mapv(relu_grad);
    let g2 = (cache.a1.t().dot(&d2), d2.sum_axis(Axis(0)));

    let d1 = d2.dot(&params.layers[1].weights.t()) * cache.z1.mapv(relu_grad);
    let g1 = (x.t().dot(&d1), d1.sum_axis(Axis(0)));

    (loss, [g1, g2, g3])
}

/// Minibatch Adam on binary cross-entropy. Row order is reshuffled every epoch.
pub fn train<R: Rng + ?Sized>(
    params: &mut ClassifierParams,
    x: &Array2<f64>,
    labels: &Array1<f64>,
    config: &ClassifierConfig,
    rng: &mut R,
) -> Result<TrainingMetrics, MlError> {
    ensure_width("classifier input width", params.input_width(), x.ncols())?;
    ensure_width("classifier label rows", x.nrows(), labels.len())?;
    if config.batch_size == 0 {
        return Err(MlError::training("classifier batch size must be > 0"));
    }
    if x.nrows() == 0 {
        return Err(MlError::training("classifier training data is empty"));
    }

    let start = Instant::now();
    let mut optimizer = Adam::new(params, config.learning_rate);
    let mut metrics = TrainingMetrics::default();
    let mut order: Vec<usize> = (0..x.nrows()).collect();

    for epoch in 0..config.epochs {
        order.shuffle(rng);
        let mut total = 0.0;
        for chunk in order.chunks(config.batch_size) {
            let xb = x.select(Axis(0), chunk);
            let yb = labels.select(Axis(0), chunk);
            let (loss, grads) = backward(params, &xb, &yb);
            if !loss.is_finite() {
                return Err(MlError::unstable(format!(
                    "classifier loss is {loss} at epoch {}",
                    epoch + 1
                )));
            }
            optimizer.apply(params, &grads);
            total += loss * chunk.len() as f64;
        }
        params.ensure_finite()?;
        let loss = total / x.nrows() as f64;
        metrics.record_epoch(loss)?;
        tracing::debug!(
            epoch = epoch + 1,
            epochs = config.epochs,
            input = params.input_width(),
            loss,
            "classifier epoch complete"
        );
    }
    metrics.total_training_time_secs = start.elapsed().as_secs_f64();
    Ok(metrics)
}
