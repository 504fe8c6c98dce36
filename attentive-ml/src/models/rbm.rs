//! Restricted Boltzmann machine trained with single-step contrastive divergence.
//!
//! Parameters live in [`RbmParams`]; sampling and update math are free
//! functions that take the random stream explicitly. Every draw goes through
//! the caller's generator, so a fixed seed reproduces training and extraction
//! exactly.

use crate::error::{MlError, ensure_finite, ensure_width};
use crate::models::sigmoid;
use crate::training::metrics::TrainingMetrics;
use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand::distributions::Standard;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Weights `W` (visible x hidden) and the two bias vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RbmParams {
    pub weights: Array2<f64>,
    pub visible_bias: Array1<f64>,
    pub hidden_bias: Array1<f64>,
}

/// Both forms of a layer draw. `probabilities` are in [0, 1], `sample` is in {0, 1}.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSample {
    pub probabilities: Array2<f64>,
    pub sample: Array2<f64>,
}

impl RbmParams {
    /// Fresh parameters: `W ~ N(0, 1) * init_std`, zero biases.
    pub fn new<R: Rng + ?Sized>(visible: usize, hidden: usize, init_std: f64, rng: &mut R) -> Self {
        let weights = Array2::from_shape_simple_fn((visible, hidden), || {
            rng.sample::<f64, _>(StandardNormal) * init_std
        });
        Self {
            weights,
            visible_bias: Array1::zeros(visible),
            hidden_bias: Array1::zeros(hidden),
        }
    }

    pub fn visible(&self) -> usize {
        self.weights.nrows()
    }

    pub fn hidden(&self) -> usize {
        self.weights.ncols()
    }

    /// Check that both bias vectors agree with the weight matrix.
    pub fn validate(&self) -> Result<(), MlError> {
        ensure_width("rbm visible bias", self.visible(), self.visible_bias.len())?;
        ensure_width("rbm hidden bias", self.hidden(), self.hidden_bias.len())
    }

    fn ensure_finite(&self) -> Result<(), MlError> {
        ensure_finite("rbm weights", self.weights.iter())?;
        ensure_finite("rbm visible bias", self.visible_bias.iter())?;
        ensure_finite("rbm hidden bias", self.hidden_bias.iter())
    }
}

fn bernoulli<R: Rng + ?Sized>(probabilities: &Array2<f64>, rng: &mut R) -> Array2<f64> {
    probabilities.mapv(|p| {
        let u: f64 = rng.sample(Standard);
        if u < p { 1.0 } else { 0.0 }
    })
}

/// `p(h | v) = sigmoid(v W + b_h)` plus an independent Bernoulli draw per unit.
pub fn sample_hidden<R: Rng + ?Sized>(
    params: &RbmParams,
    visible: &Array2<f64>,
    rng: &mut R,
) -> Result<LayerSample, MlError> {
    ensure_width("rbm visible input", params.visible(), visible.ncols())?;
    let probabilities = (visible.dot(&params.weights) + &params.hidden_bias).mapv(sigmoid);
    let sample = bernoulli(&probabilities, rng);
    Ok(LayerSample {
        probabilities,
        sample,
    })
}

/// `p(v | h) = sigmoid(h W^T + b_v)` plus an independent Bernoulli draw per unit.
pub fn sample_visible<R: Rng + ?Sized>(
    params: &RbmParams,
    hidden: &Array2<f64>,
    rng: &mut R,
) -> Result<LayerSample, MlError> {
    ensure_width("rbm hidden input", params.hidden(), hidden.ncols())?;
    let probabilities = (hidden.dot(&params.weights.t()) + &params.visible_bias).mapv(sigmoid);
    let sample = bernoulli(&probabilities, rng);
    Ok(LayerSample {
        probabilities,
        sample,
    })
}

/// One Gibbs sweep: hidden sample from `v`, then a visible sample from that.
///
/// This is the CD-1 chain; it never runs to equilibrium.
pub fn gibbs_step<R: Rng + ?Sized>(
    params: &RbmParams,
    visible: &Array2<f64>,
    rng: &mut R,
) -> Result<Array2<f64>, MlError> {
    let hidden = sample_hidden(params, visible, rng)?;
    Ok(sample_visible(params, &hidden.sample, rng)?.sample)
}

/// One CD-1 update on a minibatch. Returns the mean squared reconstruction error.
///
/// Both phases use binary samples, never probabilities. The update is added
/// with an effective step size of 1.
pub fn train_step<R: Rng + ?Sized>(
    params: &mut RbmParams,
    batch: &Array2<f64>,
    rng: &mut R,
) -> Result<f64, MlError> {
    ensure_width("rbm batch width", params.visible(), batch.ncols())?;
    let n = batch.nrows();
    if n == 0 {
        return Err(MlError::training("rbm minibatch is empty"));
    }
    let n_f = n as f64;

    let h_pos = sample_hidden(params, batch, rng)?.sample;
    let v_neg = gibbs_step(params, batch, rng)?;
    let h_neg = sample_hidden(params, &v_neg, rng)?.sample;

    let delta_w = (batch.t().dot(&h_pos) - v_neg.t().dot(&h_neg)) / n_f;
    let delta_v = (batch - &v_neg).sum_axis(Axis(0)) / n_f;
    let delta_h = (&h_pos - &h_neg).sum_axis(Axis(0)) / n_f;

    params.weights += &delta_w;
    params.visible_bias += &delta_v;
    params.hidden_bias += &delta_h;
    params.ensure_finite()?;

    let diff = batch - &v_neg;
    Ok(diff.mapv(|d| d * d).sum() / (n_f * params.visible() as f64))
}

/// Sequential, unshuffled minibatch sweeps for a fixed number of epochs.
pub fn train<R: Rng + ?Sized>(
    params: &mut RbmParams,
    data: &Array2<f64>,
    epochs: usize,
    batch_size: usize,
    rng: &mut R,
) -> Result<TrainingMetrics, MlError> {
    if batch_size == 0 {
        return Err(MlError::training("rbm batch size must be > 0"));
    }
    ensure_width("rbm training width", params.visible(), data.ncols())?;
    if data.nrows() == 0 {
        return Err(MlError::training("rbm training data is empty"));
    }

    let start = Instant::now();
    let mut metrics = TrainingMetrics::default();
    for epoch in 0..epochs {
        let mut total = 0.0;
        for batch in data.axis_chunks_iter(Axis(0), batch_size) {
            let batch = batch.to_owned();
            total += train_step(params, &batch, rng)? * batch.nrows() as f64;
        }
        let loss = total / data.nrows() as f64;
        metrics.record_epoch(loss)?;
        tracing::debug!(
            epoch = epoch + 1,
            epochs,
            hidden = params.hidden(),
            reconstruction_error = loss,
            "rbm epoch complete"
        );
    }
    metrics.total_training_time_secs = start.elapsed().as_secs_f64();
    Ok(metrics)
}

/// Hidden representation for every row: the binary sample, not the probability.
///
/// Extraction therefore depends on the random stream; pass a generator with a
/// fixed seed to get repeatable features.
pub fn extract_features<R: Rng + ?Sized>(
    params: &RbmParams,
    data: &Array2<f64>,
    rng: &mut R,
) -> Result<Array2<f64>, MlError> {
    Ok(sample_hidden(params, data, rng)?.sample)
}
