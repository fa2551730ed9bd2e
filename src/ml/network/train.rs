use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::model::{Activation, DenseLayer, NetworkModel};
use crate::ml::{OneHotDataset, TrainError, argmax};

/// Probabilities are clipped to `[PROB_EPSILON, 1 - PROB_EPSILON]` before `ln`.
const PROB_EPSILON: f32 = 1e-7;

/// Adam optimizer hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdamSettings {
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
}

impl Default for AdamSettings {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Widths of the ReLU hidden layers, input side first.
    pub hidden_layers: Vec<usize>,
    pub epochs: usize,
    pub batch_size: usize,
    pub adam: AdamSettings,
    /// Reshuffle training rows before every epoch.
    pub shuffle: bool,
    pub seed: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            hidden_layers: vec![64, 128, 64],
            epochs: 50,
            batch_size: 8,
            adam: AdamSettings::default(),
            shuffle: true,
            seed: 42,
        }
    }
}

/// Metrics reported at the end of one epoch.
///
/// `loss` and `accuracy` are running means over the epoch's batches, so they
/// reflect weights as they changed during the epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// 1-based epoch number.
    pub epoch: usize,
    pub loss: f32,
    pub accuracy: f32,
    pub val_loss: Option<f32>,
    pub val_accuracy: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochMetrics>,
}

impl TrainingHistory {
    pub fn last(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }
}

/// Mean categorical cross-entropy and accuracy of a model over a dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub loss: f32,
    pub accuracy: f32,
}

pub fn evaluate(model: &NetworkModel, data: &OneHotDataset) -> Evaluation {
    if data.x.is_empty() {
        return Evaluation {
            loss: 0.0,
            accuracy: 0.0,
        };
    }
    let mut loss = 0.0f64;
    let mut correct = 0usize;
    for (row, target) in data.x.iter().zip(&data.targets) {
        let proba = model.predict_proba(row);
        loss += f64::from(cross_entropy(&proba, target));
        if argmax(&proba) == argmax(target) {
            correct += 1;
        }
    }
    let n = data.x.len() as f64;
    Evaluation {
        loss: (loss / n) as f32,
        accuracy: (correct as f64 / n) as f32,
    }
}

/// Train a dense softmax classifier with mini-batch Adam.
///
/// `on_epoch` is called once per finished epoch, after validation.
pub fn train_network<F>(
    train: &OneHotDataset,
    validation: Option<&OneHotDataset>,
    options: &TrainOptions,
    mut on_epoch: F,
) -> Result<(NetworkModel, TrainingHistory), TrainError>
where
    F: FnMut(&EpochMetrics),
{
    train.validate()?;
    if let Some(val) = validation {
        check_validation(train, val)?;
    }
    check_options(options)?;

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut model = NetworkModel {
        model_version: NetworkModel::FORMAT_VERSION,
        feature_names: train.feature_names.clone(),
        classes: train.classes.clone(),
        layers: init_layers(
            train.feature_len(),
            &options.hidden_layers,
            train.classes.len(),
            &mut rng,
        ),
    };
    let mut optimizer = Adam::new(&model.layers, options.adam);
    let mut history = TrainingHistory::default();
    let mut indices: Vec<usize> = (0..train.x.len()).collect();

    for epoch in 1..=options.epochs {
        if options.shuffle {
            indices.shuffle(&mut rng);
        }
        let mut loss_sum = 0.0f64;
        let mut correct = 0usize;
        for batch in indices.chunks(options.batch_size) {
            let mut grads = Gradients::zeros(&model.layers);
            let scale = 1.0 / batch.len() as f32;
            for &idx in batch {
                let trace = model.forward_trace(&train.x[idx]);
                let target = &train.targets[idx];
                let proba = &trace[trace.len() - 1];
                loss_sum += f64::from(cross_entropy(proba, target));
                if argmax(proba) == argmax(target) {
                    correct += 1;
                }
                backpropagate(&model, &trace, target, scale, &mut grads);
            }
            optimizer.step(&mut model.layers, &grads);
        }

        let n = train.x.len() as f64;
        let val = validation.map(|data| evaluate(&model, data));
        let metrics = EpochMetrics {
            epoch,
            loss: (loss_sum / n) as f32,
            accuracy: (correct as f64 / n) as f32,
            val_loss: val.map(|v| v.loss),
            val_accuracy: val.map(|v| v.accuracy),
        };
        on_epoch(&metrics);
        history.epochs.push(metrics);
    }

    Ok((model, history))
}

fn check_validation(train: &OneHotDataset, val: &OneHotDataset) -> Result<(), TrainError> {
    val.validate()?;
    if val.feature_len() != train.feature_len() {
        return Err(TrainError::InvalidOption(format!(
            "validation set has {} features, expected {}",
            val.feature_len(),
            train.feature_len()
        )));
    }
    if val.classes != train.classes {
        return Err(TrainError::InvalidOption(
            "validation set uses a different class list".to_string(),
        ));
    }
    Ok(())
}

fn check_options(options: &TrainOptions) -> Result<(), TrainError> {
    if options.batch_size == 0 {
        return Err(TrainError::InvalidOption("batch_size must be >= 1".to_string()));
    }
    if options.hidden_layers.contains(&0) {
        return Err(TrainError::InvalidOption(
            "hidden layer widths must be >= 1".to_string(),
        ));
    }
    let adam = options.adam;
    if !(adam.learning_rate.is_finite() && adam.learning_rate > 0.0) {
        return Err(TrainError::InvalidOption(
            "learning_rate must be a positive number".to_string(),
        ));
    }
    if !(0.0..1.0).contains(&adam.beta1) || !(0.0..1.0).contains(&adam.beta2) {
        return Err(TrainError::InvalidOption(
            "beta1 and beta2 must lie in [0, 1)".to_string(),
        ));
    }
    if !(adam.epsilon > 0.0) {
        return Err(TrainError::InvalidOption("epsilon must be > 0".to_string()));
    }
    Ok(())
}

/// Glorot-uniform weights and zero biases; hidden layers ReLU, output softmax.
fn init_layers(
    input: usize,
    hidden: &[usize],
    n_classes: usize,
    rng: &mut StdRng,
) -> Vec<DenseLayer> {
    let mut layers = Vec::with_capacity(hidden.len() + 1);
    let mut fan_in = input;
    let widths = hidden
        .iter()
        .map(|&w| (w, Activation::Relu))
        .chain(std::iter::once((n_classes, Activation::Softmax)));
    for (fan_out, activation) in widths {
        let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
        let weights = (0..fan_in * fan_out)
            .map(|_| rng.random_range(-limit..limit))
            .collect();
        layers.push(DenseLayer {
            input_size: fan_in,
            output_size: fan_out,
            activation,
            weights,
            bias: vec![0.0; fan_out],
        });
        fan_in = fan_out;
    }
    layers
}

fn cross_entropy(proba: &[f32], target: &[f32]) -> f32 {
    proba
        .iter()
        .zip(target)
        .filter(|(_, t)| **t != 0.0)
        .map(|(p, t)| -t * p.clamp(PROB_EPSILON, 1.0 - PROB_EPSILON).ln())
        .sum()
}

struct Gradients {
    weights: Vec<Vec<f32>>,
    bias: Vec<Vec<f32>>,
}

impl Gradients {
    fn zeros(layers: &[DenseLayer]) -> Self {
        Self {
            weights: layers.iter().map(|l| vec![0.0; l.weights.len()]).collect(),
            bias: layers.iter().map(|l| vec![0.0; l.bias.len()]).collect(),
        }
    }
}

/// Accumulate `scale`-weighted gradients of one sample's loss.
///
/// Softmax with cross-entropy gives an output delta of `p - t`; hidden deltas
/// pass through the ReLU derivative, read off the stored activations.
fn backpropagate(
    model: &NetworkModel,
    trace: &[Vec<f32>],
    target: &[f32],
    scale: f32,
    grads: &mut Gradients,
) {
    let output = &trace[trace.len() - 1];
    let mut delta: Vec<f32> = output
        .iter()
        .zip(target)
        .map(|(p, t)| (p - t) * scale)
        .collect();

    for (l, layer) in model.layers.iter().enumerate().rev() {
        let input = &trace[l];
        let g_w = &mut grads.weights[l];
        let g_b = &mut grads.bias[l];
        for (o, &d) in delta.iter().enumerate() {
            g_b[o] += d;
            let row = &mut g_w[o * layer.input_size..(o + 1) * layer.input_size];
            for (g, &x) in row.iter_mut().zip(input) {
                *g += d * x;
            }
        }
        if l == 0 {
            break;
        }
        let mut prev = vec![0.0f32; layer.input_size];
        for (o, &d) in delta.iter().enumerate() {
            let row = &layer.weights[o * layer.input_size..(o + 1) * layer.input_size];
            for (acc, &w) in prev.iter_mut().zip(row) {
                *acc += w * d;
            }
        }
        for (acc, &a) in prev.iter_mut().zip(input) {
            if a <= 0.0 {
                *acc = 0.0;
            }
        }
        delta = prev;
    }
}

struct Moments {
    m: Vec<f32>,
    v: Vec<f32>,
}

impl Moments {
    fn zeros(len: usize) -> Self {
        Self {
            m: vec![0.0; len],
            v: vec![0.0; len],
        }
    }

    fn update(&mut self, params: &mut [f32], grads: &[f32], settings: &AdamSettings, lr_t: f32) {
        let AdamSettings {
            beta1,
            beta2,
            epsilon,
            ..
        } = *settings;
        for (((p, &g), m), v) in params
            .iter_mut()
            .zip(grads)
            .zip(&mut self.m)
            .zip(&mut self.v)
        {
            *m = beta1 * *m + (1.0 - beta1) * g;
            *v = beta2 * *v + (1.0 - beta2) * g * g;
            *p -= lr_t * *m / (v.sqrt() + epsilon);
        }
    }
}

/// Adam with the bias correction folded into the step size.
struct Adam {
    settings: AdamSettings,
    step: i32,
    weights: Vec<Moments>,
    bias: Vec<Moments>,
}

impl Adam {
    fn new(layers: &[DenseLayer], settings: AdamSettings) -> Self {
        Self {
            settings,
            step: 0,
            weights: layers.iter().map(|l| Moments::zeros(l.weights.len())).collect(),
            bias: layers.iter().map(|l| Moments::zeros(l.bias.len())).collect(),
        }
    }

    fn step(&mut self, layers: &mut [DenseLayer], grads: &Gradients) {
        self.step = self.step.saturating_add(1);
        let s = &self.settings;
        let lr_t = s.learning_rate * (1.0 - s.beta2.powi(self.step)).sqrt()
            / (1.0 - s.beta1.powi(self.step));
        for (l, layer) in layers.iter_mut().enumerate() {
            self.weights[l].update(&mut layer.weights, &grads.weights[l], s, lr_t);
            self.bias[l].update(&mut layer.bias, &grads.bias[l], s, lr_t);
        }
    }
}
