use serde::{Deserialize, Serialize};

use crate::ml::{argmax, softmax};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Relu,
    Softmax,
}

impl Activation {
    fn apply(self, z: Vec<f32>) -> Vec<f32> {
        match self {
            Self::Relu => z.into_iter().map(|v| v.max(0.0)).collect(),
            Self::Softmax => softmax(&z),
        }
    }
}

/// Fully connected layer. `weights` is output-major: `weights[o * input_size + i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub input_size: usize,
    pub output_size: usize,
    pub activation: Activation,
    pub weights: Vec<f32>,
    pub bias: Vec<f32>,
}

impl DenseLayer {
    pub fn forward(&self, input: &[f32]) -> Vec<f32> {
        let z = (0..self.output_size)
            .map(|o| {
                let row = &self.weights[o * self.input_size..(o + 1) * self.input_size];
                self.bias[o]
                    + row
                        .iter()
                        .zip(input)
                        .map(|(w, x)| w * x)
                        .sum::<f32>()
            })
            .collect();
        self.activation.apply(z)
    }

    pub fn parameter_count(&self) -> usize {
        self.weights.len() + self.bias.len()
    }

    fn validate(&self) -> Result<(), String> {
        if self.input_size == 0 || self.output_size == 0 {
            return Err("layer has a zero dimension".to_string());
        }
        if self.weights.len() != self.input_size * self.output_size {
            return Err("weights length mismatch".to_string());
        }
        if self.bias.len() != self.output_size {
            return Err("bias length mismatch".to_string());
        }
        if self
            .weights
            .iter()
            .chain(&self.bias)
            .any(|v| !v.is_finite())
        {
            return Err("non-finite parameter".to_string());
        }
        Ok(())
    }
}

/// Feed-forward classifier ending in a softmax layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkModel {
    pub model_version: i64,
    /// Feature names in the order predict expects them.
    pub feature_names: Vec<String>,
    /// Ordered class identifiers; output unit `k` scores `classes[k]`.
    pub classes: Vec<String>,
    pub layers: Vec<DenseLayer>,
}

impl NetworkModel {
    pub const FORMAT_VERSION: i64 = 1;

    pub fn validate(&self) -> Result<(), String> {
        if self.model_version != Self::FORMAT_VERSION {
            return Err(format!(
                "Unsupported model_version {} (expected {})",
                self.model_version,
                Self::FORMAT_VERSION
            ));
        }
        if self.classes.is_empty() {
            return Err("Model must contain at least 1 class".to_string());
        }
        let Some(last) = self.layers.last() else {
            return Err("Model must contain at least 1 layer".to_string());
        };
        if last.activation != Activation::Softmax {
            return Err("Output layer must use softmax".to_string());
        }
        if last.output_size != self.classes.len() {
            return Err(format!(
                "Output layer has {} units but {} classes are listed",
                last.output_size,
                self.classes.len()
            ));
        }
        let mut expected_input = self.feature_names.len();
        for (idx, layer) in self.layers.iter().enumerate() {
            layer
                .validate()
                .map_err(|err| format!("layer {idx}: {err}"))?;
            if layer.input_size != expected_input {
                return Err(format!(
                    "layer {idx}: expects {} inputs, previous layer yields {expected_input}",
                    layer.input_size
                ));
            }
            expected_input = layer.output_size;
        }
        Ok(())
    }

    /// Layer widths from input to output, e.g. `[4, 64, 128, 64, 10]`.
    pub fn architecture(&self) -> Vec<usize> {
        std::iter::once(self.feature_names.len())
            .chain(self.layers.iter().map(|layer| layer.output_size))
            .collect()
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(DenseLayer::parameter_count).sum()
    }

    /// Class probabilities; empty when the feature width does not match.
    pub fn predict_proba(&self, features: &[f32]) -> Vec<f32> {
        if features.len() != self.feature_names.len() || self.layers.is_empty() {
            return Vec::new();
        }
        self.layers
            .iter()
            .fold(features.to_vec(), |acc, layer| layer.forward(&acc))
    }

    pub fn predict_class_index(&self, features: &[f32]) -> usize {
        argmax(&self.predict_proba(features))
    }

    pub fn predict_class(&self, features: &[f32]) -> Option<&str> {
        let proba = self.predict_proba(features);
        if proba.is_empty() {
            return None;
        }
        self.classes.get(argmax(&proba)).map(String::as_str)
    }

    /// Input followed by every layer's activation output.
    pub(super) fn forward_trace(&self, features: &[f32]) -> Vec<Vec<f32>> {
        let mut trace = Vec::with_capacity(self.layers.len() + 1);
        trace.push(features.to_vec());
        for layer in &self.layers {
            let next = layer.forward(&trace[trace.len() - 1]);
            trace.push(next);
        }
        trace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_model() -> NetworkModel {
        NetworkModel {
            model_version: NetworkModel::FORMAT_VERSION,
            feature_names: vec!["a".into(), "b".into()],
            classes: vec!["x".into(), "y".into(), "z".into()],
            layers: vec![
                DenseLayer {
                    input_size: 2,
                    output_size: 2,
                    activation: Activation::Relu,
                    weights: vec![1.0, -1.0, -1.0, 1.0],
                    bias: vec![0.0, 0.0],
                },
                DenseLayer {
                    input_size: 2,
                    output_size: 3,
                    activation: Activation::Softmax,
                    weights: vec![2.0, 0.0, 0.0, 2.0, 0.5, 0.5],
                    bias: vec![0.0, 0.0, 0.1],
                },
            ],
        }
    }

    #[test]
    fn output_is_a_probability_distribution() {
        let model = tiny_model();
        assert!(model.validate().is_ok());
        for probe in [[0.0, 0.0], [3.0, -1.0], [-50.0, 80.0], [1e6, 1e6]] {
            let proba = model.predict_proba(&probe);
            assert_eq!(proba.len(), 3);
            let sum: f32 = proba.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "sum {sum} for {probe:?}");
            assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
        }
    }

    #[test]
    fn relu_routes_inputs_to_expected_class() {
        let model = tiny_model();
        assert_eq!(model.predict_class(&[3.0, 0.0]), Some("x"));
        assert_eq!(model.predict_class(&[0.0, 3.0]), Some("y"));
    }

    #[test]
    fn wrong_width_predicts_nothing() {
        let model = tiny_model();
        assert!(model.predict_proba(&[1.0]).is_empty());
        assert_eq!(model.predict_class(&[1.0, 2.0, 3.0]), None);
    }

    #[test]
    fn validate_checks_layer_chain_and_output() {
        let mut broken = tiny_model();
        broken.layers[1].input_size = 3;
        broken.layers[1].weights = vec![0.0; 9];
        assert!(broken.validate().is_err());

        let mut wrong_classes = tiny_model();
        wrong_classes.classes.pop();
        assert!(wrong_classes.validate().is_err());

        let mut relu_output = tiny_model();
        relu_output.layers[1].activation = Activation::Relu;
        assert!(relu_output.validate().is_err());
    }

    #[test]
    fn architecture_and_parameters() {
        let model = tiny_model();
        assert_eq!(model.architecture(), vec![2, 2, 3]);
        assert_eq!(model.parameter_count(), 6 + 9);
        assert_eq!(model.forward_trace(&[1.0, 0.0]).len(), 3);
    }

    #[test]
    fn json_round_trip_preserves_predictions() {
        let model = tiny_model();
        let json = serde_json::to_string(&model).unwrap();
        let restored: NetworkModel = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, model);
        assert_eq!(
            restored.predict_proba(&[0.3, 0.7]),
            model.predict_proba(&[0.3, 0.7])
        );
    }
}
