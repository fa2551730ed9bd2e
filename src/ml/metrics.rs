//! Evaluation metrics for classification models.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
/// Confusion matrix for a `K`-class classifier.
pub struct ConfusionMatrix {
    /// Number of classes.
    pub n_classes: usize,
    /// Row-major `KxK` counts (`truth * K + predicted`).
    pub counts: Vec<u32>,
}

impl ConfusionMatrix {
    /// Create an empty `KxK` confusion matrix.
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            counts: vec![0; n_classes * n_classes],
        }
    }

    /// Tally predictions against labels. Out-of-range pairs are ignored.
    pub fn from_predictions(n_classes: usize, truth: &[usize], predicted: &[usize]) -> Self {
        let mut cm = Self::new(n_classes);
        for (&t, &p) in truth.iter().zip(predicted) {
            cm.add(t, p);
        }
        cm
    }

    pub fn add(&mut self, truth: usize, predicted: usize) {
        if truth >= self.n_classes || predicted >= self.n_classes {
            return;
        }
        let idx = truth * self.n_classes + predicted;
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth * self.n_classes + predicted]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Precision/recall statistics for a single class.
pub struct PerClassStats {
    /// `TP / (TP + FP)`.
    pub precision: f32,
    /// `TP / (TP + FN)`.
    pub recall: f32,
    /// Total number of true examples for the class.
    pub support: u32,
}

impl PerClassStats {
    pub fn f1(&self) -> f32 {
        let denom = self.precision + self.recall;
        if denom == 0.0 {
            0.0
        } else {
            2.0 * self.precision * self.recall / denom
        }
    }
}

/// Held-out evaluation snapshot recorded in artifact manifests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub accuracy: f32,
    pub samples: u64,
    /// Only classes with support in the evaluated split are listed.
    pub per_class: Vec<PerClassMetric>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerClassMetric {
    pub class_id: String,
    pub support: u32,
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
}

/// Compute per-class precision and recall from a confusion matrix.
pub fn precision_recall_by_class(cm: &ConfusionMatrix) -> Vec<PerClassStats> {
    let k = cm.n_classes;
    (0..k)
        .map(|class_idx| {
            let tp = cm.get(class_idx, class_idx) as f32;
            let support: u32 = (0..k).map(|j| cm.get(class_idx, j)).sum();
            let predicted: u32 = (0..k).map(|i| cm.get(i, class_idx)).sum();
            let fn_ = support as f32 - tp;
            let fp = predicted as f32 - tp;
            let precision = if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) };
            let recall = if tp + fn_ == 0.0 { 0.0 } else { tp / (tp + fn_) };
            PerClassStats {
                precision,
                recall,
                support,
            }
        })
        .collect()
}

/// Compute overall accuracy from a confusion matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f32 {
    let total = cm.total();
    if total == 0 {
        return 0.0;
    }
    let correct: u64 = (0..cm.n_classes)
        .map(|i| u64::from(cm.get(i, i)))
        .sum();
    correct as f32 / total as f32
}

/// Build the serializable summary for a confusion matrix.
pub fn summarize(cm: &ConfusionMatrix, classes: &[String]) -> EvaluationSummary {
    let per_class = precision_recall_by_class(cm)
        .into_iter()
        .zip(classes)
        .filter(|(stats, _)| stats.support > 0)
        .map(|(stats, class_id)| PerClassMetric {
            class_id: class_id.clone(),
            support: stats.support,
            precision: stats.precision,
            recall: stats.recall,
            f1: stats.f1(),
        })
        .collect();
    EvaluationSummary {
        accuracy: accuracy(cm),
        samples: cm.total(),
        per_class,
    }
}

/// Render the confusion matrix as aligned text rows (rows=truth, cols=pred).
pub fn format_confusion_matrix(cm: &ConfusionMatrix) -> Vec<String> {
    (0..cm.n_classes)
        .map(|truth| {
            (0..cm.n_classes)
                .map(|pred| format!("{:6}", cm.get(truth, pred)))
                .collect::<String>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_matrix() -> ConfusionMatrix {
        // truth:     0 0 0 1 1 2
        // predicted: 0 0 1 1 0 2
        ConfusionMatrix::from_predictions(3, &[0, 0, 0, 1, 1, 2], &[0, 0, 1, 1, 0, 2])
    }

    #[test]
    fn accuracy_counts_diagonal() {
        let cm = sample_matrix();
        assert_eq!(cm.total(), 6);
        assert!((accuracy(&cm) - 4.0 / 6.0).abs() < 1e-6);
    }

    #[test]
    fn per_class_precision_and_recall() {
        let stats = precision_recall_by_class(&sample_matrix());
        assert!((stats[0].precision - 2.0 / 3.0).abs() < 1e-6);
        assert!((stats[0].recall - 2.0 / 3.0).abs() < 1e-6);
        assert!((stats[1].precision - 0.5).abs() < 1e-6);
        assert!((stats[1].recall - 0.5).abs() < 1e-6);
        assert_eq!(stats[2].support, 1);
        assert_eq!(stats[2].f1(), 1.0);
    }

    #[test]
    fn summary_skips_classes_without_support() {
        let cm = ConfusionMatrix::from_predictions(3, &[0, 2], &[0, 1]);
        let summary = summarize(&cm, &["a".into(), "b".into(), "c".into()]);
        let ids: Vec<&str> = summary.per_class.iter().map(|m| m.class_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(summary.samples, 2);
    }

    #[test]
    fn empty_matrix_has_zero_accuracy() {
        assert_eq!(accuracy(&ConfusionMatrix::new(2)), 0.0);
    }

    #[test]
    fn out_of_range_predictions_are_ignored() {
        let mut cm = ConfusionMatrix::new(2);
        cm.add(0, 5);
        assert_eq!(cm.total(), 0);
    }
}
