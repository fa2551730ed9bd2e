use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::model::{DecisionTree, ForestModel, TreeNode};
use crate::ml::{TrainDataset, TrainError};

/// Number of features examined when searching for a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// `floor(sqrt(n_features))`, at least 1.
    #[default]
    Sqrt,
    /// `floor(log2(n_features))`, at least 1.
    Log2,
    /// Every feature.
    All,
    /// A fixed count, clamped to `1..=n_features`.
    Count(usize),
}

impl MaxFeatures {
    pub fn resolve(self, n_features: usize) -> usize {
        let n = n_features.max(1);
        let k = match self {
            Self::Sqrt => (n as f64).sqrt().floor() as usize,
            Self::Log2 => (n as f64).log2().floor() as usize,
            Self::All => n,
            Self::Count(count) => count,
        };
        k.clamp(1, n)
    }
}

/// Training hyperparameters for the random forest.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Number of trees.
    pub n_trees: usize,
    /// Maximum tree depth; `None` grows until leaves are pure.
    pub max_depth: Option<usize>,
    /// Minimum samples a node needs before it may split.
    pub min_samples_split: usize,
    /// Minimum samples on each side of a split.
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    /// Train each tree on a bootstrap resample of the rows.
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            seed: 42,
        }
    }
}

/// Train a Gini-impurity random forest.
pub fn train_forest(
    dataset: &TrainDataset,
    options: &TrainOptions,
) -> Result<ForestModel, TrainError> {
    dataset.validate()?;
    if options.n_trees == 0 {
        return Err(TrainError::InvalidOption("n_trees must be >= 1".to_string()));
    }
    if options.min_samples_split < 2 {
        return Err(TrainError::InvalidOption(
            "min_samples_split must be >= 2".to_string(),
        ));
    }
    if options.min_samples_leaf == 0 {
        return Err(TrainError::InvalidOption(
            "min_samples_leaf must be >= 1".to_string(),
        ));
    }
    if dataset.feature_len() > u16::MAX as usize {
        return Err(TrainError::InvalidOption(format!(
            "at most {} features are supported",
            u16::MAX
        )));
    }

    let n = dataset.x.len();
    let grower = TreeGrower {
        x: &dataset.x,
        y: &dataset.y,
        n_classes: dataset.classes.len(),
        n_features: dataset.feature_len(),
        max_features: options.max_features.resolve(dataset.feature_len()),
        options,
    };
    let mut rng = StdRng::seed_from_u64(options.seed);

    let mut trees = Vec::with_capacity(options.n_trees);
    for _ in 0..options.n_trees {
        let samples: Vec<usize> = if options.bootstrap {
            (0..n).map(|_| rng.random_range(0..n)).collect()
        } else {
            (0..n).collect()
        };
        trees.push(grower.grow(samples, &mut rng));
    }

    let total_leaves: usize = trees.iter().map(DecisionTree::leaf_count).sum();
    let max_depth = trees.iter().map(DecisionTree::depth).max().unwrap_or(0);
    debug!(
        trees = trees.len(),
        total_leaves, max_depth, "random forest grown"
    );

    Ok(ForestModel {
        model_version: ForestModel::FORMAT_VERSION,
        feature_names: dataset.feature_names.clone(),
        classes: dataset.classes.clone(),
        trees,
    })
}

struct TreeGrower<'a> {
    x: &'a [Vec<f32>],
    y: &'a [usize],
    n_classes: usize,
    n_features: usize,
    max_features: usize,
    options: &'a TrainOptions,
}

struct PendingNode {
    node: usize,
    samples: Vec<usize>,
    depth: usize,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f32,
    /// Weighted Gini impurity of the two children.
    impurity: f64,
}

impl TreeGrower<'_> {
    fn grow(&self, samples: Vec<usize>, rng: &mut StdRng) -> DecisionTree {
        let placeholder = || TreeNode::Leaf {
            distribution: Vec::new(),
        };
        let mut nodes = vec![placeholder()];
        let mut stack = vec![PendingNode {
            node: 0,
            samples,
            depth: 0,
        }];

        while let Some(PendingNode {
            node,
            samples,
            depth,
        }) = stack.pop()
        {
            let counts = self.class_counts(&samples);
            let split = if self.can_split(&samples, &counts, depth) {
                self.best_split(&samples, &counts, rng)
            } else {
                None
            };
            let Some(split) = split else {
                nodes[node] = TreeNode::Leaf {
                    distribution: normalize(&counts),
                };
                continue;
            };

            let (left, right): (Vec<usize>, Vec<usize>) = samples
                .iter()
                .copied()
                .partition(|&s| self.x[s][split.feature] <= split.threshold);
            let left_idx = nodes.len();
            nodes.push(placeholder());
            let right_idx = nodes.len();
            nodes.push(placeholder());
            nodes[node] = TreeNode::Split {
                feature_index: split.feature as u16,
                threshold: split.threshold,
                left: left_idx as u32,
                right: right_idx as u32,
            };
            stack.push(PendingNode {
                node: right_idx,
                samples: right,
                depth: depth + 1,
            });
            stack.push(PendingNode {
                node: left_idx,
                samples: left,
                depth: depth + 1,
            });
        }

        DecisionTree { nodes }
    }

    fn can_split(&self, samples: &[usize], counts: &[u32], depth: usize) -> bool {
        let options = self.options;
        samples.len() >= options.min_samples_split
            && samples.len() >= 2 * options.min_samples_leaf
            && options.max_depth.is_none_or(|max| depth < max)
            && counts.iter().filter(|&&c| c > 0).count() > 1
    }

    fn class_counts(&self, samples: &[usize]) -> Vec<u32> {
        let mut counts = vec![0u32; self.n_classes];
        for &s in samples {
            counts[self.y[s]] += 1;
        }
        counts
    }

    /// Examine `max_features` random features, continuing past that count
    /// only while no valid split has been found.
    fn best_split(
        &self,
        samples: &[usize],
        parent_counts: &[u32],
        rng: &mut StdRng,
    ) -> Option<SplitCandidate> {
        let mut features: Vec<usize> = (0..self.n_features).collect();
        features.shuffle(rng);

        let mut best: Option<SplitCandidate> = None;
        let mut pairs: Vec<(f32, usize)> = Vec::with_capacity(samples.len());
        for (visited, feature) in features.into_iter().enumerate() {
            if visited >= self.max_features && best.is_some() {
                break;
            }
            pairs.clear();
            pairs.extend(samples.iter().map(|&s| (self.x[s][feature], self.y[s])));
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
            if let Some(candidate) = self.best_threshold(feature, &pairs, parent_counts)
                && best.is_none_or(|current| candidate.impurity < current.impurity)
            {
                best = Some(candidate);
            }
        }
        best
    }

    /// Sweep sorted `(value, label)` pairs and return the lowest-impurity cut.
    fn best_threshold(
        &self,
        feature: usize,
        pairs: &[(f32, usize)],
        parent_counts: &[u32],
    ) -> Option<SplitCandidate> {
        let n = pairs.len();
        let min_leaf = self.options.min_samples_leaf;
        let mut left_counts = vec![0u32; self.n_classes];
        let mut right_counts = parent_counts.to_vec();
        let mut best: Option<SplitCandidate> = None;

        for i in 0..n.saturating_sub(1) {
            let (value, label) = pairs[i];
            left_counts[label] += 1;
            right_counts[label] -= 1;

            let n_left = i + 1;
            let n_right = n - n_left;
            if n_left < min_leaf || n_right < min_leaf {
                continue;
            }
            let next = pairs[i + 1].0;
            if !(value < next) {
                continue;
            }
            let impurity = (n_left as f64 * gini(&left_counts, n_left)
                + n_right as f64 * gini(&right_counts, n_right))
                / n as f64;
            if best.is_none_or(|current| impurity < current.impurity) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: midpoint(value, next),
                    impurity,
                });
            }
        }
        best
    }
}

fn midpoint(low: f32, high: f32) -> f32 {
    let mid = low + (high - low) / 2.0;
    // Adjacent floats can round the midpoint up onto `high`.
    if mid >= high || !mid.is_finite() { low } else { mid }
}

fn gini(counts: &[u32], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

fn normalize(counts: &[u32]) -> Vec<f32> {
    let total: u32 = counts.iter().sum();
    if total == 0 {
        return vec![0.0; counts.len()];
    }
    counts.iter().map(|&c| c as f32 / total as f32).collect()
}
