//! One-dimensional isolation forest.
//!
//! Outliers are isolated by fewer random splits. Each tree is grown on a
//! subsample drawn without replacement, depth-limited to
//! `ceil(log2(sample_size))`; the anomaly score of a value is
//! `2^(-E[h(x)] / c(sample_size))`.

use rand::Rng;
use rand::seq::index;

use super::rng::DeterministicRng;
use crate::config::DetectorConfig;
use crate::constants::detector::{EULER_GAMMA, MIN_SPLIT_SPREAD};

#[derive(Debug, Clone)]
enum Node {
    Split {
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

#[derive(Debug, Clone)]
struct IsolationTree {
    root: Node,
}

impl IsolationTree {
    fn grow(values: &mut [f64], max_depth: usize, rng: &mut DeterministicRng) -> Self {
        Self {
            root: grow_node(values, 0, max_depth, rng),
        }
    }

    fn path_length(&self, value: f64) -> f64 {
        let mut node = &self.root;
        let mut depth = 0usize;
        loop {
            match node {
                Node::Leaf { size } => return depth as f64 + average_path_length(*size),
                Node::Split {
                    threshold,
                    left,
                    right,
                } => {
                    node = if value < *threshold { left } else { right };
                    depth += 1;
                }
            }
        }
    }
}

fn grow_node(
    values: &mut [f64],
    depth: usize,
    max_depth: usize,
    rng: &mut DeterministicRng,
) -> Node {
    let size = values.len();
    if depth >= max_depth || size <= 1 {
        return Node::Leaf { size };
    }
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    if max - min < MIN_SPLIT_SPREAD {
        return Node::Leaf { size };
    }

    let threshold = rng.random_range(min..max);
    // Partition in place: values below the threshold go left.
    let mut boundary = 0;
    for i in 0..size {
        if values[i] < threshold {
            values.swap(i, boundary);
            boundary += 1;
        }
    }
    let (left, right) = values.split_at_mut(boundary);
    if left.is_empty() || right.is_empty() {
        return Node::Leaf { size };
    }
    Node::Split {
        threshold,
        left: Box::new(grow_node(left, depth + 1, max_depth, rng)),
        right: Box::new(grow_node(right, depth + 1, max_depth, rng)),
    }
}

/// Average path length of an unsuccessful BST search over `n` items.
pub(crate) fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linear-interpolated percentile (`q` in `[0, 1]`) of an ascending slice.
pub(crate) fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        len => {
            let rank = q.clamp(0.0, 1.0) * (len - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let weight = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}

/// Forest fitted on one working set.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
    threshold: f64,
}

impl IsolationForest {
    /// Fit on `values` and derive the outlier threshold from the training scores.
    ///
    /// Returns `None` for empty input.
    pub fn fit(values: &[f64], config: &DetectorConfig) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let sample_size = config.max_samples.min(values.len()).max(1);
        let max_depth = (sample_size as f64).log2().ceil() as usize;
        let mut rng = DeterministicRng::new(config.seed);

        let trees = (0..config.n_estimators)
            .map(|_| {
                let mut sample: Vec<f64> = index::sample(&mut rng, values.len(), sample_size)
                    .into_iter()
                    .map(|i| values[i])
                    .collect();
                IsolationTree::grow(&mut sample, max_depth, &mut rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            sample_size,
            threshold: f64::INFINITY,
        };
        let mut training = forest.score_all(values);
        training.sort_by(f64::total_cmp);
        forest.threshold = percentile(&training, 1.0 - config.contamination);
        Some(forest)
    }

    /// Anomaly score in `(0, 1]`; higher is more isolated.
    pub fn score(&self, value: f64) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        let mean_depth = self
            .trees
            .iter()
            .map(|tree| tree.path_length(value))
            .sum::<f64>()
            / self.trees.len() as f64;
        let normalizer = average_path_length(self.sample_size);
        if normalizer > 0.0 {
            2f64.powf(-mean_depth / normalizer)
        } else {
            0.5
        }
    }

    /// Score every value in order.
    pub fn score_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|value| self.score(*value)).collect()
    }

    /// Fitted outlier threshold; scores strictly above it are outliers.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Subsample size each tree was grown on.
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// True when `score` lies strictly above the fitted threshold.
    pub fn is_outlier(&self, score: f64) -> bool {
        score > self.threshold
    }
}
