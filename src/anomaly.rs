/// Anomaly Detector (C8) - unsupervised outlier scorer over a fixed
/// 9-dimensional feature vector.
///
/// Grounded on `anomaly_detector.py`: the same `prepare_features`
/// layout (frequency/delta/jitter for steering, speed, brake, in that
/// order, zero-filled when a signal is absent), the same
/// collecting → trained lifecycle gated on a minimum sample count, and
/// the same raw-score-to-`[0,1]` normalization curve. The Python source
/// reached for scikit-learn's `IsolationForest`; no crate in this stack
/// provides an equivalent; this implements the isolation-forest
/// algorithm itself (Liu, Ting & Zhou 2008) - random-split binary
/// trees, anomaly measured by average path length - using `rand` for
/// tree construction, already a dependency for other components.
use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::contracts::SignalKind;
use crate::feature_extractor::SignalFeatures;

const FEATURE_DIM: usize = 9;
const TREE_COUNT: usize = 64;
const SUBSAMPLE_SIZE: usize = 64;

/// Flatten per-signal features into the fixed 9-dim vector C8 scores.
/// Missing signals are zero-filled (spec §4.8).
pub fn feature_vector(features: &HashMap<SignalKind, SignalFeatures>) -> [f64; FEATURE_DIM] {
    let mut vector = [0.0; FEATURE_DIM];
    for (i, kind) in SignalKind::ALL.iter().enumerate() {
        if let Some(f) = features.get(kind) {
            vector[i * 3] = f.frequency;
            vector[i * 3 + 1] = f.delta;
            vector[i * 3 + 2] = f.jitter;
        }
    }
    vector
}

struct IsolationNode {
    // Leaf: external node size contribution to path-length estimate.
    size: usize,
    split_feature: Option<usize>,
    split_value: f64,
    left: Option<Box<IsolationNode>>,
    right: Option<Box<IsolationNode>>,
}

impl IsolationNode {
    fn build(data: &[[f64; FEATURE_DIM]], depth: usize, max_depth: usize, rng: &mut StdRng) -> Self {
        if data.len() <= 1 || depth >= max_depth {
            return Self {
                size: data.len(),
                split_feature: None,
                split_value: 0.0,
                left: None,
                right: None,
            };
        }

        let feature = rng.gen_range(0..FEATURE_DIM);
        let (min, max) = data.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), row| {
            (lo.min(row[feature]), hi.max(row[feature]))
        });
        if (max - min).abs() < f64::EPSILON {
            return Self {
                size: data.len(),
                split_feature: None,
                split_value: 0.0,
                left: None,
                right: None,
            };
        }
        let split_value = rng.gen_range(min..max);

        let (left_data, right_data): (Vec<_>, Vec<_>) =
            data.iter().partition(|row| row[feature] < split_value);

        Self {
            size: data.len(),
            split_feature: Some(feature),
            split_value,
            left: Some(Box::new(Self::build(&left_data, depth + 1, max_depth, rng))),
            right: Some(Box::new(Self::build(&right_data, depth + 1, max_depth, rng))),
        }
    }

    fn path_length(&self, sample: &[f64; FEATURE_DIM], depth: usize) -> f64 {
        match self.split_feature {
            None => depth as f64 + average_path_length_estimate(self.size),
            Some(feature) => {
                let next = if sample[feature] < self.split_value {
                    self.left.as_ref()
                } else {
                    self.right.as_ref()
                };
                next.map(|n| n.path_length(sample, depth + 1))
                    .unwrap_or(depth as f64)
            }
        }
    }
}

/// Harmonic-number path length correction for unbuilt subtrees (the
/// isolation-forest paper's `c(n)`).
fn average_path_length_estimate(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let n = n as f64;
    2.0 * (harmonic(n - 1.0) ) - (2.0 * (n - 1.0) / n)
}

fn harmonic(n: f64) -> f64 {
    if n <= 0.0 {
        return 0.0;
    }
    n.ln() + 0.5772156649
}

enum DetectorState {
    Collecting(Vec<[f64; FEATURE_DIM]>),
    Trained {
        trees: Vec<IsolationNode>,
        c_norm: f64,
        offset: f64,
    },
}

/// Isolation-forest-like unsupervised outlier scorer.
pub struct AnomalyDetector {
    training_min_samples: usize,
    training_threshold: usize,
    contamination: f64,
    state: DetectorState,
    rng_seed: u64,
}

impl AnomalyDetector {
    pub fn new(training_min_samples: usize, training_threshold: usize, contamination: f64) -> Self {
        Self {
            training_min_samples,
            training_threshold,
            contamination,
            state: DetectorState::Collecting(Vec::new()),
            rng_seed: 0x5EED_ECA1,
        }
    }

    pub fn is_trained(&self) -> bool {
        matches!(self.state, DetectorState::Trained { .. })
    }

    /// Feed one observed feature vector. While collecting, accumulates
    /// toward the training threshold and trains once it is reached
    /// (spec §4.8: "requires ≥ 10 valid samples; after reaching the
    /// configured threshold the detector fits the model").
    pub fn observe(&mut self, vector: [f64; FEATURE_DIM]) {
        if let DetectorState::Collecting(buffer) = &mut self.state {
            buffer.push(vector);
            if buffer.len() >= self.training_threshold && buffer.len() >= self.training_min_samples {
                let data = std::mem::take(buffer);
                self.train(data);
            }
        }
    }

    fn train(&mut self, data: Vec<[f64; FEATURE_DIM]>) {
        let mut rng = StdRng::seed_from_u64(self.rng_seed);
        let subsample_size = SUBSAMPLE_SIZE.min(data.len());
        let max_depth = (subsample_size as f64).log2().ceil() as usize;

        let mut trees = Vec::with_capacity(TREE_COUNT);
        for _ in 0..TREE_COUNT {
            let mut indices: Vec<usize> = (0..data.len()).collect();
            indices.shuffle(&mut rng);
            let sample: Vec<[f64; FEATURE_DIM]> = indices
                .into_iter()
                .take(subsample_size)
                .map(|i| data[i])
                .collect();
            trees.push(IsolationNode::build(&sample, 0, max_depth, &mut rng));
        }

        let c_norm = average_path_length_estimate(subsample_size).max(1e-9);

        let mut scores: Vec<f64> = data
            .iter()
            .map(|row| score_samples(&trees, c_norm, row))
            .collect();
        scores.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let idx = ((self.contamination * scores.len() as f64).floor() as usize).min(scores.len() - 1);
        let offset = scores[idx];

        self.state = DetectorState::Trained {
            trees,
            c_norm,
            offset,
        };
    }

    /// Score `vector` in `[0, 1]` per the normalization curve in spec
    /// §4.8. Returns 0.0 while still collecting (no ML contribution).
    pub fn detect(&self, vector: &[f64; FEATURE_DIM]) -> f64 {
        let DetectorState::Trained { trees, c_norm, offset } = &self.state else {
            return 0.0;
        };
        let raw_score = score_samples(trees, *c_norm, vector) - offset;
        normalize(raw_score)
    }
}

fn score_samples(trees: &[IsolationNode], c_norm: f64, sample: &[f64; FEATURE_DIM]) -> f64 {
    let avg_path: f64 =
        trees.iter().map(|t| t.path_length(sample, 0)).sum::<f64>() / trees.len() as f64;
    -2f64.powf(-avg_path / c_norm)
}

fn normalize(raw_score: f64) -> f64 {
    let normalized = if raw_score < -0.10 {
        0.8 + (raw_score.abs() - 0.1) * 2.0
    } else if raw_score < -0.02 {
        0.5 + (raw_score.abs() - 0.02) * 3.0
    } else if raw_score < 0.02 {
        0.2 + raw_score.abs() * 10.0
    } else {
        0.0
    };
    normalized.min(1.0)
}
