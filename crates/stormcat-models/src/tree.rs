use std::collections::VecDeque;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    ModelError,
    fit::{Fit, Predict, check_sample, validate_training},
    node::{ClassCounts, Node, NodeIndex},
    split::{SplitCriterion, find_best_split},
};

/// Configuration for a binary CART decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default               |
/// |---------------------|-----------------------|
/// | `criterion`         | `Gini`                |
/// | `max_depth`         | `None` (unlimited)    |
/// | `min_samples_split` | 2                     |
/// | `min_samples_leaf`  | 1                     |
/// | `max_features`      | `None` (all features) |
/// | `seed`              | 42                    |
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DecisionTreeConfig {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the maximum tree depth (root is depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the number of features considered at each split. `None` means all.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the random seed used for feature sub-sampling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the split criterion.
    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the minimum samples required to split a node.
    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    /// Return the minimum samples required in each leaf.
    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    /// Return the per-split feature limit, if set.
    #[must_use]
    pub fn max_features(&self) -> Option<usize> {
        self.max_features
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn validate(&self, n_features: usize) -> Result<usize, ModelError> {
        if let Some(d) = self.max_depth
            && d == 0
        {
            return Err(ModelError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split < 2 {
            return Err(ModelError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf < 1 {
            return Err(ModelError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }
        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(ModelError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }
        Ok(max_features)
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Fit for DecisionTreeConfig {
    type Model = DecisionTree;

    /// Grow a tree on row-major `features`.
    ///
    /// # Errors
    ///
    /// | Variant                                  | When                                  |
    /// |------------------------------------------|---------------------------------------|
    /// | [`ModelError::EmptyDataset`]             | `features` is empty                   |
    /// | [`ModelError::ZeroFeatures`]             | rows have zero columns                |
    /// | [`ModelError::FeatureCountMismatch`]     | rows have inconsistent lengths        |
    /// | [`ModelError::LabelCountMismatch`]       | `labels.len() != features.len()`      |
    /// | [`ModelError::NonFiniteValue`]           | any value is NaN or infinite          |
    /// | [`ModelError::InvalidMaxDepth`]          | `max_depth` is `Some(0)`              |
    /// | [`ModelError::InvalidMinSamplesSplit`]   | `min_samples_split < 2`               |
    /// | [`ModelError::InvalidMinSamplesLeaf`]    | `min_samples_leaf < 1`                |
    /// | [`ModelError::InvalidMaxFeatures`]       | outside `[1, n_features]`             |
    #[instrument(skip_all, fields(n_samples = features.len()))]
    fn fit(&self, features: &[Vec<f64>], labels: &[bool]) -> Result<DecisionTree, ModelError> {
        let (n_samples, n_features) = validate_training(features, labels)?;
        let max_features = self.validate(n_features)?;

        debug!(n_samples, n_features, max_features, "fitting decision tree");

        let columns: Vec<Vec<f64>> = (0..n_features)
            .map(|f| features.iter().map(|row| row[f]).collect())
            .collect();
        let sample_indices: Vec<usize> = (0..n_samples).collect();

        let mut builder = TreeBuilder {
            columns: &columns,
            labels,
            config: self,
            max_features,
            rng: ChaCha8Rng::seed_from_u64(self.seed),
            arena: Vec::new(),
        };
        builder.grow(&sample_indices, 0);
        let nodes = builder.arena;

        debug!(n_nodes = nodes.len(), "decision tree built");

        Ok(DecisionTree { nodes, n_features })
    }
}

struct TreeBuilder<'a> {
    columns: &'a [Vec<f64>],
    labels: &'a [bool],
    config: &'a DecisionTreeConfig,
    max_features: usize,
    rng: ChaCha8Rng,
    arena: Vec<Node>,
}

impl TreeBuilder<'_> {
    /// Grow the subtree for `sample_indices` and return its arena index.
    fn grow(&mut self, sample_indices: &[usize], depth: usize) -> NodeIndex {
        let counts = ClassCounts::tally(self.labels, sample_indices);
        let impurity = self.config.criterion.impurity(counts);

        let depth_reached = self.config.max_depth.is_some_and(|d| depth >= d);
        let too_few = sample_indices.len() < self.config.min_samples_split;
        if too_few || depth_reached || impurity.value() == 0.0 {
            return self.push_leaf(counts);
        }

        let Some(split) = find_best_split(
            self.columns,
            self.labels,
            sample_indices,
            self.config.criterion,
            self.max_features,
            self.config.min_samples_leaf,
            &mut self.rng,
        ) else {
            return self.push_leaf(counts);
        };

        // Reserve the slot so children get higher indices than their parent.
        let node_idx = self.arena.len();
        self.arena.push(Node::Leaf {
            prediction: counts.majority(),
            impurity,
            counts,
        });

        let left = self.grow(&split.left_indices, depth + 1);
        let right = self.grow(&split.right_indices, depth + 1);

        self.arena[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            impurity,
            counts,
            impurity_decrease: split.impurity_decrease,
        };
        NodeIndex::new(node_idx)
    }

    fn push_leaf(&mut self, counts: ClassCounts) -> NodeIndex {
        let idx = self.arena.len();
        self.arena.push(Node::Leaf {
            prediction: counts.majority(),
            impurity: self.config.criterion.impurity(counts),
            counts,
        });
        NodeIndex::new(idx)
    }
}

/// A fitted binary CART decision tree stored as a node arena.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    n_features: usize,
}

impl DecisionTree {
    /// Fraction of training samples in the reached leaf that were positive.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_positive_fraction(&self, sample: &[f64]) -> Result<f64, ModelError> {
        check_sample(sample, self.n_features)?;
        let counts = match self.leaf(sample) {
            Node::Leaf { counts, .. } | Node::Split { counts, .. } => *counts,
        };
        Ok(counts.positive as f64 / counts.total().max(1) as f64)
    }

    /// Mean Decrease in Impurity importances, normalized to sum to 1.0.
    ///
    /// All zeros when the tree is a single leaf.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.n_features];
        for node in &self.nodes {
            if let Node::Split {
                feature,
                impurity_decrease,
                ..
            } = node
            {
                totals[feature.index()] += impurity_decrease;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }

    /// Return the arena nodes; the root is at index 0.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the total number of nodes.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the maximum depth; a lone root leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0usize;
        let mut queue = VecDeque::from([(0usize, 0usize)]);
        while let Some((idx, d)) = queue.pop_front() {
            match &self.nodes[idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    queue.push_back((left.index(), d + 1));
                    queue.push_back((right.index(), d + 1));
                }
            }
        }
        max_depth
    }

    fn leaf(&self, sample: &[f64]) -> &Node {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[feature.index()] <= *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
                leaf @ Node::Leaf { .. } => return leaf,
            }
        }
    }
}

impl Predict for DecisionTree {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, sample: &[f64]) -> Result<bool, ModelError> {
        check_sample(sample, self.n_features)?;
        match self.leaf(sample) {
            Node::Leaf { prediction, .. } => Ok(*prediction),
            Node::Split { counts, .. } => Ok(counts.majority()),
        }
    }
}
