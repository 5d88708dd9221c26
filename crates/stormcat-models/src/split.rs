use rand::Rng;

use crate::node::{ClassCounts, FeatureIndex, Impurity};

/// Criterion for measuring the quality of a split.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SplitCriterion {
    /// Gini impurity: `1 - p² - q²`.
    #[default]
    Gini,
    /// Information entropy: `-p·ln(p) - q·ln(q)`.
    Entropy,
}

impl SplitCriterion {
    /// Compute the impurity of a node from its binary class counts.
    ///
    /// An empty node is pure.
    #[must_use]
    pub fn impurity(&self, counts: ClassCounts) -> Impurity {
        let total = counts.total();
        if total == 0 {
            return Impurity::new(0.0);
        }
        let n = total as f64;
        let p = counts.positive as f64 / n;
        let q = counts.negative as f64 / n;
        let value = match self {
            SplitCriterion::Gini => 1.0 - p * p - q * q,
            SplitCriterion::Entropy => [p, q]
                .into_iter()
                .filter(|&x| x > 0.0)
                .map(|x| -x * x.ln())
                .sum(),
        };
        Impurity::new(value)
    }
}

/// Best split found for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    pub(crate) feature: FeatureIndex,
    pub(crate) threshold: f64,
    /// Weighted impurity decrease (MDI).
    pub(crate) impurity_decrease: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Find the best exact split among `max_features` randomly chosen features.
///
/// `features` is column-major: `features[feature_idx][sample_idx]`.
/// Candidate thresholds are midpoints between consecutive distinct sorted
/// values. Returns `None` when every candidate violates `min_samples_leaf`
/// or all values are identical.
pub(crate) fn find_best_split(
    features: &[Vec<f64>],
    labels: &[bool],
    sample_indices: &[usize],
    criterion: SplitCriterion,
    max_features: usize,
    min_samples_leaf: usize,
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_features = features.len();
    let n_samples = sample_indices.len();
    if n_samples < 2 || n_features == 0 {
        return None;
    }

    let parent = ClassCounts::tally(labels, sample_indices);
    let parent_weighted = n_samples as f64 * criterion.impurity(parent).value();

    // Partial Fisher-Yates over the feature order.
    let take = max_features.min(n_features);
    let mut feature_order: Vec<usize> = (0..n_features).collect();
    for i in 0..take {
        let j = rng.gen_range(i..n_features);
        feature_order.swap(i, j);
    }

    let mut best_decrease = f64::NEG_INFINITY;
    let mut best: Option<(usize, f64)> = None;
    let mut sorted: Vec<(f64, bool)> = Vec::with_capacity(n_samples);

    for &feat_idx in &feature_order[..take] {
        let column = &features[feat_idx];
        sorted.clear();
        sorted.extend(sample_indices.iter().map(|&si| (column[si], labels[si])));
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let mut left = ClassCounts::default();
        let mut right = parent;
        for i in 0..(n_samples - 1) {
            let (value, label) = sorted[i];
            left.add(label);
            right.remove(label);

            let next = sorted[i + 1].0;
            if value == next {
                continue;
            }
            let n_left = i + 1;
            let n_right = n_samples - n_left;
            if n_left < min_samples_leaf || n_right < min_samples_leaf {
                continue;
            }

            let decrease = parent_weighted
                - n_left as f64 * criterion.impurity(left).value()
                - n_right as f64 * criterion.impurity(right).value();
            if decrease > best_decrease {
                best_decrease = decrease;
                best = Some((feat_idx, (value + next) / 2.0));
            }
        }
    }

    let (feat_idx, threshold) = best?;
    let column = &features[feat_idx];
    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
        .iter()
        .partition(|&&si| column[si] <= threshold);

    Some(SplitResult {
        feature: FeatureIndex::new(feat_idx),
        threshold,
        impurity_decrease: best_decrease,
        left_indices,
        right_indices,
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn counts(negative: usize, positive: usize) -> ClassCounts {
        ClassCounts { negative, positive }
    }

    #[test]
    fn gini_pure() {
        let imp = SplitCriterion::Gini.impurity(counts(10, 0));
        assert!(imp.value().abs() < f64::EPSILON);
    }

    #[test]
    fn gini_balanced() {
        let imp = SplitCriterion::Gini.impurity(counts(5, 5));
        assert!((imp.value() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn entropy_balanced() {
        let imp = SplitCriterion::Entropy.impurity(counts(5, 5));
        assert!((imp.value() - 2.0_f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn empty_node_is_pure() {
        let imp = SplitCriterion::Entropy.impurity(counts(0, 0));
        assert!(imp.value().abs() < f64::EPSILON);
    }

    #[test]
    fn separable_data_finds_midpoint() {
        let features = vec![vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0]];
        let labels = [false, false, false, true, true, true];
        let indices: Vec<usize> = (0..6).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let split = find_best_split(
            &features,
            &labels,
            &indices,
            SplitCriterion::Gini,
            1,
            1,
            &mut rng,
        )
        .unwrap();
        assert_eq!(split.feature.index(), 0);
        assert!((split.threshold - 6.5).abs() < f64::EPSILON);
        assert_eq!(split.left_indices, vec![0, 1, 2]);
        assert_eq!(split.right_indices, vec![3, 4, 5]);
        assert!((split.impurity_decrease - 3.0).abs() < 1e-10);
    }

    #[test]
    fn constant_feature_has_no_split() {
        let features = vec![vec![4.0; 4]];
        let labels = [false, true, false, true];
        let indices: Vec<usize> = (0..4).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let split = find_best_split(
            &features,
            &labels,
            &indices,
            SplitCriterion::Gini,
            1,
            1,
            &mut rng,
        );
        assert!(split.is_none());
    }

    #[test]
    fn min_samples_leaf_blocks_small_children() {
        let features = vec![vec![1.0, 2.0, 3.0, 4.0]];
        let labels = [true, false, false, false];
        let indices: Vec<usize> = (0..4).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let split = find_best_split(
            &features,
            &labels,
            &indices,
            SplitCriterion::Gini,
            1,
            2,
            &mut rng,
        )
        .unwrap();
        assert_eq!(split.left_indices.len(), 2);
        assert_eq!(split.right_indices.len(), 2);
    }
}
