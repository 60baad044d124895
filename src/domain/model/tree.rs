//! CART tree, the weak learner behind both ensembles.
//!
//! Variance splits fit residuals for boosting; gini splits grow the
//! classification trees of the random forest. Leaves store the mean target
//! (variance) or the positive-class fraction (gini).

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitCriterion {
    Variance,
    Gini,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split; `None` means all.
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 4,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub feature: Option<usize>,
    pub threshold: Option<f64>,
    pub value: f64,
    pub left: Option<Box<Node>>,
    pub right: Option<Box<Node>>,
}

impl Node {
    fn leaf(value: f64) -> Self {
        Self {
            feature: None,
            threshold: None,
            value,
            left: None,
            right: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    params: TreeParams,
    criterion: SplitCriterion,
    root: Option<Node>,
    importance: Vec<f64>,
}

/// Running aggregates for one side of a candidate split.
#[derive(Debug, Clone, Copy, Default)]
struct Agg {
    n: usize,
    sum: f64,
    sum_sq: f64,
    positives: usize,
}

impl Agg {
    fn add(&mut self, y: f64) {
        self.n += 1;
        self.sum += y;
        self.sum_sq += y * y;
        if y > 0.5 {
            self.positives += 1;
        }
    }

    fn sse(&self) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        self.sum_sq - self.sum * self.sum / self.n as f64
    }

    fn weighted_gini(&self) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        let p = self.positives as f64 / self.n as f64;
        self.n as f64 * 2.0 * p * (1.0 - p)
    }

    fn impurity(&self, criterion: SplitCriterion) -> f64 {
        match criterion {
            SplitCriterion::Variance => self.sse(),
            SplitCriterion::Gini => self.weighted_gini(),
        }
    }
}

impl Tree {
    pub fn new(criterion: SplitCriterion, params: TreeParams) -> Self {
        Self {
            params,
            criterion,
            root: None,
            importance: Vec::new(),
        }
    }

    /// Grow the tree on the rows at `indices`.
    pub fn fit(
        &mut self,
        rows: &[Vec<f64>],
        targets: &[f64],
        indices: &[usize],
        rng: &mut ChaCha8Rng,
    ) {
        let n_features = rows.first().map(|r| r.len()).unwrap_or(0);
        self.importance = vec![0.0; n_features];
        if indices.is_empty() {
            self.root = Some(Node::leaf(0.0));
            return;
        }
        self.root = Some(self.grow(rows, targets, indices, 0, rng));

        let total: f64 = self.importance.iter().sum();
        if total > 0.0 {
            for imp in &mut self.importance {
                *imp /= total;
            }
        }
    }

    fn grow(
        &mut self,
        rows: &[Vec<f64>],
        targets: &[f64],
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> Node {
        let mut total = Agg::default();
        for &i in indices {
            total.add(targets[i]);
        }
        let impurity = total.impurity(self.criterion);
        let leaf_value = self.leaf_value(&total);

        if depth >= self.params.max_depth
            || indices.len() < self.params.min_samples_split
            || impurity < 1e-10
        {
            return Node::leaf(leaf_value);
        }

        match self.best_split(rows, targets, indices, &total, rng) {
            Some((feature, threshold, gain)) => {
                let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| rows[i][feature] <= threshold);

                if left_idx.len() < self.params.min_samples_leaf
                    || right_idx.len() < self.params.min_samples_leaf
                {
                    return Node::leaf(leaf_value);
                }

                self.importance[feature] += gain;

                let left = self.grow(rows, targets, &left_idx, depth + 1, rng);
                let right = self.grow(rows, targets, &right_idx, depth + 1, rng);

                Node {
                    feature: Some(feature),
                    threshold: Some(threshold),
                    value: leaf_value,
                    left: Some(Box::new(left)),
                    right: Some(Box::new(right)),
                }
            }
            None => Node::leaf(leaf_value),
        }
    }

    fn leaf_value(&self, agg: &Agg) -> f64 {
        if agg.n == 0 {
            return 0.0;
        }
        match self.criterion {
            SplitCriterion::Variance => agg.sum / agg.n as f64,
            SplitCriterion::Gini => agg.positives as f64 / agg.n as f64,
        }
    }

    /// Best (feature, threshold, impurity decrease) over the candidate
    /// features, scanning sorted values with running aggregates.
    fn best_split(
        &self,
        rows: &[Vec<f64>],
        targets: &[f64],
        indices: &[usize],
        total: &Agg,
        rng: &mut ChaCha8Rng,
    ) -> Option<(usize, f64, f64)> {
        let n_features = rows[indices[0]].len();
        let mut candidates: Vec<usize> = (0..n_features).collect();
        if let Some(max_features) = self.params.max_features {
            candidates.shuffle(rng);
            candidates.truncate(max_features.max(1));
        }

        let parent_impurity = total.impurity(self.criterion);
        let min_leaf = self.params.min_samples_leaf;
        let mut best: Option<(usize, f64, f64)> = None;

        for &feature in &candidates {
            let mut order = indices.to_vec();
            order.sort_by(|&a, &b| {
                rows[a][feature]
                    .partial_cmp(&rows[b][feature])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut left = Agg::default();
            for k in 0..order.len() - 1 {
                left.add(targets[order[k]]);

                let value = rows[order[k]][feature];
                let next = rows[order[k + 1]][feature];
                if value == next {
                    continue;
                }
                let n_left = k + 1;
                let n_right = order.len() - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let right = Agg {
                    n: total.n - left.n,
                    sum: total.sum - left.sum,
                    sum_sq: total.sum_sq - left.sum_sq,
                    positives: total.positives - left.positives,
                };
                let gain = parent_impurity
                    - left.impurity(self.criterion)
                    - right.impurity(self.criterion);

                if gain > 1e-12 && best.map(|(_, _, g)| gain > g).unwrap_or(true) {
                    best = Some((feature, (value + next) / 2.0, gain));
                }
            }
        }

        best
    }

    /// Leaf value for one row: mean target (variance trees) or positive
    /// fraction (gini trees).
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut node = match &self.root {
            Some(n) => n,
            None => return 0.0,
        };
        loop {
            if node.is_leaf() {
                return node.value;
            }
            let feature = node.feature.expect("inner node has a feature");
            let threshold = node.threshold.expect("inner node has a threshold");
            node = if row[feature] <= threshold {
                node.left.as_ref().expect("inner node has a left child")
            } else {
                node.right.as_ref().expect("inner node has a right child")
            };
        }
    }

    /// Normalized impurity-decrease share per feature.
    pub fn importance(&self) -> &[f64] {
        &self.importance
    }

    pub fn depth(&self) -> usize {
        fn depth_of(node: &Node) -> usize {
            if node.is_leaf() {
                1
            } else {
                1 + depth_of(node.left.as_ref().unwrap()).max(depth_of(node.right.as_ref().unwrap()))
            }
        }
        self.root.as_ref().map(depth_of).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    fn fit_tree(criterion: SplitCriterion, rows: &[Vec<f64>], targets: &[f64]) -> Tree {
        let indices: Vec<usize> = (0..rows.len()).collect();
        let mut tree = Tree::new(criterion, TreeParams::default());
        tree.fit(rows, targets, &indices, &mut rng());
        tree
    }

    #[test]
    fn variance_tree_fits_step_function() {
        let rows: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64]).collect();
        let targets: Vec<f64> = (0..40).map(|i| if i < 20 { -1.0 } else { 1.0 }).collect();

        let tree = fit_tree(SplitCriterion::Variance, &rows, &targets);

        assert!((tree.predict_row(&[5.0]) - (-1.0)).abs() < 1e-9);
        assert!((tree.predict_row(&[30.0]) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn gini_tree_separates_classes() {
        let rows: Vec<Vec<f64>> = (0..50).map(|i| vec![i as f64, 1.0]).collect();
        let targets: Vec<f64> = (0..50).map(|i| if i < 25 { 0.0 } else { 1.0 }).collect();

        let tree = fit_tree(SplitCriterion::Gini, &rows, &targets);

        assert!(tree.predict_row(&[3.0, 1.0]) < 0.5);
        assert!(tree.predict_row(&[40.0, 1.0]) > 0.5);
    }

    #[test]
    fn pure_node_stays_a_leaf() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let targets = vec![1.0; 10];

        let tree = fit_tree(SplitCriterion::Gini, &rows, &targets);
        assert_eq!(tree.depth(), 1);
        assert!((tree.predict_row(&[0.0]) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn max_depth_limits_growth() {
        let rows: Vec<Vec<f64>> = (0..64).map(|i| vec![i as f64]).collect();
        let targets: Vec<f64> = (0..64).map(|i| (i % 7) as f64).collect();

        let indices: Vec<usize> = (0..rows.len()).collect();
        let mut tree = Tree::new(
            SplitCriterion::Variance,
            TreeParams {
                max_depth: 2,
                ..TreeParams::default()
            },
        );
        tree.fit(&rows, &targets, &indices, &mut rng());
        assert!(tree.depth() <= 3);
    }

    #[test]
    fn importance_concentrates_on_informative_feature() {
        // Feature 0 decides the target; feature 1 is constant.
        let rows: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64, 7.0]).collect();
        let targets: Vec<f64> = (0..40).map(|i| if i < 20 { 0.0 } else { 1.0 }).collect();

        let tree = fit_tree(SplitCriterion::Gini, &rows, &targets);
        let imp = tree.importance();
        assert!(imp[0] > 0.99);
        assert!(imp[1] < 0.01);
    }

    #[test]
    fn serde_round_trip_preserves_predictions() {
        let rows: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64, (i * i) as f64]).collect();
        let targets: Vec<f64> = (0..30).map(|i| (i as f64).sin()).collect();

        let tree = fit_tree(SplitCriterion::Variance, &rows, &targets);
        let json = serde_json::to_string(&tree).unwrap();
        let back: Tree = serde_json::from_str(&json).unwrap();

        for row in &rows {
            assert_eq!(tree.predict_row(row), back.predict_row(row));
        }
    }
}
