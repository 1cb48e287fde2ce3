//! Bagged CART ensemble for the binary shadow/background problem.
//!
//! Trees split on weighted Gini impurity where each bootstrap row is weighted
//! by its draw count times its class weight. Trees are grown in parallel, each
//! with its own RNG derived from the run seed and the tree index, and are
//! collected in index order so the result never depends on scheduling.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Number of candidate features tried at every split.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// `floor(sqrt(n_features))`, at least one.
    Sqrt,
    /// Every feature.
    All,
    /// Fixed count, clamped to the number of features.
    Fixed(usize),
}

impl MaxFeatures {
    pub fn resolve(self, n_features: usize) -> usize {
        let n = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::All => n_features,
            MaxFeatures::Fixed(k) => k.min(n_features),
        };
        n.max(1)
    }
}

/// Growth limits shared by every tree.
///
/// Sample counts include repeated bootstrap draws of the same row.
#[derive(Copy, Clone, Debug)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: usize,
}

/// Column-major training matrix with binary labels and per-class weights.
pub struct TrainingSet<'a> {
    pub columns: &'a [Vec<f64>],
    pub labels: &'a [u8],
    pub class_weight: [f64; 2],
}

impl TrainingSet<'_> {
    fn n_rows(&self) -> usize {
        self.labels.len()
    }

    fn n_features(&self) -> usize {
        self.columns.len()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        /// Weighted fraction of positives that reached this leaf.
        positive: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Arena-allocated decision tree; node 0 is the root.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Probability of the positive class for a feature lookup.
    fn walk<F: Fn(usize) -> f64>(&self, value: F) -> f64 {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                Node::Leaf { positive } => return *positive,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    at = if value(*feature) <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        self.walk(|f| row[f])
    }

    fn predict_at(&self, columns: &[Vec<f64>], row: usize) -> f64 {
        self.walk(|f| columns[f][row])
    }

    /// Longest root-to-leaf path, counted in splits.
    pub fn depth(&self) -> usize {
        fn depth_of(nodes: &[Node], at: usize) -> usize {
            match &nodes[at] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => {
                    1 + depth_of(nodes, *left).max(depth_of(nodes, *right))
                }
            }
        }
        depth_of(&self.nodes, 0)
    }
}

fn gini(weight: f64, positive: f64) -> f64 {
    if weight <= 0.0 {
        return 0.0;
    }
    let p = positive / weight;
    2.0 * p * (1.0 - p)
}

struct Candidate {
    feature: usize,
    threshold: f64,
    improvement: f64,
}

struct TreeBuilder<'a> {
    data: &'a TrainingSet<'a>,
    params: TreeParams,
    draws: Vec<u32>,
    weights: Vec<f64>,
    nodes: Vec<Node>,
    importances: Vec<f64>,
    rng: StdRng,
}

impl<'a> TreeBuilder<'a> {
    fn totals(&self, rows: &[usize]) -> (f64, f64) {
        rows.iter().fold((0.0, 0.0), |(w, p), &i| {
            let wi = self.weights[i];
            (w + wi, p + if self.data.labels[i] == 1 { wi } else { 0.0 })
        })
    }

    fn samples(&self, rows: &[usize]) -> usize {
        rows.iter().map(|&i| self.draws[i] as usize).sum()
    }

    fn grow(&mut self, rows: &mut [usize], depth: usize) -> usize {
        let (weight, positive) = self.totals(rows);
        let samples = self.samples(rows);
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            positive: if weight > 0.0 { positive / weight } else { 0.0 },
        });

        let pure = positive <= 0.0 || positive >= weight;
        if depth >= self.params.max_depth || samples < self.params.min_samples_split || pure {
            return id;
        }

        let Some(best) = self.best_split(rows, samples, weight, positive) else {
            return id;
        };

        let mut cut = 0;
        for k in 0..rows.len() {
            if self.data.columns[best.feature][rows[k]] <= best.threshold {
                rows.swap(cut, k);
                cut += 1;
            }
        }

        self.importances[best.feature] += best.improvement;
        let (left_rows, right_rows) = rows.split_at_mut(cut);
        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[id] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        id
    }

    fn best_split(
        &mut self,
        rows: &[usize],
        samples: usize,
        weight: f64,
        positive: f64,
    ) -> Option<Candidate> {
        let parent = weight * gini(weight, positive);
        let mut order: Vec<usize> = (0..self.data.n_features()).collect();
        order.shuffle(&mut self.rng);

        let mut best: Option<Candidate> = None;
        let mut visited = 0;
        let mut pairs: Vec<(f64, usize)> = Vec::with_capacity(rows.len());

        for feature in order {
            if visited >= self.params.max_features {
                break;
            }
            let column = &self.data.columns[feature];
            pairs.clear();
            pairs.extend(rows.iter().map(|&i| (column[i], i)));
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
            if pairs[0].0 == pairs[pairs.len() - 1].0 {
                // constant in this node; does not count against the budget
                continue;
            }
            visited += 1;

            let mut w_left = 0.0;
            let mut p_left = 0.0;
            let mut n_left = 0;
            for k in 0..pairs.len() - 1 {
                let (value, i) = pairs[k];
                let wi = self.weights[i];
                w_left += wi;
                n_left += self.draws[i] as usize;
                if self.data.labels[i] == 1 {
                    p_left += wi;
                }
                let next = pairs[k + 1].0;
                if value == next {
                    continue;
                }
                if n_left < self.params.min_samples_leaf
                    || samples - n_left < self.params.min_samples_leaf
                {
                    continue;
                }
                let w_right = weight - w_left;
                let p_right = positive - p_left;
                let children = w_left * gini(w_left, p_left) + w_right * gini(w_right, p_right);
                let improvement = parent - children;
                if improvement <= 1e-12 {
                    continue;
                }
                if best.as_ref().map_or(true, |b| improvement > b.improvement) {
                    let mid = value + (next - value) / 2.0;
                    let threshold = if mid < next { mid } else { value };
                    best = Some(Candidate {
                        feature,
                        threshold,
                        improvement,
                    });
                }
            }
        }
        best
    }
}

/// One grown tree plus the bookkeeping the forest needs from it.
struct GrownTree {
    tree: DecisionTree,
    importances: Vec<f64>,
    out_of_bag: Vec<(usize, f64)>,
}

fn grow_tree(data: &TrainingSet<'_>, params: TreeParams, seed: u64) -> GrownTree {
    let n = data.n_rows();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut draws = vec![0u32; n];
    for _ in 0..n {
        draws[rng.gen_range(0..n)] += 1;
    }

    let weights: Vec<f64> = draws
        .iter()
        .zip(data.labels)
        .map(|(&d, &y)| f64::from(d) * data.class_weight[usize::from(y)])
        .collect();
    let mut rows: Vec<usize> = (0..n).filter(|&i| draws[i] > 0).collect();

    let mut builder = TreeBuilder {
        data,
        params,
        draws,
        weights,
        nodes: Vec::new(),
        importances: vec![0.0; data.n_features()],
        rng,
    };
    builder.grow(&mut rows, 0);

    let tree = DecisionTree {
        nodes: builder.nodes,
    };
    let out_of_bag = (0..n)
        .filter(|&i| builder.draws[i] == 0)
        .map(|i| (i, tree.predict_at(data.columns, i)))
        .collect();

    GrownTree {
        tree,
        importances: builder.importances,
        out_of_bag,
    }
}

/// Trained ensemble with its impurity importances and out-of-bag accuracy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Forest {
    trees: Vec<DecisionTree>,
    importances: Vec<f64>,
    oob_score: f64,
    oob_rows: usize,
}

impl Forest {
    /// Grow `n_trees` bootstrap trees. `data` must hold at least one row.
    pub fn fit(data: &TrainingSet<'_>, params: TreeParams, n_trees: usize, seed: u64) -> Self {
        let grown: Vec<GrownTree> = (0..n_trees)
            .into_par_iter()
            .map(|t| grow_tree(data, params, seed.wrapping_add(t as u64)))
            .collect();

        let n_features = data.n_features();
        let mut importances = vec![0.0; n_features];
        let mut contributing = 0usize;
        let mut oob_sum = vec![0.0; data.n_rows()];
        let mut oob_votes = vec![0u32; data.n_rows()];

        for g in &grown {
            let total: f64 = g.importances.iter().sum();
            if total > 0.0 {
                contributing += 1;
                for (acc, v) in importances.iter_mut().zip(&g.importances) {
                    *acc += v / total;
                }
            }
            for &(i, p) in &g.out_of_bag {
                oob_sum[i] += p;
                oob_votes[i] += 1;
            }
        }

        if contributing > 0 {
            let total: f64 = importances.iter().sum();
            if total > 0.0 {
                importances.iter_mut().for_each(|v| *v /= total);
            }
        }

        let mut oob_rows = 0usize;
        let mut correct = 0usize;
        for i in 0..data.n_rows() {
            if oob_votes[i] == 0 {
                continue;
            }
            oob_rows += 1;
            let predicted = u8::from(oob_sum[i] / f64::from(oob_votes[i]) > 0.5);
            if predicted == data.labels[i] {
                correct += 1;
            }
        }
        let oob_score = if oob_rows > 0 {
            correct as f64 / oob_rows as f64
        } else {
            0.0
        };

        Self {
            trees: grown.into_iter().map(|g| g.tree).collect(),
            importances,
            oob_score,
            oob_rows,
        }
    }

    /// Mean leaf probability across trees.
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
        (sum / self.trees.len() as f64).clamp(0.0, 1.0)
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Mean decrease in impurity per encoded column, summing to one when any split exists.
    pub fn importances(&self) -> &[f64] {
        &self.importances
    }

    /// Accuracy on rows each tree did not draw.
    pub fn oob_score(&self) -> f64 {
        self.oob_score
    }

    /// Rows that were out-of-bag for at least one tree.
    pub fn oob_rows(&self) -> usize {
        self.oob_rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(max_depth: usize) -> TreeParams {
        TreeParams {
            max_depth,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: 2,
        }
    }

    fn separable() -> (Vec<Vec<f64>>, Vec<u8>) {
        // feature 0 separates the classes, feature 1 is noise
        let columns = vec![
            vec![1.0, 1.2, 0.9, 1.1, 5.0, 5.2, 4.8, 5.1, 5.3, 4.9],
            vec![3.0, 1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 1.0, 2.0, 3.0],
        ];
        let labels = vec![1, 1, 1, 1, 0, 0, 0, 0, 0, 0];
        (columns, labels)
    }

    #[test]
    fn max_features_resolution() {
        assert_eq!(MaxFeatures::Sqrt.resolve(10), 3);
        assert_eq!(MaxFeatures::Sqrt.resolve(1), 1);
        assert_eq!(MaxFeatures::All.resolve(7), 7);
        assert_eq!(MaxFeatures::Fixed(20).resolve(7), 7);
        assert_eq!(MaxFeatures::Fixed(0).resolve(7), 1);
    }

    #[test]
    fn separable_data_is_learned() {
        let (columns, labels) = separable();
        let data = TrainingSet {
            columns: &columns,
            labels: &labels,
            class_weight: [1.0, 1.0],
        };
        let forest = Forest::fit(&data, params(4), 50, 7);
        assert!(forest.predict_proba(&[1.0, 2.0]) > 0.8);
        assert!(forest.predict_proba(&[5.0, 2.0]) < 0.2);
        assert!(forest.importances()[0] > forest.importances()[1]);
        let total: f64 = forest.importances().iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(forest.oob_rows() > 0);
        assert!(forest.oob_score() >= 0.8);
    }

    #[test]
    fn depth_is_bounded() {
        let (columns, labels) = separable();
        let data = TrainingSet {
            columns: &columns,
            labels: &labels,
            class_weight: [1.0, 1.0],
        };
        let forest = Forest::fit(&data, params(1), 10, 3);
        assert!(forest.trees().iter().all(|t| t.depth() <= 1));
    }

    #[test]
    fn min_samples_leaf_counts_repeated_draws() {
        // ten draws with at least four per leaf: one split at most, and it is
        // reachable even when fewer than eight distinct rows were drawn
        let columns = vec![(0..10).map(f64::from).collect::<Vec<_>>()];
        let labels: Vec<u8> = (0..10).map(|i| u8::from(i < 5)).collect();
        let data = TrainingSet {
            columns: &columns,
            labels: &labels,
            class_weight: [1.0, 1.0],
        };
        let leafy = TreeParams {
            min_samples_leaf: 4,
            ..params(8)
        };
        let forest = Forest::fit(&data, leafy, 40, 11);
        assert!(forest.trees().iter().all(|t| t.depth() <= 1));
        let split = forest.trees().iter().filter(|t| t.depth() == 1).count();
        assert!(split >= 30, "only {split} of 40 trees split");
    }

    #[test]
    fn same_seed_same_forest() {
        let (columns, labels) = separable();
        let data = TrainingSet {
            columns: &columns,
            labels: &labels,
            class_weight: [0.8, 1.25],
        };
        let a = Forest::fit(&data, params(6), 20, 42);
        let b = Forest::fit(&data, params(6), 20, 42);
        assert_eq!(a, b);
    }

    #[test]
    fn class_weight_shifts_leaf_probability() {
        // identical feature rows, so every tree is a single leaf
        let columns = vec![vec![1.0; 10]];
        let labels = vec![1, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let plain = Forest::fit(
            &TrainingSet { columns: &columns, labels: &labels, class_weight: [1.0, 1.0] },
            params(3),
            200,
            1,
        );
        let balanced = Forest::fit(
            &TrainingSet { columns: &columns, labels: &labels, class_weight: [10.0 / 18.0, 5.0] },
            params(3),
            200,
            1,
        );
        assert!(plain.predict_proba(&[1.0]) < 0.2);
        assert!(balanced.predict_proba(&[1.0]) > plain.predict_proba(&[1.0]));
        assert!(balanced.importances().iter().all(|v| *v == 0.0));
    }
}
