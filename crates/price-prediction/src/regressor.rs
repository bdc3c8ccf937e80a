//! The regressor seam for the prediction ensemble.
//!
//! Two implementations with materially different bias/variance behavior:
//! bootstrap-aggregated deep trees (low bias, variance reduced by
//! averaging) and gradient-boosted shallow trees (bias reduced round by
//! round). The ensemble combines any two `Regressor` values without
//! knowing which algorithm is behind them.

use crate::tree::RegressionTree;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// Fixed seed so identical inputs always yield identical models.
pub const TRAINING_SEED: u64 = 42;

pub trait Regressor: Send + Sync {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]);
    fn predict(&self, row: &[f64]) -> f64;
    fn name(&self) -> &'static str;
}

/// Bootstrap-aggregated regression trees.
pub struct BaggedTreeRegressor {
    n_trees: usize,
    max_depth: usize,
    seed: u64,
    trees: Vec<RegressionTree>,
}

impl BaggedTreeRegressor {
    pub fn new() -> Self {
        Self::with_params(100, 10, TRAINING_SEED)
    }

    pub fn with_params(n_trees: usize, max_depth: usize, seed: u64) -> Self {
        Self {
            n_trees,
            max_depth,
            seed,
            trees: Vec::new(),
        }
    }
}

impl Default for BaggedTreeRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Regressor for BaggedTreeRegressor {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) {
        let n = x.len();
        let max_depth = self.max_depth;
        let seed = self.seed;
        // Per-tree seeds are derived up front so the parallel fit stays
        // deterministic regardless of scheduling.
        self.trees = (0..self.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(t as u64));
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(x, y, &sample, max_depth, 1)
            })
            .collect();
    }

    fn predict(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / self.trees.len() as f64
    }

    fn name(&self) -> &'static str {
        "bagged_trees"
    }
}

/// Gradient boosting with shallow trees fit to residuals.
pub struct GradientBoostedTrees {
    rounds: usize,
    max_depth: usize,
    learning_rate: f64,
    base: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedTrees {
    pub fn new() -> Self {
        Self::with_params(100, 3, 0.1)
    }

    pub fn with_params(rounds: usize, max_depth: usize, learning_rate: f64) -> Self {
        Self {
            rounds,
            max_depth,
            learning_rate,
            base: 0.0,
            trees: Vec::new(),
        }
    }
}

impl Default for GradientBoostedTrees {
    fn default() -> Self {
        Self::new()
    }
}

impl Regressor for GradientBoostedTrees {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) {
        let n = x.len();
        self.base = if n == 0 {
            0.0
        } else {
            y.iter().sum::<f64>() / n as f64
        };
        self.trees.clear();

        let indices: Vec<usize> = (0..n).collect();
        let mut current: Vec<f64> = vec![self.base; n];
        for _ in 0..self.rounds {
            let residuals: Vec<f64> = y.iter().zip(&current).map(|(yi, ci)| yi - ci).collect();
            if residuals.iter().all(|r| r.abs() < 1e-9) {
                break;
            }
            let tree = RegressionTree::fit(x, &residuals, &indices, self.max_depth, 2);
            for (i, c) in current.iter_mut().enumerate() {
                *c += self.learning_rate * tree.predict(&x[i]);
            }
            self.trees.push(tree);
        }
    }

    fn predict(&self, row: &[f64]) -> f64 {
        self.base
            + self
                .trees
                .iter()
                .map(|t| self.learning_rate * t.predict(row))
                .sum::<f64>()
    }

    fn name(&self) -> &'static str {
        "boosted_trees"
    }
}
