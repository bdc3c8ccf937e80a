//! CART-style regression tree with variance-reduction splits.
//!
//! Nodes live in a flat arena; split search is deterministic (features
//! scanned in order, strict improvement required), so two fits over the
//! same rows produce the same tree.

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct Split {
    feature: usize,
    threshold: f64,
    score: f64,
}

fn leaf_value(y: &[f64], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64
}

/// Sum of squared errors around the mean, from prefix sums.
fn sse(sum: f64, sum_sq: f64, n: f64) -> f64 {
    if n == 0.0 {
        0.0
    } else {
        sum_sq - sum * sum / n
    }
}

fn best_split(x: &[Vec<f64>], y: &[f64], indices: &[usize], min_leaf: usize) -> Option<Split> {
    let feature_count = x.first().map(|r| r.len()).unwrap_or(0);
    let n = indices.len() as f64;
    let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
    let parent_sse = sse(total_sum, total_sq, n);

    let mut best: Option<Split> = None;

    for feature in 0..feature_count {
        let mut order: Vec<usize> = indices.to_vec();
        order.sort_by(|&a, &b| {
            x[a][feature]
                .partial_cmp(&x[b][feature])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for (pos, &i) in order.iter().enumerate().take(order.len() - 1) {
            left_sum += y[i];
            left_sq += y[i] * y[i];
            let left_n = pos + 1;
            let right_n = order.len() - left_n;
            if left_n < min_leaf || right_n < min_leaf {
                continue;
            }
            let here = x[i][feature];
            let next = x[order[pos + 1]][feature];
            if here == next {
                continue;
            }
            let score = sse(left_sum, left_sq, left_n as f64)
                + sse(total_sum - left_sum, total_sq - left_sq, right_n as f64);
            if score + 1e-12 < best.as_ref().map(|b| b.score).unwrap_or(parent_sse) {
                best = Some(Split {
                    feature,
                    threshold: (here + next) / 2.0,
                    score,
                });
            }
        }
    }

    best
}

impl RegressionTree {
    /// Fit on the rows named by `indices` (duplicates allowed, which is how
    /// the bagging regressor feeds bootstrap samples in).
    pub fn fit(x: &[Vec<f64>], y: &[f64], indices: &[usize], max_depth: usize, min_leaf: usize) -> Self {
        let mut tree = RegressionTree { nodes: Vec::new() };
        tree.grow(x, y, indices, max_depth, min_leaf);
        tree
    }

    fn grow(
        &mut self,
        x: &[Vec<f64>],
        y: &[f64],
        indices: &[usize],
        depth: usize,
        min_leaf: usize,
    ) -> usize {
        if depth == 0 || indices.len() < 2 * min_leaf {
            let id = self.nodes.len();
            self.nodes.push(Node::Leaf {
                value: leaf_value(y, indices),
            });
            return id;
        }

        match best_split(x, y, indices, min_leaf) {
            None => {
                let id = self.nodes.len();
                self.nodes.push(Node::Leaf {
                    value: leaf_value(y, indices),
                });
                id
            }
            Some(split) => {
                let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .copied()
                    .partition(|&i| x[i][split.feature] <= split.threshold);

                let id = self.nodes.len();
                self.nodes.push(Node::Leaf { value: 0.0 }); // placeholder
                let left = self.grow(x, y, &left_idx, depth - 1, min_leaf);
                let right = self.grow(x, y, &right_idx, depth - 1, min_leaf);
                self.nodes[id] = Node::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left,
                    right,
                };
                id
            }
        }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut node = 0;
        loop {
            match &self.nodes[node] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}
