//! Isolation forest.
//!
//! Anomalies are few and different, so random axis-aligned splits isolate
//! them in fewer steps than normal points. A point's score is derived from
//! its average path length over many randomly built trees.

/// Euler-Mascheroni constant, for the harmonic number approximation.
const EULER_GAMMA: f64 = 0.577_215_664_9;

/// Average path length of an unsuccessful search in a binary search tree of
/// `n` points, used to normalize path lengths.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Node in an isolation tree.
#[derive(Debug, Clone)]
enum Node {
    Internal {
        feature: usize,
        split: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

impl Node {
    fn path_length(&self, point: &[f64], depth: usize) -> f64 {
        match self {
            Node::Leaf { size } => depth as f64 + average_path_length(*size),
            Node::Internal {
                feature,
                split,
                left,
                right,
            } => {
                let value = point.get(*feature).copied().unwrap_or(0.0);
                let next = if value < *split { left } else { right };
                next.path_length(point, depth + 1)
            }
        }
    }
}

/// A fitted isolation forest over row-major feature vectors.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<Node>,
    sample_size: usize,
}

impl IsolationForest {
    /// Fit `n_trees` trees on `data`, each grown on `min(max_samples, n)` rows
    /// drawn without replacement. The same seed always yields the same forest.
    pub fn fit(data: &[Vec<f64>], n_trees: usize, max_samples: usize, seed: u64) -> Self {
        let mut rng = fastrand::Rng::with_seed(seed);
        let sample_size = max_samples.min(data.len());
        if sample_size == 0 {
            return Self {
                trees: Vec::new(),
                sample_size,
            };
        }

        let height_limit = (sample_size as f64).log2().ceil() as usize;
        let mut pool: Vec<usize> = (0..data.len()).collect();

        let trees = (0..n_trees)
            .map(|_| {
                // Partial Fisher-Yates: the first `sample_size` slots become the sample.
                for i in 0..sample_size {
                    let j = rng.usize(i..pool.len());
                    pool.swap(i, j);
                }
                let mut sample = pool[..sample_size].to_vec();
                grow(data, &mut sample, 0, height_limit, &mut rng)
            })
            .collect();

        Self { trees, sample_size }
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Mean path length of `point` over all trees.
    pub fn mean_path_length(&self, point: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let total: f64 = self.trees.iter().map(|t| t.path_length(point, 0)).sum();
        total / self.trees.len() as f64
    }

    /// Score in `[-1, 0)`; higher means more normal.
    ///
    /// Computed as `-2^(-E[h(x)] / c(sample_size))`. With fewer than two
    /// training rows there is nothing to compare against and every point
    /// scores `-0.5`.
    pub fn score(&self, point: &[f64]) -> f64 {
        let normalizer = average_path_length(self.sample_size);
        if self.trees.is_empty() || normalizer == 0.0 {
            return -0.5;
        }
        -(2f64.powf(-self.mean_path_length(point) / normalizer))
    }

    pub fn score_all(&self, data: &[Vec<f64>]) -> Vec<f64> {
        data.iter().map(|point| self.score(point)).collect()
    }
}

fn grow(
    data: &[Vec<f64>],
    rows: &mut [usize],
    depth: usize,
    height_limit: usize,
    rng: &mut fastrand::Rng,
) -> Node {
    if depth >= height_limit || rows.len() <= 1 {
        return Node::Leaf { size: rows.len() };
    }

    let n_features = data[rows[0]].len();
    let spans: Vec<(usize, f64, f64)> = (0..n_features)
        .filter_map(|feature| {
            let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                let v = data[r][feature];
                (lo.min(v), hi.max(v))
            });
            (hi > lo).then_some((feature, lo, hi))
        })
        .collect();

    if spans.is_empty() {
        return Node::Leaf { size: rows.len() };
    }

    let (feature, lo, hi) = spans[rng.usize(..spans.len())];
    let split = lo + rng.f64() * (hi - lo);

    // Partition in place: rows below the split first.
    let mut boundary = 0;
    for i in 0..rows.len() {
        if data[rows[i]][feature] < split {
            rows.swap(i, boundary);
            boundary += 1;
        }
    }
    let (left_rows, right_rows) = rows.split_at_mut(boundary);

    Node::Internal {
        feature,
        split,
        left: Box::new(grow(data, left_rows, depth + 1, height_limit, rng)),
        right: Box::new(grow(data, right_rows, depth + 1, height_limit, rng)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(values: &[f64]) -> Vec<Vec<f64>> {
        values.iter().map(|v| vec![*v]).collect()
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        let c256 = average_path_length(256);
        assert!((c256 - 10.24).abs() < 0.01, "c(256) = {}", c256);
    }

    #[test]
    fn test_outlier_scores_lower() {
        let mut values: Vec<f64> = (0..200).map(|i| 50.0 + (i % 21) as f64 - 10.0).collect();
        values.push(500.0);
        let data = column(&values);

        let forest = IsolationForest::fit(&data, 100, 256, 42);
        let scores = forest.score_all(&data);

        let outlier = scores[200];
        let typical = scores[10];
        assert!(outlier < typical, "{} !< {}", outlier, typical);
        assert!(scores.iter().all(|s| (-1.0..0.0).contains(s)));
    }

    #[test]
    fn test_same_seed_same_scores() {
        let data: Vec<Vec<f64>> = (0..50)
            .map(|i| vec![i as f64, ((i * 7) % 13) as f64])
            .collect();

        let a = IsolationForest::fit(&data, 30, 32, 7).score_all(&data);
        let b = IsolationForest::fit(&data, 30, 32, 7).score_all(&data);
        assert_eq!(a, b);
    }

    #[test]
    fn test_constant_data_gives_uniform_scores() {
        let data = column(&[3.0; 10]);
        let scores = IsolationForest::fit(&data, 10, 256, 1).score_all(&data);
        assert!(scores.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_degenerate_inputs() {
        let empty = IsolationForest::fit(&[], 10, 256, 1);
        assert_eq!(empty.tree_count(), 0);

        let single = column(&[1.0]);
        let forest = IsolationForest::fit(&single, 10, 256, 1);
        assert_eq!(forest.score(&single[0]), -0.5);
    }
}
