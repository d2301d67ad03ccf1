use faer::MatRef;
use instant_distance::{Builder, HnswMap, Point as DistancePoint, Search};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::core::classify::{FittedClassifier, NeighborClassifier};
use crate::error::{CellcastError, Result};

///////////
// Enums //
///////////

/// How neighbour votes are weighted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteWeighting {
    /// Every neighbour counts equally
    Uniform,
    /// Neighbours vote with inverse distance
    Distance,
}

/////////////
// Helpers //
/////////////

/// Helper function to parse the vote weighting
///
/// ### Params
///
/// * `s` - Type of vote weighting to use
///
/// ### Returns
///
/// Option of the VoteWeighting
pub fn get_vote_weighting(s: &str) -> Option<VoteWeighting> {
    match s.to_lowercase().as_str() {
        "uniform" => Some(VoteWeighting::Uniform),
        "distance" => Some(VoteWeighting::Distance),
        _ => None,
    }
}

////////////////
// Structures //
////////////////

/// Parameters for the k-nearest-neighbour classifier
///
/// ### Fields
///
/// * `n_neighbours` - Number of neighbours that vote per query.
/// * `weighting` - How the votes are weighted.
/// * `seed` - Seed for the HNSW index build.
#[derive(Clone, Debug)]
pub struct KnnParams {
    pub n_neighbours: usize,
    pub weighting: VoteWeighting,
    pub seed: usize,
}

impl Default for KnnParams {
    fn default() -> Self {
        KnnParams {
            n_neighbours: 15,
            weighting: VoteWeighting::Uniform,
            seed: 42,
        }
    }
}

#[derive(Clone, Debug)]
struct Point(Vec<f32>);

impl DistancePoint for Point {
    /// Distance function. This is Euclidean distance without the square
    /// root for speed gains. Does not change the rank order of
    /// neighbours.
    fn distance(&self, other: &Self) -> f32 {
        let mut sum = 0.0f32;

        for i in 0..self.0.len() {
            let diff = self.0[i] - other.0[i];
            sum += diff * diff;
        }
        sum
    }
}

/// K-nearest-neighbour classifier over an HNSW index
///
/// Neighbour search is delegated to the approximate HNSW index; this
/// type only configures the search and turns neighbour sets into label
/// votes.
#[derive(Clone, Debug)]
pub struct KnnClassifier {
    pub params: KnnParams,
}

impl KnnClassifier {
    /// Create a classifier with the given parameters
    pub fn new(params: KnnParams) -> Self {
        KnnClassifier { params }
    }
}

impl Default for KnnClassifier {
    fn default() -> Self {
        KnnClassifier::new(KnnParams::default())
    }
}

/// A fitted k-nearest-neighbour classifier
///
/// ### Fields
///
/// * `map` - HNSW index over the training features, valued with row
///   indices into `labels`.
/// * `labels` - Training labels, one per indexed point.
/// * `n_features` - Feature dimensionality the index was built on.
/// * `params` - The parameters used for fitting and querying.
pub struct FittedKnn {
    map: HnswMap<Point, usize>,
    labels: Vec<String>,
    n_features: usize,
    params: KnnParams,
}

impl NeighborClassifier for KnnClassifier {
    type Fitted = FittedKnn;

    fn fit(&self, features: MatRef<f32>, labels: &[String]) -> Result<FittedKnn> {
        if features.nrows() == 0 {
            return Err(CellcastError::InvalidInput(
                "cannot fit a neighbour classifier on zero cells".to_string(),
            ));
        }
        if labels.len() != features.nrows() {
            return Err(CellcastError::LengthMismatch {
                what: "classifier labels".to_string(),
                expected: features.nrows(),
                got: labels.len(),
            });
        }

        let n_samples = features.nrows();
        let points: Vec<Point> = (0..n_samples)
            .map(|i| Point(features.row(i).iter().cloned().collect()))
            .collect();

        let map = Builder::default()
            .seed(self.params.seed as u64)
            .build(points, (0..n_samples).collect::<Vec<_>>());

        Ok(FittedKnn {
            map,
            labels: labels.to_vec(),
            n_features: features.ncols(),
            params: self.params.clone(),
        })
    }
}

impl FittedClassifier for FittedKnn {
    fn predict(&self, features: MatRef<f32>) -> Result<Vec<String>> {
        if features.ncols() != self.n_features {
            return Err(CellcastError::LengthMismatch {
                what: "query feature dimensionality".to_string(),
                expected: self.n_features,
                got: features.ncols(),
            });
        }

        let predictions: Vec<String> = (0..features.nrows())
            .into_par_iter()
            .map(|i| {
                let query = Point(features.row(i).iter().cloned().collect());
                let mut search = Search::default();

                let neighbours: Vec<(f32, usize)> = self
                    .map
                    .search(&query, &mut search)
                    .take(self.params.n_neighbours)
                    .map(|item| (item.distance, *item.value))
                    .collect();

                self.vote(&neighbours)
            })
            .collect();

        Ok(predictions)
    }
}

impl FittedKnn {
    /// Turn a neighbour set into a single label
    ///
    /// Ties are broken towards the lexicographically smallest label so
    /// predictions stay deterministic.
    fn vote(&self, neighbours: &[(f32, usize)]) -> String {
        let mut tally: FxHashMap<&str, f64> = FxHashMap::default();

        for &(dist, idx) in neighbours {
            let weight = match self.params.weighting {
                VoteWeighting::Uniform => 1.0,
                VoteWeighting::Distance => 1.0 / (dist as f64 + 1e-6),
            };
            *tally.entry(self.labels[idx].as_str()).or_insert(0.0) += weight;
        }

        let mut winner = "";
        let mut best = f64::NEG_INFINITY;
        let mut candidates: Vec<(&str, f64)> = tally.into_iter().collect();
        candidates.sort_by(|a, b| a.0.cmp(b.0));

        for (label, weight) in candidates {
            if weight > best {
                best = weight;
                winner = label;
            }
        }

        winner.to_string()
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;
    use faer::Mat;

    fn clustered_data() -> (Mat<f32>, Vec<String>) {
        // three well-separated clusters of 30 points each
        let centres = [(0.0, 0.0), (10.0, 10.0), (-10.0, 10.0)];
        let mut rows = Vec::new();
        let mut labels = Vec::new();

        for (c, &(cx, cy)) in centres.iter().enumerate() {
            for i in 0..30 {
                rows.push(vec![
                    cx + (i as f32 * 0.1) % 2.0 - 1.0,
                    cy + (i as f32 * 0.15) % 2.0 - 1.0,
                ]);
                labels.push(format!("cluster_{}", c));
            }
        }

        let mat = Mat::from_fn(90, 2, |i, j| rows[i][j]);
        (mat, labels)
    }

    #[test]
    fn test_recovers_cluster_labels() {
        let (features, labels) = clustered_data();
        let classifier = KnnClassifier::default();
        let fitted = classifier.fit(features.as_ref(), &labels).unwrap();

        let predictions = fitted.predict(features.as_ref()).unwrap();
        assert_eq!(predictions, labels);
    }

    #[test]
    fn test_predicts_unseen_points() {
        let (features, labels) = clustered_data();
        let classifier = KnnClassifier::default();
        let fitted = classifier.fit(features.as_ref(), &labels).unwrap();

        let queries = Mat::from_fn(2, 2, |i, _| if i == 0 { 0.2 } else { 9.8 });
        let predictions = fitted.predict(queries.as_ref()).unwrap();

        assert_eq!(predictions[0], "cluster_0");
        assert_eq!(predictions[1], "cluster_1");
    }

    #[test]
    fn test_deterministic_given_seed() {
        let (features, labels) = clustered_data();
        let classifier = KnnClassifier::default();

        let a = classifier
            .fit(features.as_ref(), &labels)
            .unwrap()
            .predict(features.as_ref())
            .unwrap();
        let b = classifier
            .fit(features.as_ref(), &labels)
            .unwrap()
            .predict(features.as_ref())
            .unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_distance_weighting() {
        let (features, labels) = clustered_data();
        let classifier = KnnClassifier::new(KnnParams {
            weighting: VoteWeighting::Distance,
            ..Default::default()
        });
        let fitted = classifier.fit(features.as_ref(), &labels).unwrap();

        let query = Mat::from_fn(1, 2, |_, j| if j == 0 { -9.5f32 } else { 9.5 });
        let predictions = fitted.predict(query.as_ref()).unwrap();
        assert_eq!(predictions[0], "cluster_2");
    }

    #[test]
    fn test_input_validation() {
        let (features, labels) = clustered_data();
        let classifier = KnnClassifier::default();

        let empty: Mat<f32> = Mat::zeros(0, 2);
        assert!(classifier.fit(empty.as_ref(), &[]).is_err());

        assert!(classifier.fit(features.as_ref(), &labels[..10]).is_err());

        let fitted = classifier.fit(features.as_ref(), &labels).unwrap();
        let wrong_dim: Mat<f32> = Mat::zeros(1, 5);
        assert!(fitted.predict(wrong_dim.as_ref()).is_err());
    }

    #[test]
    fn test_vote_weighting_parser() {
        assert_eq!(get_vote_weighting("Uniform"), Some(VoteWeighting::Uniform));
        assert_eq!(
            get_vote_weighting("distance"),
            Some(VoteWeighting::Distance)
        );
        assert_eq!(get_vote_weighting("cosine"), None);
    }
}
