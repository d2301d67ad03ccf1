//! Neighbor-classification seam plus the bundled k-nearest-neighbour
//! classifier over approximate HNSW search.

pub mod knn;

pub use knn::{FittedKnn, KnnClassifier, KnnParams, VoteWeighting};

use faer::MatRef;

use crate::error::Result;

/// Seam for the external neighbor-classification library
///
/// Mirrors the usual fit/predict surface: a stateless configured
/// classifier fits on training features and labels, producing a fitted
/// value that predicts on arbitrary query features.
pub trait NeighborClassifier {
    /// The fitted classifier produced by `fit`
    type Fitted: FittedClassifier;

    /// Fit on training features (cells × k) and their labels
    fn fit(&self, features: MatRef<f32>, labels: &[String]) -> Result<Self::Fitted>;
}

/// A fitted classifier ready to predict
pub trait FittedClassifier {
    /// Predicted label for every row of `features`
    fn predict(&self, features: MatRef<f32>) -> Result<Vec<String>>;
}
