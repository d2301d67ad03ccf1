//! cellcast
//!
//! Benchmark methods for single-cell label projection: given an annotated
//! matrix with a baked-in train/test split, predict cell-type labels for
//! every cell through a deep generative model (plugged in behind the
//! [`core::model::backend::GenerativeBackend`] seam), optionally combined
//! with a nearest-neighbour classifier in latent space and a
//! highly-variable-gene preprocessing step.
//!
//! The crate is the coordination layer of the benchmark: it owns the data
//! contract, the masking of test labels, the typed hyperparameter sets,
//! the four training-strategy variants and the method registry with
//! paper metadata. Model fitting and gene ranking stay external.

pub mod core;
pub mod error;
pub mod label_projection;
pub mod utils;

pub use crate::core::classify::{
    FittedClassifier, KnnClassifier, KnnParams, NeighborClassifier, VoteWeighting,
};
pub use crate::core::data::annotated::{
    AnnotatedMatrix, ObsColumn, BATCH_KEY, IS_TRAIN_KEY, LABELS_KEY, LABELS_PRED_KEY,
};
pub use crate::core::data::synthetic::{synthetic_labelled_cells, SyntheticCellParams};
pub use crate::core::model::backend::{
    GeneRanker, GenerativeBackend, LabelPredictor, LatentSpace, QueryRef,
};
pub use crate::core::model::config::{CovariateSetup, ModelParams, NormUsage, TrainParams};
pub use crate::error::{CellcastError, Result};
pub use crate::label_projection::{
    masked_labels, project_labels, restrict_to_hvg, GeneSelection, LabelProjectionMethod,
    MethodMeta, MethodRegistry, Toolbox, TrainingStrategy, SCANVI_LABELS_KEY, UNLABELED,
};
