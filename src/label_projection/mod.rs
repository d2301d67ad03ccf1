//! The label-projection task layer: masking of test labels, optional
//! highly-variable-gene preprocessing, the four training-strategy
//! variants behind a single dispatch, and the registry of named methods
//! with their paper metadata.

pub mod hvg;
pub mod masking;
pub mod methods;
pub mod registry;
pub mod strategy;

pub use hvg::{restrict_to_hvg, GeneSelection};
pub use masking::{masked_labels, SCANVI_LABELS_KEY, UNLABELED};
pub use methods::{LabelProjectionMethod, Toolbox};
pub use registry::{MethodMeta, MethodRegistry};
pub use strategy::{project_labels, TrainingStrategy};
