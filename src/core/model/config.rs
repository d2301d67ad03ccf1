use serde::{Deserialize, Serialize};

///////////
// Enums //
///////////

/// Where normalisation layers are applied inside the model networks
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormUsage {
    /// No normalisation
    None,
    /// Encoder networks only
    Encoder,
    /// Decoder networks only
    Decoder,
    /// Encoder and decoder networks
    Both,
}

////////////////
// Structures //
////////////////

/// Covariate registration for a model fit
///
/// Replaces the reference library's global dataset-registration call with
/// an explicit value handed to each stateless fit. The batch column is
/// always registered; a label column only for semi-supervised fits.
///
/// ### Fields
///
/// * `batch_key` - Observation column with the categorical batch covariate.
/// * `labels_key` - Optional observation column with the (possibly
///   masked) label covariate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CovariateSetup {
    pub batch_key: String,
    pub labels_key: Option<String>,
}

impl CovariateSetup {
    /// Register only a batch covariate
    pub fn batch_only(batch_key: &str) -> Self {
        CovariateSetup {
            batch_key: batch_key.to_string(),
            labels_key: None,
        }
    }

    /// Register a batch covariate and a label column
    pub fn with_labels(batch_key: &str, labels_key: &str) -> Self {
        CovariateSetup {
            batch_key: batch_key.to_string(),
            labels_key: Some(labels_key.to_string()),
        }
    }
}

/// Architecture hyperparameters for the base generative model
///
/// Defaults mirror the reference library's documented defaults; the
/// benchmark only ever uses the two named parameter sets below.
///
/// ### Fields
///
/// * `n_latent` - Dimensionality of the latent space.
/// * `n_layers` - Number of hidden layers in encoder/decoder.
/// * `n_hidden` - Nodes per hidden layer.
/// * `dropout_rate` - Encoder dropout rate.
/// * `use_batch_norm` - Batch-normalisation placement.
/// * `use_layer_norm` - Layer-normalisation placement.
/// * `encode_covariates` - Feed covariates into the encoder as well.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    pub n_latent: usize,
    pub n_layers: usize,
    pub n_hidden: usize,
    pub dropout_rate: f64,
    pub use_batch_norm: NormUsage,
    pub use_layer_norm: NormUsage,
    pub encode_covariates: bool,
}

impl Default for ModelParams {
    fn default() -> Self {
        ModelParams {
            n_latent: 10,
            n_layers: 1,
            n_hidden: 128,
            dropout_rate: 0.1,
            use_batch_norm: NormUsage::Both,
            use_layer_norm: NormUsage::None,
            encode_covariates: false,
        }
    }
}

impl ModelParams {
    /// The benchmark's plain parameter set: 30 latents, two hidden layers
    pub fn standard() -> Self {
        ModelParams {
            n_latent: 30,
            n_layers: 2,
            ..Default::default()
        }
    }

    /// The transfer-learning parameter set: layer-normalisation only,
    /// covariates encoded, dropout 0.2
    pub fn arches() -> Self {
        ModelParams {
            n_latent: 30,
            n_layers: 2,
            dropout_rate: 0.2,
            use_batch_norm: NormUsage::None,
            use_layer_norm: NormUsage::Both,
            encode_covariates: true,
            ..Default::default()
        }
    }
}

/// Training-loop parameters for a model fit
///
/// ### Fields
///
/// * `max_epochs` - Optional epoch cap; `None` lets the backend decide.
/// * `train_size` - Fraction of cells used for fitting (rest validates).
/// * `weight_decay` - Optional optimiser weight decay override.
/// * `seed` - Seed handed to the backend for reproducibility purposes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainParams {
    pub max_epochs: Option<usize>,
    pub train_size: f64,
    pub weight_decay: Option<f64>,
    pub seed: u64,
}

impl Default for TrainParams {
    fn default() -> Self {
        TrainParams {
            max_epochs: None,
            train_size: 0.9,
            weight_decay: None,
            seed: 0,
        }
    }
}

impl TrainParams {
    /// Fit on the entire dataset, no internal validation split
    pub fn full() -> Self {
        TrainParams {
            train_size: 1.0,
            ..Default::default()
        }
    }

    /// Query-model fine-tuning: up to 200 epochs, zero weight decay
    pub fn query_finetune() -> Self {
        TrainParams {
            max_epochs: Some(200),
            weight_decay: Some(0.0),
            ..Default::default()
        }
    }

    /// Set the backend seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

///////////
// Tests //
///////////
