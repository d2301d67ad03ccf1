use faer::Mat;

use crate::core::data::annotated::AnnotatedMatrix;
use crate::core::model::config::{CovariateSetup, ModelParams, TrainParams};
use crate::error::Result;

////////////
// Traits //
////////////

/// A fitted model that can embed cells into its latent space
pub trait LatentSpace {
    /// Latent coordinates for every cell of `data` (cells × k)
    fn latent(&self, data: &AnnotatedMatrix) -> Result<Mat<f32>>;
}

/// A fitted semi-supervised model that can also predict labels
pub trait LabelPredictor: LatentSpace {
    /// Predicted label for every cell of `data`
    fn predict(&self, data: &AnnotatedMatrix) -> Result<Vec<String>>;
}

/// Reference model handed to a query-model initialisation
///
/// Transfer learning can start from either stage of the reference fit:
/// the plain generative model or its semi-supervised refinement.
pub enum QueryRef<'a, B: GenerativeBackend + ?Sized> {
    /// Initialise from a fitted base model
    Base(&'a B::Base),
    /// Initialise from a fitted refinement model
    Refined(&'a B::Refined),
}

/// Seam for the external deep generative-modeling library
///
/// The reference setup plugs scvi-tools in here. Every call is stateless:
/// covariate registration travels with the call instead of mutating
/// process-wide state, and fitted models are returned as values. Fitting
/// failures surface as `CellcastError::Backend` and are never retried.
pub trait GenerativeBackend {
    /// Fitted unsupervised generative model
    type Base: LatentSpace;
    /// Fitted semi-supervised refinement model
    type Refined: LabelPredictor;

    /// Version string of the backing library, for provenance reporting
    fn version(&self) -> String;

    /// Fit the unsupervised generative model
    ///
    /// ### Params
    ///
    /// * `data` - Cells to fit on.
    /// * `setup` - Covariate registration for this fit.
    /// * `model` - Architecture hyperparameters.
    /// * `train` - Training-loop parameters.
    fn fit_base(
        &self,
        data: &AnnotatedMatrix,
        setup: &CovariateSetup,
        model: &ModelParams,
        train: &TrainParams,
    ) -> Result<Self::Base>;

    /// Refine a fitted base model into a semi-supervised one
    ///
    /// Requires that the base fit registered a label column; cells whose
    /// label equals `unlabeled_category` contribute no label signal.
    ///
    /// ### Params
    ///
    /// * `base` - The fitted base model to extend.
    /// * `data` - Cells to fit on (same registration as the base fit).
    /// * `unlabeled_category` - Sentinel marking unlabeled cells.
    /// * `train` - Training-loop parameters.
    fn refine(
        &self,
        base: Self::Base,
        data: &AnnotatedMatrix,
        unlabeled_category: &str,
        train: &TrainParams,
    ) -> Result<Self::Refined>;

    /// Initialise a query model from a fitted reference and fine-tune it
    /// on new cells
    ///
    /// The query cells never contribute label signal; the reference
    /// model's covariate registration carries over.
    ///
    /// ### Params
    ///
    /// * `reference` - Fitted model to initialise from.
    /// * `query` - New cells to fine-tune on.
    /// * `train` - Training-loop parameters for the fine-tuning.
    fn adapt_query(
        &self,
        reference: QueryRef<'_, Self>,
        query: &AnnotatedMatrix,
        train: &TrainParams,
    ) -> Result<Self::Refined>;
}

/// Seam for the external gene-ranking library
///
/// The reference setup plugs a variance-stabilising highly-variable-gene
/// ranking in here. Determinism and the fewer-genes-than-requested edge
/// case are the ranking library's responsibility.
pub trait GeneRanker {
    /// Boolean per-gene flags for the top `n_top` variable genes
    ///
    /// ### Params
    ///
    /// * `data` - Cells to rank on (the caller passes the training split
    ///   only).
    /// * `n_top` - Number of genes to flag.
    /// * `batch_key` - Observation column to stratify the ranking by.
    ///
    /// ### Returns
    ///
    /// One flag per gene of `data`, `true` for selected genes.
    fn highly_variable(
        &self,
        data: &AnnotatedMatrix,
        n_top: usize,
        batch_key: &str,
    ) -> Result<Vec<bool>>;
}
