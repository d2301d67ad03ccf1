use crate::core::classify::NeighborClassifier;
use crate::core::data::annotated::{AnnotatedMatrix, ObsColumn, LABELS_PRED_KEY};
use crate::core::model::backend::{GeneRanker, GenerativeBackend};
use crate::error::{CellcastError, Result};
use crate::label_projection::hvg::{restrict_to_hvg, GeneSelection};
use crate::label_projection::registry::MethodMeta;
use crate::label_projection::strategy::{project_labels, TrainingStrategy};

////////////////
// Structures //
////////////////

/// The external collaborators a method invocation needs
///
/// All three parts are stateless between invocations, so one toolbox can
/// drive any number of methods over any number of datasets.
///
/// ### Fields
///
/// * `backend` - The generative-modeling backend.
/// * `ranker` - The highly-variable-gene ranking implementation.
/// * `classifier` - The neighbour classifier for the Knn strategies.
/// * `seed` - Seed handed to the backend fits.
/// * `verbose` - Controls stage-timing output.
pub struct Toolbox<B, R, N> {
    pub backend: B,
    pub ranker: R,
    pub classifier: N,
    pub seed: u64,
    pub verbose: bool,
}

impl<B, R, N> Toolbox<B, R, N> {
    /// Bundle the collaborators with seed 0 and quiet output
    pub fn new(backend: B, ranker: R, classifier: N) -> Self {
        Toolbox {
            backend,
            ranker,
            classifier,
            seed: 0,
            verbose: false,
        }
    }

    /// Set the backend seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Toggle stage-timing output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// One named label-projection method
///
/// Couples the paper metadata with a training strategy and a
/// gene-selection step. Running a method validates the input contract,
/// optionally restricts the matrix to highly-variable genes, fits and
/// predicts through the chosen strategy, and writes the predictions back
/// in place.
#[derive(Clone, Debug)]
pub struct LabelProjectionMethod {
    pub meta: MethodMeta,
    pub strategy: TrainingStrategy,
    pub gene_selection: GeneSelection,
}

impl LabelProjectionMethod {
    pub fn new(meta: MethodMeta, strategy: TrainingStrategy, gene_selection: GeneSelection) -> Self {
        LabelProjectionMethod {
            meta,
            strategy,
            gene_selection,
        }
    }

    /// The method's registered name
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    /// Run the method on an annotated matrix, in place
    ///
    /// On success the matrix gains exactly one observation column,
    /// `labels_pred`, with one predicted label per cell (train and test
    /// alike). On any error the matrix is left untouched: no partial
    /// predictions are ever written.
    ///
    /// ### Params
    ///
    /// * `adata` - The annotated matrix to project labels onto.
    /// * `tools` - The external collaborators to fit and classify with.
    pub fn run<B, R, N>(&self, adata: &mut AnnotatedMatrix, tools: &Toolbox<B, R, N>) -> Result<()>
    where
        B: GenerativeBackend,
        R: GeneRanker,
        N: NeighborClassifier,
    {
        adata.validate_projection_input()?;

        let predictions = match self.gene_selection {
            GeneSelection::AllGenes => project_labels(
                adata,
                self.strategy,
                &tools.backend,
                &tools.classifier,
                tools.seed,
                tools.verbose,
            )?,
            GeneSelection::HighlyVariable { n_top } => {
                let reduced = restrict_to_hvg(adata, &tools.ranker, n_top)?;
                project_labels(
                    &reduced,
                    self.strategy,
                    &tools.backend,
                    &tools.classifier,
                    tools.seed,
                    tools.verbose,
                )?
            }
        };

        if predictions.len() != adata.n_obs() {
            return Err(CellcastError::LengthMismatch {
                what: "predicted labels".to_string(),
                expected: adata.n_obs(),
                got: predictions.len(),
            });
        }

        adata.insert_obs(LABELS_PRED_KEY, ObsColumn::Categorical(predictions))?;
        Ok(())
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classify::KnnClassifier;
    use crate::core::data::annotated::LABELS_KEY;
    use crate::core::data::synthetic::{synthetic_labelled_cells, SyntheticCellParams};
    use crate::core::model::stub::{FixedClassifier, StubBackend, StubRanker};
    use crate::label_projection::masking::SCANVI_LABELS_KEY;
    use crate::utils::general::unique_strings;
    use rustc_hash::FxHashSet;

    fn toolbox() -> Toolbox<StubBackend, StubRanker, KnnClassifier> {
        Toolbox::new(
            StubBackend::new(),
            StubRanker::new(),
            KnnClassifier::default(),
        )
        .with_seed(42)
    }

    fn method(strategy: TrainingStrategy, gene_selection: GeneSelection) -> LabelProjectionMethod {
        LabelProjectionMethod::new(
            MethodMeta {
                name: "test method".to_string(),
                paper_name: "paper".to_string(),
                paper_url: "https://example.org".to_string(),
                paper_year: 2021,
                code_url: "https://example.org/code".to_string(),
                code_version: "0.0.0".to_string(),
                image: "image".to_string(),
            },
            strategy,
            gene_selection,
        )
    }

    #[test]
    fn test_in_place_contract() {
        let mut adata = synthetic_labelled_cells(&SyntheticCellParams::default()).unwrap();
        let keys_before: Vec<String> = adata.obs_keys().iter().map(|k| k.to_string()).collect();

        let m = method(TrainingStrategy::SemiSupervised, GeneSelection::AllGenes);
        m.run(&mut adata, &toolbox()).unwrap();

        let keys_after: Vec<String> = adata.obs_keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys_after[..keys_before.len()], keys_before[..]);
        assert_eq!(keys_after.len(), keys_before.len() + 1);
        assert_eq!(keys_after.last().map(|s| s.as_str()), Some("labels_pred"));
        assert!(!adata.has_obs(SCANVI_LABELS_KEY));
    }

    #[test]
    fn test_scenario_semi_supervised() {
        // 100 cells, 80 train / 20 test, 2 batches, 5 labels
        let mut adata = synthetic_labelled_cells(&SyntheticCellParams::default()).unwrap();

        let m = method(TrainingStrategy::SemiSupervised, GeneSelection::AllGenes);
        m.run(&mut adata, &toolbox()).unwrap();

        let predictions = adata.categorical(LABELS_PRED_KEY).unwrap();
        assert_eq!(predictions.len(), 100);

        let labels = adata.categorical(LABELS_KEY).unwrap();
        let allowed: FxHashSet<&String> = adata
            .train_indices()
            .unwrap()
            .iter()
            .map(|&i| &labels[i])
            .collect();
        assert_eq!(allowed.len(), 5);
        assert!(predictions.iter().all(|p| allowed.contains(p)));
    }

    #[test]
    fn test_scenario_fixed_classifier() {
        let mut adata = synthetic_labelled_cells(&SyntheticCellParams::default()).unwrap();
        let tools = Toolbox::new(
            StubBackend::new(),
            StubRanker::new(),
            FixedClassifier {
                label: "the_one_label".to_string(),
            },
        );

        let m = method(TrainingStrategy::FullKnn, GeneSelection::AllGenes);
        m.run(&mut adata, &tools).unwrap();

        let predictions = adata.categorical(LABELS_PRED_KEY).unwrap();
        assert_eq!(predictions.len(), 100);
        assert!(predictions.iter().all(|p| p == "the_one_label"));
    }

    #[test]
    fn test_hvg_method_covers_all_cells() {
        let mut adata = synthetic_labelled_cells(&SyntheticCellParams::default()).unwrap();
        let n_vars_before = adata.n_vars();

        let m = method(
            TrainingStrategy::QueryKnn,
            GeneSelection::HighlyVariable { n_top: 50 },
        );
        m.run(&mut adata, &toolbox()).unwrap();

        // fitting used a 50-gene copy, predictions still cover all cells
        // of the untouched input
        assert_eq!(adata.n_vars(), n_vars_before);
        assert_eq!(adata.categorical(LABELS_PRED_KEY).unwrap().len(), 100);
    }

    #[test]
    fn test_deterministic_given_seed() {
        let base = synthetic_labelled_cells(&SyntheticCellParams::default()).unwrap();

        let mut first = base.clone();
        let mut second = base.clone();
        let m = method(TrainingStrategy::FullKnn, GeneSelection::AllGenes);
        m.run(&mut first, &toolbox()).unwrap();
        m.run(&mut second, &toolbox()).unwrap();

        assert_eq!(
            first.categorical(LABELS_PRED_KEY).unwrap(),
            second.categorical(LABELS_PRED_KEY).unwrap()
        );
    }

    #[test]
    fn test_validation_failure_writes_nothing() {
        let adata = synthetic_labelled_cells(&SyntheticCellParams::default()).unwrap();
        let mut broken = adata.clone();
        broken.remove_obs(LABELS_KEY);

        let m = method(TrainingStrategy::SemiSupervised, GeneSelection::AllGenes);
        assert!(m.run(&mut broken, &toolbox()).is_err());
        assert!(!broken.has_obs(LABELS_PRED_KEY));
    }

    #[test]
    fn test_rerun_overwrites_predictions() {
        let mut adata = synthetic_labelled_cells(&SyntheticCellParams::default()).unwrap();

        let m = method(TrainingStrategy::SemiSupervised, GeneSelection::AllGenes);
        m.run(&mut adata, &toolbox()).unwrap();
        let first = adata.categorical(LABELS_PRED_KEY).unwrap().to_vec();

        m.run(&mut adata, &toolbox()).unwrap();
        let second = adata.categorical(LABELS_PRED_KEY).unwrap();

        assert_eq!(first, second);
        assert!(unique_strings(second).len() > 1);
    }
}
