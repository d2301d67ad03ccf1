use serde::{Deserialize, Serialize};

use crate::error::{CellcastError, Result};
use crate::label_projection::hvg::GeneSelection;
use crate::label_projection::methods::LabelProjectionMethod;
use crate::label_projection::strategy::TrainingStrategy;

////////////////
// Structures //
////////////////

/// Provenance metadata attached to a registered method
///
/// Pure reporting data: it carries no behavioural contract and is
/// preserved verbatim from the reference method set.
///
/// ### Fields
///
/// * `name` - Human-readable method name.
/// * `paper_name` - Title of the originating paper.
/// * `paper_url` - URL of the originating paper.
/// * `paper_year` - Publication year.
/// * `code_url` - URL of the source library.
/// * `code_version` - Version string of the source library.
/// * `image` - Execution-environment image tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodMeta {
    pub name: String,
    pub paper_name: String,
    pub paper_url: String,
    pub paper_year: u16,
    pub code_url: String,
    pub code_version: String,
    pub image: String,
}

struct PaperRef {
    name: &'static str,
    url: &'static str,
    year: u16,
}

const SCVI_PAPER: PaperRef = PaperRef {
    name: "Deep generative modeling for single-cell transcriptomics",
    url: "https://www.nature.com/articles/s41592-018-0229-2",
    year: 2018,
};

const SCANVI_PAPER: PaperRef = PaperRef {
    name: "Probabilistic harmonization and annotation of single-cell transcriptomics data \
           with deep generative models.",
    url: "https://www.embopress.org/doi/full/10.15252/msb.20209620",
    year: 2021,
};

const SCARCHES_PAPER: PaperRef = PaperRef {
    name: "Query to reference single-cell integration with transfer learning.",
    url: "https://www.biorxiv.org/content/10.1101/2020.07.16.205997v1",
    year: 2021,
};

const CODE_URL: &str = "https://github.com/YosefLab/scvi-tools";
const IMAGE: &str = "openproblems-python-scvi";

/// Registry of named label-projection methods
///
/// The benchmarking harness looks methods up by name and reads their
/// metadata back for reporting.
#[derive(Default)]
pub struct MethodRegistry {
    methods: Vec<LabelProjectionMethod>,
}

impl MethodRegistry {
    /// An empty registry
    pub fn new() -> Self {
        MethodRegistry {
            methods: Vec::new(),
        }
    }

    /// Register a method under its metadata name
    ///
    /// ### Params
    ///
    /// * `method` - The method to register; its name must be unused.
    pub fn register(&mut self, method: LabelProjectionMethod) -> Result<()> {
        if self.get(method.name()).is_some() {
            return Err(CellcastError::InvalidInput(format!(
                "a method named '{}' is already registered",
                method.name()
            )));
        }

        self.methods.push(method);
        Ok(())
    }

    /// Look a method up by its registered name
    pub fn get(&self, name: &str) -> Option<&LabelProjectionMethod> {
        self.methods.iter().find(|m| m.name() == name)
    }

    /// Registered method names, in registration order
    pub fn names(&self) -> Vec<&str> {
        self.methods.iter().map(|m| m.name()).collect()
    }

    /// Iterate over the registered methods
    pub fn iter(&self) -> impl Iterator<Item = &LabelProjectionMethod> {
        self.methods.iter()
    }

    /// Number of registered methods
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// `true` if no method is registered
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// The eight reference methods
    ///
    /// Note the pairing: the reference set runs its plain "scVI" methods
    /// through the transfer path and its "scArches+scVI" methods through
    /// the full-data fit; kept verbatim for parity.
    ///
    /// ### Params
    ///
    /// * `code_version` - Version string of the generative-modeling
    ///   backend, stamped into every entry.
    pub fn builtin(code_version: &str) -> Self {
        let entry = |name: &str, paper: &PaperRef, strategy, selection| {
            LabelProjectionMethod::new(
                MethodMeta {
                    name: name.to_string(),
                    paper_name: paper.name.to_string(),
                    paper_url: paper.url.to_string(),
                    paper_year: paper.year,
                    code_url: CODE_URL.to_string(),
                    code_version: code_version.to_string(),
                    image: IMAGE.to_string(),
                },
                strategy,
                selection,
            )
        };

        let methods = vec![
            entry(
                "scVI (All genes)",
                &SCVI_PAPER,
                TrainingStrategy::QueryKnn,
                GeneSelection::AllGenes,
            ),
            entry(
                "scVI (Seurat v3 2000 HVG)",
                &SCVI_PAPER,
                TrainingStrategy::QueryKnn,
                GeneSelection::hvg_2000(),
            ),
            entry(
                "scArches+scVI (All genes)",
                &SCARCHES_PAPER,
                TrainingStrategy::FullKnn,
                GeneSelection::AllGenes,
            ),
            entry(
                "scArches+scVI (Seurat v3 2000 HVG)",
                &SCARCHES_PAPER,
                TrainingStrategy::FullKnn,
                GeneSelection::hvg_2000(),
            ),
            entry(
                "scANVI (All genes)",
                &SCANVI_PAPER,
                TrainingStrategy::SemiSupervised,
                GeneSelection::AllGenes,
            ),
            entry(
                "scANVI (Seurat v3 2000 HVG)",
                &SCANVI_PAPER,
                TrainingStrategy::SemiSupervised,
                GeneSelection::hvg_2000(),
            ),
            entry(
                "scArches+scANVI (All genes)",
                &SCARCHES_PAPER,
                TrainingStrategy::SemiSupervisedQuery,
                GeneSelection::AllGenes,
            ),
            entry(
                "scArches+scANVI (Seurat v3 2000 HVG)",
                &SCARCHES_PAPER,
                TrainingStrategy::SemiSupervisedQuery,
                GeneSelection::hvg_2000(),
            ),
        ];

        MethodRegistry { methods }
    }
}

///////////
// Tests //
///////////
