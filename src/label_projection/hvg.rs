use serde::{Deserialize, Serialize};

use crate::core::data::annotated::{AnnotatedMatrix, BATCH_KEY};
use crate::core::model::backend::GeneRanker;
use crate::error::{CellcastError, Result};

/// Gene-subsetting step applied before a method's model fitting
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeneSelection {
    /// Fit on every gene of the input matrix
    AllGenes,
    /// Fit on the top `n_top` highly-variable genes, ranked on the
    /// training split only
    HighlyVariable { n_top: usize },
}

impl GeneSelection {
    /// The benchmark's highly-variable setting: top 2000 genes
    pub fn hvg_2000() -> Self {
        GeneSelection::HighlyVariable { n_top: 2000 }
    }
}

/// Restrict the matrix to highly-variable genes
///
/// The ranking sees only the training-split cells, stratified by the
/// `batch` column; the resulting per-gene mask is then applied to the
/// *full* matrix, so train and test cells are both restricted to the
/// selected genes. The reduced matrix is a fresh copy; the input is
/// untouched.
///
/// ### Params
///
/// * `adata` - The full annotated matrix.
/// * `ranker` - The external gene-ranking implementation.
/// * `n_top` - Number of genes to keep.
///
/// ### Returns
///
/// A gene-subsetted copy covering every cell.
pub fn restrict_to_hvg<R: GeneRanker>(
    adata: &AnnotatedMatrix,
    ranker: &R,
    n_top: usize,
) -> Result<AnnotatedMatrix> {
    let train_idx = adata.train_indices()?;
    if train_idx.is_empty() {
        return Err(CellcastError::InvalidInput(
            "highly-variable ranking needs at least one training cell".to_string(),
        ));
    }

    let train_view = adata.subset_rows(&train_idx);
    let mask = ranker.highly_variable(&train_view, n_top, BATCH_KEY)?;

    if mask.len() != adata.n_vars() {
        return Err(CellcastError::LengthMismatch {
            what: "highly-variable gene mask".to_string(),
            expected: adata.n_vars(),
            got: mask.len(),
        });
    }

    adata.subset_cols(&mask)
}

///////////
// Tests //
///////////
