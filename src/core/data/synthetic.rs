use faer::Mat;
use rand::prelude::*;
use rand_distr::{Distribution, Gamma, Normal, Poisson};
use rayon::prelude::*;

use crate::core::data::annotated::{
    AnnotatedMatrix, ObsColumn, BATCH_KEY, IS_TRAIN_KEY, LABELS_KEY,
};
use crate::error::{CellcastError, Result};

////////////////
// Structures //
////////////////

/// Parameters for synthetic labelled single-cell data
///
/// ### Fields
///
/// * `n_cells` - Number of cells to generate.
/// * `n_genes` - Number of genes to generate.
/// * `n_cell_types` - Number of cell types; cells cycle through them.
/// * `n_batches` - Number of batches; cells cycle through them.
/// * `markers_per_type` - Marker genes per cell type (contiguous blocks).
/// * `marker_boost` - Multiplicative expression boost on marker genes.
/// * `train_fraction` - Fraction of cells flagged as training split.
/// * `seed` - Seed for reproducibility purposes.
#[derive(Clone, Debug)]
pub struct SyntheticCellParams {
    pub n_cells: usize,
    pub n_genes: usize,
    pub n_cell_types: usize,
    pub n_batches: usize,
    pub markers_per_type: usize,
    pub marker_boost: f64,
    pub train_fraction: f64,
    pub seed: u64,
}

impl Default for SyntheticCellParams {
    fn default() -> Self {
        SyntheticCellParams {
            n_cells: 100,
            n_genes: 200,
            n_cell_types: 5,
            n_batches: 2,
            markers_per_type: 8,
            marker_boost: 6.0,
            train_fraction: 0.8,
            seed: 42,
        }
    }
}

impl SyntheticCellParams {
    fn validate(&self) -> Result<()> {
        if self.n_cells == 0 || self.n_genes == 0 {
            return Err(CellcastError::InvalidInput(
                "synthetic data needs at least one cell and one gene".to_string(),
            ));
        }
        if self.n_cell_types == 0 || self.n_batches == 0 {
            return Err(CellcastError::InvalidInput(
                "synthetic data needs at least one cell type and one batch".to_string(),
            ));
        }
        if self.markers_per_type * self.n_cell_types > self.n_genes {
            return Err(CellcastError::InvalidInput(format!(
                "marker blocks ({} x {}) exceed the gene count ({})",
                self.n_cell_types, self.markers_per_type, self.n_genes
            )));
        }
        if !(self.train_fraction > 0.0 && self.train_fraction <= 1.0) {
            return Err(CellcastError::InvalidInput(
                "train_fraction must lie in (0, 1]".to_string(),
            ));
        }
        if self.marker_boost <= 0.0 {
            return Err(CellcastError::InvalidInput(
                "marker_boost must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

////////////////////
// Main functions //
////////////////////

/// Generate synthetic labelled single-cell count data
///
/// Cells cycle through cell types and batches. Each cell type owns a
/// contiguous block of marker genes whose expected expression is boosted;
/// all genes carry a mild multiplicative batch effect. Counts are drawn
/// from a Gamma-Poisson mixture, so the matrix resembles over-dispersed
/// UMI counts with natural zeros.
///
/// The returned matrix carries `labels` (`"type_<k>"`), `batch`
/// (`"batch_<k>"`) and `is_train` (seeded shuffle at `train_fraction`)
/// observation columns and validates as label-projection input.
///
/// ### Params
///
/// * `params` - The `SyntheticCellParams` to use.
///
/// ### Returns
///
/// The annotated matrix with the synthetic data.
pub fn synthetic_labelled_cells(params: &SyntheticCellParams) -> Result<AnnotatedMatrix> {
    params.validate()?;

    let n_cells = params.n_cells;
    let n_genes = params.n_genes;

    let mut rng = StdRng::seed_from_u64(params.seed);

    // gene-level baseline means, sparse-ish like real UMI data
    let base_gamma = Gamma::new(0.8, 1.0).unwrap();
    let base_means: Vec<f64> = (0..n_genes).map(|_| base_gamma.sample(&mut rng)).collect();

    // mild multiplicative batch effect per batch and gene
    let batch_normal = Normal::<f64>::new(0.0, 0.1).unwrap();
    let batch_factors: Vec<Vec<f64>> = (0..params.n_batches)
        .map(|_| {
            (0..n_genes)
                .map(|_| batch_normal.sample(&mut rng).exp())
                .collect()
        })
        .collect();

    let dispersion_r = 2.0;
    let seed = params.seed;

    let cell_counts: Vec<Vec<f64>> = (0..n_cells)
        .into_par_iter()
        .map(|cell_idx| {
            let mut local_rng = StdRng::seed_from_u64(seed.wrapping_add(cell_idx as u64));
            let cell_type = cell_idx % params.n_cell_types;
            let batch = cell_idx % params.n_batches;

            let marker_range =
                (cell_type * params.markers_per_type)..((cell_type + 1) * params.markers_per_type);

            let mut counts = Vec::with_capacity(n_genes);
            for gene_idx in 0..n_genes {
                let boost = if marker_range.contains(&gene_idx) {
                    params.marker_boost
                } else {
                    1.0
                };
                let mean = base_means[gene_idx] * boost * batch_factors[batch][gene_idx];

                // Gamma-Poisson draw for negative-binomial style counts
                let gamma = Gamma::new(dispersion_r, mean / dispersion_r).unwrap();
                let lambda: f64 = gamma.sample(&mut local_rng);

                counts.push(if lambda > 0.0 {
                    Poisson::new(lambda).unwrap().sample(&mut local_rng)
                } else {
                    0.0
                });
            }
            counts
        })
        .collect();

    let mut x: Mat<f64> = Mat::zeros(n_cells, n_genes);
    for (i, counts) in cell_counts.into_iter().enumerate() {
        for (j, count) in counts.into_iter().enumerate() {
            x[(i, j)] = count;
        }
    }

    // train/test membership from a seeded shuffle
    let n_train = ((params.train_fraction * n_cells as f64).round() as usize).min(n_cells);
    let mut shuffled: Vec<usize> = (0..n_cells).collect();
    shuffled.shuffle(&mut rng);

    let mut is_train = vec![false; n_cells];
    for &idx in shuffled.iter().take(n_train) {
        is_train[idx] = true;
    }

    let labels: Vec<String> = (0..n_cells)
        .map(|i| format!("type_{}", i % params.n_cell_types))
        .collect();
    let batches: Vec<String> = (0..n_cells)
        .map(|i| format!("batch_{}", i % params.n_batches))
        .collect();
    let var_names: Vec<String> = (0..n_genes).map(|j| format!("gene_{}", j)).collect();

    let mut adata = AnnotatedMatrix::new(x, var_names)?;
    adata.insert_obs(LABELS_KEY, ObsColumn::Categorical(labels))?;
    adata.insert_obs(IS_TRAIN_KEY, ObsColumn::Boolean(is_train))?;
    adata.insert_obs(BATCH_KEY, ObsColumn::Categorical(batches))?;

    Ok(adata)
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::general::unique_strings;

    #[test]
    fn test_shape_and_contract() {
        let adata = synthetic_labelled_cells(&SyntheticCellParams::default()).unwrap();

        assert_eq!(adata.n_obs(), 100);
        assert_eq!(adata.n_vars(), 200);
        assert!(adata.validate_projection_input().is_ok());
    }

    #[test]
    fn test_train_fraction() {
        let adata = synthetic_labelled_cells(&SyntheticCellParams::default()).unwrap();
        let n_train = adata.train_indices().unwrap().len();

        assert_eq!(n_train, 80);
        assert_eq!(adata.test_indices().unwrap().len(), 20);
    }

    #[test]
    fn test_all_cell_types_in_train_split() {
        let adata = synthetic_labelled_cells(&SyntheticCellParams::default()).unwrap();
        let labels = adata.categorical(LABELS_KEY).unwrap();
        let train_idx = adata.train_indices().unwrap();

        let train_labels: Vec<String> = train_idx.iter().map(|&i| labels[i].clone()).collect();
        assert_eq!(unique_strings(&train_labels).len(), 5);
    }

    #[test]
    fn test_deterministic_given_seed() {
        let a = synthetic_labelled_cells(&SyntheticCellParams::default()).unwrap();
        let b = synthetic_labelled_cells(&SyntheticCellParams::default()).unwrap();

        assert_eq!(a.boolean(IS_TRAIN_KEY).unwrap(), b.boolean(IS_TRAIN_KEY).unwrap());
        for i in 0..a.n_obs() {
            for j in 0..a.n_vars() {
                assert_eq!(a.x()[(i, j)], b.x()[(i, j)]);
            }
        }
    }

    #[test]
    fn test_rejects_bad_params() {
        let params = SyntheticCellParams {
            markers_per_type: 50,
            ..Default::default()
        };
        assert!(synthetic_labelled_cells(&params).is_err());

        let params = SyntheticCellParams {
            train_fraction: 0.0,
            ..Default::default()
        };
        assert!(synthetic_labelled_cells(&params).is_err());
    }
}
