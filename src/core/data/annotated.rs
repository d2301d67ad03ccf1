use faer::{Mat, MatRef};
use indexmap::IndexMap;

use crate::error::{CellcastError, Result};
use crate::utils::general::{mask_to_indices, mat_gather_cols_f64, mat_gather_rows_f64};

//////////////////////
// Observation keys //
//////////////////////

/// Observation column holding the ground-truth cell-type label per cell
pub const LABELS_KEY: &str = "labels";

/// Observation column flagging cells that belong to the training split
pub const IS_TRAIN_KEY: &str = "is_train";

/// Observation column holding the categorical batch covariate per cell
pub const BATCH_KEY: &str = "batch";

/// Observation column that label-projection methods write back
pub const LABELS_PRED_KEY: &str = "labels_pred";

////////////////
// Structures //
////////////////

/// A single per-cell metadata column
#[derive(Clone, Debug, PartialEq)]
pub enum ObsColumn {
    /// String-valued categorical column (labels, batches, predictions)
    Categorical(Vec<String>),
    /// Boolean column (train/test membership)
    Boolean(Vec<bool>),
}

impl ObsColumn {
    /// Number of cells covered by the column
    pub fn len(&self) -> usize {
        match self {
            ObsColumn::Categorical(v) => v.len(),
            ObsColumn::Boolean(v) => v.len(),
        }
    }

    /// `true` if the column covers zero cells
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn subset(&self, rows: &[usize]) -> ObsColumn {
        match self {
            ObsColumn::Categorical(v) => {
                ObsColumn::Categorical(rows.iter().map(|&i| v[i].clone()).collect())
            }
            ObsColumn::Boolean(v) => ObsColumn::Boolean(rows.iter().map(|&i| v[i]).collect()),
        }
    }
}

/// Annotated cells × genes matrix
///
/// The central data contract of the crate: a dense expression matrix with
/// an insertion-ordered per-cell observation table and per-gene names.
/// Column lengths are checked on insertion so that every observation
/// column always covers every cell.
///
/// ### Fields
///
/// * `x` - Dense cells × genes expression matrix.
/// * `obs` - Ordered map from column name to per-cell metadata column.
/// * `var_names` - Gene names, one per matrix column.
#[derive(Clone, Debug)]
pub struct AnnotatedMatrix {
    x: Mat<f64>,
    obs: IndexMap<String, ObsColumn>,
    var_names: Vec<String>,
}

impl AnnotatedMatrix {
    /// Create a new annotated matrix
    ///
    /// ### Params
    ///
    /// * `x` - The cells × genes expression matrix.
    /// * `var_names` - Gene names; must match the number of matrix columns.
    ///
    /// ### Returns
    ///
    /// The annotated matrix with an empty observation table.
    pub fn new(x: Mat<f64>, var_names: Vec<String>) -> Result<Self> {
        if var_names.len() != x.ncols() {
            return Err(CellcastError::LengthMismatch {
                what: "var_names".to_string(),
                expected: x.ncols(),
                got: var_names.len(),
            });
        }

        Ok(AnnotatedMatrix {
            x,
            obs: IndexMap::new(),
            var_names,
        })
    }

    /// Number of cells
    pub fn n_obs(&self) -> usize {
        self.x.nrows()
    }

    /// Number of genes
    pub fn n_vars(&self) -> usize {
        self.x.ncols()
    }

    /// Borrow the expression matrix
    pub fn x(&self) -> MatRef<'_, f64> {
        self.x.as_ref()
    }

    /// Borrow the gene names
    pub fn var_names(&self) -> &[String] {
        &self.var_names
    }

    /// Names of the observation columns, in insertion order
    pub fn obs_keys(&self) -> Vec<&str> {
        self.obs.keys().map(|k| k.as_str()).collect()
    }

    /// `true` if the observation table has a column of the given name
    pub fn has_obs(&self, key: &str) -> bool {
        self.obs.contains_key(key)
    }

    /// Insert (or replace) an observation column
    ///
    /// ### Params
    ///
    /// * `key` - Column name.
    /// * `column` - The per-cell column; its length must equal the cell
    ///   count.
    pub fn insert_obs(&mut self, key: &str, column: ObsColumn) -> Result<()> {
        if column.len() != self.n_obs() {
            return Err(CellcastError::LengthMismatch {
                what: format!("observation column '{}'", key),
                expected: self.n_obs(),
                got: column.len(),
            });
        }

        self.obs.insert(key.to_string(), column);
        Ok(())
    }

    /// Remove an observation column, preserving the order of the rest
    pub fn remove_obs(&mut self, key: &str) -> Option<ObsColumn> {
        self.obs.shift_remove(key)
    }

    /// Borrow a categorical observation column
    ///
    /// ### Params
    ///
    /// * `key` - Column name.
    ///
    /// ### Returns
    ///
    /// The per-cell string values, or an error if the column is missing
    /// or has a different type.
    pub fn categorical(&self, key: &str) -> Result<&[String]> {
        match self.obs.get(key) {
            Some(ObsColumn::Categorical(v)) => Ok(v),
            Some(_) => Err(CellcastError::ObsType {
                column: key.to_string(),
                expected: "categorical",
            }),
            None => Err(CellcastError::MissingObs(key.to_string())),
        }
    }

    /// Borrow a boolean observation column
    ///
    /// ### Params
    ///
    /// * `key` - Column name.
    ///
    /// ### Returns
    ///
    /// The per-cell boolean values, or an error if the column is missing
    /// or has a different type.
    pub fn boolean(&self, key: &str) -> Result<&[bool]> {
        match self.obs.get(key) {
            Some(ObsColumn::Boolean(v)) => Ok(v),
            Some(_) => Err(CellcastError::ObsType {
                column: key.to_string(),
                expected: "boolean",
            }),
            None => Err(CellcastError::MissingObs(key.to_string())),
        }
    }

    /// Indices of the training-split cells, in matrix order
    pub fn train_indices(&self) -> Result<Vec<usize>> {
        Ok(mask_to_indices(self.boolean(IS_TRAIN_KEY)?))
    }

    /// Indices of the test-split cells, in matrix order
    pub fn test_indices(&self) -> Result<Vec<usize>> {
        let is_train = self.boolean(IS_TRAIN_KEY)?;
        let inverted: Vec<bool> = is_train.iter().map(|&t| !t).collect();
        Ok(mask_to_indices(&inverted))
    }

    /// Copy out a row subset (all observation columns come along)
    ///
    /// This function will panic if you try to select indices larger than
    /// the underlying matrix.
    ///
    /// ### Params
    ///
    /// * `rows` - Cell indices to keep, in output order.
    ///
    /// ### Returns
    ///
    /// An owned annotated matrix with `rows.len()` cells.
    pub fn subset_rows(&self, rows: &[usize]) -> Self {
        let x = mat_gather_rows_f64(self.x.as_ref(), rows);
        let obs = self
            .obs
            .iter()
            .map(|(k, col)| (k.clone(), col.subset(rows)))
            .collect();

        AnnotatedMatrix {
            x,
            obs,
            var_names: self.var_names.clone(),
        }
    }

    /// Copy out a gene subset (all cells, selected genes)
    ///
    /// ### Params
    ///
    /// * `keep` - Boolean per-gene mask; must match the gene count.
    ///
    /// ### Returns
    ///
    /// An owned annotated matrix restricted to the flagged genes, or an
    /// error for a mask of the wrong length or one selecting zero genes.
    pub fn subset_cols(&self, keep: &[bool]) -> Result<Self> {
        if keep.len() != self.n_vars() {
            return Err(CellcastError::LengthMismatch {
                what: "gene mask".to_string(),
                expected: self.n_vars(),
                got: keep.len(),
            });
        }

        let cols = mask_to_indices(keep);
        if cols.is_empty() {
            return Err(CellcastError::InvalidInput(
                "gene mask selects zero genes".to_string(),
            ));
        }

        let x = mat_gather_cols_f64(self.x.as_ref(), &cols);
        let var_names = cols.iter().map(|&j| self.var_names[j].clone()).collect();

        Ok(AnnotatedMatrix {
            x,
            obs: self.obs.clone(),
            var_names,
        })
    }

    /// Check the data contract required by the label-projection methods
    ///
    /// Fails fast, before any model fitting, if the matrix is empty or if
    /// any of `labels`, `is_train`, `batch` is missing or mistyped.
    pub fn validate_projection_input(&self) -> Result<()> {
        if self.n_obs() == 0 || self.n_vars() == 0 {
            return Err(CellcastError::InvalidInput(
                "annotated matrix has no cells or no genes".to_string(),
            ));
        }

        self.categorical(LABELS_KEY)?;
        self.boolean(IS_TRAIN_KEY)?;
        self.categorical(BATCH_KEY)?;

        Ok(())
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_matrix() -> AnnotatedMatrix {
        let x = Mat::from_fn(4, 3, |i, j| (i * 3 + j) as f64);
        let var_names = (0..3).map(|j| format!("gene_{}", j)).collect();
        let mut adata = AnnotatedMatrix::new(x, var_names).unwrap();

        adata
            .insert_obs(
                LABELS_KEY,
                ObsColumn::Categorical(vec![
                    "alpha".to_string(),
                    "beta".to_string(),
                    "alpha".to_string(),
                    "beta".to_string(),
                ]),
            )
            .unwrap();
        adata
            .insert_obs(
                IS_TRAIN_KEY,
                ObsColumn::Boolean(vec![true, true, true, false]),
            )
            .unwrap();
        adata
            .insert_obs(
                BATCH_KEY,
                ObsColumn::Categorical(vec![
                    "b0".to_string(),
                    "b1".to_string(),
                    "b0".to_string(),
                    "b1".to_string(),
                ]),
            )
            .unwrap();

        adata
    }

    #[test]
    fn test_new_checks_var_names() {
        let x: Mat<f64> = Mat::zeros(2, 3);
        let res = AnnotatedMatrix::new(x, vec!["only_one".to_string()]);
        assert!(matches!(res, Err(CellcastError::LengthMismatch { .. })));
    }

    #[test]
    fn test_insert_obs_checks_length() {
        let mut adata = toy_matrix();
        let res = adata.insert_obs("too_short", ObsColumn::Boolean(vec![true]));
        assert!(matches!(res, Err(CellcastError::LengthMismatch { .. })));
    }

    #[test]
    fn test_typed_accessors() {
        let adata = toy_matrix();

        assert_eq!(adata.categorical(LABELS_KEY).unwrap().len(), 4);
        assert!(matches!(
            adata.categorical(IS_TRAIN_KEY),
            Err(CellcastError::ObsType { .. })
        ));
        assert!(matches!(
            adata.boolean("nope"),
            Err(CellcastError::MissingObs(_))
        ));
    }

    #[test]
    fn test_split_indices() {
        let adata = toy_matrix();
        assert_eq!(adata.train_indices().unwrap(), vec![0, 1, 2]);
        assert_eq!(adata.test_indices().unwrap(), vec![3]);
    }

    #[test]
    fn test_subset_rows_carries_obs() {
        let adata = toy_matrix();
        let sub = adata.subset_rows(&[3, 0]);

        assert_eq!(sub.n_obs(), 2);
        assert_eq!(sub.n_vars(), 3);
        assert_eq!(
            sub.categorical(LABELS_KEY).unwrap(),
            &["beta".to_string(), "alpha".to_string()]
        );
        assert_eq!(sub.boolean(IS_TRAIN_KEY).unwrap(), &[false, true]);
        assert_eq!(sub.x()[(0, 0)], 9.0);
    }

    #[test]
    fn test_subset_cols() {
        let adata = toy_matrix();
        let sub = adata.subset_cols(&[true, false, true]).unwrap();

        assert_eq!(sub.n_obs(), 4);
        assert_eq!(sub.n_vars(), 2);
        assert_eq!(
            sub.var_names(),
            &["gene_0".to_string(), "gene_2".to_string()]
        );
        assert_eq!(sub.x()[(1, 1)], 5.0);
        // obs comes along untouched
        assert_eq!(sub.categorical(LABELS_KEY).unwrap().len(), 4);
    }

    #[test]
    fn test_subset_cols_rejects_degenerate_masks() {
        let adata = toy_matrix();

        assert!(matches!(
            adata.subset_cols(&[true, false]),
            Err(CellcastError::LengthMismatch { .. })
        ));
        assert!(matches!(
            adata.subset_cols(&[false, false, false]),
            Err(CellcastError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_projection_input() {
        let adata = toy_matrix();
        assert!(adata.validate_projection_input().is_ok());

        let mut missing = toy_matrix();
        missing.remove_obs(BATCH_KEY);
        assert!(matches!(
            missing.validate_projection_input(),
            Err(CellcastError::MissingObs(_))
        ));
    }
}
