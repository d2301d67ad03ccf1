use crate::core::data::annotated::{AnnotatedMatrix, IS_TRAIN_KEY, LABELS_KEY};
use crate::error::{CellcastError, Result};

/// Scratch observation column carrying the masked label view; lives only
/// on local working copies, never on the caller's matrix
pub const SCANVI_LABELS_KEY: &str = "scanvi_labels";

/// Sentinel category standing in for hidden test-cell labels
pub const UNLABELED: &str = "Unknown";

/// Build the masked label view
///
/// Training-cell labels are copied verbatim; test-cell labels are
/// replaced by the [`UNLABELED`] sentinel so that no fitting step ever
/// observes them. A *training* label that already equals the sentinel
/// would silently lose its label signal downstream, so it is rejected
/// here instead.
///
/// ### Params
///
/// * `adata` - The annotated matrix with `labels` and `is_train`.
///
/// ### Returns
///
/// One label per cell: true labels for train cells, the sentinel for
/// test cells.
pub fn masked_labels(adata: &AnnotatedMatrix) -> Result<Vec<String>> {
    let labels = adata.categorical(LABELS_KEY)?;
    let is_train = adata.boolean(IS_TRAIN_KEY)?;

    if labels
        .iter()
        .zip(is_train.iter())
        .any(|(label, &train)| train && label == UNLABELED)
    {
        return Err(CellcastError::InvalidInput(format!(
            "a training cell is labelled '{}', which collides with the mask sentinel",
            UNLABELED
        )));
    }

    Ok(labels
        .iter()
        .zip(is_train.iter())
        .map(|(label, &train)| {
            if train {
                label.clone()
            } else {
                UNLABELED.to_string()
            }
        })
        .collect())
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data::annotated::{ObsColumn, BATCH_KEY};
    use faer::Mat;

    fn toy_matrix(labels: Vec<&str>, is_train: Vec<bool>) -> AnnotatedMatrix {
        let n = labels.len();
        let x = Mat::from_fn(n, 2, |i, j| (i + j) as f64);
        let mut adata =
            AnnotatedMatrix::new(x, vec!["gene_0".to_string(), "gene_1".to_string()]).unwrap();

        adata
            .insert_obs(
                LABELS_KEY,
                ObsColumn::Categorical(labels.iter().map(|s| s.to_string()).collect()),
            )
            .unwrap();
        adata
            .insert_obs(IS_TRAIN_KEY, ObsColumn::Boolean(is_train))
            .unwrap();
        adata
            .insert_obs(
                BATCH_KEY,
                ObsColumn::Categorical(vec!["b0".to_string(); n]),
            )
            .unwrap();

        adata
    }

    #[test]
    fn test_masks_test_cells_only() {
        let adata = toy_matrix(
            vec!["alpha", "beta", "gamma"],
            vec![true, false, true],
        );
        let masked = masked_labels(&adata).unwrap();

        assert_eq!(masked, vec!["alpha", UNLABELED, "gamma"]);
    }

    #[test]
    fn test_rejects_sentinel_collision_in_train() {
        let adata = toy_matrix(vec!["alpha", UNLABELED], vec![true, true]);
        assert!(matches!(
            masked_labels(&adata),
            Err(CellcastError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_sentinel_in_test_split_is_fine() {
        // a hidden test label equal to the sentinel is masked anyway
        let adata = toy_matrix(vec!["alpha", UNLABELED], vec![true, false]);
        let masked = masked_labels(&adata).unwrap();
        assert_eq!(masked, vec!["alpha", UNLABELED]);
    }

    #[test]
    fn test_requires_contract_columns() {
        let n = 2;
        let x = Mat::zeros(n, 1);
        let adata = AnnotatedMatrix::new(x, vec!["gene_0".to_string()]).unwrap();
        assert!(matches!(
            masked_labels(&adata),
            Err(CellcastError::MissingObs(_))
        ));
    }
}
