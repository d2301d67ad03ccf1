use faer::{Mat, MatRef};
use rustc_hash::FxHashSet;

//////////////////
// VECTOR STUFF //
//////////////////

/// Get unique strings from a slice, preserving first-occurrence order
///
/// ### Params
///
/// * `vec` - The slice of strings.
///
/// ### Returns
///
/// The unique elements of `vec` as an owned Vec.
pub fn unique_strings(vec: &[String]) -> Vec<String> {
    let mut set = FxHashSet::default();
    vec.iter()
        .filter(|item| set.insert(item.as_str()))
        .cloned()
        .collect()
}

/// Turn a boolean mask into the indices of its `true` positions
///
/// ### Params
///
/// * `mask` - The boolean mask.
///
/// ### Returns
///
/// Indices at which the mask is `true`.
pub fn mask_to_indices(mask: &[bool]) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter_map(|(i, &keep)| if keep { Some(i) } else { None })
        .collect()
}

//////////////////
// MATRIX STUFF //
//////////////////

/// Gather a set of rows from an f64 matrix into an owned copy
///
/// This function will panic if you try to select indices larger than the
/// underlying matrix.
///
/// ### Params
///
/// * `x` - The original matrix.
/// * `rows` - The row indices to gather, in output order.
///
/// ### Returns
///
/// Owned matrix with `rows.len()` rows.
pub fn mat_gather_rows_f64(x: MatRef<f64>, rows: &[usize]) -> Mat<f64> {
    let max_row = rows.iter().max().copied().unwrap_or(0);
    assert!(
        rows.is_empty() || max_row < x.nrows(),
        "You selected indices larger than nrow."
    );

    Mat::from_fn(rows.len(), x.ncols(), |i, j| *x.get(rows[i], j))
}

/// Gather a set of rows from an f32 matrix into an owned copy
///
/// This function will panic if you try to select indices larger than the
/// underlying matrix.
///
/// ### Params
///
/// * `x` - The original matrix.
/// * `rows` - The row indices to gather, in output order.
///
/// ### Returns
///
/// Owned matrix with `rows.len()` rows.
pub fn mat_gather_rows_f32(x: MatRef<f32>, rows: &[usize]) -> Mat<f32> {
    let max_row = rows.iter().max().copied().unwrap_or(0);
    assert!(
        rows.is_empty() || max_row < x.nrows(),
        "You selected indices larger than nrow."
    );

    Mat::from_fn(rows.len(), x.ncols(), |i, j| *x.get(rows[i], j))
}

/// Gather a set of columns from an f64 matrix into an owned copy
///
/// This function will panic if you try to select indices larger than the
/// underlying matrix.
///
/// ### Params
///
/// * `x` - The original matrix.
/// * `cols` - The column indices to gather, in output order.
///
/// ### Returns
///
/// Owned matrix with `cols.len()` columns.
pub fn mat_gather_cols_f64(x: MatRef<f64>, cols: &[usize]) -> Mat<f64> {
    let max_col = cols.iter().max().copied().unwrap_or(0);
    assert!(
        cols.is_empty() || max_col < x.ncols(),
        "You selected indices larger than ncol."
    );

    Mat::from_fn(x.nrows(), cols.len(), |i, j| *x.get(i, cols[j]))
}

///////////
// Tests //
///////////
