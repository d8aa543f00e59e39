use rayon::prelude::*;

use super::SparseGradient;
use crate::error::{KernelErr, Result};

/// Merges the duplicated rows of `grad` by summing them element-wise.
///
/// The reduced gradient is written into the caller's scratch buffers, which are always
/// written before being read. Every distinct index of `grad` shows up exactly once in the
/// output, in ascending order. Rows sharing an index are summed in their input order.
///
/// Indices are not range checked here, an index outside the table is reduced like any
/// other and left for the updater to reject.
///
/// # Arguments
/// * `grad` - The raw sparse gradient.
/// * `values` - Scratch space for the summed rows, at least `grad.len() * outer_dim` long.
/// * `indices` - Scratch space for the distinct indices, at least `grad.len()` long.
/// * `positions` - Reusable bookkeeping space, resized to `2 * grad.len() + 1`. It only
///   allocates when its capacity falls short.
///
/// # Returns
/// The reduced gradient borrowing the prefix of the scratch buffers that was written,
/// or a `SizeMismatch` error if `values` or `indices` is too small.
pub fn reduce_sparse_gradient<'w>(
    grad: SparseGradient<'_>,
    values: &'w mut [f32],
    indices: &'w mut [i32],
    positions: &mut Vec<usize>,
) -> Result<SparseGradient<'w>> {
    let outer_dim = grad.outer_dim();
    let raw = grad.indices();
    let n = raw.len();

    if values.len() < grad.values().len() {
        return Err(KernelErr::SizeMismatch {
            operand: "workspace values",
            got: values.len(),
            expected: grad.values().len(),
        });
    }

    if indices.len() < n {
        return Err(KernelErr::SizeMismatch {
            operand: "workspace indices",
            got: indices.len(),
            expected: n,
        });
    }

    positions.clear();
    positions.extend(0..n);
    positions.resize(2 * n + 1, 0);

    // The sorted permutation of `raw`, then where each run of equal indices starts.
    let (order, starts) = positions.split_at_mut(n);
    order.par_sort_by_key(|&k| raw[k]);

    let mut count = 0;
    let mut start = 0;

    for run in order.chunk_by(|&a, &b| raw[a] == raw[b]) {
        starts[count] = start;
        indices[count] = raw[run[0]];
        start += run.len();
        count += 1;
    }

    starts[count] = start;

    if outer_dim > 0 {
        let order: &[usize] = order;

        values[..count * outer_dim]
            .par_chunks_mut(outer_dim)
            .zip(starts[..=count].par_windows(2))
            .for_each(|(out, bounds)| {
                let run = &order[bounds[0]..bounds[1]];
                out.copy_from_slice(grad.row(run[0]));

                for &k in &run[1..] {
                    out.iter_mut().zip(grad.row(k)).for_each(|(o, g)| *o += g);
                }
            });
    }

    let values: &'w [f32] = values;
    let indices: &'w [i32] = indices;
    SparseGradient::new(&values[..count * outer_dim], &indices[..count], outer_dim)
}
