use crate::error::{KernelErr, Result};

/// A borrowed sparse gradient, row `k` of `values` belongs to the table row `indices[k]`.
#[derive(Debug, Clone, Copy)]
pub struct SparseGradient<'a> {
    values: &'a [f32],
    indices: &'a [i32],
    outer_dim: usize,
}

impl<'a> SparseGradient<'a> {
    /// Creates a new `SparseGradient`.
    ///
    /// # Arguments
    /// * `values` - The flat `[indices.len(), outer_dim]` gradient rows.
    /// * `indices` - The table row each gradient row belongs to, may contain duplicates.
    /// * `outer_dim` - The length of every row.
    ///
    /// # Returns
    /// A `SizeMismatch` error if `values` doesn't hold exactly one row per index.
    pub fn new(values: &'a [f32], indices: &'a [i32], outer_dim: usize) -> Result<Self> {
        let expected = indices.len() * outer_dim;

        if values.len() != expected {
            return Err(KernelErr::SizeMismatch {
                operand: "grad",
                got: values.len(),
                expected,
            });
        }

        Ok(Self {
            values,
            indices,
            outer_dim,
        })
    }

    /// The amount of rows, counting duplicates.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn outer_dim(&self) -> usize {
        self.outer_dim
    }

    pub fn indices(&self) -> &'a [i32] {
        self.indices
    }

    pub fn values(&self) -> &'a [f32] {
        self.values
    }

    /// The `k`-th gradient row.
    ///
    /// # Panics
    /// If `k >= self.len()`.
    pub fn row(&self, k: usize) -> &'a [f32] {
        &self.values[k * self.outer_dim..(k + 1) * self.outer_dim]
    }

    /// Iterates over every `(index, row)` pair in storage order.
    pub fn rows(self) -> impl Iterator<Item = (i32, &'a [f32])> {
        (0..self.len()).map(move |k| (self.indices[k], self.row(k)))
    }
}
