use std::ops::Range;

use crate::{
    error::{KernelErr, Result},
    optimization::FtrlSlotsMut,
};

/// An owned row-major `[rows, cols]` buffer of single precision floats.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    rows: usize,
    cols: usize,
    data: Box<[f32]>,
}

impl Table {
    /// Creates a new `Table` with every element set to `value`.
    pub fn filled(rows: usize, cols: usize, value: f32) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols].into_boxed_slice(),
        }
    }

    /// Creates a new `Table` from a flat buffer.
    ///
    /// # Arguments
    /// * `rows` - The amount of rows.
    /// * `cols` - The length of every row.
    /// * `data` - The flat row-major contents.
    ///
    /// # Returns
    /// A `SizeMismatch` error if `data` doesn't hold `rows * cols` elements.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(KernelErr::SizeMismatch {
                operand: "table",
                got: data.len(),
                expected: rows * cols,
            });
        }

        Ok(Self {
            rows,
            cols,
            data: data.into_boxed_slice(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The flat range a row occupies, `None` if `row` is out of bounds.
    fn span(&self, row: usize) -> Option<Range<usize>> {
        (row < self.rows).then(|| row * self.cols..(row + 1) * self.cols)
    }

    pub fn row(&self, row: usize) -> Option<&[f32]> {
        self.span(row).map(|span| &self.data[span])
    }

    pub fn row_mut(&mut self, row: usize) -> Option<&mut [f32]> {
        self.span(row).map(|span| &mut self.data[span])
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }
}

/// The three row aligned tables an ftrl optimizer keeps per embedding table.
#[derive(Debug, Clone, PartialEq)]
pub struct FtrlSlots {
    pub var: Table,
    pub accum: Table,
    pub linear: Table,
}

impl FtrlSlots {
    /// Creates the slots for `var`, `accum` starts at `initial_accumulator` and `linear` at zero.
    pub fn new(var: Table, initial_accumulator: f32) -> Self {
        let (rows, cols) = (var.rows(), var.cols());

        Self {
            var,
            accum: Table::filled(rows, cols, initial_accumulator),
            linear: Table::filled(rows, cols, 0.),
        }
    }

    /// Borrows the three tables as flat mutable buffers.
    pub fn as_mut(&mut self) -> FtrlSlotsMut<'_> {
        FtrlSlotsMut {
            var: self.var.as_mut_slice(),
            accum: self.accum.as_mut_slice(),
            linear: self.linear.as_mut_slice(),
        }
    }
}
