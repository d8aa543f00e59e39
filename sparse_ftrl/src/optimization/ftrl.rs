use std::mem;

use rayon::prelude::*;

use crate::{
    error::{KernelErr, Result},
    reduction::SparseGradient,
};

/// The mutable flat `[rows, outer_dim]` buffers an ftrl update writes to.
#[derive(Debug)]
pub struct FtrlSlotsMut<'a> {
    pub var: &'a mut [f32],
    pub accum: &'a mut [f32],
    pub linear: &'a mut [f32],
}

/// The Follow-The-Regularized-Leader update rule.
///
/// Holds the validated hyperparameters, immutable once built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ftrl {
    lr: f32,
    l1: f32,
    l2: f32,
    lr_power: f32,
}

impl Ftrl {
    /// Creates a new `Ftrl` optimizer.
    ///
    /// # Arguments
    /// * `lr` - The learning rate, must be positive.
    /// * `l1` - The L1 regularization strength, must be non-negative.
    /// * `l2` - The L2 regularization strength, must be non-negative.
    /// * `lr_power` - The learning rate power, must be non-positive.
    ///
    /// # Returns
    /// An `InvalidAttr` error naming the first hyperparameter that breaks its constraint.
    /// NaN breaks every constraint.
    pub fn new(lr: f32, l1: f32, l2: f32, lr_power: f32) -> Result<Self> {
        let checks = [
            ("lr", lr, lr > 0., "positive"),
            ("l1", l1, l1 >= 0., "non-negative"),
            ("l2", l2, l2 >= 0., "non-negative"),
            ("lr_power", lr_power, lr_power <= 0., "non-positive"),
        ];

        if let Some(&(name, value, _, constraint)) = checks.iter().find(|check| !check.2) {
            return Err(KernelErr::InvalidAttr {
                name,
                value,
                constraint,
            });
        }

        Ok(Self {
            lr,
            l1,
            l2,
            lr_power,
        })
    }

    pub fn lr(&self) -> f32 {
        self.lr
    }

    pub fn l1(&self) -> f32 {
        self.l1
    }

    pub fn l2(&self) -> f32 {
        self.l2
    }

    pub fn lr_power(&self) -> f32 {
        self.lr_power
    }

    /// Raises an accumulator value to `-lr_power`.
    ///
    /// `-0.5` is exactly representable, so the comparison only catches literal configs. A
    /// computed `lr_power` that lands next to it takes the general path.
    #[inline]
    fn lr_pow(&self, accum: f32) -> f32 {
        if self.lr_power == -0.5 {
            accum.sqrt()
        } else {
            accum.powf(-self.lr_power)
        }
    }

    /// Applies the update to a single element.
    ///
    /// `accum` is committed last, its previous value feeds the linear term.
    #[inline]
    fn step(&self, grad: f32, var: &mut f32, accum: &mut f32, linear: &mut f32) {
        let accum_new = *accum + grad * grad;
        let pow_new = self.lr_pow(accum_new);

        *linear += grad - (pow_new - self.lr_pow(*accum)) / self.lr * *var;

        let x = sign(*linear) * self.l1 - *linear;
        let y = pow_new / self.lr + 2. * self.l2;
        *var = if linear.abs() > self.l1 { x / y } else { 0. };
        *accum = accum_new;
    }

    /// Applies the update to every element of a row, all four slices share a length.
    fn update_row(&self, grad: &[f32], row: RowMut<'_>) {
        let RowMut { var, accum, linear } = row;
        debug_assert!([var.len(), accum.len(), linear.len()].iter().all(|&n| n == grad.len()));

        grad.iter()
            .zip(var)
            .zip(accum)
            .zip(linear)
            .for_each(|(((g, v), a), l)| self.step(*g, v, a, l));
    }

    /// Applies the update to every row referenced by a reduced sparse gradient.
    ///
    /// Rows are updated in parallel. When an index falls outside `[0, rows)` every row
    /// preceding it in `grad` is still written, the ones following it are not.
    ///
    /// # Arguments
    /// * `grad` - A reduced gradient, no index may appear twice.
    /// * `slots` - The `[rows, grad.outer_dim()]` buffers to update.
    /// * `rows` - The amount of rows in the slots.
    ///
    /// # Returns
    /// An `IndexOutOfRange` error for the first index outside the table, or a
    /// `DuplicateIndex` error, raised before any write, if `grad` isn't reduced.
    pub fn apply_sparse(
        &self,
        grad: &SparseGradient<'_>,
        slots: FtrlSlotsMut<'_>,
        rows: usize,
    ) -> Result<()> {
        let outer_dim = grad.outer_dim();
        let indices = grad.indices();

        let valid = indices
            .iter()
            .position(|&index| usize::try_from(index).map_or(true, |row| row >= rows))
            .unwrap_or(indices.len());

        let prefix = &indices[..valid];

        // The reducer hands rows over ascending, any other order gets sorted first.
        let touched = if prefix.windows(2).all(|pair| pair[0] < pair[1]) {
            let ascending = prefix.iter().map(|&index| index as usize);
            split_rows(slots, outer_dim, ascending.enumerate())
        } else {
            let mut order: Vec<(usize, usize)> = prefix
                .iter()
                .enumerate()
                .map(|(k, &index)| (k, index as usize))
                .collect();

            order.sort_unstable_by_key(|&(_, row)| row);

            if let Some(pair) = order.windows(2).find(|pair| pair[0].1 == pair[1].1) {
                return Err(KernelErr::DuplicateIndex {
                    index: pair[0].1 as i32,
                });
            }

            split_rows(slots, outer_dim, order.into_iter())
        };

        touched
            .into_par_iter()
            .for_each(|(k, row)| self.update_row(grad.row(k), row));

        if let Some(&index) = indices.get(valid) {
            return Err(KernelErr::IndexOutOfRange { index, rows });
        }

        Ok(())
    }
}

/// One row of each of the three slots.
#[derive(Debug)]
struct RowMut<'t> {
    var: &'t mut [f32],
    accum: &'t mut [f32],
    linear: &'t mut [f32],
}

/// `sign(0) == 0`, unlike `f32::signum`.
fn sign(v: f32) -> f32 {
    if v > 0. {
        1.
    } else if v < 0. {
        -1.
    } else {
        0.
    }
}

/// Carves the given rows out of the slots as disjoint mutable rows.
///
/// # Arguments
/// * `slots` - The flat row-major tables.
/// * `width` - The length of every row.
/// * `rows` - `(k, row)` pairs with strictly ascending rows, all of them inside the tables.
fn split_rows<'t>(
    slots: FtrlSlotsMut<'t>,
    width: usize,
    rows: impl Iterator<Item = (usize, usize)>,
) -> Vec<(usize, RowMut<'t>)> {
    let FtrlSlotsMut {
        mut var,
        mut accum,
        mut linear,
    } = slots;

    let mut out = Vec::with_capacity(rows.size_hint().0);
    let mut next_row = 0;

    for (k, row) in rows {
        let skip = (row - next_row) * width;
        let row_mut = RowMut {
            var: carve(&mut var, skip, width),
            accum: carve(&mut accum, skip, width),
            linear: carve(&mut linear, skip, width),
        };

        out.push((k, row_mut));
        next_row = row + 1;
    }

    out
}

/// Skips `skip` elements of `table`, then splits off the next `width` of them.
fn carve<'t>(table: &mut &'t mut [f32], skip: usize, width: usize) -> &'t mut [f32] {
    let rest = mem::take(table);
    let (_, rest) = rest.split_at_mut(skip);
    let (row, rest) = rest.split_at_mut(width);
    *table = rest;
    row
}
