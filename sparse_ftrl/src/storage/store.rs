use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;

use crate::{
    error::{KernelErr, Result},
    kernel::{Operand, SparseApplyFtrlKernel, Workspace},
    table::FtrlSlots,
};

/// An embedding table trained with sparse ftrl updates.
///
/// Owns the optimizer slots and the kernel's scratch space, updates are serialized while
/// reads may run concurrently between them.
#[derive(Debug)]
pub struct EmbeddingStore {
    kernel: SparseApplyFtrlKernel,
    slots: RwLock<FtrlSlots>,
    workspace: Mutex<Workspace>,
}

impl EmbeddingStore {
    /// Creates a new `EmbeddingStore`.
    ///
    /// # Arguments
    /// * `kernel` - An initialized kernel.
    /// * `slots` - The initial optimizer state, shaped `[kernel.first_dim(), kernel.outer_dim()]`.
    ///
    /// # Returns
    /// A `SizeMismatch` error if any slot doesn't match the kernel's table shape.
    pub fn new(kernel: SparseApplyFtrlKernel, slots: FtrlSlots) -> Result<Self> {
        let expected = kernel.first_dim() * kernel.outer_dim();

        for (operand, table) in [
            ("var", &slots.var),
            ("accum", &slots.accum),
            ("linear", &slots.linear),
        ] {
            let aligned = table.rows() == kernel.first_dim() && table.cols() == kernel.outer_dim();

            if !aligned {
                return Err(KernelErr::SizeMismatch {
                    operand,
                    got: table.as_slice().len(),
                    expected,
                });
            }
        }

        let workspace = Workspace::new(kernel.workspace_sizes());

        Ok(Self {
            kernel,
            slots: RwLock::new(slots),
            workspace: Mutex::new(workspace),
        })
    }

    /// The total amount of parameters in the table.
    pub fn len(&self) -> usize {
        self.rows() * self.cols()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rows(&self) -> usize {
        self.kernel.first_dim()
    }

    pub fn cols(&self) -> usize {
        self.kernel.outer_dim()
    }

    pub fn kernel(&self) -> &SparseApplyFtrlKernel {
        &self.kernel
    }

    /// Applies a sparse gradient to the table.
    ///
    /// # Arguments
    /// * `grad` - `indices.len()` gradient rows laid out flat.
    /// * `indices` - The row each gradient row belongs to, may repeat.
    ///
    /// # Returns
    /// The kernel's error if the launch fails, see `SparseApplyFtrlKernel::launch`.
    pub fn apply(&self, grad: &[f32], indices: &[i32]) -> Result<()> {
        let mut workspace = self.workspace.lock();
        let mut slots = self.slots.write();
        let FtrlSlots { var, accum, linear } = &mut *slots;

        let mut inputs = [
            Operand::F32Mut(var.as_mut_slice()),
            Operand::F32Mut(accum.as_mut_slice()),
            Operand::F32Mut(linear.as_mut_slice()),
            Operand::F32(grad),
            Operand::I32(indices),
        ];

        self.kernel.launch(&mut inputs, &mut workspace)
    }

    /// Gathers the current weights of the given rows.
    ///
    /// # Arguments
    /// * `indices` - The rows to gather, may repeat.
    /// * `out` - Where to copy the rows, `indices.len() * self.cols()` long.
    ///
    /// # Returns
    /// A `SizeMismatch` error if `out` has the wrong length or an `IndexOutOfRange`
    /// error if any index is outside the table.
    pub fn lookup(&self, indices: &[i32], out: &mut [f32]) -> Result<()> {
        let cols = self.cols();

        if out.len() != indices.len() * cols {
            return Err(KernelErr::SizeMismatch {
                operand: "lookup",
                got: out.len(),
                expected: indices.len() * cols,
            });
        }

        let slots = self.slots.read();
        let rows = self.rows();

        if let Some(&index) = indices
            .iter()
            .find(|&&index| usize::try_from(index).map_or(true, |row| row >= rows))
        {
            return Err(KernelErr::IndexOutOfRange { index, rows });
        }

        let var = &slots.var;

        if cols > 0 {
            out.par_chunks_mut(cols)
                .zip(indices.par_iter())
                .for_each(|(out_row, &index)| {
                    if let Some(row) = var.row(index as usize) {
                        out_row.copy_from_slice(row);
                    }
                });
        }

        Ok(())
    }

    /// Copies the whole weight table into `out`.
    ///
    /// # Returns
    /// A `SizeMismatch` error if `out` isn't `self.len()` long.
    pub fn pull_weights(&self, out: &mut [f32]) -> Result<()> {
        if out.len() != self.len() {
            return Err(KernelErr::SizeMismatch {
                operand: "pull",
                got: out.len(),
                expected: self.len(),
            });
        }

        out.copy_from_slice(self.slots.read().var.as_slice());
        Ok(())
    }

    /// Takes a copy of the optimizer state.
    pub fn snapshot(&self) -> FtrlSlots {
        self.slots.read().clone()
    }
}
