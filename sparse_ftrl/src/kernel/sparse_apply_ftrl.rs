use log::{debug, trace, warn};

use super::{KernelNode, Operand, Workspace, WorkspaceSizes};
use crate::{
    error::{KernelErr, Result},
    optimization::{Ftrl, FtrlSlotsMut},
    reduction::{SparseGradient, reduce_sparse_gradient},
};

/// Applies the ftrl update to the rows of `var`, `accum` and `linear` referenced by a sparse
/// gradient, summing the gradient rows of repeated indices first.
///
/// Shapes and hyperparameters are validated once in `init`, every `launch` after that only
/// checks that the buffers it receives match them.
#[derive(Debug, Clone)]
pub struct SparseApplyFtrlKernel {
    first_dim: usize,
    outer_dim: usize,
    indices_size: usize,
    ftrl: Ftrl,
}

impl SparseApplyFtrlKernel {
    /// The operands of a launch, in order: `var`, `accum`, `linear`, `grad` and `indices`.
    pub const INPUTS: usize = 5;

    /// Creates a new `SparseApplyFtrlKernel` from the shapes and attributes of a node.
    ///
    /// # Arguments
    /// * `node` - Provides the shapes of the five inputs and the `lr`, `l1`, `l2` and
    ///   `lr_power` attributes.
    ///
    /// # Returns
    /// A configuration error if any shape or hyperparameter is invalid.
    pub fn init<N: KernelNode + ?Sized>(node: &N) -> Result<Self> {
        let var_shape = node.input_shape(0)?;
        let accum_shape = node.input_shape(1)?;
        let linear_shape = node.input_shape(2)?;
        let grad_shape = node.input_shape(3)?;
        let indices_shape = node.input_shape(4)?;

        same_shape("var", "accum", var_shape, accum_shape)?;
        same_shape("var", "linear", var_shape, linear_shape)?;

        let Some((&first_dim, trailing)) = var_shape.split_first() else {
            return Err(KernelErr::ZeroRank { operand: "var" });
        };

        if grad_shape.len() != var_shape.len() {
            return Err(KernelErr::InvalidRank {
                operand: "grad",
                got: grad_shape.len(),
                expected: var_shape.len(),
            });
        }

        let mismatch = trailing
            .iter()
            .zip(&grad_shape[1..])
            .position(|(var, grad)| var != grad);

        if let Some(i) = mismatch {
            return Err(KernelErr::DimMismatch {
                dim: i + 1,
                var: trailing[i],
                grad: grad_shape[i + 1],
            });
        }

        let outer_dim = trailing.iter().product();

        let &[indices_size] = indices_shape else {
            return Err(KernelErr::InvalidRank {
                operand: "indices",
                got: indices_shape.len(),
                expected: 1,
            });
        };

        if grad_shape[0] != indices_size {
            return Err(KernelErr::LeadingDimMismatch {
                grad: grad_shape[0],
                indices: indices_size,
            });
        }

        let ftrl = Ftrl::new(
            node.attr("lr")?,
            node.attr("l1")?,
            node.attr("l2")?,
            node.attr("lr_power")?,
        )?;

        debug!(
            first_dim = first_dim,
            outer_dim = outer_dim,
            indices_size = indices_size;
            "sparse ftrl kernel initialized"
        );

        Ok(Self {
            first_dim,
            outer_dim,
            indices_size,
            ftrl,
        })
    }

    /// The amount of rows of the updated tables.
    pub fn first_dim(&self) -> usize {
        self.first_dim
    }

    /// The length of a row, the product of every trailing dimension of `var`.
    pub fn outer_dim(&self) -> usize {
        self.outer_dim
    }

    /// The amount of indices of every launch.
    pub fn indices_size(&self) -> usize {
        self.indices_size
    }

    pub fn ftrl(&self) -> &Ftrl {
        &self.ftrl
    }

    /// Returns the scratch space a launch needs to hold the reduced gradient.
    pub fn workspace_sizes(&self) -> WorkspaceSizes {
        WorkspaceSizes {
            values: self.indices_size * self.outer_dim,
            indices: self.indices_size,
        }
    }

    /// Runs the sparse ftrl update in place.
    ///
    /// Every operand check happens before the first write. An index outside the table
    /// aborts the update, rows reduced before it stay written.
    ///
    /// # Arguments
    /// * `inputs` - `var`, `accum` and `linear` as writable f32 buffers, `grad` as an f32
    ///   buffer and `indices` as an i32 buffer. Extra operands are ignored.
    /// * `workspace` - Scratch space at least as big as `workspace_sizes`.
    ///
    /// # Returns
    /// A configuration error for missing, mistyped or mis-sized operands, or an
    /// `IndexOutOfRange` error.
    pub fn launch(&self, inputs: &mut [Operand<'_>], workspace: &mut Workspace) -> Result<()> {
        self.try_launch(inputs, workspace)
            .inspect_err(|e| warn!("sparse ftrl launch failed: {e}"))
    }

    fn try_launch(&self, inputs: &mut [Operand<'_>], workspace: &mut Workspace) -> Result<()> {
        let got = inputs.len();
        let [var, accum, linear, grad, indices, ..] = inputs else {
            return Err(KernelErr::InputCount {
                got,
                expected: Self::INPUTS,
            });
        };

        let table_len = self.first_dim * self.outer_dim;
        let var = var.as_f32_mut(0)?;
        let accum = accum.as_f32_mut(1)?;
        let linear = linear.as_f32_mut(2)?;
        let grad = grad.as_f32(3)?;
        let indices = indices.as_i32(4)?;

        check_len("var", var.len(), table_len)?;
        check_len("accum", accum.len(), table_len)?;
        check_len("linear", linear.len(), table_len)?;
        check_len("grad", grad.len(), self.indices_size * self.outer_dim)?;
        check_len("indices", indices.len(), self.indices_size)?;

        let raw = SparseGradient::new(grad, indices, self.outer_dim)?;
        let unique = reduce_sparse_gradient(
            raw,
            &mut workspace.values,
            &mut workspace.indices,
            &mut workspace.positions,
        )?;

        trace!(raw = raw.len(), unique = unique.len(); "reduced sparse gradient");

        let slots = FtrlSlotsMut { var, accum, linear };
        self.ftrl.apply_sparse(&unique, slots, self.first_dim)
    }
}

fn same_shape(a: &'static str, b: &'static str, expected: &[usize], got: &[usize]) -> Result<()> {
    if expected != got {
        return Err(KernelErr::ShapeMismatch {
            a,
            b,
            got: got.to_vec(),
            expected: expected.to_vec(),
        });
    }

    Ok(())
}

fn check_len(operand: &'static str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(KernelErr::SizeMismatch {
            operand,
            got,
            expected,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{kernel::NodeSpec, specs::FtrlSpec};

    const FTRL: FtrlSpec = FtrlSpec {
        lr: 0.1,
        l1: 0.,
        l2: 0.,
        lr_power: -0.5,
    };

    fn init(node: &NodeSpec) -> Result<SparseApplyFtrlKernel> {
        SparseApplyFtrlKernel::init(node)
    }

    #[test]
    fn derives_dims_and_workspace() {
        let node = NodeSpec::sparse_apply_ftrl(&[10, 2, 3], 4, FTRL);
        let kernel = init(&node).unwrap();

        assert_eq!(kernel.first_dim(), 10);
        assert_eq!(kernel.outer_dim(), 6);
        assert_eq!(kernel.indices_size(), 4);
        assert_eq!(
            kernel.workspace_sizes(),
            WorkspaceSizes {
                values: 24,
                indices: 4
            }
        );
    }

    #[test]
    fn rank_one_var_has_unit_rows() {
        let node = NodeSpec::sparse_apply_ftrl(&[7], 3, FTRL);
        let kernel = init(&node).unwrap();

        assert_eq!(kernel.outer_dim(), 1);
    }

    #[test]
    fn rejects_mismatched_slots() {
        let mut node = NodeSpec::sparse_apply_ftrl(&[4, 2], 3, FTRL);
        node.inputs[1] = vec![4, 3];
        assert!(matches!(
            init(&node),
            Err(KernelErr::ShapeMismatch { b: "accum", .. })
        ));

        let mut node = NodeSpec::sparse_apply_ftrl(&[4, 2], 3, FTRL);
        node.inputs[2] = vec![5, 2];
        assert!(matches!(
            init(&node),
            Err(KernelErr::ShapeMismatch { b: "linear", .. })
        ));
    }

    #[test]
    fn rejects_zero_rank_var() {
        let mut node = NodeSpec::sparse_apply_ftrl(&[], 3, FTRL);
        node.inputs[3] = vec![3];

        assert!(matches!(
            init(&node),
            Err(KernelErr::ZeroRank { operand: "var" })
        ));
    }

    #[test]
    fn rejects_grad_trailing_dims() {
        let mut node = NodeSpec::sparse_apply_ftrl(&[4, 2, 5], 3, FTRL);
        node.inputs[3] = vec![3, 2, 6];
        assert!(matches!(
            init(&node),
            Err(KernelErr::DimMismatch {
                dim: 2,
                var: 5,
                grad: 6
            })
        ));

        node.inputs[3] = vec![3, 10];
        assert!(matches!(
            init(&node),
            Err(KernelErr::InvalidRank {
                operand: "grad",
                ..
            })
        ));
    }

    #[test]
    fn rejects_indices_layout() {
        let mut node = NodeSpec::sparse_apply_ftrl(&[4, 2], 3, FTRL);
        node.inputs[4] = vec![3, 1];
        assert!(matches!(
            init(&node),
            Err(KernelErr::InvalidRank {
                operand: "indices",
                got: 2,
                ..
            })
        ));

        node.inputs[4] = vec![2];
        assert!(matches!(
            init(&node),
            Err(KernelErr::LeadingDimMismatch {
                grad: 3,
                indices: 2
            })
        ));
    }

    #[test]
    fn rejects_hyperparameters() {
        for (name, value) in [("lr", 0.), ("l1", -1.), ("l2", -1.), ("lr_power", 0.1)] {
            let mut node = NodeSpec::sparse_apply_ftrl(&[4, 2], 3, FTRL);
            node.attrs.insert(name.to_string(), value);

            match init(&node) {
                Err(KernelErr::InvalidAttr { name: got, .. }) => assert_eq!(got, name),
                other => panic!("{name} = {value} should be rejected, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_missing_pieces() {
        let mut node = NodeSpec::sparse_apply_ftrl(&[4, 2], 3, FTRL);
        node.attrs.remove("l2");
        assert!(matches!(
            init(&node),
            Err(KernelErr::MissingAttr { name: "l2" })
        ));

        node.inputs.truncate(4);
        assert!(matches!(
            init(&node),
            Err(KernelErr::MissingInput { index: 4 })
        ));
    }
}
