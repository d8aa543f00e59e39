use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::{KernelErr, Result},
    specs::FtrlSpec,
};

/// The host engine's view of a kernel node, the shapes of its inputs and its scalar attributes.
pub trait KernelNode {
    /// Returns the inferred shape of the `index`-th input.
    ///
    /// # Returns
    /// A `MissingInput` error if the node has no such input.
    fn input_shape(&self, index: usize) -> Result<&[usize]>;

    /// Returns the value of a scalar attribute.
    ///
    /// # Returns
    /// A `MissingAttr` error if the node doesn't carry the attribute.
    fn attr(&self, name: &'static str) -> Result<f32>;
}

/// A plain description of a kernel node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub inputs: Vec<Vec<usize>>,
    pub attrs: BTreeMap<String, f32>,
}

impl NodeSpec {
    /// Describes a sparse ftrl node updating a `var_shape` table with `batch` gradient rows.
    ///
    /// # Arguments
    /// * `var_shape` - The shape of `var`, `accum` and `linear`.
    /// * `batch` - The amount of indices per launch.
    /// * `ftrl` - The optimizer hyperparameters.
    pub fn sparse_apply_ftrl(var_shape: &[usize], batch: usize, ftrl: FtrlSpec) -> Self {
        let mut grad_shape = var_shape.to_vec();

        match grad_shape.first_mut() {
            Some(first) => *first = batch,
            None => grad_shape.push(batch),
        }

        let attrs = [
            ("lr", ftrl.lr),
            ("l1", ftrl.l1),
            ("l2", ftrl.l2),
            ("lr_power", ftrl.lr_power),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();

        Self {
            inputs: vec![
                var_shape.to_vec(),
                var_shape.to_vec(),
                var_shape.to_vec(),
                grad_shape,
                vec![batch],
            ],
            attrs,
        }
    }
}

impl KernelNode for NodeSpec {
    fn input_shape(&self, index: usize) -> Result<&[usize]> {
        self.inputs
            .get(index)
            .map(Vec::as_slice)
            .ok_or(KernelErr::MissingInput { index })
    }

    fn attr(&self, name: &'static str) -> Result<f32> {
        self.attrs
            .get(name)
            .copied()
            .ok_or(KernelErr::MissingAttr { name })
    }
}
