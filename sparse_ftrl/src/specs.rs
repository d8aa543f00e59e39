use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// The specification for the `Ftrl` optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FtrlSpec {
    pub lr: f32,
    #[serde(default)]
    pub l1: f32,
    #[serde(default)]
    pub l2: f32,
    #[serde(default = "default_lr_power")]
    pub lr_power: f32,
}

fn default_lr_power() -> f32 {
    -0.5
}

/// The specification for the `Distribution` trait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionSpec {
    Uniform { low: f32, high: f32 },
    UniformInclusive { low: f32, high: f32 },
    Normal { mean: f32, std_dev: f32 },
}

/// The specification for the `ParamGen` trait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamGenSpec {
    Const { value: f32 },
    Rand { distribution: DistributionSpec },
}

/// The specification for the `EmbeddingStore` struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSpec {
    pub rows: usize,
    pub dims: Vec<usize>,
    pub batch_size: NonZeroUsize,
    pub ftrl: FtrlSpec,
    pub weights: ParamGenSpec,
    #[serde(default = "default_initial_accumulator")]
    pub initial_accumulator: f32,
    pub seed: Option<u64>,
}

fn default_initial_accumulator() -> f32 {
    0.1
}

impl StoreSpec {
    /// The full shape of the embedding table, `rows` followed by `dims`.
    pub fn var_shape(&self) -> Vec<usize> {
        let mut shape = Vec::with_capacity(self.dims.len() + 1);
        shape.push(self.rows);
        shape.extend_from_slice(&self.dims);
        shape
    }
}
