use log::info;
use rand::{SeedableRng, rngs::StdRng};

use super::EmbeddingStore;
use crate::{
    error::{KernelErr, Result},
    initialization::{ConstParamGen, ParamGen, RandParamGen},
    kernel::{NodeSpec, SparseApplyFtrlKernel},
    specs::{DistributionSpec, ParamGenSpec, StoreSpec},
    table::{FtrlSlots, Table},
};

/// Resolves a distribution spec into a concrete `RandParamGen` and hands it to `callback`,
/// avoiding boxing the parameter generator.
///
/// # Arguments
/// * `rng` - A random number generator.
/// * `dist_spec` - The distribution to draw from.
/// * `limit` - The limit of parameters that the `RandParamGen` can generate.
/// * `callback` - The closure to call passing in the created param gen.
macro_rules! with_distribution {
    ($rng:expr, $dist_spec:expr, $limit:expr, $callback:expr) => {
        match $dist_spec {
            DistributionSpec::Uniform { low, high } => {
                let param_gen = RandParamGen::uniform($rng, $limit, low, high)?;
                ($callback)(param_gen)
            }
            DistributionSpec::UniformInclusive { low, high } => {
                let param_gen = RandParamGen::uniform_inclusive($rng, $limit, low, high)?;
                ($callback)(param_gen)
            }
            DistributionSpec::Normal { mean, std_dev } => {
                let param_gen = RandParamGen::normal($rng, $limit, mean, std_dev)?;
                ($callback)(param_gen)
            }
        }
    };
}

/// Builds `EmbeddingStore`s out of their `StoreSpec`.
#[derive(Debug, Default)]
pub struct StoreBuilder;

impl StoreBuilder {
    /// Creates a new `StoreBuilder`.
    pub fn new() -> Self {
        Self
    }

    /// Builds a new `EmbeddingStore` following a spec.
    ///
    /// # Arguments
    /// * `spec` - The table shape, hyperparameters and initial weights.
    ///
    /// # Returns
    /// A new store, or a configuration error if the table shape, the hyperparameters or
    /// the weight distribution are invalid.
    pub fn build(&self, spec: &StoreSpec) -> Result<EmbeddingStore> {
        if !(spec.initial_accumulator >= 0.) {
            return Err(KernelErr::InvalidAttr {
                name: "initial_accumulator",
                value: spec.initial_accumulator,
                constraint: "non-negative",
            });
        }

        let var_shape = spec.var_shape();
        let node = NodeSpec::sparse_apply_ftrl(&var_shape, spec.batch_size.get(), spec.ftrl);
        let kernel = SparseApplyFtrlKernel::init(&node)?;
        let var = self.resolve_weights(spec, kernel.first_dim(), kernel.outer_dim())?;

        info!(
            rows = kernel.first_dim(),
            cols = kernel.outer_dim(),
            batch_size = kernel.indices_size();
            "embedding store built"
        );

        EmbeddingStore::new(kernel, FtrlSlots::new(var, spec.initial_accumulator))
    }

    /// Generates a random number generator given (or not) a seed.
    fn generate_rng(&self, seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    /// Resolves the `ParamGen` for the initial weights and samples the whole table with it.
    fn resolve_weights(&self, spec: &StoreSpec, rows: usize, cols: usize) -> Result<Table> {
        let limit = rows * cols;

        match spec.weights {
            ParamGenSpec::Const { value } => {
                self.fill_table(ConstParamGen::new(value, limit), rows, cols)
            }
            ParamGenSpec::Rand { distribution } => {
                let rng = self.generate_rng(spec.seed);
                with_distribution!(rng, distribution, limit, |param_gen| {
                    self.fill_table(param_gen, rows, cols)
                })
            }
        }
    }

    fn fill_table<P>(&self, mut param_gen: P, rows: usize, cols: usize) -> Result<Table>
    where
        P: ParamGen,
    {
        let mut table = Table::filled(rows, cols, 0.);
        let written = param_gen.fill(table.as_mut_slice());

        if written != rows * cols {
            return Err(KernelErr::SizeMismatch {
                operand: "initial weights",
                got: written,
                expected: rows * cols,
            });
        }

        Ok(table)
    }
}
