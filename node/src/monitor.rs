use std::{io, num::NonZeroUsize};

use log::info;
use sparse_ftrl::EmbeddingStore;

use crate::callback::{Callback, RunContext};

/// The fraction of weights the l1 term has driven to exactly zero.
///
/// # Arguments
/// * `store` - The store to inspect.
/// * `weights` - Scratch space, resized to the store's length.
pub fn zeroed_fraction(store: &EmbeddingStore, weights: &mut Vec<f32>) -> io::Result<f32> {
    weights.resize(store.len(), 0.);
    store.pull_weights(weights)?;

    if weights.is_empty() {
        return Ok(0.);
    }

    let zeroed = weights.iter().filter(|&&w| w == 0.).count();
    Ok(zeroed as f32 / weights.len() as f32)
}

/// Logs the fraction of zeroed weights every `every` steps.
#[derive(Debug)]
pub struct SparsityLogger {
    every: NonZeroUsize,
    weights: Vec<f32>,
}

impl SparsityLogger {
    pub fn new(every: NonZeroUsize) -> Self {
        Self {
            every,
            weights: Vec::new(),
        }
    }
}

impl Callback for SparsityLogger {
    fn begin(&mut self, ctx: &mut RunContext<'_>) -> io::Result<()> {
        info!(steps_per_epoch = ctx.steps_per_epoch(); "training started");
        Ok(())
    }

    fn step_end(&mut self, ctx: &mut RunContext<'_>) -> io::Result<()> {
        if ctx.step() % self.every.get() != 0 {
            return Ok(());
        }

        let zeroed = zeroed_fraction(ctx.store(), &mut self.weights)?;
        info!(epoch = ctx.epoch(), step = ctx.step(), zeroed = zeroed; "applied batch");
        Ok(())
    }

    fn end(&mut self, ctx: &mut RunContext<'_>) -> io::Result<()> {
        info!("done after {} steps", ctx.step());
        Ok(())
    }
}

/// Stops training once at least `target` of the weights are zero.
#[derive(Debug)]
pub struct SparsityStop {
    target: f32,
    weights: Vec<f32>,
}

impl SparsityStop {
    pub fn new(target: f32) -> Self {
        Self {
            target,
            weights: Vec::new(),
        }
    }
}

impl Callback for SparsityStop {
    fn step_end(&mut self, ctx: &mut RunContext<'_>) -> io::Result<()> {
        let zeroed = zeroed_fraction(ctx.store(), &mut self.weights)?;

        if zeroed >= self.target {
            info!(step = ctx.step(), zeroed = zeroed; "sparsity target reached, stopping");
            ctx.request_stop();
        }

        Ok(())
    }
}
