use std::io;

use sparse_ftrl::EmbeddingStore;

/// The state of a training run, as seen by its callbacks.
pub struct RunContext<'a> {
    store: &'a EmbeddingStore,
    epoch: usize,
    step: usize,
    steps_per_epoch: usize,
    stop_requested: bool,
}

impl<'a> RunContext<'a> {
    /// Creates a new `RunContext` for a run that hasn't started yet.
    ///
    /// # Arguments
    /// * `store` - The store being trained.
    /// * `steps_per_epoch` - The amount of batches applied per epoch.
    pub fn new(store: &'a EmbeddingStore, steps_per_epoch: usize) -> Self {
        Self {
            store,
            epoch: 0,
            step: 0,
            steps_per_epoch,
            stop_requested: false,
        }
    }

    pub fn store(&self) -> &'a EmbeddingStore {
        self.store
    }

    /// The current epoch, counting from 1. Zero before the first epoch begins.
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// The amount of steps begun so far, across every epoch.
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn steps_per_epoch(&self) -> usize {
        self.steps_per_epoch
    }

    /// Asks the training loop to stop once the current step ends.
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    pub fn begin_epoch(&mut self) {
        self.epoch += 1;
    }

    pub fn begin_step(&mut self) {
        self.step += 1;
    }
}

/// Hooks into the training loop. Every hook does nothing by default.
///
/// An error returned by any hook aborts the run.
pub trait Callback {
    /// Called once before the first epoch.
    fn begin(&mut self, _ctx: &mut RunContext<'_>) -> io::Result<()> {
        Ok(())
    }

    fn epoch_begin(&mut self, _ctx: &mut RunContext<'_>) -> io::Result<()> {
        Ok(())
    }

    /// Called after the last step of an epoch, also when the epoch was cut short.
    fn epoch_end(&mut self, _ctx: &mut RunContext<'_>) -> io::Result<()> {
        Ok(())
    }

    /// Called before the step's batch is applied.
    fn step_begin(&mut self, _ctx: &mut RunContext<'_>) -> io::Result<()> {
        Ok(())
    }

    /// Called after the step's batch is applied.
    fn step_end(&mut self, _ctx: &mut RunContext<'_>) -> io::Result<()> {
        Ok(())
    }

    /// Called once after training, whether it ran to completion or stopped early.
    fn end(&mut self, _ctx: &mut RunContext<'_>) -> io::Result<()> {
        Ok(())
    }
}

/// Runs a list of callbacks in the order they were added.
#[derive(Default)]
pub struct CallbackManager {
    callbacks: Vec<Box<dyn Callback>>,
}

impl CallbackManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<C: Callback + 'static>(&mut self, callback: C) {
        self.callbacks.push(Box::new(callback));
    }
}

impl Callback for CallbackManager {
    fn begin(&mut self, ctx: &mut RunContext<'_>) -> io::Result<()> {
        self.callbacks.iter_mut().try_for_each(|cb| cb.begin(ctx))
    }

    fn epoch_begin(&mut self, ctx: &mut RunContext<'_>) -> io::Result<()> {
        self.callbacks.iter_mut().try_for_each(|cb| cb.epoch_begin(ctx))
    }

    fn epoch_end(&mut self, ctx: &mut RunContext<'_>) -> io::Result<()> {
        self.callbacks.iter_mut().try_for_each(|cb| cb.epoch_end(ctx))
    }

    fn step_begin(&mut self, ctx: &mut RunContext<'_>) -> io::Result<()> {
        self.callbacks.iter_mut().try_for_each(|cb| cb.step_begin(ctx))
    }

    fn step_end(&mut self, ctx: &mut RunContext<'_>) -> io::Result<()> {
        self.callbacks.iter_mut().try_for_each(|cb| cb.step_end(ctx))
    }

    fn end(&mut self, ctx: &mut RunContext<'_>) -> io::Result<()> {
        self.callbacks.iter_mut().try_for_each(|cb| cb.end(ctx))
    }
}
