use std::io;

use rand::Rng;
use sparse_ftrl::EmbeddingStore;

use crate::{
    batch::Batch,
    callback::{Callback, CallbackManager, RunContext},
};

/// Trains an `EmbeddingStore` on randomly sampled sparse batches.
pub struct Trainer<'s, R: Rng> {
    store: &'s EmbeddingStore,
    batch: Batch,
    rng: R,
    epochs: usize,
    steps_per_epoch: usize,
}

impl<'s, R: Rng> Trainer<'s, R> {
    /// Creates a new `Trainer`.
    ///
    /// # Arguments
    /// * `store` - The store to train.
    /// * `batch` - The batch resampled before every step.
    /// * `rng` - The source of the batches.
    /// * `epochs` - The amount of epochs to run.
    /// * `steps_per_epoch` - The amount of batches applied per epoch.
    pub fn new(
        store: &'s EmbeddingStore,
        batch: Batch,
        rng: R,
        epochs: usize,
        steps_per_epoch: usize,
    ) -> Self {
        Self {
            store,
            batch,
            rng,
            epochs,
            steps_per_epoch,
        }
    }

    /// Runs the training loop, calling back into `callbacks` around every epoch and step.
    ///
    /// A callback may request a stop, the current epoch then ends right after the step that
    /// requested it and no further epoch begins.
    ///
    /// # Returns
    /// The amount of steps applied, or the first error raised by the store or a callback.
    pub fn train(&mut self, callbacks: &mut CallbackManager) -> io::Result<usize> {
        let mut ctx = RunContext::new(self.store, self.steps_per_epoch);
        callbacks.begin(&mut ctx)?;

        for _ in 0..self.epochs {
            ctx.begin_epoch();
            callbacks.epoch_begin(&mut ctx)?;

            for _ in 0..self.steps_per_epoch {
                ctx.begin_step();
                callbacks.step_begin(&mut ctx)?;

                self.batch.sample(&mut self.rng);
                self.store.apply(&self.batch.grad, &self.batch.indices)?;

                callbacks.step_end(&mut ctx)?;

                if ctx.stop_requested() {
                    break;
                }
            }

            callbacks.epoch_end(&mut ctx)?;

            if ctx.stop_requested() {
                break;
            }
        }

        callbacks.end(&mut ctx)?;
        Ok(ctx.step())
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, num::NonZeroUsize, rc::Rc};

    use rand::{SeedableRng, rngs::StdRng};
    use sparse_ftrl::{
        StoreBuilder,
        specs::{FtrlSpec, ParamGenSpec, StoreSpec},
    };

    use super::*;

    type Log = Rc<RefCell<Vec<String>>>;

    /// Records every hook it sees, stopping at `stop_at` if set.
    struct Recorder {
        log: Log,
        stop_at: Option<usize>,
    }

    impl Recorder {
        fn record(&self, hook: &str, ctx: &RunContext<'_>) {
            let entry = format!("{hook} {}:{}", ctx.epoch(), ctx.step());
            self.log.borrow_mut().push(entry);
        }
    }

    impl Callback for Recorder {
        fn begin(&mut self, ctx: &mut RunContext<'_>) -> io::Result<()> {
            self.record("begin", ctx);
            Ok(())
        }

        fn epoch_begin(&mut self, ctx: &mut RunContext<'_>) -> io::Result<()> {
            self.record("epoch_begin", ctx);
            Ok(())
        }

        fn epoch_end(&mut self, ctx: &mut RunContext<'_>) -> io::Result<()> {
            self.record("epoch_end", ctx);
            Ok(())
        }

        fn step_begin(&mut self, ctx: &mut RunContext<'_>) -> io::Result<()> {
            self.record("step_begin", ctx);
            Ok(())
        }

        fn step_end(&mut self, ctx: &mut RunContext<'_>) -> io::Result<()> {
            self.record("step_end", ctx);

            if self.stop_at == Some(ctx.step()) {
                ctx.request_stop();
            }

            Ok(())
        }

        fn end(&mut self, ctx: &mut RunContext<'_>) -> io::Result<()> {
            self.record("end", ctx);
            Ok(())
        }
    }

    /// Fails the run at its first step.
    struct Failing;

    impl Callback for Failing {
        fn step_begin(&mut self, _ctx: &mut RunContext<'_>) -> io::Result<()> {
            Err(io::Error::other("boom"))
        }
    }

    fn create_test_store() -> EmbeddingStore {
        let spec = StoreSpec {
            rows: 6,
            dims: vec![2],
            batch_size: NonZeroUsize::new(3).unwrap(),
            ftrl: FtrlSpec {
                lr: 0.1,
                l1: 0.01,
                l2: 0.,
                lr_power: -0.5,
            },
            weights: ParamGenSpec::Const { value: 0.1 },
            initial_accumulator: 0.1,
            seed: Some(9),
        };

        StoreBuilder::new().build(&spec).unwrap()
    }

    fn trainer(store: &EmbeddingStore, epochs: usize, steps: usize) -> Trainer<'_, StdRng> {
        let batch = Batch::new(3, 2, 6, 1.).unwrap();
        Trainer::new(store, batch, StdRng::seed_from_u64(4), epochs, steps)
    }

    fn recorded(log: &Log) -> Vec<String> {
        log.borrow().clone()
    }

    #[test]
    fn hooks_run_in_order() {
        let store = create_test_store();
        let log = Log::default();
        let mut callbacks = CallbackManager::new();
        callbacks.push(Recorder {
            log: log.clone(),
            stop_at: None,
        });

        let steps = trainer(&store, 2, 2).train(&mut callbacks).unwrap();

        assert_eq!(steps, 4);
        assert_eq!(
            recorded(&log),
            [
                "begin 0:0",
                "epoch_begin 1:0",
                "step_begin 1:1",
                "step_end 1:1",
                "step_begin 1:2",
                "step_end 1:2",
                "epoch_end 1:2",
                "epoch_begin 2:2",
                "step_begin 2:3",
                "step_end 2:3",
                "step_begin 2:4",
                "step_end 2:4",
                "epoch_end 2:4",
                "end 2:4",
            ]
        );
    }

    #[test]
    fn callbacks_run_in_push_order() {
        let store = create_test_store();
        let (first, second) = (Log::default(), Log::default());
        let shared = Log::default();
        let mut callbacks = CallbackManager::new();

        for log in [&first, &second] {
            callbacks.push(Recorder {
                log: log.clone(),
                stop_at: None,
            });
        }
        callbacks.push(Recorder {
            log: shared.clone(),
            stop_at: None,
        });
        callbacks.push(Recorder {
            log: shared.clone(),
            stop_at: None,
        });

        trainer(&store, 1, 1).train(&mut callbacks).unwrap();

        assert_eq!(recorded(&first), recorded(&second));
        assert_eq!(recorded(&shared)[..2], ["begin 0:0", "begin 0:0"]);
    }

    #[test]
    fn stop_request_ends_the_run_early() {
        let store = create_test_store();
        let log = Log::default();
        let mut callbacks = CallbackManager::new();
        callbacks.push(Recorder {
            log: log.clone(),
            stop_at: Some(3),
        });

        let before = store.snapshot();
        let steps = trainer(&store, 3, 2).train(&mut callbacks).unwrap();

        assert_eq!(steps, 3);
        assert_ne!(store.snapshot(), before);
        assert_eq!(
            recorded(&log)[7..],
            [
                "epoch_begin 2:2",
                "step_begin 2:3",
                "step_end 2:3",
                "epoch_end 2:3",
                "end 2:3",
            ]
        );
    }

    #[test]
    fn callback_error_aborts_before_applying() {
        let store = create_test_store();
        let before = store.snapshot();
        let mut callbacks = CallbackManager::new();
        callbacks.push(Failing);

        assert!(trainer(&store, 1, 5).train(&mut callbacks).is_err());
        assert_eq!(store.snapshot(), before);
    }
}
