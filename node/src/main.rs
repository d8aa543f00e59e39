mod batch;
mod callback;
mod monitor;
mod train;

use std::{
    env,
    fs::File,
    io::{self, BufReader},
    num::NonZeroUsize,
};

use log::info;
use rand::{SeedableRng, rngs::StdRng};
use serde::Deserialize;

use sparse_ftrl::{StoreBuilder, specs::StoreSpec};

use crate::{
    batch::Batch,
    callback::CallbackManager,
    monitor::{SparsityLogger, SparsityStop},
    train::Trainer,
};

const SPEC_VAR: &str = "FTRL_SPEC";

/// What the driver trains and for how long.
#[derive(Debug, Deserialize)]
struct DriverSpec {
    store: StoreSpec,
    #[serde(default = "default_epochs")]
    epochs: NonZeroUsize,
    steps: NonZeroUsize,
    #[serde(default = "default_grad_std_dev")]
    grad_std_dev: f32,
    #[serde(default = "default_log_every")]
    log_every: NonZeroUsize,
    /// Stops training once this fraction of the weights is zero.
    #[serde(default)]
    stop_at_zeroed: Option<f32>,
}

fn default_epochs() -> NonZeroUsize {
    NonZeroUsize::MIN
}

fn default_grad_std_dev() -> f32 {
    1.
}

fn default_log_every() -> NonZeroUsize {
    NonZeroUsize::MIN
}

fn main() -> io::Result<()> {
    env_logger::init();

    let path = env::args()
        .nth(1)
        .or_else(|| env::var(SPEC_VAR).ok())
        .ok_or_else(|| io::Error::other(format!("usage: node <spec.json>, or set {SPEC_VAR}")))?;

    let file = File::open(&path)?;
    let spec: DriverSpec = serde_json::from_reader(BufReader::new(file))?;
    info!("loaded spec from {path}");

    let store = StoreBuilder::new().build(&spec.store)?;
    let rng = match spec.store.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let batch = Batch::new(
        store.kernel().indices_size(),
        store.cols(),
        store.rows(),
        spec.grad_std_dev,
    )?;

    let mut callbacks = CallbackManager::new();
    callbacks.push(SparsityLogger::new(spec.log_every));

    if let Some(target) = spec.stop_at_zeroed {
        callbacks.push(SparsityStop::new(target));
    }

    let mut trainer = Trainer::new(&store, batch, rng, spec.epochs.get(), spec.steps.get());
    trainer.train(&mut callbacks)?;

    Ok(())
}
