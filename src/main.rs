use anyhow::Context;
use tradeauth::{Config, run};

fn main() -> anyhow::Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();

    if config.general.worker_threads > 0 {
        builder.worker_threads(config.general.worker_threads);
    }

    builder
        .build()
        .context("Failed to start async runtime")?
        .block_on(run(config))
}
