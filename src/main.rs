use std::io;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use quatbench::{estimate_clock_mhz, logging, run, write_reports, Args, BenchConfig};
use tracing::info;

fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let args = Args::parse();
    let config = BenchConfig::try_from(args).context("invalid benchmark configuration")?;
    info!(
        q = config.exponent,
        n = config.len,
        workers = config.workers,
        seed = config.seed,
        "starting benchmark"
    );

    if config.clock_rate {
        let mhz = estimate_clock_mhz(Duration::from_millis(500));
        info!("cycle counter rate: {mhz:.1} MHz");
    }

    let reports = run(&config).context("benchmark run failed")?;

    let stdout = io::stdout();
    write_reports(&reports, config.run_id, config.header, &mut stdout.lock())
        .context("failed to write results")?;
    Ok(())
}
