//! `desilence` command line tool.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};

use desilence_media::FfmpegBackend;
use desilence_worker::logging::init_tracing;
use desilence_worker::{Args, Pipeline, PresetRegistry, RunConfig, RunSummary};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(args.verbose);

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received interrupt");
            let _ = cancel_tx.send(true);
        }
    });

    match run(args, cancel_rx).await {
        Ok(summary) => {
            report(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args, cancel_rx: watch::Receiver<bool>) -> anyhow::Result<RunSummary> {
    let mut registry = PresetRegistry::builtin()?;
    if let Some(path) = &args.config {
        registry
            .load_file(path)
            .with_context(|| format!("failed to load presets from {}", path.display()))?;
    }

    let preset = registry.get(&args.preset)?.clone();
    info!(preset = %args.preset, "Using preset");

    let config = RunConfig::from_args(&args, &preset)?;
    info!(
        input = %config.input.display(),
        output = %config.output.display(),
        parallel = config.parallel,
        "Starting desilence"
    );

    let backend = Arc::new(FfmpegBackend::new(preset));
    let pipeline = Pipeline::new(config, backend).with_cancel(cancel_rx);

    Ok(pipeline.run().await?)
}

fn report(summary: &RunSummary) {
    for (index, reason) in &summary.rejected {
        warn!(index = index, "Segment {} left out: {}", index, reason);
    }
    info!(
        kept = summary.kept,
        rejected = summary.rejected.len(),
        output = %summary.output.display(),
        "Removed {:.2} precious seconds of nothingness in {:.1} seconds",
        summary.silence_removed,
        summary.elapsed.as_secs_f64()
    );
}
