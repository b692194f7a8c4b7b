//! Procrastinate CLI - renders the reference composition to a WAV file

mod composition;

use clap::Parser;
use procrastinate::prelude::*;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "procrastinate")]
#[command(about = "Render the sound of procrastination to a WAV file", long_about = None)]
struct Cli {
    /// Output WAV file path
    output: PathBuf,

    /// JSON configuration file (sample rate, stream capacity, seed)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for the random nodes, for reproducible renders
    #[arg(long)]
    seed: Option<u64>,

    /// Sample rate in Hz, overriding the configuration file
    #[arg(short, long)]
    sample_rate: Option<f64>,

    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Reject a render that stopped before the requested length.
fn ensure_complete(written: usize, requested: usize) -> Result<usize, Error> {
    if written < requested {
        return Err(Error::ShortRender { requested, written });
    }
    Ok(written)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    if let Some(rate) = cli.sample_rate {
        config.sample_rate = rate;
    }
    config.validate()?;

    let rack = Rack::new(config);
    let (stop, mut master) = composition::build(&rack)?;
    info!(nodes = rack.node_count(), "graph built");

    let samples = rack.config().ticks_in(composition::length());
    let written = render_to_file(&cli.output, &mut master, samples, rack.config());

    stop.stop();
    drop(master);
    // A node that failed to start explains a short render better than the
    // length check does.
    rack.join()?;
    let written = ensure_complete(written?, samples)?;

    info!(samples = written, path = %cli.output.display(), "done");
    Ok(())
}
