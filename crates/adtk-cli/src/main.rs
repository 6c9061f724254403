use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod args;
mod cmd;
mod output;

fn main() -> Result<()> {
    let cli = args::Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = cmd::dispatch(cli) {
        output::eprintln_line(&format!("error: {err:#}"));
        std::process::exit(1);
    }
    Ok(())
}

/// Install a `tracing-subscriber` fmt layer driven by `RUST_LOG`, falling
/// back to `info` (or `debug` under `--verbose`) when unset. The core crate
/// never installs a subscriber of its own; this is the one place in the
/// workspace permitted to own global logging state.
fn init_logging(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
