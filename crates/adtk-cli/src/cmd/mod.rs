use anyhow::Result;
use tracing::instrument;

use crate::args::{Cli, Command};

mod doctor;
mod extract;

#[instrument(skip(cli), fields(json = cli.json))]
pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Extract {
            fixture,
            cache_dir,
            no_cache,
        } => extract::run(cli.json, &fixture, cache_dir.as_deref(), no_cache),
        Command::Doctor { cache_dir } => doctor::run(cli.json, cache_dir.as_deref()),
    }
}
