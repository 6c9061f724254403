use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "adtk", version, about = "afterdark-toolkit extraction pipeline driver")]
pub struct Cli {
    /// Emit JSON output on stdout instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Raise the default tracing verbosity from `info` to `debug`.
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the extraction pipeline against a fixture program file.
    Extract {
        /// Path to a fixture program JSON file (see `FixtureProgram`).
        fixture: PathBuf,

        /// Cache directory root. Defaults to `./.afterdarktk/cache`.
        #[arg(long)]
        cache_dir: Option<String>,

        /// Disable the fingerprint-keyed disk cache for this run.
        #[arg(long)]
        no_cache: bool,
    },

    /// Report resolved configuration and cache directory health without
    /// running extraction.
    Doctor {
        /// Cache directory root. Defaults to `./.afterdarktk/cache`.
        #[arg(long)]
        cache_dir: Option<String>,
    },
}
