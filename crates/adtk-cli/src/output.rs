use std::io::Write;

use serde::Serialize;
use termcolor::{ColorChoice, StandardStream};

/// Print a value as pretty-printed JSON on stdout, matching the pipeline's
/// own wire format byte-for-byte (no CLI-side re-shaping of field names).
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    println!("{s}");
    Ok(())
}

pub fn eprintln_line(msg: &str) {
    let _ = writeln!(std::io::stderr(), "{msg}");
}

pub fn stdout() -> StandardStream {
    StandardStream::stdout(ColorChoice::Auto)
}
