//! Deterministic text normalization.
//!
//! Applied to raw docblock tag text before parsing, and to path strings
//! before they enter a source span, so identical logical input always
//! produces identical normalized output regardless of platform.

use crate::errors::{CoreError, CoreResult};

/// Collapse runs of whitespace to a single space and trim both ends.
/// Used on raw docblock tag payloads before grammar parsing.
pub fn collapse_whitespace(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_space = false;
    for c in input.trim().chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out
}

/// Normalize line endings to LF, strip a UTF-8 BOM, and trim trailing
/// whitespace per line, preserving a final newline only if one was present.
pub fn normalize_newlines(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }
    let mut s = input.to_string();
    if s.starts_with('\u{FEFF}') {
        s = s.trim_start_matches('\u{FEFF}').to_string();
    }
    s = s.replace("\r\n", "\n").replace('\r', "\n");
    let had_trailing_newline = s.ends_with('\n');
    let mut out = s
        .split('\n')
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n");
    if had_trailing_newline {
        out.push('\n');
    }
    out
}

/// Normalize a file path to forward-slash form for a source span: lexically
/// resolve `.`/`..` segments, then reject the result if it still climbs
/// above its root (a `..` prefix surviving lexical cleaning means the path
/// escaped).
pub fn normalize_path(path: &str) -> CoreResult<String> {
    use path_clean::PathClean;
    use std::path::{Path, PathBuf};

    let slash_form = path.replace('\\', "/");
    let cleaned: PathBuf = Path::new(&slash_form).clean();
    let cleaned = cleaned.to_string_lossy().replace('\\', "/");

    if cleaned == ".." || cleaned.starts_with("../") {
        return Err(CoreError::invalid_argument(format!(
            "path escapes its root: {path}"
        )));
    }
    Ok(cleaned)
}
