use std::io::Write;

use adtk_core::config::Config;
use adtk_core::facade::fixture::FixtureFacade;
use adtk_core::pipeline::{extract as run_extract, ExtractOptions};
use anyhow::{anyhow, Result};
use serde::Serialize;

use crate::output;

#[derive(Debug, Serialize)]
struct ExtractReport {
    ok: bool,
    ir: adtk_core::ir::IrProgram,
    diagnostics: adtk_core::errors::Diagnostics,
    #[serde(rename = "cacheStats")]
    cache_stats: Option<adtk_core::cache::CacheStats>,
}

pub fn run(
    json: bool,
    fixture: &std::path::Path,
    cache_dir: Option<&str>,
    no_cache: bool,
) -> Result<()> {
    let config = Config::default();
    let options = ExtractOptions {
        compiler_config_path: None,
        base_path: Some(fixture.to_string_lossy().into_owned()),
        use_cache: !no_cache,
        cache_dir: cache_dir.map(str::to_string),
    };
    let facade = FixtureFacade::new();

    match run_extract(&facade, &options, &config) {
        Ok(out) => {
            if json {
                output::print_json(&ExtractReport {
                    ok: true,
                    ir: out.ir,
                    diagnostics: out.diagnostics,
                    cache_stats: out.cache_stats,
                })?;
            } else {
                print_human(&out.diagnostics, out.cache_stats.as_ref());
                println!(
                    "extracted {} entit{} ({} node{})",
                    out.ir.entities.len(),
                    if out.ir.entities.len() == 1 { "y" } else { "ies" },
                    out.ir.nodes.len(),
                    if out.ir.nodes.len() == 1 { "" } else { "s" },
                );
            }
            Ok(())
        }
        Err(diagnostics) => {
            if json {
                output::print_json(&ExtractReport {
                    ok: false,
                    ir: adtk_core::ir::IrProgram::default(),
                    diagnostics: diagnostics.clone(),
                    cache_stats: None,
                })?;
            } else {
                print_human(&diagnostics, None);
            }
            Err(anyhow!(
                "extraction failed with {} error diagnostic(s)",
                diagnostics.0.iter().filter(|d| d.is_error()).count()
            ))
        }
    }
}

fn print_human(diagnostics: &adtk_core::errors::Diagnostics, cache_stats: Option<&adtk_core::cache::CacheStats>) {
    let mut out = output::stdout();
    for diag in &diagnostics.0 {
        let _ = writeln!(out, "[{:?}] {} {}", diag.category, diag.code, diag.message);
    }
    if let Some(stats) = cache_stats {
        let _ = writeln!(
            out,
            "cache: {} hit(s), {} miss(es), {} write(s)",
            stats.hits, stats.misses, stats.writes
        );
    }
}
