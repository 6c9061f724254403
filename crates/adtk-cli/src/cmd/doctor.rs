use std::io::Write;

use adtk_core::cache::Cache;
use adtk_core::config::Config;
use anyhow::Result;
use serde::Serialize;

use crate::output;

#[derive(Debug, Serialize)]
struct Check {
    name: String,
    ok: bool,
    detail: String,
}

#[derive(Debug, Serialize)]
struct DoctorOut {
    ok: bool,
    #[serde(rename = "cacheDir")]
    cache_dir: String,
    checks: Vec<Check>,
}

/// Report the resolved configuration and cache directory health without
/// running extraction.
pub fn run(json: bool, cache_dir: Option<&str>) -> Result<()> {
    let mut checks = Vec::new();

    let config = Config::default();
    checks.push(match config.validate() {
        Ok(()) => Check {
            name: "config".to_string(),
            ok: true,
            detail: format!(
                "hashing domain {:?}, max_depth {}, max_declarations {}",
                config.hashing.domain, config.limits.max_depth, config.limits.max_declarations
            ),
        },
        Err(err) => Check {
            name: "config".to_string(),
            ok: false,
            detail: err.to_string(),
        },
    });

    let resolved_cache_dir = cache_dir
        .map(str::to_string)
        .unwrap_or_else(|| ".afterdarktk/cache".to_string());
    let cache = Cache::new(resolved_cache_dir.clone());
    checks.push(match cache.init_layout() {
        Ok(()) => Check {
            name: "cache".to_string(),
            ok: true,
            detail: format!("writable at {}", cache.root().display()),
        },
        Err(err) => Check {
            name: "cache".to_string(),
            ok: false,
            detail: err.to_string(),
        },
    });

    let ok = checks.iter().all(|c| c.ok);
    let report = DoctorOut {
        ok,
        cache_dir: resolved_cache_dir,
        checks,
    };

    if json {
        output::print_json(&report)?;
    } else {
        let mut out = output::stdout();
        for check in &report.checks {
            let _ = writeln!(
                out,
                "[{}] {} — {}",
                if check.ok { "ok" } else { "FAIL" },
                check.name,
                check.detail
            );
        }
        let _ = writeln!(out, "cache dir: {}", report.cache_dir);
    }

    if ok {
        Ok(())
    } else {
        anyhow::bail!("doctor checks failed")
    }
}
