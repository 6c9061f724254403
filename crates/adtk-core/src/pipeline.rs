//! Pipeline Coordinator (§4.J).
//!
//! `extract()` is the crate's single public entry point. It is a
//! straight-line accumulator: load the program, enumerate entity-tagged
//! declarations, parse and validate annotations, resolve and lower each
//! symbol's type (via the cache when possible), and assemble the resulting
//! IR program. No step is parallelized across symbols, so diagnostic order
//! and cache-write order are both deterministic and reproducible.

use std::collections::BTreeMap;

use tracing::{info_span, instrument};

use crate::annotate::{parse::default_resolve_set, parse_annotations, validate_annotations, TagIndex};
use crate::cache::{self, Cache, CacheKind, CacheStats};
use crate::config::Config;
use crate::errors::{CoreError, Diagnostic, Diagnostics};
use crate::facade::{LoadOptions, ProgramFacade};
use crate::ir::{IrEntity, IrNode, IrProgram};
use crate::lower::lower_entity;
use crate::resolve::{resolve_type, ResolverContext};

/// Options for a single `extract` invocation. `use_cache` defaults to `true`.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub compiler_config_path: Option<String>,
    pub base_path: Option<String>,
    pub use_cache: bool,
    pub cache_dir: Option<String>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            compiler_config_path: None,
            base_path: None,
            use_cache: true,
            cache_dir: None,
        }
    }
}

/// The successful result of a run.
#[derive(Debug)]
pub struct ExtractOutput {
    pub ir: IrProgram,
    pub diagnostics: Diagnostics,
    pub cache_stats: Option<CacheStats>,
}

/// A cooperative cancellation signal, checked at the top of each
/// per-symbol iteration. The core imposes no timeouts of its own; callers
/// may wrap `extract` in their own.
pub trait CancellationToken {
    fn is_cancelled(&self) -> bool;
}

/// A token that never cancels, used when the caller has no cancellation needs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverCancel;

impl CancellationToken for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Run the pipeline against `facade` under `config`, with no cancellation support.
pub fn extract<F: ProgramFacade>(
    facade: &F,
    options: &ExtractOptions,
    config: &Config,
) -> Result<ExtractOutput, Diagnostics> {
    extract_cancellable(facade, options, config, &NeverCancel)
}

/// Run the pipeline with an explicit cancellation token (§4.J, S8).
#[instrument(skip(facade, options, config, cancel), fields(use_cache = options.use_cache))]
pub fn extract_cancellable<F: ProgramFacade, C: CancellationToken>(
    facade: &F,
    options: &ExtractOptions,
    config: &Config,
    cancel: &C,
) -> Result<ExtractOutput, Diagnostics> {
    let mut diagnostics = Diagnostics::new();

    if let Err(err) = config.validate() {
        diagnostics.push(err.to_diagnostic());
        return Err(diagnostics);
    }

    // 1. Load the program handle.
    let load_options = LoadOptions {
        compiler_config_path: options.compiler_config_path.clone(),
        base_path: options.base_path.clone(),
    };
    let handle = match facade.load_program(&load_options) {
        Ok(h) => h,
        Err(err) => {
            diagnostics.push(err.to_diagnostic());
            return Err(diagnostics);
        }
    };

    // 2. Initialize the cache layout; non-fatal on failure.
    let cache = options.use_cache.then(|| {
        let root = options
            .cache_dir
            .clone()
            .unwrap_or_else(|| ".afterdarktk/cache".to_string());
        Cache::new(root)
    });
    let mut cache_stats = options.use_cache.then(CacheStats::default);

    if let Some(cache) = &cache {
        if let Err(err) = cache.init_layout() {
            diagnostics.push(cache::as_non_fatal_diagnostic(&err));
        }
    }

    // 3. Enumerate declarations carrying the `entity` tag.
    let declarations = match facade.enumerate_declarations_with_tag(&handle, "entity") {
        Ok(d) => d,
        Err(err) => {
            diagnostics.push(err.to_diagnostic());
            return Err(diagnostics);
        }
    };

    let resolve_set = default_resolve_set();
    let mut tag_index: TagIndex = BTreeMap::new();
    let mut annotations_by_symbol = BTreeMap::new();
    let mut tags_by_symbol = BTreeMap::new();

    // 4-5. Project each declaration and parse its annotations.
    for decl in &declarations {
        let symbol_id = facade.symbol_id_of(decl);
        let raw_tags = facade.docblock_tags_of(decl);
        let annotations = parse_annotations(
            &symbol_id,
            &raw_tags,
            &resolve_set,
            &mut tag_index,
            &mut diagnostics,
        );
        tags_by_symbol.insert(symbol_id.clone(), raw_tags);
        annotations_by_symbol.insert(symbol_id, annotations);
    }

    let compiler_config_bytes = facade.compiler_config_bytes(&load_options);
    let ts_version = facade.compiler_version();

    let mut resolver_ctx = ResolverContext::new();
    let mut ir_nodes: BTreeMap<String, IrNode> = BTreeMap::new();
    let mut entities: BTreeMap<String, IrEntity> = BTreeMap::new();

    // 6. Per-symbol resolution, validation, lowering, hashing, caching.
    for decl in &declarations {
        if cancel.is_cancelled() {
            diagnostics.push(Diagnostic::info(
                "ADTK-IR-0003",
                "extraction cancelled before all symbols were processed",
            ));
            break;
        }

        let symbol_id = facade.symbol_id_of(decl);
        let span = info_span!("resolve_symbol", symbol_id = %symbol_id);
        let _enter = span.enter();

        let annotations = annotations_by_symbol
            .get(&symbol_id)
            .cloned()
            .unwrap_or_default();

        let fingerprint = if let Some(cache) = &cache {
            let content_bytes = facade.raw_symbol_bytes(decl);
            match cache::compute_fingerprint(
                &content_bytes,
                compiler_config_bytes.as_deref(),
                &ts_version,
                &config.normalization,
            ) {
                Ok(fp) => Some(fp),
                Err(err) => {
                    diagnostics.push(cache::as_non_fatal_diagnostic(&err));
                    None
                }
            }
        } else {
            None
        };

        // 6b. Try a cache read first.
        if let (Some(cache), Some(fingerprint)) = (&cache, &fingerprint) {
            match cache.read::<IrNode>(CacheKind::Ir, fingerprint, &config.normalization) {
                Ok(Some(node)) => {
                    if let Some(stats) = &mut cache_stats {
                        stats.hits += 1;
                    }
                    let entity = lower_entity_from_cached(&symbol_id, node.clone(), annotations, facade.span_of(decl));
                    ir_nodes.insert(symbol_id.clone(), node);
                    entities.insert(symbol_id.clone(), entity);
                    continue;
                }
                Ok(None) => {
                    if let Some(stats) = &mut cache_stats {
                        stats.misses += 1;
                    }
                }
                Err(err) => {
                    diagnostics.push(cache::as_non_fatal_diagnostic(&err));
                    if let Some(stats) = &mut cache_stats {
                        stats.misses += 1;
                    }
                }
            }
        }

        // 6c. Resolve, 6d. validate, 6e. lower.
        let host_type = match facade.resolve_declared_type(decl) {
            Ok(t) => t,
            Err(err) => {
                diagnostics.push(err.to_diagnostic());
                continue;
            }
        };

        let resolved = match resolve_type(
            &host_type,
            Some(&symbol_id),
            &mut resolver_ctx,
            &config.limits,
            &mut diagnostics,
        ) {
            Ok(r) => r,
            Err(_) => continue,
        };

        validate_annotations(&annotations, &resolved, &mut diagnostics);

        let entity = lower_entity(&symbol_id, &resolved, annotations, facade.span_of(decl));

        // 6f. Canonical-encode and hash, write the envelope.
        if let (Some(cache), Some(fingerprint)) = (&cache, &fingerprint) {
            match cache.write(CacheKind::Ir, fingerprint, &entity.node, &config.normalization) {
                Ok(()) => {
                    if let Some(stats) = &mut cache_stats {
                        stats.writes += 1;
                    }
                }
                Err(err) => diagnostics.push(cache::as_non_fatal_diagnostic(&err)),
            }
        }

        // 6g. Store.
        ir_nodes.insert(symbol_id.clone(), entity.node.clone());
        entities.insert(symbol_id, entity);
    }

    // 7. Assemble the IR program.
    let ir = IrProgram {
        entities,
        nodes: ir_nodes,
    };

    // 8. Escalate iff any accumulated diagnostic is error-category.
    if diagnostics.has_errors() {
        return Err(diagnostics);
    }

    Ok(ExtractOutput {
        ir,
        diagnostics,
        cache_stats,
    })
}

fn lower_entity_from_cached(
    symbol_id: &str,
    node: IrNode,
    annotations: Vec<crate::ir::Annotation>,
    span: Option<crate::errors::SourceSpan>,
) -> IrEntity {
    let name = annotations
        .iter()
        .find_map(|a| match a {
            crate::ir::Annotation::Entity { name: Some(n) } => Some(n.clone()),
            _ => None,
        })
        .unwrap_or_else(|| crate::ir::last_path_segment(&symbol_id.to_string()));
    IrEntity {
        symbol_id: symbol_id.to_string(),
        name,
        node,
        span,
        annotations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facade::fixture::FixtureFacade;

    fn write_fixture(dir: &std::path::Path, json: &str) -> String {
        let path = dir.join("fixture.json");
        std::fs::write(&path, json).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn user_fixture() -> &'static str {
        r#"{
          "tsVersion": "5.4.0",
          "declarations": [
            {
              "symbolId": "models/user.ts:User",
              "docblockTags": [
                {"name": "entity", "text": "User"},
                {"name": "version", "text": "1.0.0"}
              ],
              "type": {
                "kind": "object",
                "properties": [
                  {"name": "id", "type": {"kind": "stringPrimitive"}},
                  {"name": "email", "type": {"kind": "stringPrimitive"}},
                  {"name": "name", "type": {"kind": "stringPrimitive"}},
                  {"name": "age", "type": {"kind": "numberPrimitive"}, "optional": true},
                  {"name": "createdAt", "type": {"kind": "stringPrimitive"}},
                  {"name": "role", "type": {"kind": "union", "members": [
                    {"kind": "stringLiteral", "value": "admin"},
                    {"kind": "stringLiteral", "value": "user"},
                    {"kind": "stringLiteral", "value": "guest"}
                  ]}}
                ]
              }
            }
          ]
        }"#
    }

    #[test]
    fn s1_simple_entity() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), user_fixture());
        let facade = FixtureFacade::new();
        let options = ExtractOptions {
            base_path: Some(path),
            use_cache: false,
            ..Default::default()
        };
        let out = extract(&facade, &options, &Config::default()).unwrap();
        assert_eq!(out.ir.entities.len(), 1);
        let entity = out.ir.entities.get("models/user.ts:User").unwrap();
        assert_eq!(entity.name, "User");
        assert!(!out.diagnostics.has_errors());
    }

    #[test]
    fn s4_cache_hit_on_second_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), user_fixture());
        let cache_dir = dir.path().join("cache").to_string_lossy().into_owned();
        let facade = FixtureFacade::new();
        let options = ExtractOptions {
            base_path: Some(path),
            use_cache: true,
            cache_dir: Some(cache_dir),
            ..Default::default()
        };
        let cfg = Config::default();

        let first = extract(&facade, &options, &cfg).unwrap();
        let stats1 = first.cache_stats.unwrap();
        assert_eq!(stats1.hits, 0);
        assert_eq!(stats1.misses, 1);
        assert_eq!(stats1.writes, 1);

        let second = extract(&facade, &options, &cfg).unwrap();
        let stats2 = second.cache_stats.unwrap();
        assert_eq!(stats2.hits, 1);
        assert_eq!(stats2.misses, 0);
        assert_eq!(stats2.writes, 0);

        assert_eq!(
            serde_json::to_value(&first.ir).unwrap(),
            serde_json::to_value(&second.ir).unwrap()
        );
    }

    #[test]
    fn s9_corrupted_envelope_is_recomputed_not_a_crash() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), user_fixture());
        let cache_dir = dir.path().join("cache");
        let facade = FixtureFacade::new();
        let options = ExtractOptions {
            base_path: Some(path),
            use_cache: true,
            cache_dir: Some(cache_dir.to_string_lossy().into_owned()),
            ..Default::default()
        };
        let cfg = Config::default();

        let first = extract(&facade, &options, &cfg).unwrap();
        assert_eq!(first.cache_stats.unwrap().writes, 1);

        // Tamper with the single envelope's checksum on disk.
        let ir_dir = cache_dir.join("ir");
        let entry = std::fs::read_dir(&ir_dir)
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        let mut envelope: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&entry).unwrap()).unwrap();
        envelope["checksum"] = serde_json::json!("0".repeat(64));
        std::fs::write(&entry, serde_json::to_vec(&envelope).unwrap()).unwrap();

        let second = extract(&facade, &options, &cfg).unwrap();
        let stats2 = second.cache_stats.unwrap();
        assert_eq!(stats2.hits, 0);
        assert_eq!(stats2.misses, 1);
        assert_eq!(stats2.writes, 1);
        assert!(second.diagnostics.iter().any(|d| d.code == "ADTK-IR-5002"));
        assert_eq!(
            serde_json::to_value(&first.ir).unwrap(),
            serde_json::to_value(&second.ir).unwrap()
        );
    }

    #[test]
    fn s2_indexes() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"{
          "tsVersion": "5.4.0",
          "declarations": [{
            "symbolId": "models/post.ts:Post",
            "docblockTags": [
              {"name": "entity", "text": "Post"},
              {"name": "index", "text": "userId"},
              {"name": "index", "text": "userId,createdAt"}
            ],
            "type": {"kind": "object", "properties": [
              {"name": "userId", "type": {"kind": "stringPrimitive"}},
              {"name": "createdAt", "type": {"kind": "stringPrimitive"}}
            ]}
          }]
        }"#;
        let path = write_fixture(dir.path(), json);
        let facade = FixtureFacade::new();
        let options = ExtractOptions { base_path: Some(path), use_cache: false, ..Default::default() };
        let out = extract(&facade, &options, &Config::default()).unwrap();
        let entity = out.ir.entities.get("models/post.ts:Post").unwrap();
        let indexes: Vec<&crate::ir::Annotation> = entity
            .annotations
            .iter()
            .filter(|a| matches!(a, crate::ir::Annotation::Index { .. }))
            .collect();
        assert_eq!(indexes.len(), 2);
        assert!(indexes.iter().any(|a| matches!(
            a,
            crate::ir::Annotation::Index { fields, unique } if fields == &vec!["userId".to_string()] && !unique
        )));
        assert!(indexes.iter().any(|a| matches!(
            a,
            crate::ir::Annotation::Index { fields, unique }
                if fields == &vec!["userId".to_string(), "createdAt".to_string()] && !unique
        )));
    }

    #[test]
    fn s3_record_type() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"{
          "tsVersion": "5.4.0",
          "declarations": [{
            "symbolId": "models/post.ts:Post",
            "docblockTags": [{"name": "entity", "text": "Post"}],
            "type": {"kind": "object", "properties": [
              {"name": "metadata", "optional": true, "type": {
                "kind": "reference",
                "symbolId": "Record",
                "symbolName": "Record",
                "typeArgs": [{"kind": "stringPrimitive"}, {"kind": "stringPrimitive"}]
              }}
            ]}
          }]
        }"#;
        let path = write_fixture(dir.path(), json);
        let facade = FixtureFacade::new();
        let options = ExtractOptions { base_path: Some(path), use_cache: false, ..Default::default() };
        let out = extract(&facade, &options, &Config::default()).unwrap();
        let entity = out.ir.entities.get("models/post.ts:Post").unwrap();
        let crate::ir::IrNode::Object { properties, .. } = &entity.node else {
            panic!("expected object node");
        };
        let metadata = properties.iter().find(|p| p.name == "metadata").unwrap();
        assert!(metadata.optional);
        let crate::ir::IrNode::Object { properties: inner_props, index_signature, .. } = &metadata.type_ else {
            panic!("expected record shape");
        };
        assert!(inner_props.is_empty());
        assert!(index_signature.is_some());
    }

    #[test]
    fn s5_heterogeneous_union_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"{
          "tsVersion": "5.4.0",
          "declarations": [{
            "symbolId": "X",
            "docblockTags": [{"name": "entity", "text": "X"}],
            "type": {"kind": "union", "members": [
              {"kind": "object", "properties": [{"name": "a", "type": {"kind": "stringPrimitive"}}]},
              {"kind": "stringPrimitive"}
            ]}
          }]
        }"#;
        let path = write_fixture(dir.path(), json);
        let facade = FixtureFacade::new();
        let options = ExtractOptions { base_path: Some(path), use_cache: false, ..Default::default() };
        let err = extract(&facade, &options, &Config::default()).unwrap_err();
        assert!(err.iter().any(|d| d.code == "ADTK-IR-2002"));
    }

    #[test]
    fn s6_intersection_conflict_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"{
          "tsVersion": "5.4.0",
          "declarations": [{
            "symbolId": "C",
            "docblockTags": [{"name": "entity", "text": "C"}],
            "type": {"kind": "intersection", "members": [
              {"kind": "object", "properties": [{"name": "value", "type": {"kind": "stringPrimitive"}}]},
              {"kind": "object", "properties": [{"name": "value", "type": {"kind": "numberPrimitive"}}]}
            ]}
          }]
        }"#;
        let path = write_fixture(dir.path(), json);
        let facade = FixtureFacade::new();
        let options = ExtractOptions { base_path: Some(path), use_cache: false, ..Default::default() };
        let err = extract(&facade, &options, &Config::default()).unwrap_err();
        assert!(err.iter().any(|d| d.code == "ADTK-IR-2003"));
    }

    struct CancelAfter(std::cell::Cell<usize>, usize);
    impl CancellationToken for CancelAfter {
        fn is_cancelled(&self) -> bool {
            let n = self.0.get();
            self.0.set(n + 1);
            n >= self.1
        }
    }

    #[test]
    fn s8_cancellation_stops_early_with_info_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"{
          "tsVersion": "5.4.0",
          "declarations": [
            {"symbolId": "A", "docblockTags": [{"name": "entity", "text": "A"}], "type": {"kind": "stringPrimitive"}},
            {"symbolId": "B", "docblockTags": [{"name": "entity", "text": "B"}], "type": {"kind": "stringPrimitive"}},
            {"symbolId": "C", "docblockTags": [{"name": "entity", "text": "C"}], "type": {"kind": "stringPrimitive"}}
          ]
        }"#;
        let path = write_fixture(dir.path(), json);
        let facade = FixtureFacade::new();
        let options = ExtractOptions { base_path: Some(path), use_cache: false, ..Default::default() };
        let cancel = CancelAfter(std::cell::Cell::new(0), 2);
        let out = extract_cancellable(&facade, &options, &Config::default(), &cancel).unwrap();
        assert!(out.ir.entities.len() < 3);
        assert!(out.diagnostics.iter().any(|d| d.code == "ADTK-IR-0003"));
    }
}
