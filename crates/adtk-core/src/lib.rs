//! adtk-core
//!
//! Deterministic, content-addressed extraction of an Intermediate
//! Representation (IR) from schema-bearing type declarations: structural
//! type resolution, docblock annotation parsing and validation, IR lowering,
//! canonical encoding, content hashing, and a fingerprint-keyed disk cache.
//!
//! The crate's single public entry point is [`pipeline::extract`]. Everything
//! else here is the machinery that makes `extract` deterministic: identical
//! inputs must produce byte-identical outputs and identical hashes, across
//! platforms and runs.
//!
//! This crate performs no host-compiler parsing of its own — it consumes a
//! narrow [`facade::ProgramFacade`] capability interface (§4.D) that a real
//! embedder implements against their own compiler. A [`facade::fixture`]
//! implementation ships here so the pipeline, CLI, and test suite are
//! runnable standalone.

pub mod annotate;
pub mod cache;
pub mod canonical;
pub mod config;
pub mod determinism;
pub mod errors;
pub mod facade;
pub mod hash;
pub mod ir;
pub mod lower;
pub mod pipeline;
pub mod resolve;

pub use crate::errors::{CoreError, CoreResult};
pub use crate::pipeline::{extract, extract_cancellable, ExtractOptions, ExtractOutput};

/// Convenience re-exports for downstream crates (the CLI, and any embedder).
pub mod prelude {
    pub use crate::annotate::{parse_annotations, validate_annotations, TagIndex};
    pub use crate::cache::{Cache, CacheKind, CacheStats};
    pub use crate::canonical::{encode, encode_value, CanonicalInput};
    pub use crate::config::Config;
    pub use crate::errors::{Category, Diagnostic, Diagnostics, SourceSpan};
    pub use crate::facade::{fixture::FixtureFacade, LoadOptions, ProgramFacade};
    pub use crate::hash::{hash, hash_value, hash_with_domain};
    pub use crate::ir::{IrEntity, IrNode, IrProgram, ResolvedType, SymbolId};
    pub use crate::pipeline::{extract, ExtractOptions, ExtractOutput};
    pub use crate::{CoreError, CoreResult};
}
