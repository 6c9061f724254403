//! Primitives & Diagnostics.
//!
//! Every fallible operation in this crate returns a `CoreResult<T>`, which is
//! either `Ok(T)` or `Err(Diagnostics)` — never a panic. A `Diagnostic` is the
//! unit of reporting shared by every component: the resolver, the annotation
//! parser/validator, the canonical encoder, the cache layer, and the pipeline
//! coordinator all emit the same shape so a CLI or API surface can render them
//! uniformly.
//!
//! Diagnostic codes are stable, dash-separated strings of the form
//! `ADTK-IR-<number>`. They are produced from a small fixed table so the code
//! string and the `Display` text of the corresponding [`CoreError`] variant
//! never drift apart.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A 1-based source location, purely diagnostic: it never participates in
/// canonical encoding or hashing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSpan {
    pub file: String,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Info,
    Warning,
    Error,
}

/// A single diagnostic record.
///
/// Serializes bit-exact as `{code, category, message, helpUrl?, location?, context?}`
/// per the wire format documented for downstream tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: String,
    pub category: Category,
    pub message: String,
    #[serde(rename = "helpUrl", skip_serializing_if = "Option::is_none")]
    pub help_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceSpan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<BTreeMap<String, String>>,
}

const DOCS_BASE: &str = "https://docs.afterdarktk.dev/diagnostics";

impl Diagnostic {
    pub fn new(code: impl Into<String>, category: Category, message: impl Into<String>) -> Self {
        let code = code.into();
        let help_url = Some(format!("{DOCS_BASE}/{}", docs_slug(&code)));
        Self {
            code,
            category,
            message: message.into(),
            help_url,
            location: None,
            context: None,
        }
    }

    pub fn info(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, Category::Info, message)
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, Category::Warning, message)
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, Category::Error, message)
    }

    pub fn with_location(mut self, location: SourceSpan) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.category == Category::Error
    }
}

fn docs_slug(code: &str) -> String {
    code.to_ascii_lowercase()
}

/// Interpolate `%s` placeholders in `template` with `args`, positionally.
/// A missing argument renders as the literal string `<missing>` rather than
/// failing — diagnostic formatting must never itself be fallible.
pub fn format_template(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut arg_idx = 0usize;
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '%' && chars.peek() == Some(&'s') {
            chars.next();
            out.push_str(args.get(arg_idx).copied().unwrap_or("<missing>"));
            arg_idx += 1;
        } else {
            out.push(c);
        }
    }
    out
}

/// A non-empty collection of diagnostics returned on pipeline/component failure.
///
/// `Diagnostics` is also used to accumulate non-fatal (warning/info) entries
/// throughout a run even when the overall result is `Ok`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics(pub Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, d: Diagnostic) {
        self.0.push(d);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "[{:?}] {}: {}", d.category, d.code, d.message)?;
        }
        Ok(())
    }
}

/// The typed error taxonomy backing every diagnostic code. One variant per
/// category entry in the error-handling design.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CoreError {
    #[error("type could not be resolved: {0}")]
    TypeUnresolved(String),

    #[error("facade failed to load program: {0}")]
    FacadeLoad(String),

    #[error("unsupported type: {0}")]
    TypeUnsupported(String),

    #[error("heterogeneous union: {0}")]
    UnionHeterogeneous(String),

    #[error("intersection conflict: {0}")]
    IntersectionConflict(String),

    #[error("unknown docblock tag: {0}")]
    TagUnknown(String),

    #[error("malformed docblock tag: {0}")]
    TagMalformed(String),

    #[error("docblock tag missing required payload: {0}")]
    TagPayloadMissing(String),

    #[error("docblock tag payload invalid: {0}")]
    TagPayloadInvalid(String),

    #[error("duplicate docblock tag: {0}")]
    TagDuplicate(String),

    #[error("annotation incompatible with resolved type: {0}")]
    TagIncompatibleType(String),

    #[error("annotation references unknown field: {0}")]
    TagFieldNotFound(String),

    #[error("canonical encoder rejected unsupported value: {0}")]
    CanonicalUnsupportedType(String),

    #[error("canonical encoder rejected non-finite number: {0}")]
    CanonicalUnstableNumber(String),

    #[error("canonical encoder rejected bigint under current policy: {0}")]
    CanonicalBigIntPolicy(String),

    #[error("cache I/O error: {0}")]
    CacheIoError(String),

    #[error("cache envelope corrupted: {0}")]
    CacheCorrupted(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl CoreError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant(message.into())
    }

    /// The stable diagnostic code for this error variant's taxonomy entry.
    pub fn code(&self) -> &'static str {
        match self {
            Self::TypeUnresolved(_) => "ADTK-IR-1001",
            Self::FacadeLoad(_) => "ADTK-IR-1002",
            Self::TypeUnsupported(_) => "ADTK-IR-2001",
            Self::UnionHeterogeneous(_) => "ADTK-IR-2002",
            Self::IntersectionConflict(_) => "ADTK-IR-2003",
            Self::TagUnknown(_) => "ADTK-IR-3001",
            Self::TagMalformed(_) => "ADTK-IR-3002",
            Self::TagPayloadMissing(_) => "ADTK-IR-3003",
            Self::TagPayloadInvalid(_) => "ADTK-IR-3004",
            Self::TagDuplicate(_) => "ADTK-IR-3005",
            Self::TagIncompatibleType(_) => "ADTK-IR-3006",
            Self::TagFieldNotFound(_) => "ADTK-IR-3007",
            Self::CanonicalUnsupportedType(_) => "ADTK-IR-4001",
            Self::CanonicalUnstableNumber(_) => "ADTK-IR-4002",
            Self::CanonicalBigIntPolicy(_) => "ADTK-IR-4003",
            Self::CacheIoError(_) => "ADTK-IR-5001",
            Self::CacheCorrupted(_) => "ADTK-IR-5002",
            Self::InvalidArgument(_) => "ADTK-IR-0001",
            Self::Invariant(_) => "ADTK-IR-0002",
        }
    }

    /// The default category for this error's taxonomy entry.
    pub fn category(&self) -> Category {
        match self {
            Self::TagUnknown(_) | Self::TagDuplicate(_) => Category::Warning,
            _ => Category::Error,
        }
    }

    /// Render this error as a wire diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(self.code(), self.category(), self.to_string())
    }
}

/// The result type returned by every fallible core operation.
pub type CoreResult<T> = Result<T, CoreError>;
