//! Data model shared by the resolver, annotation layer, and IR lowering:
//! symbol identifiers, source spans, resolved types, parsed annotations, and
//! the IR node/entity/program shapes that `extract()` ultimately returns.
//!
//! Both `ResolvedType` and `IrNode` are closed algebraic families. Cycles in
//! the underlying type graph are never expressed as literal pointer/Rc
//! cycles: every named referent is cut at the point of recursion and
//! re-emitted as `Ref { target }`, which is what keeps the whole IR a DAG
//! suitable for canonical encoding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::SourceSpan;

/// An opaque, stable identifier for a declaration, derived from its
/// fully-qualified path. Created at discovery, immutable thereafter, and
/// used as the sole primary key for every per-symbol map in a run.
pub type SymbolId = String;

/// A raw docblock tag as the facade hands it to the annotation parser:
/// `{name, text}` with `text` already whitespace-collapsed and trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTag {
    pub name: String,
    pub text: String,
}

/// Referential action for a foreign-key annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferentialAction {
    Cascade,
    Restrict,
    #[serde(rename = "set null")]
    SetNull,
    #[serde(rename = "no action")]
    NoAction,
}

impl ReferentialAction {
    /// Parse the case-insensitive aliases `setnull`/`set null` and
    /// `noaction`/`no action`. Any other value collapses to `NoAction`.
    pub fn coerce(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "cascade" => Self::Cascade,
            "restrict" => Self::Restrict,
            "setnull" | "set null" => Self::SetNull,
            "noaction" | "no action" => Self::NoAction,
            _ => Self::NoAction,
        }
    }
}

/// A scalar literal value carried by `@default`, `literal`, and `literalUnion`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LiteralValue {
    String(String),
    Number(String),
    Boolean(bool),
    BigInt(String),
}

impl LiteralValue {
    /// Stringified form used as the sort key for literal-union members.
    pub fn sort_key(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Number(n) => n.clone(),
            Self::Boolean(b) => b.to_string(),
            Self::BigInt(n) => n.clone(),
        }
    }
}

/// A single parsed docblock annotation. The complete, closed set of
/// recognized variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "camelCase")]
pub enum Annotation {
    Entity { name: Option<String> },
    Pk,
    Unique,
    Index { fields: Vec<String>, unique: bool },
    Fk {
        target: String,
        field: String,
        on_delete: Option<ReferentialAction>,
        on_update: Option<ReferentialAction>,
    },
    Default { value: String },
    RenameFrom { old_name: String, version: Option<String> },
    SqlType { sql_type: String },
    Decimal { precision: u32, scale: u32 },
    Check { expr: String },
    Version { semver: String },
    Min { n: f64 },
    Max { n: f64 },
    Int,
    MinLength { n: u64 },
    MaxLength { n: u64 },
    Pattern { regex: String },
    Format { name: String },
    Email,
    Uuid,
    Url,
    Description { text: String },
    Validator { name: String },
    Transform { name: String },
}

impl Annotation {
    /// The docblock tag name this variant was parsed from, used for
    /// diagnostics and for the `tagIndex`.
    pub fn tag_name(&self) -> &'static str {
        match self {
            Self::Entity { .. } => "entity",
            Self::Pk => "pk",
            Self::Unique => "unique",
            Self::Index { .. } => "index",
            Self::Fk { .. } => "fk",
            Self::Default { .. } => "default",
            Self::RenameFrom { .. } => "renameFrom",
            Self::SqlType { .. } => "sqlType",
            Self::Decimal { .. } => "decimal",
            Self::Check { .. } => "check",
            Self::Version { .. } => "version",
            Self::Min { .. } => "min",
            Self::Max { .. } => "max",
            Self::Int => "int",
            Self::MinLength { .. } => "minLength",
            Self::MaxLength { .. } => "maxLength",
            Self::Pattern { .. } => "pattern",
            Self::Format { .. } => "format",
            Self::Email => "email",
            Self::Uuid => "uuid",
            Self::Url => "url",
            Self::Description { .. } => "description",
            Self::Validator { .. } => "validator",
            Self::Transform { .. } => "transform",
        }
    }
}

/// A discriminant detected on a union of object members: a property name
/// present (as a literal) on every member, with pairwise-distinct values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discriminant {
    pub property_name: String,
    pub values: Vec<LiteralValue>,
}

/// A resolved, normalized structural type. Closed algebraic family; cycles
/// are represented exclusively via `Ref`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ResolvedType {
    Primitive { primitive_kind: PrimitiveKind },
    Literal { value: LiteralValue },
    LiteralUnion { members: Vec<LiteralValue> },
    Array { element: Box<ResolvedType> },
    Tuple { elements: Vec<ResolvedType> },
    Object {
        properties: Vec<ObjectProperty>,
        index_signature: Option<IndexSignature>,
    },
    Union {
        members: Vec<ResolvedType>,
        discriminant: Option<Discriminant>,
    },
    Ref { target: SymbolId },
    Unsupported {
        reason: String,
        original_text: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrimitiveKind {
    String,
    Number,
    Boolean,
    BigInt,
    Null,
    Undefined,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectProperty {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: ResolvedType,
    pub optional: bool,
    pub readonly: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IndexKeyKind {
    String,
    Number,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSignature {
    pub key_type: IndexKeyKind,
    pub value_type: Box<ResolvedType>,
}

impl ResolvedType {
    /// A total-order sort key used when sorting union members: `(kind rank,
    /// kind-specific key)`. Kind-specific key is the literal's stringified
    /// value for `Literal`, the target symbol id for `Ref`, and empty
    /// otherwise (other kinds keep their relative encounter order, which is
    /// already deterministic because member resolution is sequential).
    pub fn union_sort_key(&self) -> (u8, String) {
        match self {
            Self::Primitive { .. } => (0, String::new()),
            Self::Literal { value } => (1, value.sort_key()),
            Self::LiteralUnion { .. } => (2, String::new()),
            Self::Array { .. } => (3, String::new()),
            Self::Tuple { .. } => (4, String::new()),
            Self::Object { .. } => (5, String::new()),
            Self::Union { .. } => (6, String::new()),
            Self::Ref { target } => (7, target.clone()),
            Self::Unsupported { .. } => (8, String::new()),
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object { .. })
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, Self::Ref { .. })
    }

    pub fn is_null_primitive(&self) -> bool {
        matches!(
            self,
            Self::Primitive {
                primitive_kind: PrimitiveKind::Null
            }
        )
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Primitive { .. } | Self::Literal { .. } | Self::LiteralUnion { .. })
    }

    pub fn is_numeric_scalar(&self) -> bool {
        match self {
            Self::Primitive { primitive_kind } => {
                matches!(primitive_kind, PrimitiveKind::Number | PrimitiveKind::BigInt)
            }
            Self::Literal {
                value: LiteralValue::Number(_) | LiteralValue::BigInt(_),
            } => true,
            _ => false,
        }
    }

    pub fn is_string_like(&self) -> bool {
        match self {
            Self::Primitive {
                primitive_kind: PrimitiveKind::String,
            } => true,
            Self::Literal {
                value: LiteralValue::String(_),
            } => true,
            Self::LiteralUnion { members } => {
                members.iter().all(|m| matches!(m, LiteralValue::String(_)))
            }
            Self::Array { .. } => true,
            _ => false,
        }
    }
}

/// Per-property annotations attached during IR lowering; kept separate from
/// the resolved-type shape so the resolver stays annotation-agnostic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IrPropertyMeta {
    pub annotations: Vec<Annotation>,
}

/// Metadata attached only at an IR node's root (never on nested nodes, to
/// avoid annotation duplication through a recursively-mirrored tree).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrMetadata {
    pub symbol_id: SymbolId,
    pub span: Option<SourceSpan>,
    pub annotations: Vec<Annotation>,
}

/// The IR shape: the same variant set as `ResolvedType`, plus metadata at
/// the root and a per-property annotations list on object members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IrNode {
    Primitive {
        primitive_kind: PrimitiveKind,
        metadata: Option<IrMetadata>,
    },
    Literal {
        value: LiteralValue,
        metadata: Option<IrMetadata>,
    },
    LiteralUnion {
        members: Vec<LiteralValue>,
        metadata: Option<IrMetadata>,
    },
    Array {
        element: Box<IrNode>,
        metadata: Option<IrMetadata>,
    },
    Tuple {
        elements: Vec<IrNode>,
        metadata: Option<IrMetadata>,
    },
    Object {
        properties: Vec<IrObjectProperty>,
        index_signature: Option<IrIndexSignature>,
        metadata: Option<IrMetadata>,
    },
    Union {
        members: Vec<IrNode>,
        discriminant: Option<Discriminant>,
        metadata: Option<IrMetadata>,
    },
    Ref {
        target: SymbolId,
        metadata: Option<IrMetadata>,
    },
    Unsupported {
        reason: String,
        original_text: Option<String>,
        metadata: Option<IrMetadata>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrObjectProperty {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: IrNode,
    pub optional: bool,
    pub readonly: bool,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrIndexSignature {
    pub key_type: IndexKeyKind,
    pub value_type: Box<IrNode>,
}

/// One extracted entity: a named, annotated root IR node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrEntity {
    pub symbol_id: SymbolId,
    pub name: String,
    pub node: IrNode,
    pub span: Option<SourceSpan>,
    pub annotations: Vec<Annotation>,
}

/// The final artifact returned by `extract()`: entities and nodes keyed by
/// symbol id. `BTreeMap` is used specifically so that even incidental,
/// non-hashed iteration (diagnostic rendering, debug printing) is itself
/// deterministic — the canonical encoder sorts independently regardless.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IrProgram {
    pub entities: BTreeMap<SymbolId, IrEntity>,
    pub nodes: BTreeMap<SymbolId, IrNode>,
}

/// Derive an entity's display name from its trailing path segment, used
/// when `@entity` carries no explicit name.
pub fn last_path_segment(symbol_id: &SymbolId) -> String {
    symbol_id
        .rsplit(['.', '/', ':'])
        .next()
        .unwrap_or(symbol_id)
        .to_string()
}
