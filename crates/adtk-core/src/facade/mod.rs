//! Program Facade.
//!
//! A narrow capability interface the rest of the crate consumes; a concrete
//! implementation against a real host compiler is an external collaborator.
//! The facade is the only component aware of the host compiler's own type
//! representation — everything downstream (resolver, annotation layer, IR
//! lowering) sees only `HostType`, never a host-compiler-native type handle.
//!
//! This crate ships one concrete facade (`fixture`): an in-memory stand-in
//! driven by a small JSON description of declarations, already-resolved host
//! types, and raw docblock text, so the pipeline, CLI, and test suite are
//! runnable without a real host compiler attached.

pub mod fixture;

use crate::errors::{CoreError, SourceSpan};
use crate::ir::{RawTag, SymbolId};

/// Options used to load a program. `compiler_config_path` is hashed (or the
/// literal sentinel `<missing>` is hashed in its place) as one of the three
/// fingerprint components; it is never interpreted by the core itself.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub compiler_config_path: Option<String>,
    pub base_path: Option<String>,
}

/// An opaque handle to a loaded program. The facade implementation decides
/// what it contains; the core only ever passes it back to the same facade.
pub trait ProgramHandle: std::fmt::Debug {}

/// A declaration enumerated from a loaded program.
pub trait Declaration: std::fmt::Debug {}

/// Recursive representation of an already-resolved host type, as handed to
/// the core by a facade. This is the seam between "whatever the real host
/// compiler's type representation looks like" and the resolver's
/// deterministic normalization algorithm.
#[derive(Debug, Clone, PartialEq)]
pub enum HostType {
    Void,
    Any,
    Unknown,
    Never,
    Null,
    Undefined,
    StringPrimitive,
    NumberPrimitive,
    BooleanPrimitive,
    BigIntPrimitive,
    StringLiteral(String),
    NumberLiteral(String),
    BooleanLiteral(bool),
    BigIntLiteral(String),
    /// An enum member, string- or number-valued.
    EnumMember { value: HostEnumValue },
    Union(Vec<HostType>),
    Intersection(Vec<HostType>),
    Array(Box<HostType>),
    Tuple(Vec<HostType>),
    Object(HostObject),
    /// A template literal type; always collapses to the string primitive.
    TemplateLiteral,
    /// Any callable/constructable signature; always unsupported.
    Signature,
    /// A named reference to another symbol, possibly with type arguments
    /// (used to recognize `Record<K,V>`) and possibly a type-alias target.
    Reference(HostReference),
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostEnumValue {
    String(String),
    Number(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostObject {
    pub properties: Vec<HostProperty>,
    pub index_signature: Option<HostIndexSignature>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostProperty {
    pub name: String,
    pub type_: HostType,
    pub optional: bool,
    pub readonly: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostIndexSignature {
    pub key_type: HostIndexKeyType,
    pub value_type: Box<HostType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostIndexKeyType {
    String,
    Number,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostReference {
    pub symbol_id: SymbolId,
    pub symbol_name: String,
    pub type_args: Vec<HostType>,
    /// Present when the referent is a type alias; the alias's own target,
    /// recursed into under the alias's own symbol id by the resolver.
    pub alias_target: Option<Box<HostType>>,
}

/// The narrow capability interface consumed by the resolver, annotation
/// parser, and pipeline coordinator.
pub trait ProgramFacade {
    type Handle: ProgramHandle;
    type Decl: Declaration;

    fn load_program(&self, options: &LoadOptions) -> Result<Self::Handle, CoreError>;

    /// Enumerate declarations carrying the named docblock tag, in a
    /// deterministic, facade-defined order.
    fn enumerate_declarations_with_tag(
        &self,
        handle: &Self::Handle,
        tag_name: &str,
    ) -> Result<Vec<Self::Decl>, CoreError>;

    fn symbol_id_of(&self, decl: &Self::Decl) -> SymbolId;

    /// Raw docblock tags, sorted by tag name, whitespace-normalized, markup stripped.
    fn docblock_tags_of(&self, decl: &Self::Decl) -> Vec<RawTag>;

    fn resolve_declared_type(&self, decl: &Self::Decl) -> Result<HostType, CoreError>;

    fn span_of(&self, decl: &Self::Decl) -> Option<SourceSpan>;

    fn find_exported_symbol(
        &self,
        handle: &Self::Handle,
        name: &str,
    ) -> Result<Self::Decl, CoreError>;

    /// Raw bytes of the symbol projection used in the fingerprint's
    /// `content` component (declaration text plus its raw docblock tags).
    fn raw_symbol_bytes(&self, decl: &Self::Decl) -> Vec<u8>;

    /// Compiler-options file bytes for the fingerprint's `tsconfig`
    /// component, or `None` if no options file was configured.
    fn compiler_config_bytes(&self, options: &LoadOptions) -> Option<Vec<u8>>;

    /// The host-compiler version string for the fingerprint's `tsVersion` component.
    fn compiler_version(&self) -> String;
}
