//! The in-memory "fixture" facade: a concrete `ProgramFacade` driven by a
//! small JSON description of declarations, already-resolved host types, and
//! raw docblock text. It honors the same trait a production host-compiler
//! facade would implement, so the pipeline, CLI, and test suite are runnable
//! without a real TypeScript-like compiler attached.

use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, SourceSpan};
use crate::facade::{
    Declaration, HostEnumValue, HostIndexKeyType, HostIndexSignature, HostObject, HostProperty,
    HostReference, HostType, LoadOptions, ProgramFacade, ProgramHandle,
};
use crate::ir::{RawTag, SymbolId};

/// On-disk/in-memory shape of a fixture program file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureProgram {
    pub ts_version: String,
    #[serde(default)]
    pub compiler_config_bytes: Option<String>,
    pub declarations: Vec<FixtureDeclaration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureDeclaration {
    pub symbol_id: String,
    #[serde(default)]
    pub span: Option<SourceSpan>,
    #[serde(default)]
    pub docblock_tags: Vec<RawTagSpec>,
    #[serde(rename = "type")]
    pub type_: HostTypeSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTagSpec {
    pub name: String,
    pub text: String,
}

/// JSON mirror of `HostType`, tagged on `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum HostTypeSpec {
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
    StringLiteral { value: String },
    NumberLiteral { value: String },
    BooleanLiteral { value: bool },
    BigIntLiteral { value: String },
    EnumMember { value: EnumValueSpec },
    Union { members: Vec<HostTypeSpec> },
    Intersection { members: Vec<HostTypeSpec> },
    Array { element: Box<HostTypeSpec> },
    Tuple { elements: Vec<HostTypeSpec> },
    #[serde(rename_all = "camelCase")]
    Object {
        properties: Vec<PropertySpec>,
        #[serde(default)]
        index_signature: Option<IndexSignatureSpec>,
    },
    TemplateLiteral,
    Signature,
    #[serde(rename_all = "camelCase")]
    Reference {
        symbol_id: String,
        symbol_name: String,
        #[serde(default)]
        type_args: Vec<HostTypeSpec>,
        #[serde(default)]
        alias_target: Option<Box<HostTypeSpec>>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EnumValueSpec {
    String { value: String },
    Number { value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySpec {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: HostTypeSpec,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub readonly: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSignatureSpec {
    pub key_type: String,
    pub value_type: Box<HostTypeSpec>,
}

impl From<HostTypeSpec> for HostType {
    fn from(spec: HostTypeSpec) -> Self {
        match spec {
            HostTypeSpec::Void => HostType::Void,
            HostTypeSpec::Any => HostType::Any,
            HostTypeSpec::Unknown => HostType::Unknown,
            HostTypeSpec::Never => HostType::Never,
            HostTypeSpec::Null => HostType::Null,
            HostTypeSpec::Undefined => HostType::Undefined,
            HostTypeSpec::StringPrimitive => HostType::StringPrimitive,
            HostTypeSpec::NumberPrimitive => HostType::NumberPrimitive,
            HostTypeSpec::BooleanPrimitive => HostType::BooleanPrimitive,
            HostTypeSpec::BigIntPrimitive => HostType::BigIntPrimitive,
            HostTypeSpec::StringLiteral { value } => HostType::StringLiteral(value),
            HostTypeSpec::NumberLiteral { value } => HostType::NumberLiteral(value),
            HostTypeSpec::BooleanLiteral { value } => HostType::BooleanLiteral(value),
            HostTypeSpec::BigIntLiteral { value } => HostType::BigIntLiteral(value),
            HostTypeSpec::EnumMember { value } => HostType::EnumMember {
                value: match value {
                    EnumValueSpec::String { value } => HostEnumValue::String(value),
                    EnumValueSpec::Number { value } => HostEnumValue::Number(value),
                },
            },
            HostTypeSpec::Union { members } => {
                HostType::Union(members.into_iter().map(HostType::from).collect())
            }
            HostTypeSpec::Intersection { members } => {
                HostType::Intersection(members.into_iter().map(HostType::from).collect())
            }
            HostTypeSpec::Array { element } => HostType::Array(Box::new(HostType::from(*element))),
            HostTypeSpec::Tuple { elements } => {
                HostType::Tuple(elements.into_iter().map(HostType::from).collect())
            }
            HostTypeSpec::Object {
                properties,
                index_signature,
            } => HostType::Object(HostObject {
                properties: properties
                    .into_iter()
                    .map(|p| HostProperty {
                        name: p.name,
                        type_: HostType::from(p.type_),
                        optional: p.optional,
                        readonly: p.readonly,
                    })
                    .collect(),
                index_signature: index_signature.map(|sig| HostIndexSignature {
                    key_type: if sig.key_type == "number" {
                        HostIndexKeyType::Number
                    } else {
                        HostIndexKeyType::String
                    },
                    value_type: Box::new(HostType::from(*sig.value_type)),
                }),
            }),
            HostTypeSpec::TemplateLiteral => HostType::TemplateLiteral,
            HostTypeSpec::Signature => HostType::Signature,
            HostTypeSpec::Reference {
                symbol_id,
                symbol_name,
                type_args,
                alias_target,
            } => HostType::Reference(HostReference {
                symbol_id,
                symbol_name,
                type_args: type_args.into_iter().map(HostType::from).collect(),
                alias_target: alias_target.map(|t| Box::new(HostType::from(*t))),
            }),
        }
    }
}

#[derive(Debug)]
pub struct FixtureHandle {
    program: FixtureProgram,
}

impl ProgramHandle for FixtureHandle {}

#[derive(Debug, Clone)]
pub struct FixtureDecl {
    symbol_id: SymbolId,
    span: Option<SourceSpan>,
    tags: Vec<RawTag>,
    type_: HostType,
    raw_bytes: Vec<u8>,
}

impl Declaration for FixtureDecl {}

/// A `ProgramFacade` backed by an in-memory `FixtureProgram`.
#[derive(Debug, Default)]
pub struct FixtureFacade;

impl FixtureFacade {
    pub fn new() -> Self {
        Self
    }

    /// Parse a fixture program from its canonical JSON text form.
    pub fn parse_program(source: &str) -> Result<FixtureProgram, CoreError> {
        serde_json::from_str(source)
            .map_err(|e| CoreError::FacadeLoad(format!("invalid fixture program: {e}")))
    }
}

impl ProgramFacade for FixtureFacade {
    type Handle = FixtureHandle;
    type Decl = FixtureDecl;

    fn load_program(&self, options: &LoadOptions) -> Result<Self::Handle, CoreError> {
        let path = options
            .base_path
            .as_ref()
            .ok_or_else(|| CoreError::FacadeLoad("fixture facade requires base_path".into()))?;
        let text = std::fs::read_to_string(path)
            .map_err(|e| CoreError::FacadeLoad(format!("failed to read fixture {path}: {e}")))?;
        let program = Self::parse_program(&text)?;
        Ok(FixtureHandle { program })
    }

    fn enumerate_declarations_with_tag(
        &self,
        handle: &Self::Handle,
        tag_name: &str,
    ) -> Result<Vec<Self::Decl>, CoreError> {
        let mut out = Vec::new();
        for decl in &handle.program.declarations {
            if decl.docblock_tags.iter().any(|t| t.name == tag_name) {
                let mut tags: Vec<RawTag> = decl
                    .docblock_tags
                    .iter()
                    .map(|t| RawTag {
                        name: t.name.clone(),
                        text: crate::determinism::text::collapse_whitespace(&t.text),
                    })
                    .collect();
                tags.sort_by(|a, b| a.name.cmp(&b.name));

                let raw_bytes = serde_json::to_vec(decl).map_err(|e| {
                    CoreError::FacadeLoad(format!("failed to project declaration: {e}"))
                })?;

                out.push(FixtureDecl {
                    symbol_id: decl.symbol_id.clone(),
                    span: decl.span.clone(),
                    tags,
                    type_: HostType::from(decl.type_.clone()),
                    raw_bytes,
                });
            }
        }
        Ok(out)
    }

    fn symbol_id_of(&self, decl: &Self::Decl) -> SymbolId {
        decl.symbol_id.clone()
    }

    fn docblock_tags_of(&self, decl: &Self::Decl) -> Vec<RawTag> {
        decl.tags.clone()
    }

    fn resolve_declared_type(&self, decl: &Self::Decl) -> Result<HostType, CoreError> {
        Ok(decl.type_.clone())
    }

    fn span_of(&self, decl: &Self::Decl) -> Option<SourceSpan> {
        decl.span.clone()
    }

    fn find_exported_symbol(
        &self,
        handle: &Self::Handle,
        name: &str,
    ) -> Result<Self::Decl, CoreError> {
        handle
            .program
            .declarations
            .iter()
            .find(|d| d.symbol_id.ends_with(name))
            .map(|decl| FixtureDecl {
                symbol_id: decl.symbol_id.clone(),
                span: decl.span.clone(),
                tags: decl
                    .docblock_tags
                    .iter()
                    .map(|t| RawTag {
                        name: t.name.clone(),
                        text: t.text.clone(),
                    })
                    .collect(),
                type_: HostType::from(decl.type_.clone()),
                raw_bytes: Vec::new(),
            })
            .ok_or_else(|| CoreError::FacadeLoad(format!("symbol not found: {name}")))
    }

    fn raw_symbol_bytes(&self, decl: &Self::Decl) -> Vec<u8> {
        decl.raw_bytes.clone()
    }

    fn compiler_config_bytes(&self, options: &LoadOptions) -> Option<Vec<u8>> {
        options
            .compiler_config_path
            .as_ref()
            .and_then(|p| std::fs::read(p).ok())
    }

    fn compiler_version(&self) -> String {
        "fixture".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> &'static str {
        r#"{
            "tsVersion": "5.4.0",
            "declarations": [
                {
                    "symbolId": "models/user.ts:User",
                    "docblockTags": [{"name": "entity", "text": "User"}],
                    "type": {"kind": "stringPrimitive"}
                }
            ]
        }"#
    }

    #[test]
    fn parses_fixture_program() {
        let program = FixtureFacade::parse_program(sample()).unwrap();
        assert_eq!(program.declarations.len(), 1);
        assert_eq!(program.ts_version, "5.4.0");
    }

    #[test]
    fn enumerates_tagged_declarations() {
        let facade = FixtureFacade::new();
        let program = FixtureFacade::parse_program(sample()).unwrap();
        let handle = FixtureHandle { program };
        let decls = facade
            .enumerate_declarations_with_tag(&handle, "entity")
            .unwrap();
        assert_eq!(decls.len(), 1);
        assert_eq!(facade.symbol_id_of(&decls[0]), "models/user.ts:User");
    }
}
