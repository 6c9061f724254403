//! IR Lowering (§4.H).
//!
//! Pure transformation from a resolved type plus its symbol's annotations
//! into the IR shape. Metadata is attached only at the root node; nested
//! nodes carry `{symbol_id, annotations: []}` to avoid duplicating the
//! parent's annotations throughout the tree.

use crate::errors::SourceSpan;
use crate::ir::{
    last_path_segment, Annotation, IndexSignature, IrEntity, IrIndexSignature, IrMetadata, IrNode,
    IrObjectProperty, ObjectProperty, ResolvedType, SymbolId,
};

/// Lower a symbol's resolved type into an `IrEntity`, deriving the entity
/// name from its `entity` annotation's optional name, falling back to the
/// symbol's trailing path segment.
pub fn lower_entity(
    symbol_id: &SymbolId,
    resolved_type: &ResolvedType,
    annotations: Vec<Annotation>,
    span: Option<SourceSpan>,
) -> IrEntity {
    let name = annotations
        .iter()
        .find_map(|a| match a {
            Annotation::Entity { name: Some(n) } => Some(n.clone()),
            _ => None,
        })
        .unwrap_or_else(|| last_path_segment(symbol_id));

    let node = lower_node(resolved_type, Some(IrMetadata {
        symbol_id: symbol_id.clone(),
        span: span.clone(),
        annotations: annotations.clone(),
    }));

    IrEntity {
        symbol_id: symbol_id.clone(),
        name,
        node,
        span,
        annotations,
    }
}

fn lower_node(resolved: &ResolvedType, metadata: Option<IrMetadata>) -> IrNode {
    match resolved {
        ResolvedType::Primitive { primitive_kind } => IrNode::Primitive {
            primitive_kind: *primitive_kind,
            metadata,
        },
        ResolvedType::Literal { value } => IrNode::Literal {
            value: value.clone(),
            metadata,
        },
        ResolvedType::LiteralUnion { members } => IrNode::LiteralUnion {
            members: members.clone(),
            metadata,
        },
        ResolvedType::Array { element } => IrNode::Array {
            element: Box::new(lower_node(element, None)),
            metadata,
        },
        ResolvedType::Tuple { elements } => IrNode::Tuple {
            elements: elements.iter().map(|e| lower_node(e, None)).collect(),
            metadata,
        },
        ResolvedType::Object {
            properties,
            index_signature,
        } => IrNode::Object {
            properties: properties.iter().map(lower_property).collect(),
            index_signature: index_signature.as_ref().map(lower_index_signature),
            metadata,
        },
        ResolvedType::Union {
            members,
            discriminant,
        } => IrNode::Union {
            members: members.iter().map(|m| lower_node(m, None)).collect(),
            discriminant: discriminant.clone(),
            metadata,
        },
        ResolvedType::Ref { target } => IrNode::Ref {
            target: target.clone(),
            metadata,
        },
        ResolvedType::Unsupported {
            reason,
            original_text,
        } => IrNode::Unsupported {
            reason: reason.clone(),
            original_text: original_text.clone(),
            metadata,
        },
    }
}

fn lower_property(prop: &ObjectProperty) -> IrObjectProperty {
    IrObjectProperty {
        name: prop.name.clone(),
        type_: lower_node(&prop.type_, None),
        optional: prop.optional,
        readonly: prop.readonly,
        annotations: Vec::new(),
    }
}

fn lower_index_signature(sig: &IndexSignature) -> IrIndexSignature {
    IrIndexSignature {
        key_type: sig.key_type,
        value_type: Box::new(lower_node(&sig.value_type, None)),
    }
}
