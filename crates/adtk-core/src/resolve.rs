//! Structural Resolver.
//!
//! Converts a `HostType` into a `ResolvedType` with deterministic
//! normalization: depth-first with a per-run visited set so cycles are cut
//! at every named referent rather than walked into infinitely.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::LimitsConfig;
use crate::determinism::sort::stable_sort_by_key;
use crate::errors::{CoreError, Diagnostic, Diagnostics};
use crate::facade::{HostEnumValue, HostIndexKeyType, HostType};
use crate::ir::{
    Discriminant, IndexKeyKind, IndexSignature, LiteralValue, ObjectProperty, PrimitiveKind,
    ResolvedType, SymbolId,
};

/// Per-run resolution state, owned by the pipeline coordinator and threaded
/// by mutable reference across the entire run so that earlier-resolved
/// symbols remain visible to later-resolved symbols as `ref` targets.
#[derive(Debug, Default)]
pub struct ResolverContext {
    /// Symbols currently being resolved on the active call stack, used to
    /// detect and cut self-referential cycles without emitting a partial shape.
    pending: BTreeSet<SymbolId>,
    /// Symbols already fully resolved in this run.
    pub resolved: BTreeMap<SymbolId, ResolvedType>,
}

impl ResolverContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Resolve `host_type` (the type of the declaration identified by
/// `origin_symbol`, when resolving a named declaration's own type) to a
/// `ResolvedType`, accumulating non-fatal diagnostics into `diagnostics`.
pub fn resolve_type(
    host_type: &HostType,
    origin_symbol: Option<&SymbolId>,
    ctx: &mut ResolverContext,
    limits: &LimitsConfig,
    diagnostics: &mut Diagnostics,
) -> Result<ResolvedType, CoreError> {
    resolve_depth(host_type, origin_symbol, ctx, limits, diagnostics, 0)
}

fn resolve_depth(
    host_type: &HostType,
    origin_symbol: Option<&SymbolId>,
    ctx: &mut ResolverContext,
    limits: &LimitsConfig,
    diagnostics: &mut Diagnostics,
    depth: usize,
) -> Result<ResolvedType, CoreError> {
    if depth > limits.max_depth {
        return Ok(ResolvedType::Unsupported {
            reason: "max depth exceeded".to_string(),
            original_text: None,
        });
    }

    match host_type {
        // 1. Signatures first.
        HostType::Signature => Ok(unsupported("function types are not supported")),

        // 2. Primitive classification.
        HostType::Void => Ok(unsupported("use undefined")),
        HostType::Any => Ok(unsupported("any is not supported")),
        HostType::Unknown => Ok(unsupported("unknown is not supported")),
        HostType::Never => Ok(unsupported("never is not supported")),
        HostType::Null => Ok(primitive(PrimitiveKind::Null)),
        HostType::Undefined => Ok(primitive(PrimitiveKind::Undefined)),
        HostType::StringPrimitive => Ok(primitive(PrimitiveKind::String)),
        HostType::NumberPrimitive => Ok(primitive(PrimitiveKind::Number)),
        HostType::BooleanPrimitive => Ok(primitive(PrimitiveKind::Boolean)),
        HostType::BigIntPrimitive => Ok(primitive(PrimitiveKind::BigInt)),

        // 3. Literals.
        HostType::StringLiteral(s) => Ok(literal(LiteralValue::String(s.clone()))),
        HostType::NumberLiteral(n) => Ok(literal(LiteralValue::Number(n.clone()))),
        HostType::BigIntLiteral(n) => Ok(literal(LiteralValue::BigInt(n.clone()))),
        HostType::BooleanLiteral(b) => Ok(literal(LiteralValue::Boolean(*b))),

        // 4. Enum members.
        HostType::EnumMember { value } => Ok(literal(match value {
            HostEnumValue::String(s) => LiteralValue::String(s.clone()),
            HostEnumValue::Number(n) => LiteralValue::Number(n.clone()),
        })),

        // 5. Unions.
        HostType::Union(members) => {
            resolve_union(members, origin_symbol, ctx, limits, diagnostics, depth)
        }

        // 6. Intersections.
        HostType::Intersection(members) => {
            resolve_intersection(members, origin_symbol, ctx, limits, diagnostics, depth)
        }

        // 7. Arrays.
        HostType::Array(element) => {
            let resolved = resolve_depth(element, origin_symbol, ctx, limits, diagnostics, depth + 1)?;
            Ok(ResolvedType::Array {
                element: Box::new(resolved),
            })
        }

        // 8. Tuples.
        HostType::Tuple(elements) => {
            let mut out = Vec::with_capacity(elements.len());
            for e in elements {
                out.push(resolve_depth(e, origin_symbol, ctx, limits, diagnostics, depth + 1)?);
            }
            Ok(ResolvedType::Tuple { elements: out })
        }

        // 9. Objects.
        HostType::Object(obj) => resolve_object(obj, origin_symbol, ctx, limits, diagnostics, depth),

        // 10/11. Template literals collapse to string.
        HostType::TemplateLiteral => Ok(primitive(PrimitiveKind::String)),

        // 12. Named references.
        HostType::Reference(r) => {
            resolve_reference(r, origin_symbol, ctx, limits, diagnostics, depth)
        }
    }
}

fn unsupported(reason: &str) -> ResolvedType {
    ResolvedType::Unsupported {
        reason: reason.to_string(),
        original_text: None,
    }
}

fn primitive(kind: PrimitiveKind) -> ResolvedType {
    ResolvedType::Primitive { primitive_kind: kind }
}

fn literal(value: LiteralValue) -> ResolvedType {
    ResolvedType::Literal { value }
}

fn resolve_union(
    members: &[HostType],
    origin_symbol: Option<&SymbolId>,
    ctx: &mut ResolverContext,
    limits: &LimitsConfig,
    diagnostics: &mut Diagnostics,
    depth: usize,
) -> Result<ResolvedType, CoreError> {
    let mut resolved = Vec::with_capacity(members.len());
    for m in members {
        resolved.push(resolve_depth(m, origin_symbol, ctx, limits, diagnostics, depth + 1)?);
    }

    if resolved.iter().all(|m| matches!(m, ResolvedType::Literal { .. })) {
        let mut values: Vec<LiteralValue> = resolved
            .into_iter()
            .map(|m| match m {
                ResolvedType::Literal { value } => value,
                _ => unreachable!(),
            })
            .collect();
        stable_sort_by_key(&mut values, |v| v.sort_key());
        return Ok(ResolvedType::LiteralUnion { members: values });
    }

    let object_like = resolved
        .iter()
        .filter(|m| m.is_object() || m.is_ref())
        .count();
    let other_non_null = resolved
        .iter()
        .filter(|m| !m.is_object() && !m.is_ref() && !m.is_null_primitive())
        .count();

    if object_like > 0 && other_non_null > 0 {
        let err = CoreError::UnionHeterogeneous(
            "a union mixing object-like members with non-null scalar members is not supported"
                .to_string(),
        );
        diagnostics.push(err.to_diagnostic());
        return Err(err);
    }

    let discriminant = detect_discriminant(&resolved);

    let mut sorted = resolved;
    stable_sort_by_key(&mut sorted, |m| m.union_sort_key());

    Ok(ResolvedType::Union {
        members: sorted,
        discriminant,
    })
}

fn detect_discriminant(members: &[ResolvedType]) -> Option<Discriminant> {
    let objects: Vec<&Vec<ObjectProperty>> = members
        .iter()
        .filter_map(|m| match m {
            ResolvedType::Object { properties, .. } => Some(properties),
            _ => None,
        })
        .collect();

    if objects.len() < 2 {
        return None;
    }

    let mut candidate_names: BTreeSet<String> = objects[0]
        .iter()
        .filter(|p| matches!(p.type_, ResolvedType::Literal { .. }))
        .map(|p| p.name.clone())
        .collect();

    for props in &objects[1..] {
        let names: BTreeSet<String> = props
            .iter()
            .filter(|p| matches!(p.type_, ResolvedType::Literal { .. }))
            .map(|p| p.name.clone())
            .collect();
        candidate_names = candidate_names.intersection(&names).cloned().collect();
    }

    for name in candidate_names {
        let mut values = Vec::with_capacity(objects.len());
        let mut distinct = BTreeSet::new();
        let mut ok = true;
        for props in &objects {
            let Some(p) = props.iter().find(|p| p.name == name) else {
                ok = false;
                break;
            };
            let ResolvedType::Literal { value } = &p.type_ else {
                ok = false;
                break;
            };
            if !distinct.insert(value.sort_key()) {
                ok = false;
                break;
            }
            values.push(value.clone());
        }
        if ok {
            return Some(Discriminant {
                property_name: name,
                values,
            });
        }
    }
    None
}

fn resolve_intersection(
    members: &[HostType],
    origin_symbol: Option<&SymbolId>,
    ctx: &mut ResolverContext,
    limits: &LimitsConfig,
    diagnostics: &mut Diagnostics,
    depth: usize,
) -> Result<ResolvedType, CoreError> {
    let mut resolved = Vec::with_capacity(members.len());
    for m in members {
        resolved.push(resolve_depth(m, origin_symbol, ctx, limits, diagnostics, depth + 1)?);
    }

    if resolved.iter().any(|m| !m.is_object()) {
        return Ok(unsupported(
            "intersection with a non-object member is not supported",
        ));
    }

    let mut merged: BTreeMap<String, ObjectProperty> = BTreeMap::new();
    let mut index_signature: Option<IndexSignature> = None;

    for m in resolved {
        let ResolvedType::Object {
            properties,
            index_signature: sig,
        } = m
        else {
            unreachable!()
        };

        if let Some(sig) = sig {
            if index_signature.is_some() {
                let err = CoreError::IntersectionConflict(
                    "multiple index signatures across intersection members".to_string(),
                );
                diagnostics.push(err.to_diagnostic());
                return Err(err);
            }
            index_signature = Some(sig);
        }

        for prop in properties {
            match merged.get_mut(&prop.name) {
                None => {
                    merged.insert(prop.name.clone(), prop);
                }
                Some(existing) => {
                    if !scalar_type_eq(&existing.type_, &prop.type_) {
                        let err = CoreError::IntersectionConflict(format!(
                            "conflicting types for property {}",
                            prop.name
                        ));
                        diagnostics.push(err.to_diagnostic());
                        return Err(err);
                    }
                    existing.optional = existing.optional && prop.optional;
                    existing.readonly = existing.readonly || prop.readonly;
                }
            }
        }
    }

    let mut properties: Vec<ObjectProperty> = merged.into_values().collect();
    stable_sort_by_key(&mut properties, |p| p.name.clone());

    Ok(ResolvedType::Object {
        properties,
        index_signature,
    })
}

/// Structural equality restricted to primitive/literal/ref kinds, per the
/// intersection merge conflict rule.
fn scalar_type_eq(a: &ResolvedType, b: &ResolvedType) -> bool {
    match (a, b) {
        (
            ResolvedType::Primitive { primitive_kind: pa },
            ResolvedType::Primitive { primitive_kind: pb },
        ) => pa == pb,
        (ResolvedType::Literal { value: va }, ResolvedType::Literal { value: vb }) => va == vb,
        (ResolvedType::Ref { target: ta }, ResolvedType::Ref { target: tb }) => ta == tb,
        _ => a == b,
    }
}

fn resolve_object(
    obj: &crate::facade::HostObject,
    origin_symbol: Option<&SymbolId>,
    ctx: &mut ResolverContext,
    limits: &LimitsConfig,
    diagnostics: &mut Diagnostics,
    depth: usize,
) -> Result<ResolvedType, CoreError> {
    if obj.properties.is_empty() {
        if let Some(sig) = &obj.index_signature {
            let value_type =
                resolve_depth(&sig.value_type, origin_symbol, ctx, limits, diagnostics, depth + 1)?;
            return Ok(ResolvedType::Object {
                properties: vec![],
                index_signature: Some(IndexSignature {
                    key_type: match sig.key_type {
                        HostIndexKeyType::String => IndexKeyKind::String,
                        HostIndexKeyType::Number => IndexKeyKind::Number,
                    },
                    value_type: Box::new(value_type),
                }),
            });
        }
    }

    let mut properties = Vec::with_capacity(obj.properties.len());
    for prop in &obj.properties {
        let resolved = resolve_depth(&prop.type_, origin_symbol, ctx, limits, diagnostics, depth + 1)?;
        properties.push(ObjectProperty {
            name: prop.name.clone(),
            type_: resolved,
            optional: prop.optional,
            readonly: prop.readonly,
        });
    }
    stable_sort_by_key(&mut properties, |p| p.name.clone());

    let index_signature = match &obj.index_signature {
        Some(sig) => {
            let value_type =
                resolve_depth(&sig.value_type, origin_symbol, ctx, limits, diagnostics, depth + 1)?;
            Some(IndexSignature {
                key_type: match sig.key_type {
                    HostIndexKeyType::String => IndexKeyKind::String,
                    HostIndexKeyType::Number => IndexKeyKind::Number,
                },
                value_type: Box::new(value_type),
            })
        }
        None => None,
    };

    Ok(ResolvedType::Object {
        properties,
        index_signature,
    })
}

fn resolve_reference(
    r: &crate::facade::HostReference,
    origin_symbol: Option<&SymbolId>,
    ctx: &mut ResolverContext,
    limits: &LimitsConfig,
    diagnostics: &mut Diagnostics,
    depth: usize,
) -> Result<ResolvedType, CoreError> {
    // Record<K,V> recognition: symbol name + exactly two type args whose key
    // type is a string- or number-primitive.
    if r.symbol_name == "Record" && r.type_args.len() == 2 {
        let key = &r.type_args[0];
        let value = &r.type_args[1];
        let key_kind = match key {
            HostType::StringPrimitive => Some(IndexKeyKind::String),
            HostType::NumberPrimitive => Some(IndexKeyKind::Number),
            _ => None,
        };
        if let Some(key_type) = key_kind {
            let value_type =
                resolve_depth(value, origin_symbol, ctx, limits, diagnostics, depth + 1)?;
            return Ok(ResolvedType::Object {
                properties: vec![],
                index_signature: Some(IndexSignature {
                    key_type,
                    value_type: Box::new(value_type),
                }),
            });
        }
    }

    // Cycle back to the symbol currently being resolved.
    if Some(&r.symbol_id) == origin_symbol {
        return Ok(ResolvedType::Ref {
            target: r.symbol_id.clone(),
        });
    }

    // Already resolved earlier in this run: later symbols see earlier ones as refs.
    if ctx.resolved.contains_key(&r.symbol_id) {
        return Ok(ResolvedType::Ref {
            target: r.symbol_id.clone(),
        });
    }

    if ctx.pending.contains(&r.symbol_id) {
        return Ok(ResolvedType::Ref {
            target: r.symbol_id.clone(),
        });
    }

    // Type alias whose target differs from the current reference: recurse
    // into the target under the alias's own symbol id.
    if let Some(alias_target) = &r.alias_target {
        ctx.pending.insert(r.symbol_id.clone());
        let resolved = resolve_depth(
            alias_target,
            Some(&r.symbol_id),
            ctx,
            limits,
            diagnostics,
            depth + 1,
        )?;
        ctx.pending.remove(&r.symbol_id);
        ctx.resolved.insert(r.symbol_id.clone(), resolved.clone());
        return Ok(resolved);
    }

    // Otherwise emit a ref without recursing; downstream consumers look the
    // referent up by id.
    Ok(ResolvedType::Ref {
        target: r.symbol_id.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitsConfig;
    use crate::facade::{HostIndexSignature, HostObject, HostProperty};

    fn limits() -> LimitsConfig {
        LimitsConfig::default()
    }

    #[test]
    fn resolves_primitive() {
        let mut ctx = ResolverContext::new();
        let mut diags = Diagnostics::new();
        let r = resolve_type(&HostType::StringPrimitive, None, &mut ctx, &limits(), &mut diags).unwrap();
        assert_eq!(r, ResolvedType::Primitive { primitive_kind: PrimitiveKind::String });
    }

    #[test]
    fn void_is_unsupported() {
        let mut ctx = ResolverContext::new();
        let mut diags = Diagnostics::new();
        let r = resolve_type(&HostType::Void, None, &mut ctx, &limits(), &mut diags).unwrap();
        assert!(matches!(r, ResolvedType::Unsupported { .. }));
    }

    #[test]
    fn object_properties_sorted_by_name() {
        let obj = HostType::Object(HostObject {
            properties: vec![
                HostProperty { name: "b".into(), type_: HostType::StringPrimitive, optional: false, readonly: false },
                HostProperty { name: "a".into(), type_: HostType::StringPrimitive, optional: false, readonly: false },
            ],
            index_signature: None,
        });
        let mut ctx = ResolverContext::new();
        let mut diags = Diagnostics::new();
        let r = resolve_type(&obj, None, &mut ctx, &limits(), &mut diags).unwrap();
        match r {
            ResolvedType::Object { properties, .. } => {
                assert_eq!(properties[0].name, "a");
                assert_eq!(properties[1].name, "b");
            }
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn record_type_recognized() {
        let r = HostType::Reference(crate::facade::HostReference {
            symbol_id: "Record".into(),
            symbol_name: "Record".into(),
            type_args: vec![HostType::StringPrimitive, HostType::StringPrimitive],
            alias_target: None,
        });
        let mut ctx = ResolverContext::new();
        let mut diags = Diagnostics::new();
        let resolved = resolve_type(&r, None, &mut ctx, &limits(), &mut diags).unwrap();
        match resolved {
            ResolvedType::Object { properties, index_signature } => {
                assert!(properties.is_empty());
                assert!(index_signature.is_some());
            }
            _ => panic!("expected record shape"),
        }
    }

    #[test]
    fn literal_union_sorted() {
        let u = HostType::Union(vec![
            HostType::StringLiteral("user".into()),
            HostType::StringLiteral("admin".into()),
            HostType::StringLiteral("guest".into()),
        ]);
        let mut ctx = ResolverContext::new();
        let mut diags = Diagnostics::new();
        let r = resolve_type(&u, None, &mut ctx, &limits(), &mut diags).unwrap();
        match r {
            ResolvedType::LiteralUnion { members } => {
                let values: Vec<String> = members.iter().map(|m| m.sort_key()).collect();
                assert_eq!(values, vec!["admin", "guest", "user"]);
            }
            _ => panic!("expected literal union"),
        }
    }

    #[test]
    fn heterogeneous_union_rejected() {
        let u = HostType::Union(vec![
            HostType::Object(HostObject { properties: vec![], index_signature: None }),
            HostType::StringPrimitive,
        ]);
        let mut ctx = ResolverContext::new();
        let mut diags = Diagnostics::new();
        let err = resolve_type(&u, None, &mut ctx, &limits(), &mut diags).unwrap_err();
        assert!(matches!(err, CoreError::UnionHeterogeneous(_)));
    }

    #[test]
    fn object_or_null_union_allowed() {
        let u = HostType::Union(vec![
            HostType::Object(HostObject { properties: vec![], index_signature: None }),
            HostType::Null,
        ]);
        let mut ctx = ResolverContext::new();
        let mut diags = Diagnostics::new();
        let r = resolve_type(&u, None, &mut ctx, &limits(), &mut diags).unwrap();
        assert!(matches!(r, ResolvedType::Union { .. }));
    }

    #[test]
    fn intersection_merges_properties() {
        let i = HostType::Intersection(vec![
            HostType::Object(HostObject {
                properties: vec![HostProperty { name: "a".into(), type_: HostType::StringPrimitive, optional: true, readonly: false }],
                index_signature: None,
            }),
            HostType::Object(HostObject {
                properties: vec![HostProperty { name: "b".into(), type_: HostType::NumberPrimitive, optional: false, readonly: false }],
                index_signature: None,
            }),
        ]);
        let mut ctx = ResolverContext::new();
        let mut diags = Diagnostics::new();
        let r = resolve_type(&i, None, &mut ctx, &limits(), &mut diags).unwrap();
        match r {
            ResolvedType::Object { properties, .. } => assert_eq!(properties.len(), 2),
            _ => panic!("expected merged object"),
        }
    }

    #[test]
    fn intersection_conflict_detected() {
        let i = HostType::Intersection(vec![
            HostType::Object(HostObject {
                properties: vec![HostProperty { name: "value".into(), type_: HostType::StringPrimitive, optional: false, readonly: false }],
                index_signature: None,
            }),
            HostType::Object(HostObject {
                properties: vec![HostProperty { name: "value".into(), type_: HostType::NumberPrimitive, optional: false, readonly: false }],
                index_signature: None,
            }),
        ]);
        let mut ctx = ResolverContext::new();
        let mut diags = Diagnostics::new();
        let err = resolve_type(&i, None, &mut ctx, &limits(), &mut diags).unwrap_err();
        assert!(matches!(err, CoreError::IntersectionConflict(_)));
    }

    #[test]
    fn self_reference_cuts_cycle() {
        let origin: SymbolId = "Tree".into();
        let r = HostType::Reference(crate::facade::HostReference {
            symbol_id: origin.clone(),
            symbol_name: "Tree".into(),
            type_args: vec![],
            alias_target: None,
        });
        let mut ctx = ResolverContext::new();
        let mut diags = Diagnostics::new();
        let resolved = resolve_type(&r, Some(&origin), &mut ctx, &limits(), &mut diags).unwrap();
        assert_eq!(resolved, ResolvedType::Ref { target: origin });
    }

    #[test]
    fn _unused_import_guard() {
        let _ = HostIndexSignature {
            key_type: HostIndexKeyType::String,
            value_type: Box::new(HostType::StringPrimitive),
        };
    }
}
