//! Annotation Parser (§4.F).
//!
//! Turns a declaration's raw, whitespace-collapsed docblock tags into the
//! closed `Annotation` variant set, following a fixed per-tag grammar table.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use crate::errors::{CoreError, Diagnostics};
use crate::ir::{Annotation, RawTag, ReferentialAction, SymbolId};

/// Maps a recognized tag name to the symbols (in discovery order) on which
/// it was parsed, populated only for tags in the configurable "resolve set"
/// (default: just `entity`).
pub type TagIndex = BTreeMap<String, Vec<SymbolId>>;

const KNOWN_TAGS: &[&str] = &[
    "entity", "pk", "unique", "index", "fk", "default", "renameFrom", "sqlType", "decimal",
    "check", "version", "min", "max", "int", "minLength", "maxLength", "pattern", "format",
    "email", "uuid", "url", "description", "validator", "transform",
];

fn payload_required(tag: &str) -> bool {
    !matches!(tag, "pk" | "unique" | "int" | "email" | "uuid" | "url")
}

/// Tags that may legitimately appear more than once on a single declaration
/// (e.g. `Post` carrying both `@index userId` and `@index userId,createdAt`,
/// per S2). Everything else is single-valued and the second occurrence is a
/// `tag-duplicate` warning.
fn is_repeatable(tag: &str) -> bool {
    matches!(tag, "index" | "fk")
}

/// Parse one declaration's raw tags into annotations, applying the
/// unknown/duplicate/missing-payload/invalid-payload pipeline in order.
/// `tag_index` is updated in place for tags in `resolve_set`.
pub fn parse_annotations(
    symbol_id: &SymbolId,
    tags: &[RawTag],
    resolve_set: &BTreeSet<String>,
    tag_index: &mut TagIndex,
    diagnostics: &mut Diagnostics,
) -> Vec<Annotation> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();

    for tag in tags {
        if !KNOWN_TAGS.contains(&tag.name.as_str()) {
            let err = CoreError::TagUnknown(tag.name.clone());
            diagnostics.push(err.to_diagnostic());
            continue;
        }

        let dedup_key = if is_repeatable(&tag.name) {
            format!("{}\u{0}{}", tag.name, tag.text.trim())
        } else {
            tag.name.clone()
        };
        if !seen.insert(dedup_key) {
            let err = CoreError::TagDuplicate(tag.name.clone());
            diagnostics.push(err.to_diagnostic());
            continue;
        }

        if payload_required(&tag.name) && tag.text.trim().is_empty() {
            let err = CoreError::TagPayloadMissing(tag.name.clone());
            diagnostics.push(err.to_diagnostic());
            continue;
        }

        match construct(tag) {
            Ok(annotation) => {
                if resolve_set.contains(&tag.name) {
                    tag_index
                        .entry(tag.name.clone())
                        .or_default()
                        .push(symbol_id.clone());
                }
                out.push(annotation);
            }
            Err(err) => {
                diagnostics.push(err.to_diagnostic());
            }
        }
    }

    out
}

/// The default tag-index resolve set: just `entity`.
pub fn default_resolve_set() -> BTreeSet<String> {
    BTreeSet::from(["entity".to_string()])
}

fn construct(tag: &RawTag) -> Result<Annotation, CoreError> {
    let payload = tag.text.trim();
    match tag.name.as_str() {
        "entity" => Ok(Annotation::Entity {
            name: if payload.is_empty() {
                None
            } else {
                Some(payload.to_string())
            },
        }),
        "pk" => Ok(Annotation::Pk),
        "unique" => Ok(Annotation::Unique),
        "index" => parse_index(payload),
        "fk" => parse_fk(payload),
        "default" => Ok(Annotation::Default {
            value: payload.to_string(),
        }),
        "renameFrom" => parse_rename_from(payload),
        "sqlType" => Ok(Annotation::SqlType {
            sql_type: payload.to_string(),
        }),
        "decimal" => parse_decimal(payload),
        "check" => Ok(Annotation::Check {
            expr: payload.to_string(),
        }),
        "version" => parse_version(payload),
        "min" => parse_number(payload).map(|n| Annotation::Min { n }),
        "max" => parse_number(payload).map(|n| Annotation::Max { n }),
        "int" => Ok(Annotation::Int),
        "minLength" => parse_u64(payload).map(|n| Annotation::MinLength { n }),
        "maxLength" => parse_u64(payload).map(|n| Annotation::MaxLength { n }),
        "pattern" => parse_pattern(payload),
        "format" => Ok(Annotation::Format {
            name: payload.to_string(),
        }),
        "email" => Ok(Annotation::Email),
        "uuid" => Ok(Annotation::Uuid),
        "url" => Ok(Annotation::Url),
        "description" => Ok(Annotation::Description {
            text: payload.to_string(),
        }),
        "validator" => Ok(Annotation::Validator {
            name: payload.to_string(),
        }),
        "transform" => Ok(Annotation::Transform {
            name: payload.to_string(),
        }),
        other => unreachable!("unknown tags are filtered before construct: {other}"),
    }
}

fn parse_index(payload: &str) -> Result<Annotation, CoreError> {
    let (fields_part, unique) = match payload.strip_suffix(":unique") {
        Some(rest) => (rest, true),
        None => (payload, false),
    };
    let fields: Vec<String> = fields_part
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if fields.is_empty() {
        return Err(CoreError::TagPayloadInvalid(format!(
            "@index requires at least one field name: {payload}"
        )));
    }
    Ok(Annotation::Index { fields, unique })
}

fn parse_fk(payload: &str) -> Result<Annotation, CoreError> {
    let mut parts = payload.splitn(2, char::is_whitespace);
    let target_field = parts.next().unwrap_or("");
    let actions = parts.next();

    let Some((target, field)) = target_field.split_once('.') else {
        return Err(CoreError::TagPayloadInvalid(format!(
            "@fk requires Target.field: {payload}"
        )));
    };
    if target.is_empty() || field.is_empty() {
        return Err(CoreError::TagPayloadInvalid(format!(
            "@fk requires Target.field: {payload}"
        )));
    }

    let (on_delete, on_update) = match actions {
        Some(actions) => match actions.split_once(':') {
            Some((d, u)) => (
                Some(ReferentialAction::coerce(d)),
                Some(ReferentialAction::coerce(u)),
            ),
            None => (Some(ReferentialAction::coerce(actions)), None),
        },
        None => (None, None),
    };

    Ok(Annotation::Fk {
        target: target.to_string(),
        field: field.to_string(),
        on_delete,
        on_update,
    })
}

fn parse_rename_from(payload: &str) -> Result<Annotation, CoreError> {
    match payload.split_once('@') {
        Some((old_name, version)) => Ok(Annotation::RenameFrom {
            old_name: old_name.to_string(),
            version: Some(version.to_string()),
        }),
        None => Ok(Annotation::RenameFrom {
            old_name: payload.to_string(),
            version: None,
        }),
    }
}

fn parse_decimal(payload: &str) -> Result<Annotation, CoreError> {
    let re = Regex::new(r"^(\d+),(\d+)$").expect("static regex is valid");
    let caps = re.captures(payload).ok_or_else(|| {
        CoreError::TagPayloadInvalid(format!("@decimal requires precision,scale: {payload}"))
    })?;
    let precision: u32 = caps[1].parse().expect("regex guarantees digits");
    let scale: u32 = caps[2].parse().expect("regex guarantees digits");
    Ok(Annotation::Decimal { precision, scale })
}

fn parse_version(payload: &str) -> Result<Annotation, CoreError> {
    let re = Regex::new(r"^\d+\.\d+\.\d+$").expect("static regex is valid");
    if !re.is_match(payload) {
        return Err(CoreError::TagPayloadInvalid(format!(
            "@version requires a semver string: {payload}"
        )));
    }
    Ok(Annotation::Version {
        semver: payload.to_string(),
    })
}

fn parse_number(payload: &str) -> Result<f64, CoreError> {
    payload
        .parse::<f64>()
        .map_err(|_| CoreError::TagPayloadInvalid(format!("expected a number: {payload}")))
}

fn parse_u64(payload: &str) -> Result<u64, CoreError> {
    payload
        .parse::<u64>()
        .map_err(|_| CoreError::TagPayloadInvalid(format!("expected a non-negative integer: {payload}")))
}

fn parse_pattern(payload: &str) -> Result<Annotation, CoreError> {
    Regex::new(payload)
        .map_err(|e| CoreError::TagPayloadInvalid(format!("@pattern is not a valid regex: {e}")))?;
    Ok(Annotation::Pattern {
        regex: payload.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str, text: &str) -> RawTag {
        RawTag {
            name: name.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn unknown_tag_warns_and_skips() {
        let mut diags = Diagnostics::new();
        let mut idx = TagIndex::new();
        let out = parse_annotations(
            &"Sym".to_string(),
            &[tag("bogus", "x")],
            &default_resolve_set(),
            &mut idx,
            &mut diags,
        );
        assert!(out.is_empty());
        assert_eq!(diags.len(), 1);
        assert!(!diags.has_errors());
    }

    #[test]
    fn duplicate_tag_first_wins() {
        let mut diags = Diagnostics::new();
        let mut idx = TagIndex::new();
        let out = parse_annotations(
            &"Sym".to_string(),
            &[tag("version", "1.0.0"), tag("version", "2.0.0")],
            &default_resolve_set(),
            &mut idx,
            &mut diags,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0], Annotation::Version { semver: "1.0.0".into() });
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn missing_required_payload_errors() {
        let mut diags = Diagnostics::new();
        let mut idx = TagIndex::new();
        let out = parse_annotations(
            &"Sym".to_string(),
            &[tag("index", "")],
            &default_resolve_set(),
            &mut idx,
            &mut diags,
        );
        assert!(out.is_empty());
        assert!(diags.has_errors());
    }

    #[test]
    fn repeated_index_tags_with_distinct_payloads_both_kept() {
        let mut diags = Diagnostics::new();
        let mut idx = TagIndex::new();
        let out = parse_annotations(
            &"Sym".to_string(),
            &[tag("index", "userId"), tag("index", "userId,createdAt")],
            &default_resolve_set(),
            &mut idx,
            &mut diags,
        );
        assert_eq!(out.len(), 2);
        assert!(!diags.has_errors() && diags.is_empty());
    }

    #[test]
    fn repeated_index_tags_with_identical_payload_is_still_a_duplicate() {
        let mut diags = Diagnostics::new();
        let mut idx = TagIndex::new();
        let out = parse_annotations(
            &"Sym".to_string(),
            &[tag("index", "userId"), tag("index", "userId")],
            &default_resolve_set(),
            &mut idx,
            &mut diags,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn index_with_unique_suffix() {
        let mut diags = Diagnostics::new();
        let mut idx = TagIndex::new();
        let out = parse_annotations(
            &"Sym".to_string(),
            &[tag("index", "name,email:unique")],
            &default_resolve_set(),
            &mut idx,
            &mut diags,
        );
        assert_eq!(
            out[0],
            Annotation::Index {
                fields: vec!["name".into(), "email".into()],
                unique: true
            }
        );
    }

    #[test]
    fn fk_with_actions() {
        let mut diags = Diagnostics::new();
        let mut idx = TagIndex::new();
        let out = parse_annotations(
            &"Sym".to_string(),
            &[tag("fk", "User.id cascade:restrict")],
            &default_resolve_set(),
            &mut idx,
            &mut diags,
        );
        assert_eq!(
            out[0],
            Annotation::Fk {
                target: "User".into(),
                field: "id".into(),
                on_delete: Some(ReferentialAction::Cascade),
                on_update: Some(ReferentialAction::Restrict),
            }
        );
    }

    #[test]
    fn decimal_parses_precision_and_scale() {
        let mut diags = Diagnostics::new();
        let mut idx = TagIndex::new();
        let out = parse_annotations(
            &"Sym".to_string(),
            &[tag("decimal", "10,2")],
            &default_resolve_set(),
            &mut idx,
            &mut diags,
        );
        assert_eq!(out[0], Annotation::Decimal { precision: 10, scale: 2 });
    }

    #[test]
    fn rename_from_with_version() {
        let mut diags = Diagnostics::new();
        let mut idx = TagIndex::new();
        let out = parse_annotations(
            &"Sym".to_string(),
            &[tag("renameFrom", "old@1.2.3")],
            &default_resolve_set(),
            &mut idx,
            &mut diags,
        );
        assert_eq!(
            out[0],
            Annotation::RenameFrom { old_name: "old".into(), version: Some("1.2.3".into()) }
        );
    }

    #[test]
    fn invalid_regex_pattern_rejected() {
        let mut diags = Diagnostics::new();
        let mut idx = TagIndex::new();
        let out = parse_annotations(
            &"Sym".to_string(),
            &[tag("pattern", "[unterminated")],
            &default_resolve_set(),
            &mut idx,
            &mut diags,
        );
        assert!(out.is_empty());
        assert!(diags.has_errors());
    }

    #[test]
    fn tag_index_populated_for_resolve_set() {
        let mut diags = Diagnostics::new();
        let mut idx = TagIndex::new();
        parse_annotations(
            &"models/user.ts:User".to_string(),
            &[tag("entity", "User")],
            &default_resolve_set(),
            &mut idx,
            &mut diags,
        );
        assert_eq!(idx.get("entity").unwrap(), &vec!["models/user.ts:User".to_string()]);
    }
}
