//! Annotation Validator (§4.G).
//!
//! Checks each parsed annotation against the symbol's resolved type,
//! accumulating `tag-incompatible-type` / `tag-field-not-found` diagnostics.
//! All violations accumulate before the caller decides whether to fail.

use crate::errors::{CoreError, Diagnostics};
use crate::ir::{Annotation, ResolvedType};

/// Validate `annotations` against `resolved_type`, pushing a diagnostic per
/// violation. Returns the count of violations found.
pub fn validate_annotations(
    annotations: &[Annotation],
    resolved_type: &ResolvedType,
    diagnostics: &mut Diagnostics,
) -> usize {
    let mut violations = 0;
    for annotation in annotations {
        if let Err(err) = validate_one(annotation, resolved_type) {
            diagnostics.push(err.to_diagnostic());
            violations += 1;
        }
    }
    violations
}

fn validate_one(annotation: &Annotation, resolved_type: &ResolvedType) -> Result<(), CoreError> {
    match annotation {
        Annotation::Entity { .. } => Ok(()),

        Annotation::Pk | Annotation::Unique | Annotation::Default { .. } | Annotation::SqlType { .. } | Annotation::Decimal { .. } => {
            require(
                resolved_type.is_scalar(),
                annotation,
                "requires a scalar type (primitive, literal, or literal union)",
            )
        }

        Annotation::Index { fields, .. } => {
            let ResolvedType::Object { properties, .. } = resolved_type else {
                return Err(incompatible(annotation, "requires an object type"));
            };
            for field in fields {
                if !properties.iter().any(|p| &p.name == field) {
                    return Err(CoreError::TagFieldNotFound(format!(
                        "@index references unknown field: {field}"
                    )));
                }
            }
            Ok(())
        }

        Annotation::Fk { .. } => require(
            resolved_type.is_scalar(),
            annotation,
            "requires a scalar type for the foreign-key column",
        ),

        Annotation::Min { .. } | Annotation::Max { .. } | Annotation::Int => require(
            resolved_type.is_numeric_scalar(),
            annotation,
            "requires a numeric primitive or literal",
        ),

        Annotation::MinLength { .. }
        | Annotation::MaxLength { .. }
        | Annotation::Pattern { .. }
        | Annotation::Format { .. }
        | Annotation::Email
        | Annotation::Uuid
        | Annotation::Url => require(
            resolved_type.is_string_like(),
            annotation,
            "requires a string-like type (string, string literal, string literal union, or array)",
        ),

        Annotation::RenameFrom { .. }
        | Annotation::Check { .. }
        | Annotation::Version { .. }
        | Annotation::Description { .. } => Ok(()),

        Annotation::Validator { name } | Annotation::Transform { name } => Err(
            CoreError::TagIncompatibleType(format!(
                "@{} is not currently supported: {name}",
                annotation.tag_name()
            )),
        ),
    }
}

fn require(
    ok: bool,
    annotation: &Annotation,
    reason: &str,
) -> Result<(), CoreError> {
    if ok {
        Ok(())
    } else {
        Err(incompatible(annotation, reason))
    }
}

fn incompatible(annotation: &Annotation, reason: &str) -> CoreError {
    CoreError::TagIncompatibleType(format!("@{} {}", annotation.tag_name(), reason))
}
