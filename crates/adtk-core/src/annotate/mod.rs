//! Annotation Parser & Validator.
//!
//! `parse` turns a declaration's raw docblock tags into the closed
//! `Annotation` variant set (§4.F); `validate` checks each parsed annotation
//! against the symbol's resolved type (§4.G).

pub mod parse;
pub mod validate;

pub use parse::{parse_annotations, TagIndex};
pub use validate::validate_annotations;
