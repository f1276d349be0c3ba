//! Core formula transforms
//!
//! All transforms are pure functions of their input text plus the read-only
//! schema index and function registry. None of them fails on malformed input.

pub mod columns;
pub mod extractor;
pub mod field_keys;
pub mod lexer;
pub mod lookup;
pub mod markers;
pub mod normalizer;
pub mod validator;

pub use columns::column_index_to_letter;
pub use extractor::extract_calls;
pub use field_keys::{strip_spaces, FieldKeyTransformer};
pub use lookup::build_lookup_formula;
pub use markers::{markers_for, Marker};
pub use normalizer::Normalizer;
pub use validator::SignatureValidator;

use crate::functions::FunctionRegistry;
use crate::schema::SchemaIndex;
use crate::types::FormulaError;

/// Rewrite display syntax to canonical ranges
pub fn normalize_formula(raw: &str, index: &SchemaIndex, current_table: &str) -> String {
    Normalizer::new(index, current_table).normalize(raw)
}

/// Normalize, then report the first call whose arity is invalid
pub fn validate_formula(
    raw: &str,
    index: &SchemaIndex,
    registry: &FunctionRegistry,
    current_table: &str,
) -> Option<FormulaError> {
    let canonical = normalize_formula(raw, index, current_table);
    SignatureValidator::new(registry).validate(&canonical)
}

/// Rewrite display syntax to `[tableCode.fieldCode]` references
pub fn transform_to_field_keys(
    raw: &str,
    index: &SchemaIndex,
    registry: &FunctionRegistry,
    default_table: Option<&str>,
) -> String {
    FieldKeyTransformer::new(index, registry, default_table).transform(raw)
}
