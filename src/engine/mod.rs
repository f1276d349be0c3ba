//! Evaluation engine seam
//!
//! The bridge never evaluates formulas itself. A [`FormulaEngine`] parses
//! canonical text to report syntax errors and computes a preview value.
//! [`XlFormulaEngine`] is the bundled implementation.

pub mod xl;

pub use xl::XlFormulaEngine;

use serde::{Deserialize, Serialize};
use std::fmt;

/// A syntax error reported by an engine
///
/// `location` is a single offset; `start`/`end` a span. Both refer to the
/// canonical text the engine was given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            start: None,
            end: None,
        }
    }

    pub fn at(mut self, location: usize) -> Self {
        self.location = Some(location);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseOutcome {
    pub ok: bool,
    pub errors: Vec<EngineError>,
}

impl ParseOutcome {
    pub fn ok() -> Self {
        Self {
            ok: true,
            errors: Vec::new(),
        }
    }

    pub fn failed(errors: Vec<EngineError>) -> Self {
        Self { ok: false, errors }
    }
}

/// A computed preview value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EngineValue {
    Number(f64),
    Boolean(bool),
    Text(String),
}

impl fmt::Display for EngineValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineValue::Number(n) => write!(f, "{}", n),
            EngineValue::Boolean(true) => write!(f, "TRUE"),
            EngineValue::Boolean(false) => write!(f, "FALSE"),
            EngineValue::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComputeOutcome {
    Value(EngineValue),
    Error(String),
}

/// Parses and computes canonical formulas
pub trait FormulaEngine: Send + Sync {
    fn parse(&self, formula: &str) -> ParseOutcome;

    fn compute(&self, formula: &str) -> ComputeOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_value_display() {
        assert_eq!(EngineValue::Number(1.5).to_string(), "1.5");
        assert_eq!(EngineValue::Boolean(true).to_string(), "TRUE");
        assert_eq!(EngineValue::Text("x".to_string()).to_string(), "x");
    }

    #[test]
    fn test_engine_value_serializes_plain() {
        let json = serde_json::to_string(&EngineValue::Number(2.0)).unwrap();
        assert_eq!(json, "2.0");
        let json = serde_json::to_string(&EngineValue::Text("a".to_string())).unwrap();
        assert_eq!(json, "\"a\"");
    }

    #[test]
    fn test_engine_error_skips_empty_offsets() {
        let json = serde_json::to_value(EngineError::new("bad").at(3)).unwrap();
        assert_eq!(json, serde_json::json!({"message": "bad", "location": 3}));
    }
}
