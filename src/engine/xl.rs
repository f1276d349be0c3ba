//! [`FormulaEngine`] backed by `xlformula_engine`
//!
//! `xlformula_engine` has no notion of sheets, so canonical `'Sheet'!C:C`
//! ranges are replaced with array literals before evaluation. Values come from
//! the `sample` lists of the schema fields. Parsing substitutes `{0}` so that
//! only the shape of the formula is checked.

use super::{ComputeOutcome, EngineError, EngineValue, FormulaEngine, ParseOutcome};
use crate::core::columns::column_letter_to_index;
use crate::error::{BridgeError, BridgeResult};
use crate::schema::SchemaIndex;
use regex::{Captures, Regex};
use std::sync::Arc;
use tracing::debug;
use xlformula_engine::{calculate, parse_formula, types, NoCustomFunction};

/// Canonical range: quoted sheet, `!`, column span
const RANGE_PATTERN: &str = r"'((?:[^']|'')+)'!([A-Z]+):([A-Z]+)";

pub struct XlFormulaEngine {
    index: Arc<SchemaIndex>,
    range: Regex,
}

impl XlFormulaEngine {
    pub fn new(index: Arc<SchemaIndex>) -> BridgeResult<Self> {
        let range = Regex::new(RANGE_PATTERN)
            .map_err(|e| BridgeError::Config(format!("Regex error: {}", e)))?;
        Ok(Self { index, range })
    }

    /// Replace every range with `{0}`
    fn shape_only(&self, formula: &str) -> String {
        self.range.replace_all(formula, "{0}").into_owned()
    }

    /// Replace every range with the sample values of its columns
    fn with_samples(&self, formula: &str) -> Result<String, String> {
        let mut result = String::with_capacity(formula.len());
        let mut last = 0;

        for caps in self.range.captures_iter(formula) {
            let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
            result.push_str(&formula[last..whole.start]);
            result.push_str(&self.range_literal(&caps)?);
            last = whole.end;
        }
        result.push_str(&formula[last..]);

        Ok(result)
    }

    fn range_literal(&self, caps: &Captures) -> Result<String, String> {
        let sheet = caps[1].replace("''", "'");
        let no_data = || format!("no sample data for range {}", &caps[0]);

        let entry = self.index.table(&sheet).ok_or_else(no_data)?;
        let (first, last) = match (
            column_letter_to_index(&caps[2]),
            column_letter_to_index(&caps[3]),
        ) {
            (Some(a), Some(b)) if a <= b => (a, b),
            _ => return Err(no_data()),
        };

        let values: Vec<String> = entry
            .table
            .fields
            .iter()
            .enumerate()
            .filter(|(pos, _)| (first..=last).contains(pos))
            .flat_map(|(_, field)| field.sample.iter())
            .filter_map(array_element)
            .collect();

        if values.is_empty() {
            return Err(no_data());
        }
        Ok(format!("{{{}}}", values.join(",")))
    }
}

/// One element of an array literal; nulls and nested values are skipped
fn array_element(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(true) => Some("TRUE".to_string()),
        serde_json::Value::Bool(false) => Some("FALSE".to_string()),
        serde_json::Value::String(s) => Some(format!("\"{}\"", s.replace('"', "\"\""))),
        _ => None,
    }
}

/// Evaluate with every bare reference resolving to zero
fn evaluate(formula: &str) -> types::Value {
    let resolver = |_name: String| -> types::Value { types::Value::Number(0.0) };
    let parsed = parse_formula::parse_string_to_formula(formula, None::<NoCustomFunction>);
    calculate::calculate_formula(parsed, Some(&resolver))
}

fn is_syntax_error(error: &types::Error) -> bool {
    matches!(error, types::Error::Parse)
}

impl FormulaEngine for XlFormulaEngine {
    fn parse(&self, formula: &str) -> ParseOutcome {
        let shaped = self.shape_only(formula);
        match evaluate(&shaped) {
            types::Value::Error(e) if is_syntax_error(&e) => {
                debug!(formula = %formula, "engine rejected formula");
                ParseOutcome::failed(vec![EngineError::new(format!(
                    "cannot parse formula: {:?}",
                    e
                ))])
            }
            _ => ParseOutcome::ok(),
        }
    }

    fn compute(&self, formula: &str) -> ComputeOutcome {
        let substituted = match self.with_samples(formula) {
            Ok(s) => s,
            Err(message) => return ComputeOutcome::Error(message),
        };

        match evaluate(&substituted) {
            types::Value::Number(n) => {
                // f32 artifacts from the engine
                let rounded = ((n as f64) * 1e6).round() / 1e6;
                ComputeOutcome::Value(EngineValue::Number(rounded))
            }
            types::Value::Text(s) => ComputeOutcome::Value(EngineValue::Text(s)),
            types::Value::Error(e) => {
                ComputeOutcome::Error(format!("formula returned error: {:?}", e))
            }
            other => match calculate::result_to_string(other).as_str() {
                "TRUE" => ComputeOutcome::Value(EngineValue::Boolean(true)),
                "FALSE" => ComputeOutcome::Value(EngineValue::Boolean(false)),
                s => ComputeOutcome::Value(EngineValue::Text(s.to_string())),
            },
        }
    }
}
