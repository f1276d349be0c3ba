use serde::{Deserialize, Serialize};
use std::fmt;

//==============================================================================
// Schema Model
//==============================================================================

/// A field (column) of a table.
///
/// The position of a field inside [`Table::fields`] is its spreadsheet column:
/// the first field is column `A`, the 27th is `AA`. Reordering fields changes
/// the ranges the normalizer emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Display name shown to the user (e.g. `编号`)
    pub name: String,
    /// Stable code key used in stored formulas (e.g. `id`)
    #[serde(alias = "field")]
    pub code: String,
    /// Optional sample cell values, used only for preview evaluation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample: Vec<serde_json::Value>,
}

impl Field {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            sample: Vec::new(),
        }
    }

    /// Attach sample values (builder style)
    pub fn with_sample(mut self, sample: Vec<serde_json::Value>) -> Self {
        self.sample = sample;
        self
    }
}

/// A table with an ordered field list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Display name, also used as the sheet name in canonical ranges
    pub name: String,
    /// Stable code key used in stored formulas
    #[serde(alias = "fieldName")]
    pub code: String,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Table {
    pub fn new(name: impl Into<String>, code: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            fields,
        }
    }
}

/// Ordered collection of tables supplied by the host application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub tables: Vec<Table>,
}

impl Schema {
    pub fn new(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    /// Built-in two-table sample schema (outbound notice / handover sheet)
    pub fn sample() -> Self {
        Self::new(vec![
            Table::new(
                "出库通知单",
                "outStock",
                vec![
                    Field::new("编号", "id"),
                    Field::new("姓名", "name"),
                    Field::new("等级", "level"),
                ],
            ),
            Table::new(
                "交接单",
                "handOver",
                vec![
                    Field::new("编号", "id"),
                    Field::new("客户编号", "customerId"),
                    Field::new("金额", "amount"),
                    Field::new("日期", "date"),
                ],
            ),
        ])
    }
}

//==============================================================================
// Call Extraction
//==============================================================================

/// A function call found in a formula body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedCall {
    /// Function name exactly as written
    pub name: String,
    /// Raw, trimmed argument substrings. Nested calls stay unparsed here.
    pub args: Vec<String>,
}

impl ExtractedCall {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    pub fn arg_count(&self) -> usize {
        self.args.len()
    }
}

//==============================================================================
// Formula Diagnostics
//==============================================================================

/// Location of a diagnostic, in character offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Span {
    /// Single offset
    At(usize),
    /// Half-open range `[start, end)`
    Range { start: usize, end: usize },
}

/// Kind of formula diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaErrorKind {
    /// Call name not present in the function registry
    UnknownFunction,
    /// Argument count outside `[min, max]`
    Arity,
    /// Parse error reported verbatim by the evaluation engine
    EngineParse,
    /// Compute error reported verbatim by the evaluation engine
    EngineCompute,
}

/// A formula diagnostic. These are values handed back to the host, never
/// propagated as `Err` across the library boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormulaError {
    pub kind: FormulaErrorKind,
    pub message: String,
    /// Signature errors cover the offending call in the validated (normalized)
    /// text; engine errors carry no span here, see `core::markers`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl FormulaError {
    pub fn new(kind: FormulaErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
        }
    }

    pub fn unknown_function(name: &str) -> Self {
        Self::new(
            FormulaErrorKind::UnknownFunction,
            format!("unknown function: {name}"),
        )
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
