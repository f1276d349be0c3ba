//! Schema documents: loading, validation and indexing
//!
//! A schema document lists the tables formulas may reference, optionally
//! extra functions and session options:
//!
//! ```yaml
//! tables:
//!   - name: 交接单
//!     code: handOver
//!     fields:
//!       - { name: 编号, code: id }
//!       - { name: 金额, code: amount, sample: [120, 80.5] }
//! functions:
//!   - { name: DOUBLE, params: "value", category: custom }
//! options:
//!   default_table: 交接单
//! ```
//!
//! JSON documents in the host's own shape (`fieldName` / `field` keys) are
//! accepted as well.

pub mod index;

pub use index::{SchemaIndex, TableEntry};

use crate::config::Options;
use crate::error::{BridgeError, BridgeResult};
use crate::functions::{FunctionDef, FunctionRegistry};
use crate::types::{Schema, Table};
use jsonschema::JSONSchema;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// A parsed schema document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub functions: Vec<FunctionDef>,
    #[serde(default)]
    pub options: Options,
}

impl SchemaDocument {
    /// Document wrapping the built-in sample schema
    pub fn sample() -> Self {
        Self {
            tables: Schema::sample().tables,
            ..Self::default()
        }
    }

    pub fn schema(&self) -> Schema {
        Schema::new(self.tables.clone())
    }

    pub fn index(&self) -> SchemaIndex {
        SchemaIndex::new(&self.schema())
    }

    /// Built-in functions extended with the document's definitions
    pub fn registry(&self) -> FunctionRegistry {
        FunctionRegistry::with_functions(&self.functions)
    }
}

/// Load a schema document from a YAML or JSON file
///
/// # Example
/// ```no_run
/// use formula_bridge::schema::load_document;
/// use std::path::Path;
///
/// let doc = load_document(Path::new("schema.yaml"))?;
/// println!("Tables: {}", doc.tables.len());
/// # Ok::<(), formula_bridge::error::BridgeError>(())
/// ```
pub fn load_document(path: &Path) -> BridgeResult<SchemaDocument> {
    let content = std::fs::read_to_string(path)?;
    let doc = parse_document(&content)?;
    debug!(
        path = %path.display(),
        tables = doc.tables.len(),
        functions = doc.functions.len(),
        "loaded schema document"
    );
    Ok(doc)
}

/// Parse a schema document from YAML or JSON text
pub fn parse_document(content: &str) -> BridgeResult<SchemaDocument> {
    let yaml: Value = serde_yaml::from_str(content)?;
    validate_against_schema(&yaml)?;

    let doc: SchemaDocument = serde_yaml::from_value(yaml)?;
    check_document(&doc)?;
    Ok(doc)
}

/// Validate a YAML value against the embedded JSON Schema
fn validate_against_schema(yaml: &Value) -> BridgeResult<()> {
    let schema_str = include_str!("../../schema/formula-bridge.schema.json");
    let schema_value: serde_json::Value = serde_json::from_str(schema_str)
        .map_err(|e| BridgeError::Schema(format!("Failed to parse schema: {}", e)))?;

    let compiled_schema = JSONSchema::compile(&schema_value)
        .map_err(|e| BridgeError::Schema(format!("Failed to compile schema: {}", e)))?;

    // Convert YAML to JSON for validation
    let json_value: serde_json::Value = serde_json::to_value(yaml)
        .map_err(|e| BridgeError::Schema(format!("Failed to convert YAML to JSON: {}", e)))?;

    if let Err(errors) = compiled_schema.validate(&json_value) {
        let error_messages: Vec<String> = errors.map(|e| format!("  - {}", e)).collect();
        return Err(BridgeError::Schema(format!(
            "Schema validation failed:\n{}",
            error_messages.join("\n")
        )));
    }

    Ok(())
}

/// Checks the JSON Schema cannot express: identifier-shaped code keys and
/// unique names
fn check_document(doc: &SchemaDocument) -> BridgeResult<()> {
    let code_key = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
        .map_err(|e| BridgeError::Schema(format!("Regex error: {}", e)))?;

    let mut table_names = HashSet::new();
    for table in &doc.tables {
        if !table_names.insert(table.name.to_lowercase()) {
            return Err(BridgeError::Schema(format!(
                "Duplicate table name '{}'",
                table.name
            )));
        }
        if !code_key.is_match(&table.code) {
            return Err(BridgeError::Schema(format!(
                "Table '{}': code key '{}' is not an identifier",
                table.name, table.code
            )));
        }

        let mut field_names = HashSet::new();
        for field in &table.fields {
            if !field_names.insert(field.name.to_lowercase()) {
                return Err(BridgeError::Schema(format!(
                    "Table '{}': duplicate field name '{}'",
                    table.name, field.name
                )));
            }
            if !code_key.is_match(&field.code) {
                return Err(BridgeError::Schema(format!(
                    "Table '{}': field '{}' has code key '{}' which is not an identifier",
                    table.name, field.name, field.code
                )));
            }
        }
    }

    if let Some(table) = &doc.options.default_table {
        if !doc.tables.iter().any(|t| {
            t.name.eq_ignore_ascii_case(table) || t.code.eq_ignore_ascii_case(table)
        }) {
            return Err(BridgeError::Config(format!(
                "default_table '{}' is not a table of this schema",
                table
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const YAML_DOC: &str = r#"
tables:
  - name: 交接单
    code: handOver
    fields:
      - { name: 编号, code: id }
      - { name: 金额, code: amount, sample: [120, 80.5] }
functions:
  - { name: DOUBLE, params: "value", category: custom }
options:
  default_table: 交接单
  validate_nested: true
"#;

    #[test]
    fn test_parse_yaml_document() {
        let doc = parse_document(YAML_DOC).unwrap();
        assert_eq!(doc.tables.len(), 1);
        assert_eq!(doc.tables[0].fields[1].sample.len(), 2);
        assert_eq!(doc.options.default_table.as_deref(), Some("交接单"));
        assert!(doc.options.validate_nested);
        assert!(doc.registry().contains("double"));
        assert!(doc.registry().contains("SUM"));
    }

    #[test]
    fn test_parse_host_json_shape() {
        let json = r#"{"tables":[{"name":"出库通知单","fieldName":"outStock",
            "fields":[{"name":"编号","field":"id"},{"name":"姓名","field":"name"}]}]}"#;
        let doc = parse_document(json).unwrap();
        let index = doc.index();
        assert_eq!(index.column_letter("outStock", "name").as_deref(), Some("B"));
    }

    #[test]
    fn test_missing_tables_rejected() {
        let err = parse_document("functions: []").unwrap_err();
        assert!(err.to_string().contains("Schema validation failed"), "{err}");
    }

    #[test]
    fn test_field_without_code_rejected() {
        let doc = "tables:\n  - name: T\n    code: t\n    fields:\n      - name: a\n";
        assert!(parse_document(doc).is_err());
    }

    #[test]
    fn test_bad_code_key_rejected() {
        let doc = "tables:\n  - name: T\n    code: t\n    fields:\n      - { name: a, code: 'a-b' }\n";
        let err = parse_document(doc).unwrap_err();
        assert!(err.to_string().contains("not an identifier"), "{err}");
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let doc = "tables:\n  - name: T\n    code: t\n    fields:\n      - { name: a, code: x }\n      - { name: A, code: y }\n";
        let err = parse_document(doc).unwrap_err();
        assert!(err.to_string().contains("duplicate field"), "{err}");
    }

    #[test]
    fn test_unknown_default_table_rejected() {
        let doc = "tables: []\noptions:\n  default_table: nope\n";
        let err = parse_document(doc).unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }

    #[test]
    fn test_load_document_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(YAML_DOC.as_bytes()).unwrap();
        let doc = load_document(file.path()).unwrap();
        assert_eq!(doc.tables[0].code, "handOver");
    }

    #[test]
    fn test_sample_document() {
        let doc = SchemaDocument::sample();
        assert_eq!(doc.tables.len(), 2);
        assert!(doc.functions.is_empty());
        check_document(&doc).unwrap();
    }
}
