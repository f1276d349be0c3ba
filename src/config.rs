//! Behaviour options for a formula session
//!
//! Options are read from the `options:` section of a schema document and can
//! be overridden from the command line.

use serde::{Deserialize, Serialize};

/// Sheet used when neither the caller nor the options name a table
pub const DEFAULT_FALLBACK_SHEET: &str = "Sheet1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Table context used when a call does not supply one
    pub default_table: Option<String>,
    /// Sheet name for `@Field` ranges when there is no table context at all
    pub fallback_sheet: String,
    /// Validate calls nested in arguments, not just the outermost ones
    pub validate_nested: bool,
    /// Report every arity error instead of stopping at the first
    pub collect_all_errors: bool,
    /// Remove spaces outside string literals from stored formulas
    pub strip_spaces_on_commit: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            default_table: None,
            fallback_sheet: DEFAULT_FALLBACK_SHEET.to_string(),
            validate_nested: false,
            collect_all_errors: false,
            strip_spaces_on_commit: true,
        }
    }
}

impl Options {
    /// Table context for the normalizer: explicit, then default, then the
    /// fallback sheet
    pub fn context_table<'a>(&'a self, explicit: Option<&'a str>) -> &'a str {
        explicit
            .filter(|t| !t.trim().is_empty())
            .or(self.default_table.as_deref())
            .unwrap_or(&self.fallback_sheet)
    }

    /// Table context for the field-key transformer, which has no sheet
    /// fallback
    pub fn key_table<'a>(&'a self, explicit: Option<&'a str>) -> Option<&'a str> {
        explicit
            .filter(|t| !t.trim().is_empty())
            .or(self.default_table.as_deref())
    }

    /// Apply a command-line table override
    pub fn with_default_table(mut self, table: Option<String>) -> Self {
        if table.is_some() {
            self.default_table = table;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.fallback_sheet, "Sheet1");
        assert!(options.strip_spaces_on_commit);
        assert!(!options.validate_nested);
        assert!(!options.collect_all_errors);
    }

    #[test]
    fn test_context_table_precedence() {
        let options = Options::default();
        assert_eq!(options.context_table(None), "Sheet1");
        assert_eq!(options.context_table(Some("交接单")), "交接单");
        assert_eq!(options.context_table(Some("  ")), "Sheet1");

        let options = options.with_default_table(Some("出库通知单".to_string()));
        assert_eq!(options.context_table(None), "出库通知单");
        assert_eq!(options.context_table(Some("交接单")), "交接单");
        assert_eq!(options.key_table(None), Some("出库通知单"));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let options: Options = serde_yaml::from_str("validate_nested: true").unwrap();
        assert!(options.validate_nested);
        assert_eq!(options.fallback_sheet, "Sheet1");
    }

    #[test]
    fn test_override_none_keeps_default_table() {
        let options = Options {
            default_table: Some("交接单".to_string()),
            ..Options::default()
        };
        let options = options.with_default_table(None);
        assert_eq!(options.default_table.as_deref(), Some("交接单"));
    }
}
