//! Formula session: the host-facing context object
//!
//! A session owns the schema index, the function registry, the evaluation
//! engine and the options. It is immutable once built; a new schema revision
//! means a new session. Wrap it in an `Arc` to share across threads.

use crate::config::Options;
use crate::core::{
    build_lookup_formula, markers_for, strip_spaces, FieldKeyTransformer, Marker, Normalizer,
    SignatureValidator,
};
use crate::engine::{ComputeOutcome, EngineValue, FormulaEngine, XlFormulaEngine};
use crate::error::BridgeResult;
use crate::functions::FunctionRegistry;
use crate::schema::{load_document, SchemaDocument, SchemaIndex};
use crate::types::{FormulaError, FormulaErrorKind};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Result of the validate-and-preview flow for one formula
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheckReport {
    /// Canonical text handed to the engine, `=`-prefixed
    pub canonical: String,
    /// Signature errors (at most one unless all errors are collected)
    pub validation: Vec<FormulaError>,
    /// Engine parse errors
    pub parse_errors: Vec<FormulaError>,
    /// Parse errors placed on the original text
    pub markers: Vec<Marker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<EngineValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compute_error: Option<FormulaError>,
}

impl CheckReport {
    /// No signature, parse or compute error
    pub fn is_ok(&self) -> bool {
        self.validation.is_empty() && self.parse_errors.is_empty() && self.compute_error.is_none()
    }

    /// Validation message for display, empty when valid
    pub fn validation_message(&self) -> String {
        self.validation
            .first()
            .map(|e| e.message.clone())
            .unwrap_or_default()
    }
}

pub struct FormulaSession {
    index: Arc<SchemaIndex>,
    registry: Arc<FunctionRegistry>,
    engine: Box<dyn FormulaEngine>,
    options: Options,
}

impl FormulaSession {
    /// Session over a schema document, evaluated with [`XlFormulaEngine`]
    pub fn new(document: &SchemaDocument) -> BridgeResult<Self> {
        let index = Arc::new(document.index());
        let engine = XlFormulaEngine::new(Arc::clone(&index))?;
        Ok(Self {
            index,
            registry: Arc::new(document.registry()),
            engine: Box::new(engine),
            options: document.options.clone(),
        })
    }

    /// Session over a schema document file
    pub fn from_path(path: &Path) -> BridgeResult<Self> {
        let document = load_document(path)?;
        Self::new(&document)
    }

    /// Session over the built-in sample schema
    pub fn sample() -> BridgeResult<Self> {
        Self::new(&SchemaDocument::sample())
    }

    /// Session with a caller-supplied engine
    pub fn with_engine(
        index: Arc<SchemaIndex>,
        registry: Arc<FunctionRegistry>,
        engine: Box<dyn FormulaEngine>,
        options: Options,
    ) -> Self {
        Self {
            index,
            registry,
            engine,
            options,
        }
    }

    /// Replace the options, keeping schema and engine
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn index(&self) -> &SchemaIndex {
        &self.index
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    fn normalizer<'a>(&'a self, table: Option<&'a str>) -> Normalizer<'a> {
        Normalizer::new(&self.index, self.options.context_table(table))
    }

    fn validator(&self) -> SignatureValidator<'_> {
        SignatureValidator::new(&self.registry).nested(self.options.validate_nested)
    }

    /// Canonical text, keeping the input's `=` prefix (or lack of one)
    pub fn normalize(&self, raw: &str, table: Option<&str>) -> String {
        self.normalizer(table).normalize(raw)
    }

    /// Canonical text, always `=`-prefixed
    pub fn canonical(&self, raw: &str, table: Option<&str>) -> String {
        self.normalizer(table).canonical(raw)
    }

    /// First signature error in scan order
    pub fn validate(&self, raw: &str, table: Option<&str>) -> Option<FormulaError> {
        self.validator().validate(&self.normalize(raw, table))
    }

    /// Every signature error in scan order
    pub fn validate_all(&self, raw: &str, table: Option<&str>) -> Vec<FormulaError> {
        self.validator().validate_all(&self.normalize(raw, table))
    }

    /// First signature error as text, empty when the formula is valid
    pub fn validation_message(&self, raw: &str, table: Option<&str>) -> String {
        self.validate(raw, table)
            .map(|e| e.message)
            .unwrap_or_default()
    }

    /// Normalize, validate, parse and (when parsing succeeds) compute a
    /// preview. Blank input gives an empty report.
    pub fn check(&self, raw: &str, table: Option<&str>) -> CheckReport {
        if raw.trim().is_empty() {
            return CheckReport::default();
        }

        let canonical = self.canonical(raw, table);
        let validation = if self.options.collect_all_errors {
            self.validator().validate_all(&canonical)
        } else {
            self.validator().validate(&canonical).into_iter().collect()
        };

        let parsed = self.engine.parse(&canonical);
        debug!(
            canonical = %canonical,
            parse_ok = parsed.ok,
            validation_errors = validation.len(),
            "checked formula"
        );

        if !parsed.ok {
            let markers = markers_for(&parsed.errors, raw);
            let parse_errors = parsed
                .errors
                .into_iter()
                .map(|e| FormulaError::new(FormulaErrorKind::EngineParse, e.message))
                .collect();
            return CheckReport {
                canonical,
                validation,
                parse_errors,
                markers,
                ..CheckReport::default()
            };
        }

        let (preview, compute_error) = match self.engine.compute(&canonical) {
            ComputeOutcome::Value(value) => (Some(value), None),
            ComputeOutcome::Error(message) => (
                None,
                Some(FormulaError::new(FormulaErrorKind::EngineCompute, message)),
            ),
        };

        CheckReport {
            canonical,
            validation,
            preview,
            compute_error,
            ..CheckReport::default()
        }
    }

    /// Stored form of a formula: code keys, trimmed, and with spaces outside
    /// string literals removed when configured
    pub fn commit(&self, raw: &str, table: Option<&str>) -> String {
        let transformer =
            FieldKeyTransformer::new(&self.index, &self.registry, self.options.key_table(table));
        let keyed = transformer.transform(raw.trim());
        if self.options.strip_spaces_on_commit {
            strip_spaces(&keyed)
        } else {
            keyed
        }
    }

    /// INDEX/MATCH lookup formula, `None` when the table or a field is unknown
    pub fn lookup(
        &self,
        table: &str,
        key_field: &str,
        key_expr: &str,
        value_field: &str,
    ) -> Option<String> {
        build_lookup_formula(&self.index, table, key_field, key_expr, value_field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineError, ParseOutcome};
    use crate::types::Schema;
    use pretty_assertions::assert_eq;

    struct RejectingEngine;

    impl FormulaEngine for RejectingEngine {
        fn parse(&self, _formula: &str) -> ParseOutcome {
            ParseOutcome::failed(vec![EngineError::new("unexpected token").at(1)])
        }

        fn compute(&self, _formula: &str) -> ComputeOutcome {
            panic!("compute must not run after a parse error");
        }
    }

    fn rejecting_session() -> FormulaSession {
        FormulaSession::with_engine(
            Arc::new(SchemaIndex::new(&Schema::sample())),
            Arc::new(FunctionRegistry::builtin()),
            Box::new(RejectingEngine),
            Options::default(),
        )
    }

    #[test]
    fn test_blank_input_gives_empty_report() {
        let session = FormulaSession::sample().unwrap();
        assert_eq!(session.check("   ", None), CheckReport::default());
        assert!(session.check("", None).is_ok());
    }

    #[test]
    fn test_parse_error_stops_before_compute() {
        let session = rejecting_session();
        let report = session.check("=SUM(@金额", Some("交接单"));
        assert_eq!(report.parse_errors.len(), 1);
        assert_eq!(report.parse_errors[0].kind, FormulaErrorKind::EngineParse);
        assert_eq!(report.markers[0].start, 1);
        assert!(report.preview.is_none());
        assert!(!report.is_ok());
    }

    #[test]
    fn test_validation_message() {
        let session = FormulaSession::sample().unwrap();
        assert_eq!(session.validation_message("=SUM(1)", None), "");
        assert_eq!(
            session.validation_message("=FOO(1)", None),
            "unknown function: FOO"
        );
    }

    #[test]
    fn test_collect_all_errors_option() {
        let options = Options {
            collect_all_errors: true,
            ..Options::default()
        };
        let session = FormulaSession::sample().unwrap().with_options(options);
        let report = session.check("=FOO(1)+BAR(2)", None);
        assert_eq!(report.validation.len(), 2);
        assert_eq!(report.validation_message(), "unknown function: FOO");
    }

    #[test]
    fn test_commit_strips_spaces_outside_strings() {
        let session = FormulaSession::sample().unwrap();
        assert_eq!(
            session.commit("  IF(@金额 > 1, \"a b\", 0) ", Some("交接单")),
            "IF([handOver.amount]>1,\"a b\",0)"
        );
    }

    #[test]
    fn test_commit_keeps_spaces_when_disabled() {
        let options = Options {
            strip_spaces_on_commit: false,
            ..Options::default()
        };
        let session = FormulaSession::sample().unwrap().with_options(options);
        assert_eq!(
            session.commit("@金额 + 1", Some("交接单")),
            "[handOver.amount] + 1"
        );
    }

    #[test]
    fn test_default_table_from_options() {
        let options = Options {
            default_table: Some("交接单".to_string()),
            ..Options::default()
        };
        let session = FormulaSession::sample().unwrap().with_options(options);
        assert_eq!(session.normalize("@金额", None), "'交接单'!C:C");
        assert_eq!(session.commit("@金额", None), "[handOver.amount]");
    }

    #[test]
    fn test_lookup() {
        let session = FormulaSession::sample().unwrap();
        assert_eq!(
            session.lookup("交接单", "id", "A2", "amount").as_deref(),
            Some("=INDEX('交接单'!C:C, MATCH(A2, '交接单'!A:A, 0))")
        );
    }
}
