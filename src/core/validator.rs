//! Static signature validation of extracted calls

use super::extractor::{locate_calls, LocatedCall};
use crate::functions::{FunctionRegistry, FunctionSpec};
use crate::types::{ExtractedCall, FormulaError, FormulaErrorKind, Span};

/// Checks call arity against a function registry.
///
/// Runs over canonical (already normalized) formula text so that table method
/// calls such as `[T].SUM(x)` are counted with their implicit range argument.
#[derive(Debug, Clone, Copy)]
pub struct SignatureValidator<'a> {
    registry: &'a FunctionRegistry,
    nested: bool,
}

impl<'a> SignatureValidator<'a> {
    pub fn new(registry: &'a FunctionRegistry) -> Self {
        Self {
            registry,
            nested: false,
        }
    }

    /// Also validate calls nested inside arguments (after their parent)
    pub fn nested(mut self, nested: bool) -> Self {
        self.nested = nested;
        self
    }

    /// First violation in scan order, `None` when every call is valid.
    ///
    /// Spans are character offsets into `body` as given.
    pub fn validate(&self, body: &str) -> Option<FormulaError> {
        self.first(body, 0)
    }

    fn first(&self, text: &str, base: usize) -> Option<FormulaError> {
        let (body, skipped) = formula_body(text);
        let base = base + skipped;
        for located in locate_calls(body) {
            if let Some(error) = self.check_call(&located.call) {
                return Some(error.with_span(call_span(&located, base)));
            }
            if self.nested {
                for (arg, offset) in located.call.args.iter().zip(&located.arg_offsets) {
                    if let Some(error) = self.first(arg, base + offset) {
                        return Some(error);
                    }
                }
            }
        }
        None
    }

    /// Every violation in scan order. The first element always equals
    /// [`validate`](Self::validate).
    pub fn validate_all(&self, body: &str) -> Vec<FormulaError> {
        let mut errors = Vec::new();
        self.collect(body, 0, &mut errors);
        errors
    }

    fn collect(&self, text: &str, base: usize, errors: &mut Vec<FormulaError>) {
        let (body, skipped) = formula_body(text);
        let base = base + skipped;
        for located in locate_calls(body) {
            if let Some(error) = self.check_call(&located.call) {
                errors.push(error.with_span(call_span(&located, base)));
            }
            if self.nested {
                for (arg, offset) in located.call.args.iter().zip(&located.arg_offsets) {
                    self.collect(arg, base + offset, errors);
                }
            }
        }
    }

    /// Validate a single call
    pub fn check_call(&self, call: &ExtractedCall) -> Option<FormulaError> {
        let Some(spec) = self.registry.get(&call.name) else {
            return Some(FormulaError::unknown_function(&call.name));
        };
        arity_error(&call.name, spec, call.arg_count())
    }
}

/// Body without surrounding whitespace and leading `=`, plus the number of
/// characters dropped from the front
fn formula_body(text: &str) -> (&str, usize) {
    let trimmed = text.trim_start();
    let mut skipped = text.chars().count() - trimmed.chars().count();
    let body = match trimmed.strip_prefix('=') {
        Some(rest) => {
            skipped += 1;
            rest
        }
        None => trimmed,
    };
    (body.trim_end(), skipped)
}

fn call_span(located: &LocatedCall, base: usize) -> Span {
    Span::Range {
        start: base + located.start,
        end: base + located.end,
    }
}

fn arity_error(name: &str, spec: &FunctionSpec, count: usize) -> Option<FormulaError> {
    let min = spec.min_args();
    if count < min {
        return Some(FormulaError::new(
            FormulaErrorKind::Arity,
            format!("function {name} requires at least {min} arguments, got {count}"),
        ));
    }
    match spec.max_args() {
        Some(max) if count > max => Some(FormulaError::new(
            FormulaErrorKind::Arity,
            format!(
                "function {name} accepts at most {} arguments, got {count}",
                describe_max(Some(max))
            ),
        )),
        _ => None,
    }
}

/// Upper bound as shown to users
pub fn describe_max(max: Option<usize>) -> String {
    match max {
        Some(max) => max.to_string(),
        None => "unlimited".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::FunctionRegistry;

    fn validate(body: &str) -> Option<FormulaError> {
        let registry = FunctionRegistry::builtin();
        SignatureValidator::new(&registry).validate(body)
    }

    #[test]
    fn test_valid_formula() {
        assert_eq!(validate("=IF(1, 2, 3)"), None);
        assert_eq!(validate("SUM()"), None);
        assert_eq!(validate("1 + 2"), None);
    }

    #[test]
    fn test_if_requires_three() {
        let err = validate("IF(1,2)").unwrap();
        assert_eq!(err.kind, FormulaErrorKind::Arity);
        assert!(err.message.contains("at least 3"), "{}", err.message);
        assert!(err.message.contains("got 2"));
    }

    #[test]
    fn test_too_many_arguments() {
        let err = validate("NOT(1, 2)").unwrap();
        assert_eq!(err.kind, FormulaErrorKind::Arity);
        assert_eq!(err.message, "function NOT accepts at most 1 arguments, got 2");
    }

    #[test]
    fn test_unknown_function() {
        let err = validate("foo(1)").unwrap();
        assert_eq!(err.kind, FormulaErrorKind::UnknownFunction);
        assert_eq!(err.message, "unknown function: foo");
    }

    #[test]
    fn test_lowercase_known_function() {
        assert_eq!(validate("sum(1, 2)"), None);
    }

    #[test]
    fn test_variadic_any_count() {
        for n in 2..12 {
            let args = vec!["1"; n].join(",");
            assert_eq!(validate(&format!("OR({args})")), None, "OR with {n}");
        }
        assert!(validate("OR(1)").is_some());
    }

    #[test]
    fn test_fail_fast_reports_first() {
        let err = validate("FOO(1) + IF(1)").unwrap();
        assert_eq!(err.kind, FormulaErrorKind::UnknownFunction);
    }

    #[test]
    fn test_nested_not_checked_by_default() {
        assert_eq!(validate("IF(FOO(1), 2, 3)"), None);
        let registry = FunctionRegistry::builtin();
        let err = SignatureValidator::new(&registry)
            .nested(true)
            .validate("IF(FOO(1), 2, 3)")
            .unwrap();
        assert_eq!(err.message, "unknown function: FOO");
    }

    #[test]
    fn test_validate_all_first_matches_fail_fast() {
        let registry = FunctionRegistry::builtin();
        let validator = SignatureValidator::new(&registry).nested(true);
        let body = "IF(1) + NOT(FOO(), 2) + BAR()";
        let all = validator.validate_all(body);
        assert_eq!(all.len(), 4);
        assert_eq!(Some(all[0].clone()), validator.validate(body));
        assert_eq!(all[2].message, "unknown function: FOO");
    }

    #[test]
    fn test_error_span_covers_call() {
        let err = validate("= 1 + IF(1, 2)").unwrap();
        assert_eq!(err.span, Some(Span::Range { start: 6, end: 14 }));
    }

    #[test]
    fn test_nested_error_span() {
        let registry = FunctionRegistry::builtin();
        let err = SignatureValidator::new(&registry)
            .nested(true)
            .validate("=IF(1, NOT(), 3)")
            .unwrap();
        assert_eq!(err.message, "function NOT requires at least 1 arguments, got 0");
        assert_eq!(err.span, Some(Span::Range { start: 7, end: 12 }));
    }

    #[test]
    fn test_sheet_name_is_not_a_call() {
        assert_eq!(validate("=SUM('Orders(2024)'!A:A)"), None);
        assert_eq!(validate("='Orders(2024)'!A:A + 1"), None);
    }

    #[test]
    fn test_describe_max() {
        assert_eq!(describe_max(None), "unlimited");
        assert_eq!(describe_max(Some(2)), "2");
    }
}
