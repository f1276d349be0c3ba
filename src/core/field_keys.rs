//! Field-key transformer: display names → `[tableCode.fieldCode]`
//!
//! Produces the persisted form of a formula. Unlike the normalizer this is a
//! single character scan that carries the most recent `[Table]` forward as
//! the context for later `@Field` and bare field tokens.

use super::lexer::{is_field_char, is_ident_start};
use crate::functions::FunctionRegistry;
use crate::schema::SchemaIndex;

/// Rewrites references to stable code keys. Unresolved tokens are left
/// exactly as written; this transform never reports errors.
#[derive(Debug, Clone, Copy)]
pub struct FieldKeyTransformer<'a> {
    index: &'a SchemaIndex,
    registry: &'a FunctionRegistry,
    default_table: Option<&'a str>,
}

impl<'a> FieldKeyTransformer<'a> {
    pub fn new(
        index: &'a SchemaIndex,
        registry: &'a FunctionRegistry,
        default_table: Option<&'a str>,
    ) -> Self {
        Self {
            index,
            registry,
            default_table,
        }
    }

    /// `[tableCode.fieldCode]` for a field of `table`
    fn key_for(&self, table: &str, field: &str) -> Option<String> {
        let (entry, _, field) = self.index.field(table, field)?;
        Some(format!("[{}.{}]", entry.code(), field.code))
    }

    /// Table name of an already code-keyed `[table.field]` bracket
    fn code_keyed_table(&self, content: &str) -> Option<String> {
        if self.index.table(content).is_some() {
            return None;
        }
        let (table, field) = content.split_once('.')?;
        let entry = self.index.table_by_code(table)?;
        entry.field_by_code(field)?;
        Some(entry.name().to_string())
    }

    pub fn transform(&self, formula: &str) -> String {
        let s: Vec<char> = formula.chars().collect();
        let n = s.len();
        let text = |from: usize, to: usize| -> String { s[from..to].iter().collect() };
        let skip_ws = |mut k: usize| -> usize {
            while k < n && s[k].is_whitespace() {
                k += 1;
            }
            k
        };
        let field_end = |mut k: usize| -> usize {
            while k < n && is_field_char(s[k]) {
                k += 1;
            }
            k
        };

        let mut out = String::with_capacity(formula.len());
        let mut current_table: Option<String> = None;
        let mut i = 0;

        while i < n {
            let ch = s[i];

            if ch == '"' || ch == '\'' {
                let mut j = i + 1;
                while j < n && s[j] != ch {
                    j += 1;
                }
                let end = (j + 1).min(n);
                out.push_str(&text(i, end));
                i = end;
                continue;
            }

            if ch == '[' {
                let Some(close) = (i + 1..n).find(|&j| s[j] == ']') else {
                    out.push_str(&text(i, n));
                    break;
                };
                let table = text(i + 1, close);

                if let Some(name) = self.code_keyed_table(&table) {
                    out.push_str(&text(i, close + 1));
                    current_table = Some(name);
                    i = close + 1;
                    continue;
                }

                let mut k = skip_ws(close + 1);
                if k < n && s[k] == '.' {
                    k = skip_ws(k + 1);
                    if k < n && s[k] == '@' {
                        let m = field_end(k + 1);
                        let display = text(k + 1, m);
                        match self.key_for(&table, &display) {
                            Some(key) => out.push_str(&key),
                            None => out.push_str(&text(i, m)),
                        }
                        current_table = Some(table);
                        i = m;
                        continue;
                    }
                    if k < n && is_ident_start(s[k]) {
                        let m = field_end(k);
                        let name = text(k, m);
                        let is_call = skip_ws(m) < n && s[skip_ws(m)] == '(';
                        if !is_call {
                            if let Some(key) = self.key_for(&table, &name) {
                                out.push_str(&key);
                                current_table = Some(table);
                                i = m;
                                continue;
                            }
                        }
                    }
                }

                out.push_str(&text(i, close + 1));
                current_table = Some(table);
                i = close + 1;
                continue;
            }

            if ch == '@' {
                let m = field_end(i + 1);
                let display = text(i + 1, m);
                let table = current_table.as_deref().or(self.default_table);
                match table.and_then(|t| self.key_for(t, &display)) {
                    Some(key) => out.push_str(&key),
                    None => out.push_str(&text(i, m.max(i + 1))),
                }
                i = m.max(i + 1);
                continue;
            }

            if is_ident_start(ch) {
                let m = field_end(i);
                let token = text(i, m);
                let next = skip_ws(m);
                let is_function = self.registry.contains(&token) || (next < n && s[next] == '(');
                if !is_function {
                    let table = current_table.as_deref().or(self.default_table);
                    if let Some(key) = table.and_then(|t| self.key_for(t, &token)) {
                        out.push_str(&key);
                        i = m;
                        continue;
                    }
                }
                out.push_str(&token);
                i = m;
                continue;
            }

            if ch.is_ascii_digit() {
                let mut m = i;
                while m < n && (s[m].is_ascii_alphanumeric() || s[m] == '.') {
                    m += 1;
                }
                out.push_str(&text(i, m));
                i = m;
                continue;
            }

            out.push(ch);
            i += 1;
        }

        out
    }
}

/// Remove spaces outside double-quoted string literals
pub fn strip_spaces(formula: &str) -> String {
    let mut out = String::with_capacity(formula.len());
    let mut in_string = false;
    for c in formula.chars() {
        if c == '"' {
            in_string = !in_string;
        }
        if c == ' ' && !in_string {
            continue;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Schema;
    use pretty_assertions::assert_eq;

    fn transform(formula: &str, default_table: Option<&str>) -> String {
        let index = SchemaIndex::new(&Schema::sample());
        let registry = FunctionRegistry::builtin();
        FieldKeyTransformer::new(&index, &registry, default_table).transform(formula)
    }

    #[test]
    fn test_table_field_to_code_keys() {
        assert_eq!(transform("[出库通知单].@编号", None), "[outStock.id]");
    }

    #[test]
    fn test_at_field_uses_current_table() {
        assert_eq!(
            transform("=[交接单].@金额 + @日期", None),
            "=[handOver.amount] + [handOver.date]"
        );
    }

    #[test]
    fn test_at_field_uses_default_table() {
        assert_eq!(transform("SUM(@姓名)", Some("出库通知单")), "SUM([outStock.name])");
        assert_eq!(transform("SUM(@姓名)", None), "SUM(@姓名)");
    }

    #[test]
    fn test_bracket_context_overrides_default() {
        assert_eq!(
            transform("[交接单] + @编号", Some("出库通知单")),
            "[交接单] + [handOver.id]"
        );
    }

    #[test]
    fn test_bare_identifiers() {
        assert_eq!(
            transform("MIN(编号, 金额)", Some("交接单")),
            "MIN([handOver.id], [handOver.amount])"
        );
        // function names are never treated as fields
        assert_eq!(transform("TODAY() - 日期", Some("交接单")), "TODAY() - [handOver.date]");
    }

    #[test]
    fn test_table_bare_field_after_dot() {
        assert_eq!(transform("[交接单].金额 * 2", None), "[handOver.amount] * 2");
    }

    #[test]
    fn test_field_code_shared_with_function_name() {
        // `date` is also the DATE function; after `[T].` without `(` it is a field
        assert_eq!(transform("[交接单].date", None), "[handOver.date]");
        assert_eq!(transform("[交接单].DATE + 1", None), "[handOver.date] + 1");
        assert_eq!(transform("[交接单].date(1)", None), "[交接单].date(1)");
    }

    #[test]
    fn test_table_method_left_in_place() {
        assert_eq!(
            transform("[交接单].SUM(@金额)", None),
            "[交接单].SUM([handOver.amount])"
        );
    }

    #[test]
    fn test_unresolved_left_untouched() {
        assert_eq!(transform("[交接单].@nope", None), "[交接单].@nope");
        assert_eq!(transform("@nope + x", Some("交接单")), "@nope + x");
        assert_eq!(transform("[Unknown].@编号", None), "[Unknown].@编号");
    }

    #[test]
    fn test_strings_untouched() {
        assert_eq!(
            transform("IF(@金额 > 1, \"金额\", '编号')", Some("交接单")),
            "IF([handOver.amount] > 1, \"金额\", '编号')"
        );
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "[出库通知单].@编号",
            "=[交接单].@金额 + @日期 * 编号",
            "SUM(@姓名, [交接单].金额)",
            "[交接单].@nope + @客户编号",
        ];
        for input in inputs {
            let once = transform(input, Some("出库通知单"));
            let twice = transform(&once, Some("出库通知单"));
            assert_eq!(twice, once, "input: {input}");
        }
    }

    #[test]
    fn test_malformed_input_passes_through() {
        assert_eq!(transform("SUM([交接单", None), "SUM([交接单");
        assert_eq!(transform("\"abc", None), "\"abc");
        assert_eq!(transform("@", Some("交接单")), "@");
    }

    #[test]
    fn test_strip_spaces_outside_strings() {
        assert_eq!(strip_spaces("IF( x > 1, \"a b\", 2 )"), "IF(x>1,\"a b\",2)");
    }
}
