//! Reference normalizer: display syntax → canonical spreadsheet ranges
//!
//! | Display syntax              | Canonical form                  |
//! |-----------------------------|---------------------------------|
//! | `[T].@F.METHOD(args)`       | `METHOD('T'!C:C, args)`         |
//! | `[T].METHOD(args)`          | `METHOD('T'!A:Z, args)`         |
//! | `[T].F` / `[T].@F`          | `'T'!C:C` (`'T'!A:Z` unresolved) |
//! | `@F.METHOD(args)`           | `METHOD('Cur'!C:C, args)`       |
//! | `@F`, bare field name       | `'Cur'!C:C`                     |
//!
//! `C` is the letter of the field's position in its table. `Cur` is the
//! current table context supplied by the caller.

use super::columns::{self, column_index_to_letter};
use super::lexer::{tokenize, Token};
use crate::schema::SchemaIndex;

/// Rewrites display-syntax references against a schema index and the
/// current table context. Holds no state between calls.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'a> {
    index: &'a SchemaIndex,
    current_table: &'a str,
}

impl<'a> Normalizer<'a> {
    pub fn new(index: &'a SchemaIndex, current_table: &'a str) -> Self {
        Self {
            index,
            current_table,
        }
    }

    /// Rewrite a formula. A leading `=` is preserved when present.
    pub fn normalize(&self, formula: &str) -> String {
        let mut out = String::with_capacity(formula.len() + 16);
        for token in tokenize(formula) {
            self.rewrite(&token, &mut out);
        }
        out
    }

    /// Canonical formula for the evaluation engine, always `=`-prefixed
    pub fn canonical(&self, formula: &str) -> String {
        let normalized = self.normalize(formula.trim());
        if normalized.starts_with('=') {
            normalized
        } else {
            format!("={normalized}")
        }
    }

    fn rewrite(&self, token: &Token, out: &mut String) {
        match token {
            Token::TableRef(table) => {
                out.push('[');
                out.push_str(table);
                out.push(']');
            }
            Token::TableField { table, field } => out.push_str(&self.table_field_range(table, field)),
            Token::FieldRef(field) => out.push_str(&self.index.field_range(self.current_table, field)),
            Token::ChainedCall {
                table,
                field,
                method,
                args,
                closed,
            } => {
                let method = method.to_uppercase();
                let range = match (table, field) {
                    (Some(table), Some(field)) => self.chained_field_range(table, field),
                    (Some(table), None) => self.table_argument(table),
                    (None, Some(field)) => self.index.field_range(self.current_table, field),
                    (None, None) => String::new(),
                };
                self.write_call(&method, &range, args, *closed, out);
            }
            Token::Identifier { name, is_call } => {
                match self.current_field_range(name, *is_call) {
                    Some(range) => out.push_str(&range),
                    None => out.push_str(name),
                }
            }
            Token::Other(text) => out.push_str(text),
        }
    }

    /// Argument text is normalized again, so each character is scanned once
    /// per enclosing chained call. Ordinary parentheses do not recurse.
    fn write_call(&self, method: &str, range: &str, args: &str, closed: bool, out: &mut String) {
        out.push_str(method);
        out.push('(');
        out.push_str(range);
        let args = self.normalize(args);
        let args = args.trim();
        if !args.is_empty() {
            out.push_str(", ");
            out.push_str(args);
        }
        if closed {
            out.push(')');
        }
    }

    /// Sheet name for a bracketed table: its display name when known,
    /// otherwise the literal bracket text
    fn sheet_name<'t>(&'t self, table: &'t str) -> &'t str {
        match self.index.table(table) {
            Some(entry) => entry.name(),
            None => table,
        }
    }

    /// `[T].F`: field column, or the whole table when the field is unknown
    fn table_field_range(&self, table: &str, field: &str) -> String {
        match self.index.field(table, field) {
            Some((entry, pos, _)) => columns::index_range(entry.name(), pos),
            None => columns::table_range(self.sheet_name(table)),
        }
    }

    /// `[T].@F.M()`: field column, falling back to column `A`
    fn chained_field_range(&self, table: &str, field: &str) -> String {
        let letter = self
            .index
            .table(table)
            .and_then(|entry| entry.column_letter(field))
            .unwrap_or_else(|| column_index_to_letter(0));
        columns::column_range(self.sheet_name(table), &letter)
    }

    /// First argument for `[T].M()`: the whole table
    fn table_argument(&self, table: &str) -> String {
        columns::table_range(self.sheet_name(table))
    }

    /// Bare identifiers naming a field of the current table
    fn current_field_range(&self, name: &str, is_call: bool) -> Option<String> {
        if is_call {
            return None;
        }
        let entry = self.index.table(self.current_table)?;
        let pos = entry.field_position(name)?;
        Some(columns::index_range(entry.name(), pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Schema;
    use pretty_assertions::assert_eq;

    fn normalize(formula: &str, current: &str) -> String {
        let index = SchemaIndex::new(&Schema::sample());
        Normalizer::new(&index, current).normalize(formula)
    }

    #[test]
    fn test_table_field_at_first_column() {
        assert_eq!(normalize("[出库通知单].@编号", "Sheet1"), "'出库通知单'!A:A");
    }

    #[test]
    fn test_deeply_nested_chained_calls() {
        let depth = 64;
        let formula = format!("{}{}", "@金额.SUM(".repeat(depth), ")".repeat(depth));
        let expected = format!(
            "{}SUM('交接单'!C:C){}",
            "SUM('交接单'!C:C, ".repeat(depth - 1),
            ")".repeat(depth - 1)
        );
        assert_eq!(normalize(&formula, "交接单"), expected);
    }

    #[test]
    fn test_table_field_bare_and_code_key() {
        assert_eq!(normalize("[交接单].金额", "Sheet1"), "'交接单'!C:C");
        assert_eq!(normalize("[handOver].date", "Sheet1"), "'交接单'!D:D");
    }

    #[test]
    fn test_table_field_unresolved_field() {
        assert_eq!(normalize("[交接单].nope", "Sheet1"), "'交接单'!A:Z");
    }

    #[test]
    fn test_unknown_table_used_verbatim() {
        assert_eq!(normalize("[Other Sheet].x", "Sheet1"), "'Other Sheet'!A:Z");
        assert_eq!(normalize("[Other].@x.SUM()", "Sheet1"), "SUM('Other'!A:A)");
    }

    #[test]
    fn test_chained_table_field_method() {
        assert_eq!(
            normalize("=[交接单].@金额.sum(1)", "Sheet1"),
            "=SUM('交接单'!C:C, 1)"
        );
        assert_eq!(normalize("[交接单].@nope.SUM()", "Sheet1"), "SUM('交接单'!A:A)");
    }

    #[test]
    fn test_table_method() {
        assert_eq!(
            normalize("[交接单].COUNTIF(\">1\")", "Sheet1"),
            "COUNTIF('交接单'!A:Z, \">1\")"
        );
        assert_eq!(normalize("[交接单].filter()", "Sheet1"), "FILTER('交接单'!A:Z)");
    }

    #[test]
    fn test_field_chain_against_current_table() {
        assert_eq!(normalize("@金额.MAX()", "交接单"), "MAX('交接单'!C:C)");
        assert_eq!(normalize("@金额.MAX()", "Sheet1"), "MAX('Sheet1'!A:Z)");
    }

    #[test]
    fn test_field_ref_against_current_table() {
        assert_eq!(
            normalize("=IF(@金额 > 100, @客户编号, 0)", "交接单"),
            "=IF('交接单'!C:C > 100, '交接单'!B:B, 0)"
        );
    }

    #[test]
    fn test_bare_identifier_in_current_table() {
        assert_eq!(
            normalize("MIN(编号, amount)", "交接单"),
            "MIN('交接单'!A:A, '交接单'!C:C)"
        );
        // function names and unknown identifiers pass through
        assert_eq!(normalize("TODAY() + x", "交接单"), "TODAY() + x");
    }

    #[test]
    fn test_nested_args_normalized() {
        assert_eq!(
            normalize("[交接单].SUMIF(\">0\", @金额)", "交接单"),
            "SUMIF('交接单'!A:Z, \">0\", '交接单'!C:C)"
        );
    }

    #[test]
    fn test_string_literals_untouched() {
        assert_eq!(
            normalize("CONCAT(\"@金额\", @金额)", "交接单"),
            "CONCAT(\"@金额\", '交接单'!C:C)"
        );
    }

    #[test]
    fn test_partial_input_degrades() {
        assert_eq!(normalize("[交接单].SUM(@金额", "交接单"), "SUM('交接单'!A:Z, '交接单'!C:C");
        assert_eq!(normalize("SUM([交接单", "交接单"), "SUM([交接单");
        assert_eq!(normalize("[交接单]", "交接单"), "[交接单]");
    }

    #[test]
    fn test_canonical_adds_prefix() {
        let index = SchemaIndex::new(&Schema::sample());
        let normalizer = Normalizer::new(&index, "Sheet1");
        assert_eq!(normalizer.canonical(" 1+1 "), "=1+1");
        assert_eq!(normalizer.canonical("=1+1"), "=1+1");
    }

    #[test]
    fn test_canonical_output_is_stable() {
        let index = SchemaIndex::new(&Schema::sample());
        let normalizer = Normalizer::new(&index, "交接单");
        let once = normalizer.normalize("=SUM([交接单].@金额) + @日期");
        assert_eq!(normalizer.normalize(&once), once);
    }
}
