//! INDEX/MATCH lookup formula builder

use super::columns;
use crate::schema::SchemaIndex;

/// Build `=INDEX('T'!V:V, MATCH(key_expr, 'T'!K:K, 0))`, which returns the
/// `value_field` of the row whose `key_field` equals `key_expr`.
///
/// Fields are resolved by code key or display name. Returns `None` when the
/// table or either field is unknown.
pub fn build_lookup_formula(
    index: &SchemaIndex,
    table: &str,
    key_field: &str,
    key_expr: &str,
    value_field: &str,
) -> Option<String> {
    let entry = index.table(table)?;
    let key_pos = entry.field_position(key_field)?;
    let value_pos = entry.field_position(value_field)?;

    let key_range = columns::index_range(entry.name(), key_pos);
    let value_range = columns::index_range(entry.name(), value_pos);

    Some(format!(
        "=INDEX({value_range}, MATCH({}, {key_range}, 0))",
        key_expr.trim()
    ))
}
