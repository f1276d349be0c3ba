//! Case-insensitive lookup index over a [`Schema`].
//!
//! Built once per schema revision. Every lookup is total: it returns `None`
//! for unknown names instead of failing.

use crate::core::columns::{self, column_index_to_letter};
use crate::types::{Field, Schema, Table};
use std::collections::HashMap;

/// A table together with its per-field index
#[derive(Debug, Clone)]
pub struct TableEntry {
    pub table: Table,
    /// lowercase display name / code key → field position
    fields: HashMap<String, usize>,
}

impl TableEntry {
    fn new(table: Table) -> Self {
        let mut fields = HashMap::new();
        for (pos, field) in table.fields.iter().enumerate() {
            fields.entry(field.name.to_lowercase()).or_insert(pos);
        }
        for (pos, field) in table.fields.iter().enumerate() {
            fields.entry(field.code.to_lowercase()).or_insert(pos);
        }
        Self { table, fields }
    }

    pub fn name(&self) -> &str {
        &self.table.name
    }

    pub fn code(&self) -> &str {
        &self.table.code
    }

    /// Position of a field by display name or code key
    pub fn field_position(&self, name: &str) -> Option<usize> {
        self.fields.get(&name.to_lowercase()).copied()
    }

    /// Field and its position by display name or code key
    pub fn field(&self, name: &str) -> Option<(usize, &Field)> {
        let pos = self.field_position(name)?;
        self.table.fields.get(pos).map(|field| (pos, field))
    }

    /// Field looked up by code key only
    pub fn field_by_code(&self, code: &str) -> Option<(usize, &Field)> {
        let code = code.to_lowercase();
        self.table
            .fields
            .iter()
            .enumerate()
            .find(|(_, f)| f.code.to_lowercase() == code)
    }

    /// Column letter of a field, `None` when the field is unknown
    pub fn column_letter(&self, name: &str) -> Option<String> {
        self.field_position(name).map(column_index_to_letter)
    }
}

/// Precomputed index from lowercase display names and code keys
#[derive(Debug, Clone, Default)]
pub struct SchemaIndex {
    entries: Vec<TableEntry>,
    /// lowercase display name / code key → entry position
    tables: HashMap<String, usize>,
    /// lowercase code key → entry position
    codes: HashMap<String, usize>,
}

impl SchemaIndex {
    pub fn new(schema: &Schema) -> Self {
        let entries: Vec<TableEntry> = schema.tables.iter().cloned().map(TableEntry::new).collect();

        let mut tables = HashMap::new();
        let mut codes = HashMap::new();
        for (pos, entry) in entries.iter().enumerate() {
            tables.entry(entry.name().to_lowercase()).or_insert(pos);
            codes.entry(entry.code().to_lowercase()).or_insert(pos);
        }
        for (pos, entry) in entries.iter().enumerate() {
            tables.entry(entry.code().to_lowercase()).or_insert(pos);
        }

        Self {
            entries,
            tables,
            codes,
        }
    }

    /// Table by display name or code key
    pub fn table(&self, name: &str) -> Option<&TableEntry> {
        self.tables
            .get(&name.trim().to_lowercase())
            .and_then(|&pos| self.entries.get(pos))
    }

    /// Table by code key only
    pub fn table_by_code(&self, code: &str) -> Option<&TableEntry> {
        self.codes
            .get(&code.trim().to_lowercase())
            .and_then(|&pos| self.entries.get(pos))
    }

    /// Field of a table, both looked up by display name or code key
    pub fn field(&self, table: &str, field: &str) -> Option<(&TableEntry, usize, &Field)> {
        let entry = self.table(table)?;
        let (pos, field) = entry.field(field)?;
        Some((entry, pos, field))
    }

    /// Column letter of `table.field`
    pub fn column_letter(&self, table: &str, field: &str) -> Option<String> {
        self.table(table)?.column_letter(field)
    }

    /// Single-column range of a field in `table`, or the whole-table range
    /// when the field cannot be positioned. Unknown tables keep their literal
    /// name as the sheet name.
    pub fn field_range(&self, table: &str, field: &str) -> String {
        let field = field.strip_prefix('@').unwrap_or(field);
        match self.table(table) {
            Some(entry) => match entry.field_position(field) {
                Some(pos) => columns::index_range(entry.name(), pos),
                None => columns::table_range(entry.name()),
            },
            None => columns::table_range(table),
        }
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<&Schema> for SchemaIndex {
    fn from(schema: &Schema) -> Self {
        Self::new(schema)
    }
}
