//! Spreadsheet column letters and canonical range text

/// Column span used when a whole table is referenced
pub const WHOLE_TABLE: &str = "A:Z";

/// Convert a zero-based column index to spreadsheet letters
///
/// Examples:
/// - 0 → A
/// - 1 → B
/// - 25 → Z
/// - 26 → AA
pub fn column_index_to_letter(index: usize) -> String {
    let mut result = String::new();
    let mut idx = index;

    loop {
        let remainder = idx % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }

    result
}

/// Convert spreadsheet letters back to a zero-based column index
///
/// Returns `None` for anything but uppercase ASCII letters.
pub fn column_letter_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() || !letters.bytes().all(|b| b.is_ascii_uppercase()) {
        return None;
    }
    let value = letters
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + (b - b'A') as usize + 1);
    Some(value - 1)
}

/// Quote a sheet name, doubling embedded single quotes
pub fn quote_sheet(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// `'Sheet'!C:C`
pub fn column_range(sheet: &str, letter: &str) -> String {
    format!("{}!{letter}:{letter}", quote_sheet(sheet))
}

/// `'Sheet'!C:C` for a zero-based column index
pub fn index_range(sheet: &str, index: usize) -> String {
    column_range(sheet, &column_index_to_letter(index))
}

/// `'Sheet'!A:Z`
pub fn table_range(sheet: &str) -> String {
    format!("{}!{WHOLE_TABLE}", quote_sheet(sheet))
}
