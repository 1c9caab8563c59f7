use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::formatter::ELLIPSIS;
use crate::value::{CellValue, Row};

/// Flag set on rows that had at least one value truncated.
pub const TRUNCATED_FIELD: &str = "_truncated";

/// Options for [`cleanup_data_for_memory`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupOptions {
    /// Strings longer than this many bytes are cut and marked.
    pub max_bytes: usize,
    /// Fields dropped from every row.
    pub remove_fields: BTreeSet<String>,
    /// Also drop fields whose value is empty (blank strings, empty lists).
    pub skip_empty: bool,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        CleanupOptions {
            max_bytes: 1000,
            remove_fields: BTreeSet::new(),
            skip_empty: false,
        }
    }
}

impl CleanupOptions {
    pub fn max_bytes(mut self, bytes: usize) -> Self {
        self.max_bytes = bytes;
        self
    }

    pub fn remove_field(mut self, field: impl Into<String>) -> Self {
        self.remove_fields.insert(field.into());
        self
    }

    pub fn skip_empty(mut self) -> Self {
        self.skip_empty = true;
        self
    }
}

/// Shrinks rows before they are held for rendering.
///
/// Strings are trimmed, nulls and listed fields are dropped, and strings over
/// `max_bytes` are cut at a character boundary and suffixed with `...`. Rows
/// with a cut value gain `_truncated: true`.
pub fn cleanup_data_for_memory(rows: &[Row], options: &CleanupOptions) -> Vec<Row> {
    rows.iter().map(|row| cleanup_row(row, options)).collect()
}

fn cleanup_row(row: &Row, options: &CleanupOptions) -> Row {
    let mut truncated = false;
    let mut out = Row::new();

    for (key, value) in row {
        if value.is_null() || options.remove_fields.contains(key) {
            continue;
        }
        if options.skip_empty && value.is_empty() {
            continue;
        }
        out.insert(key.clone(), cleanup_value(value, options.max_bytes, &mut truncated));
    }

    if truncated {
        out.insert(TRUNCATED_FIELD.to_string(), CellValue::Bool(true));
    }
    out
}

fn cleanup_value(value: &CellValue, max_bytes: usize, truncated: &mut bool) -> CellValue {
    match value {
        CellValue::String(s) => {
            let trimmed = s.trim();
            if trimmed.len() > max_bytes {
                *truncated = true;
                CellValue::String(format!("{}{}", cut_at_boundary(trimmed, max_bytes), ELLIPSIS))
            } else {
                CellValue::String(trimmed.to_string())
            }
        }
        CellValue::List(items) => CellValue::List(
            items
                .iter()
                .map(|v| cleanup_value(v, max_bytes, truncated))
                .collect(),
        ),
        CellValue::Map(map) => CellValue::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), cleanup_value(v, max_bytes, truncated)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn cut_at_boundary(s: &str, max_bytes: usize) -> &str {
    let mut end = max_bytes.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::row;

    #[test]
    fn trims_and_drops_nulls() {
        let rows = vec![row([
            ("name", CellValue::from("  Ann ")),
            ("gone", CellValue::Null),
            ("blank", CellValue::from("  ")),
        ])];
        let out = cleanup_data_for_memory(&rows, &CleanupOptions::default());
        assert_eq!(out[0]["name"], CellValue::from("Ann"));
        assert!(!out[0].contains_key("gone"));
        assert_eq!(out[0]["blank"], CellValue::from(""));
        assert!(!out[0].contains_key(TRUNCATED_FIELD));
    }

    #[test]
    fn skip_empty_and_listed_fields() {
        let rows = vec![row([("a", ""), ("b", "x"), ("secret", "s")])];
        let options = CleanupOptions::default().skip_empty().remove_field("secret");
        let out = cleanup_data_for_memory(&rows, &options);
        assert_eq!(out[0].keys().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn long_strings_are_cut_and_flagged() {
        let rows = vec![row([("note", "abcdefghij")])];
        let out = cleanup_data_for_memory(&rows, &CleanupOptions::default().max_bytes(4));
        assert_eq!(out[0]["note"], CellValue::from("abcd..."));
        assert_eq!(out[0][TRUNCATED_FIELD], CellValue::Bool(true));
    }

    #[test]
    fn cuts_respect_char_boundaries() {
        // Each kana is three bytes.
        let rows = vec![row([("note", "あいうえお")])];
        let out = cleanup_data_for_memory(&rows, &CleanupOptions::default().max_bytes(4));
        assert_eq!(out[0]["note"], CellValue::from("あ..."));
    }

    #[test]
    fn nested_values_are_cleaned() {
        let rows = vec![row([(
            "items",
            CellValue::List(vec![CellValue::from(" a "), CellValue::from("long value")]),
        )])];
        let out = cleanup_data_for_memory(&rows, &CleanupOptions::default().max_bytes(4));
        assert_eq!(
            out[0]["items"],
            CellValue::List(vec![CellValue::from("a"), CellValue::from("long...")])
        );
        assert_eq!(out[0][TRUNCATED_FIELD], CellValue::Bool(true));
    }
}
