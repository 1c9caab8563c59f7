//! Structural validation of cell-level table data.
//!
//! The validated shape is the one a templating layer consumes:
//!
//! ```yaml
//! - cells:
//!     - { type: text, value: "Web", rowspan: 2 }
//!     - { type: email, value: "ops@example.com" }
//! ```
//!
//! Hard errors are structural or security relevant. Pattern mismatches on
//! typed cells only warn.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};

use crate::formatter::{is_numeric_str, parse_date};
use crate::types::{CellType, TableConfig};
use crate::validation::ValidationResult;
use crate::value::{CellValue, Row};

/// Hard colspan limit; spans above `COLSPAN_WARN` only warn.
pub const MAX_COLSPAN: u64 = 12;
pub const COLSPAN_WARN: u64 = 6;
/// Hard rowspan limit; spans above `ROWSPAN_WARN` only warn.
pub const MAX_ROWSPAN: u64 = 10;
pub const ROWSPAN_WARN: u64 = 5;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid email regex")
});

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").expect("valid url regex"));

/// Optional checks for [`validate_table_data`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataValidationOptions {
    /// Warn when the dataset has more rows than this.
    pub max_rows: Option<usize>,
    /// Warn when rows have differing cell counts.
    pub check_cell_consistency: bool,
}

impl DataValidationOptions {
    pub fn max_rows(mut self, max: usize) -> Self {
        self.max_rows = Some(max);
        self
    }

    pub fn check_cell_consistency(mut self) -> Self {
        self.check_cell_consistency = true;
        self
    }
}

/// Validates cell-level table data.
pub fn validate_table_data(data: &Json, options: &DataValidationOptions) -> ValidationResult {
    let mut result = ValidationResult::new();

    let Some(rows) = data.as_array() else {
        result.add_error("table data must be a list of rows");
        return result;
    };

    if let Some(max) = options.max_rows {
        if rows.len() > max {
            result.add_warning(format!(
                "table has {} rows, more than the recommended {}",
                rows.len(),
                max
            ));
        }
    }

    let mut counts = BTreeSet::new();
    for (r, row) in rows.iter().enumerate() {
        let Some(row) = row.as_object() else {
            result.add_error(format!("rows[{}] must be a mapping", r));
            continue;
        };
        let Some(cells) = row.get("cells").and_then(Json::as_array) else {
            result.add_error(format!("rows[{}] must contain a 'cells' list", r));
            continue;
        };
        counts.insert(cells.len());

        for (c, cell) in cells.iter().enumerate() {
            validate_cell(&format!("rows[{}].cells[{}]", r, c), cell, &mut result);
        }
    }

    if options.check_cell_consistency && counts.len() > 1 {
        let counts: Vec<String> = counts.iter().map(ToString::to_string).collect();
        result.add_warning(format!("rows have differing cell counts: {}", counts.join(", ")));
    }

    result
}

/// Validates rows against a table configuration by building the cell-level
/// shape from the configured columns.
///
/// Rows where every configured field is empty produce a warning.
pub fn validate_rows(rows: &[Row], config: &TableConfig, options: &DataValidationOptions) -> ValidationResult {
    let data: Vec<Json> = rows
        .iter()
        .map(|row| {
            let cells: Vec<Json> = config
                .columns
                .iter()
                .map(|column| {
                    json!({
                        "type": column.cell_type.as_str(),
                        "value": Json::from(row.get(&column.key).cloned().unwrap_or_default()),
                    })
                })
                .collect();
            json!({ "cells": cells })
        })
        .collect();

    let mut result = validate_table_data(&Json::Array(data), options);
    if !config.columns.is_empty() {
        for (index, row) in rows.iter().enumerate() {
            let empty = config
                .columns
                .iter()
                .all(|c| row.get(&c.key).map_or(true, CellValue::is_empty));
            if empty {
                result.add_warning(format!("rows[{}] has no values for any configured column", index));
            }
        }
    }
    result
}

fn validate_cell(path: &str, cell: &Json, result: &mut ValidationResult) {
    let Some(cell) = cell.as_object() else {
        result.add_error(format!("{} must be a mapping", path));
        return;
    };

    let cell_type = match cell.get("type") {
        None | Some(Json::Null) => CellType::Text,
        Some(Json::String(name)) => match name.parse::<CellType>() {
            Ok(t) => t,
            Err(_) => {
                result.add_error(format!("{}: unsupported cell type '{}'", path, name));
                return;
            }
        },
        Some(other) => {
            result.add_error(format!("{}: cell type must be a string, got {}", path, other));
            return;
        }
    };

    check_span(path, "colspan", cell.get("colspan"), MAX_COLSPAN, COLSPAN_WARN, result);
    check_span(path, "rowspan", cell.get("rowspan"), MAX_ROWSPAN, ROWSPAN_WARN, result);

    let value = cell.get("value").cloned().map(CellValue::from).unwrap_or_default();
    if value.is_empty() {
        return;
    }
    check_value(path, cell_type, &value, result);
}

fn check_span(
    path: &str,
    name: &str,
    span: Option<&Json>,
    max: u64,
    warn_above: u64,
    result: &mut ValidationResult,
) {
    let Some(span) = span.filter(|s| !s.is_null()) else {
        return;
    };
    let Some(n) = span.as_f64() else {
        result.add_error(format!("{}: {} must be numeric, got {}", path, name, span));
        return;
    };
    if n < 1.0 || n > max as f64 || n.fract() != 0.0 {
        result.add_error(format!("{}: {} must be an integer between 1 and {}, got {}", path, name, max, n));
    } else if n > warn_above as f64 {
        result.add_warning(format!("{}: large {} {}", path, name, n));
    }
}

fn check_value(path: &str, cell_type: CellType, value: &CellValue, result: &mut ValidationResult) {
    let text = value.to_display_string();
    let text = text.trim();

    match cell_type {
        CellType::Email if !EMAIL_RE.is_match(text) => {
            result.add_warning(format!("{}: '{}' does not look like an email address", path, text))
        }
        CellType::Url if !URL_RE.is_match(text) => {
            result.add_warning(format!("{}: '{}' does not look like a URL", path, text))
        }
        CellType::Date if parse_date(value).is_none() => {
            result.add_warning(format!("{}: '{}' is not a recognizable date", path, text))
        }
        CellType::Number | CellType::Currency
            if value.as_f64().is_none() && !is_numeric_str(text) =>
        {
            result.add_warning(format!("{}: '{}' is not numeric", path, text))
        }
        CellType::File if is_traversal(text) => {
            result.add_error(format!("{}: file path contains a parent-directory reference", path))
        }
        _ => {}
    }
}

fn is_traversal(path: &str) -> bool {
    path == ".."
        || path.contains("../")
        || path.contains("..\\")
        || path.ends_with("/..")
        || path.ends_with("\\..")
}
