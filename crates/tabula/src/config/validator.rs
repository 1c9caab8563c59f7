//! Structural validation of table declarations.
//!
//! Validation runs on the untyped document (after merging over the default
//! skeleton) rather than on [`TableConfig`], so that problems serde would
//! paper over or reject wholesale, such as a missing `type` or a string where
//! a boolean belongs, are reported individually. Each problem is a typed
//! [`ConfigViolation`]; automatic repair in
//! [`ErrorHandler::repair_config`](crate::ErrorHandler::repair_config) matches
//! on these.

use std::collections::HashSet;

use serde_json::{Map, Value as Json};
use thiserror::Error;

use crate::table::check_template;
use crate::types::{Breakpoint, CellType, LayoutType, TableConfig, Transform, Width};
use crate::validation::ValidationResult;

/// Per-column fields that must be booleans when present.
pub const COLUMN_BOOL_FIELDS: &[&str] = &["rowspan_group", "dynamic", "auto_class", "lenient", "download"];

/// Per-column fields that must be non-negative integers when present.
pub const COLUMN_COUNT_FIELDS: &[&str] = &["decimals", "max_length", "header_level"];

const SHOW_CONDITIONS: &[&str] = &["has_data", "data_equals", "field_exists"];
const MERGE_TYPES: &[&str] = &["horizontal", "vertical", "complex"];

/// A single schema violation in a table declaration.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigViolation {
    #[error("'columns' is required and must be a list")]
    MissingColumns,

    #[error("'columns' must contain at least one column")]
    EmptyColumns,

    #[error("columns[{index}] must be a mapping")]
    ColumnNotMapping { index: usize },

    #[error("columns[{index}]: missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("columns[{index}]: '{field}' must be a string")]
    NotString { index: usize, field: &'static str },

    #[error("columns[{index}]: unknown type '{value}'")]
    UnknownType { index: usize, value: String },

    #[error("columns[{index}]: select columns require a non-empty 'options' mapping")]
    SelectWithoutOptions { index: usize },

    #[error("columns[{index}]: invalid width '{value}' (expected '<n>%', '<n>px' or 'auto')")]
    InvalidWidth { index: usize, value: String },

    #[error("columns[{index}]: duplicate column key '{key}'")]
    DuplicateKey { index: usize, key: String },

    #[error("columns[{index}]: '{field}' must be a non-negative integer")]
    InvalidCount { index: usize, field: &'static str },

    #[error("columns[{index}]: unknown transform '{value}'")]
    UnknownTransform { index: usize, value: String },

    #[error("columns[{index}]: invalid show_condition")]
    InvalidShowCondition { index: usize },

    #[error("layout.columns_per_row must be an integer between 1 and 4, got {value}")]
    InvalidColumnsPerRow { value: String },

    #[error("layout.responsive_breakpoint must be one of xs, sm, md, lg, xl, got '{value}'")]
    UnknownBreakpoint { value: String },

    #[error("layout.type must be one of key_value_pairs, grouped_rows, standard_table, got '{value}'")]
    UnknownLayoutType { value: String },

    #[error("'{path}' must be a boolean")]
    NotBoolean { path: String },

    #[error("merges[{index}]: {reason}")]
    InvalidMerge { index: usize, reason: String },

    #[error("nested.field must be a non-empty string")]
    InvalidNested,
}

/// Violations plus non-fatal warnings from one check.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigCheck {
    pub violations: Vec<ConfigViolation>,
    pub warnings: Vec<String>,
}

impl ConfigCheck {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn into_result(self) -> ValidationResult {
        let mut result = ValidationResult::new();
        for v in self.violations {
            result.add_error(v.to_string());
        }
        for w in self.warnings {
            result.add_warning(w);
        }
        result
    }
}

/// Validates table declarations against the configuration schema.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn new() -> Self {
        ConfigValidator
    }

    /// Validates a raw declaration.
    pub fn validate(&self, raw: &Json) -> ValidationResult {
        self.check(raw).into_result()
    }

    /// Validates an already-typed configuration.
    pub fn validate_config(&self, config: &TableConfig) -> ValidationResult {
        match serde_json::to_value(config) {
            Ok(raw) => self.validate(&raw),
            Err(e) => {
                let mut result = ValidationResult::new();
                result.add_error(format!("configuration is not serializable: {}", e));
                result
            }
        }
    }

    /// Collects every violation and warning in a raw declaration.
    pub fn check(&self, raw: &Json) -> ConfigCheck {
        let mut check = ConfigCheck::default();

        match raw.get("columns").and_then(Json::as_array) {
            None => check.violations.push(ConfigViolation::MissingColumns),
            Some(columns) if columns.is_empty() => {
                check.violations.push(ConfigViolation::EmptyColumns)
            }
            Some(columns) => check_columns(columns, &mut check),
        }

        if let Some(layout) = raw.get("layout") {
            check_layout(layout, &mut check);
        }

        if let Some(Json::Object(features)) = raw.get("features") {
            for (name, value) in features {
                if !value.is_boolean() {
                    check.violations.push(ConfigViolation::NotBoolean {
                        path: format!("features.{}", name),
                    });
                }
            }
        }

        if let Some(merges) = raw.get("merges").and_then(Json::as_array) {
            check_merges(merges, raw, &mut check);
        }

        if let Some(nested) = raw.get("nested") {
            let field_ok = nested
                .get("field")
                .and_then(Json::as_str)
                .is_some_and(|f| !f.trim().is_empty());
            if !nested.is_null() && !field_ok {
                check.violations.push(ConfigViolation::InvalidNested);
            }
        }

        check
    }
}

fn check_columns(columns: &[Json], check: &mut ConfigCheck) {
    let mut seen = HashSet::new();
    let mut explicit_percent = 0.0;

    for (index, column) in columns.iter().enumerate() {
        let Some(col) = column.as_object() else {
            check
                .violations
                .push(ConfigViolation::ColumnNotMapping { index });
            continue;
        };

        for field in ["key", "label", "type"] {
            match col.get(field) {
                None | Some(Json::Null) => check
                    .violations
                    .push(ConfigViolation::MissingField { index, field }),
                Some(Json::String(_)) => {}
                Some(_) => check
                    .violations
                    .push(ConfigViolation::NotString { index, field }),
            }
        }

        if let Some(key) = col.get("key").and_then(Json::as_str) {
            if !seen.insert(key.to_string()) {
                check.violations.push(ConfigViolation::DuplicateKey {
                    index,
                    key: key.to_string(),
                });
            }
        }

        let cell_type = col.get("type").and_then(Json::as_str);
        if let Some(name) = cell_type {
            if name.parse::<CellType>().is_err() {
                check.violations.push(ConfigViolation::UnknownType {
                    index,
                    value: name.to_string(),
                });
            }
        }
        if cell_type == Some("select") && !has_options(col) {
            check
                .violations
                .push(ConfigViolation::SelectWithoutOptions { index });
        }

        match col.get("width") {
            None | Some(Json::Null) => {}
            Some(Json::Number(n)) if n.as_f64().is_some_and(|px| px >= 0.0) => {}
            Some(Json::String(s)) if Width::parse(s).is_some() => {
                if let Some(Width::Percent(p)) = Width::parse(s) {
                    explicit_percent += p;
                }
            }
            Some(other) => check.violations.push(ConfigViolation::InvalidWidth {
                index,
                value: display_raw(other),
            }),
        }

        for field in COLUMN_COUNT_FIELDS {
            if let Some(value) = col.get(*field) {
                if !value.is_null() && value.as_u64().is_none() {
                    check
                        .violations
                        .push(ConfigViolation::InvalidCount {
                            index,
                            field: *field,
                        });
                }
            }
        }

        for field in COLUMN_BOOL_FIELDS {
            if let Some(value) = col.get(*field) {
                if !value.is_boolean() && !value.is_null() {
                    check.violations.push(ConfigViolation::NotBoolean {
                        path: format!("columns[{}].{}", index, field),
                    });
                }
            }
        }

        if let Some(transform) = col.get("transform") {
            let known = transform
                .as_str()
                .is_some_and(|t| Transform::NAMES.contains(&t));
            if !known && !transform.is_null() {
                check.violations.push(ConfigViolation::UnknownTransform {
                    index,
                    value: display_raw(transform),
                });
            }
        }

        if let Some(condition) = col.get("show_condition") {
            let known = condition
                .get("type")
                .and_then(Json::as_str)
                .is_some_and(|t| SHOW_CONDITIONS.contains(&t));
            let needs_value = condition.get("type").and_then(Json::as_str) == Some("data_equals");
            if !condition.is_null() && (!known || (needs_value && condition.get("value").is_none()))
            {
                check
                    .violations
                    .push(ConfigViolation::InvalidShowCondition { index });
            }
        }
    }

    if explicit_percent > 100.0 {
        check.warnings.push(format!(
            "explicit column widths sum to {}%, they will be scaled to 100%",
            explicit_percent
        ));
    }
}

fn has_options(col: &Map<String, Json>) -> bool {
    col.get("options")
        .and_then(Json::as_object)
        .is_some_and(|o| !o.is_empty())
}

fn check_layout(layout: &Json, check: &mut ConfigCheck) {
    if let Some(value) = layout.get("columns_per_row") {
        let in_range = value.as_u64().is_some_and(|n| (1..=4).contains(&n));
        if !in_range {
            check.violations.push(ConfigViolation::InvalidColumnsPerRow {
                value: display_raw(value),
            });
        }
    }

    if let Some(value) = layout.get("responsive_breakpoint") {
        let known = value
            .as_str()
            .is_some_and(|b| Breakpoint::ALL.iter().any(|bp| bp.as_str() == b));
        if !known {
            check.violations.push(ConfigViolation::UnknownBreakpoint {
                value: display_raw(value),
            });
        }
    }

    let layout_type = layout.get("type");
    if let Some(value) = layout_type {
        let known = value
            .as_str()
            .is_some_and(|t| LayoutType::NAMES.contains(&t));
        if !known {
            check.violations.push(ConfigViolation::UnknownLayoutType {
                value: display_raw(value),
            });
        }
    }

    let grouped = layout_type.and_then(Json::as_str) == Some(LayoutType::GroupedRows.as_str());
    if grouped && layout.get("group_by").and_then(Json::as_str).is_none() {
        check
            .warnings
            .push("grouped_rows layout without 'group_by' renders as a single group".to_string());
    }
}

fn check_merges(merges: &[Json], raw: &Json, check: &mut ConfigCheck) {
    let declared: HashSet<&str> = raw
        .get("columns")
        .and_then(Json::as_array)
        .map(|cols| {
            cols.iter()
                .filter_map(|c| c.get("key").and_then(Json::as_str))
                .collect()
        })
        .unwrap_or_default();

    for (index, merge) in merges.iter().enumerate() {
        let merge_type = merge.get("type").and_then(Json::as_str);
        if !merge_type.is_some_and(|t| MERGE_TYPES.contains(&t)) {
            check.violations.push(ConfigViolation::InvalidMerge {
                index,
                reason: format!(
                    "type must be one of horizontal, vertical, complex, got {}",
                    merge.get("type").map(display_raw).unwrap_or_default()
                ),
            });
            continue;
        }

        let columns: Option<Vec<&str>> = merge
            .get("columns")
            .and_then(Json::as_array)
            .and_then(|cols| cols.iter().map(Json::as_str).collect());
        let Some(columns) = columns.filter(|c| !c.is_empty()) else {
            check.violations.push(ConfigViolation::InvalidMerge {
                index,
                reason: "columns must be a non-empty list of column keys".to_string(),
            });
            continue;
        };

        if merge_type != Some("vertical") && columns.len() < 2 {
            check.violations.push(ConfigViolation::InvalidMerge {
                index,
                reason: "horizontal merges need at least two columns".to_string(),
            });
        }

        match merge.get("template") {
            None | Some(Json::Null) => {}
            Some(Json::String(template)) => {
                if let Err(error) = check_template(template) {
                    check.violations.push(ConfigViolation::InvalidMerge {
                        index,
                        reason: format!("template does not parse: {}", error),
                    });
                }
            }
            Some(other) => check.violations.push(ConfigViolation::InvalidMerge {
                index,
                reason: format!("template must be a string, got {}", other),
            }),
        }

        for column in columns.iter().filter(|c| !declared.contains(*c)) {
            check.warnings.push(format!(
                "merges[{}] references undeclared column '{}'",
                index, column
            ));
        }
    }
}

fn display_raw(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}
