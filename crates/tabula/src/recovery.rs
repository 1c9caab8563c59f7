//! Failure classification, automatic repair and fallbacks.
//!
//! Every failure the engine meets goes through [`ErrorHandler`], which walks
//! it through `detected → classified → repaired? → recovered | fallback →
//! reported`:
//!
//! - **Config** failures resolve to a built-in [`fallback_config`] for the
//!   table type.
//! - **Validation** failures of a declaration first go through
//!   [`ErrorHandler::repair_config`]; only when the repaired declaration still
//!   fails does the config fallback apply.
//! - **Rendering** failures degrade to a [`minimal_table`] built straight from
//!   the raw rows, and if even that fails, to an inline message.
//! - **Data** anomalies are logged with a structural summary of the dataset.
//!
//! Each handled failure yields an [`ErrorReport`] with a unique id. Callers
//! get a generic message; technical detail is only exposed when the handler
//! is in debug mode.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};

use crate::config::validator::{ConfigValidator, ConfigViolation};
use crate::error::{ErrorKind, TableError};
use crate::formatter::escape_html;
use crate::table::{minimal_table, FormattedTable};
use crate::types::{CellType, ColumnSpec, LayoutType, TableConfig};
use crate::value::Row;

/// Prefix of every report id.
pub const REPORT_ID_PREFIX: &str = "tbl_err_";

/// Report severity; decides the log level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A record of one handled failure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub id: String,
    pub kind: ErrorKind,
    pub severity: Severity,
    pub user_message: String,
    /// Internal detail; empty unless the handler runs in debug mode.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub technical_message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, Json>,
}

/// How a failure was resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The input was repaired and is fully usable.
    Recovered,
    /// A canned replacement stands in for the input.
    Fallback,
}

/// A usable value plus the record of how it was obtained.
#[derive(Clone, Debug, PartialEq)]
pub struct Recovery<T> {
    pub outcome: Outcome,
    pub value: T,
    pub report: ErrorReport,
}

/// Degraded rendering produced after a rendering failure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderFallback {
    /// Plain escaped table of the raw rows.
    Minimal { table: FormattedTable },
    /// Safe inline message; contains no user content.
    Message { html: String },
}

/// Classifies failures, repairs configurations and produces fallbacks.
#[derive(Clone, Debug, Default)]
pub struct ErrorHandler {
    debug: bool,
    validator: ConfigValidator,
}

impl ErrorHandler {
    pub fn new(debug: bool) -> Self {
        ErrorHandler {
            debug,
            validator: ConfigValidator::new(),
        }
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Builds and logs a report.
    pub fn report(
        &self,
        kind: ErrorKind,
        severity: Severity,
        technical: impl Into<String>,
        context: BTreeMap<String, Json>,
    ) -> ErrorReport {
        let technical = technical.into();
        let id = format!("{}{}", REPORT_ID_PREFIX, uuid::Uuid::new_v4().simple());
        let context_json = Json::from(
            context
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<serde_json::Map<_, _>>(),
        );

        match severity {
            Severity::Error => {
                tracing::error!(%id, kind = %kind, context = %context_json, "{}", technical)
            }
            Severity::Warning => {
                tracing::warn!(%id, kind = %kind, context = %context_json, "{}", technical)
            }
            Severity::Info => {
                tracing::info!(%id, kind = %kind, context = %context_json, "{}", technical)
            }
        }

        ErrorReport {
            id,
            kind,
            severity,
            user_message: user_message(kind).to_string(),
            technical_message: if self.debug { technical } else { String::new() },
            context,
        }
    }

    /// Resolves a configuration failure to the built-in fallback.
    pub fn handle_config_error(&self, table_type: &str, error: &TableError) -> Recovery<TableConfig> {
        let report = self.report(
            ErrorKind::Config,
            Severity::Warning,
            error.to_string(),
            context([("table_type", json!(table_type))]),
        );
        Recovery {
            outcome: Outcome::Fallback,
            value: fallback_config(table_type),
            report,
        }
    }

    /// Repairs a declaration that failed validation, falling back to the
    /// built-in configuration when repair cannot produce a valid one.
    pub fn handle_validation_error(
        &self,
        table_type: &str,
        raw: &Json,
        violations: &[ConfigViolation],
    ) -> Recovery<TableConfig> {
        let messages: Vec<String> = violations.iter().map(ToString::to_string).collect();

        match self.repair_config(raw, violations) {
            Some(config) => {
                let report = self.report(
                    ErrorKind::Validation,
                    Severity::Info,
                    format!("repaired configuration: {}", messages.join("; ")),
                    context([
                        ("table_type", json!(table_type)),
                        ("violations", json!(messages)),
                    ]),
                );
                Recovery {
                    outcome: Outcome::Recovered,
                    value: config,
                    report,
                }
            }
            None => self.handle_config_error(table_type, &TableError::InvalidConfig(messages)),
        }
    }

    /// Applies a targeted fix for each violation and returns the configuration
    /// only if the result validates clean.
    pub fn repair_config(&self, raw: &Json, violations: &[ConfigViolation]) -> Option<TableConfig> {
        let mut doc = raw.clone();
        for violation in violations {
            if !apply_fix(&mut doc, violation) {
                tracing::debug!(%violation, "no automatic repair");
                return None;
            }
        }
        if let Some(merges) = doc.get_mut("merges").and_then(Json::as_array_mut) {
            merges.retain(|m| !m.is_null());
        }

        let recheck = self.validator.check(&doc);
        if !recheck.is_valid() {
            tracing::debug!(remaining = recheck.violations.len(), "repair left violations");
            return None;
        }
        serde_json::from_value(doc).ok()
    }

    /// Degrades a failed render to a minimal table, or to a safe message if
    /// the rows cannot be shown at all.
    pub fn handle_rendering_error(&self, rows: &[Row], error: &TableError) -> Recovery<RenderFallback> {
        let report = self.report(
            ErrorKind::Rendering,
            Severity::Error,
            error.to_string(),
            context([("rows", json!(rows.len()))]),
        );

        match minimal_table(rows) {
            Ok(table) => Recovery {
                outcome: Outcome::Fallback,
                value: RenderFallback::Minimal { table },
                report,
            },
            Err(minimal_error) => {
                tracing::error!(id = %report.id, error = %minimal_error, "minimal rendering failed");
                let html = format!(
                    r#"<div class="table-error" role="alert">{} (ref: {})</div>"#,
                    escape_html(user_message(ErrorKind::Rendering)),
                    escape_html(&report.id)
                );
                Recovery {
                    outcome: Outcome::Fallback,
                    value: RenderFallback::Message { html },
                    report,
                }
            }
        }
    }

    /// Logs a data failure together with a structural summary of the rows.
    pub fn handle_data_error(&self, table_type: &str, rows: &[Row], error: &TableError) -> ErrorReport {
        let summary = data_summary(rows);
        self.report(
            error.kind(),
            Severity::Warning,
            error.to_string(),
            context([("table_type", json!(table_type)), ("summary", summary)]),
        )
    }
}

fn context<const N: usize>(pairs: [(&str, Json); N]) -> BTreeMap<String, Json> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Generic caller-facing message for a failure kind.
pub fn user_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Config => "The table configuration could not be loaded; default settings are shown.",
        ErrorKind::Validation => "Some table data could not be validated.",
        ErrorKind::Rendering => "The table could not be displayed.",
        ErrorKind::Data => "Some table data has an unexpected shape.",
        ErrorKind::System => "An unexpected error occurred.",
    }
}

/// Row count, value-type histogram and empty rows of a dataset.
pub fn data_summary(rows: &[Row]) -> Json {
    let mut types: BTreeMap<&str, usize> = BTreeMap::new();
    let mut empty_rows = Vec::new();
    let mut widths: Vec<usize> = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        if row.values().all(|v| v.is_empty()) {
            empty_rows.push(index);
        }
        widths.push(row.len());
        for value in row.values() {
            *types.entry(value.type_name()).or_default() += 1;
        }
    }

    json!({
        "rows": rows.len(),
        "value_types": types,
        "empty_rows": empty_rows,
        "min_fields": widths.iter().min().copied().unwrap_or(0),
        "max_fields": widths.iter().max().copied().unwrap_or(0),
    })
}

/// Built-in configuration for a table type, chosen from its name.
///
/// Names mentioning services or groups get a grouped layout, names for basic
/// or detail information get key/value pairs, everything else a standard
/// table. The result always validates.
pub fn fallback_config(table_type: &str) -> TableConfig {
    let name = table_type.to_ascii_lowercase();
    let builder = TableConfig::builder()
        .styling("table_class", "table table-bordered")
        .feature("dynamic_columns", true);

    if name.contains("service") || name.contains("group") {
        builder
            .layout_type(LayoutType::GroupedRows)
            .group_by("category")
            .column(ColumnSpec::new("category", "カテゴリ", CellType::Text).rowspan_group())
            .column(ColumnSpec::new("name", "名称", CellType::Text))
            .column(ColumnSpec::new("value", "内容", CellType::Text))
            .build()
    } else if name.contains("basic") || name.contains("info") || name.contains("detail") {
        builder
            .layout_type(LayoutType::KeyValuePairs)
            .columns_per_row(2)
            .column(ColumnSpec::new("name", "名称", CellType::Text))
            .column(ColumnSpec::new("value", "内容", CellType::Text))
            .build()
    } else {
        builder
            .column(ColumnSpec::new("name", "名称", CellType::Text))
            .column(ColumnSpec::new("value", "内容", CellType::Text))
            .build()
    }
}

/// Applies the fix for one violation. Returns false when the violation has
/// no automatic repair.
fn apply_fix(doc: &mut Json, violation: &ConfigViolation) -> bool {
    use ConfigViolation as V;

    match violation {
        V::MissingColumns | V::EmptyColumns => false,
        V::ColumnNotMapping { index } => {
            column_mut(doc, *index).map(|c| *c = json!({})).is_some()
                && fill_missing(doc, *index)
        }
        V::MissingField { index, .. } => fill_missing(doc, *index),
        V::NotString { index, field: "type" } => set_column(doc, *index, "type", json!("text")),
        V::NotString { index, field } => column_mut(doc, *index)
            .map(|c| {
                let text = match &c[*field] {
                    Json::String(s) => s.clone(),
                    other => other.to_string(),
                };
                c[*field] = json!(text);
            })
            .is_some(),
        V::UnknownType { index, .. } => set_column(doc, *index, "type", json!("text")),
        V::SelectWithoutOptions { index } => {
            set_column(doc, *index, "options", json!({"": "選択してください"}))
        }
        V::InvalidWidth { index, .. } => set_column(doc, *index, "width", json!("auto")),
        V::DuplicateKey { index, key } => {
            set_column(doc, *index, "key", json!(format!("{}_{}", key, index)))
        }
        V::InvalidCount { index, field } => {
            let replacement = match *field {
                "decimals" => json!(0),
                _ => Json::Null,
            };
            set_column(doc, *index, field, replacement)
        }
        V::UnknownTransform { index, .. } => remove_column_field(doc, *index, "transform"),
        V::InvalidShowCondition { index } => remove_column_field(doc, *index, "show_condition"),
        V::InvalidColumnsPerRow { .. } => {
            let n = doc["layout"]["columns_per_row"]
                .as_i64()
                .or_else(|| doc["layout"]["columns_per_row"].as_f64().map(|f| f as i64))
                .unwrap_or(2)
                .clamp(1, 4);
            doc["layout"]["columns_per_row"] = json!(n);
            true
        }
        V::UnknownBreakpoint { .. } => {
            doc["layout"]["responsive_breakpoint"] = json!("md");
            true
        }
        V::UnknownLayoutType { .. } => {
            doc["layout"]["type"] = json!("standard_table");
            true
        }
        V::NotBoolean { path } => coerce_bool_at(doc, path),
        V::InvalidMerge { index, .. } => {
            // Nulled here and dropped once every fix has run, so later
            // merge indices stay valid.
            if let Some(slot) = doc
                .get_mut("merges")
                .and_then(Json::as_array_mut)
                .and_then(|m| m.get_mut(*index))
            {
                *slot = Json::Null;
            }
            true
        }
        V::InvalidNested => doc
            .as_object_mut()
            .map(|o| o.remove("nested"))
            .is_some(),
    }
}

fn column_mut(doc: &mut Json, index: usize) -> Option<&mut Json> {
    doc.get_mut("columns")?.as_array_mut()?.get_mut(index)
}

fn set_column(doc: &mut Json, index: usize, field: &str, value: Json) -> bool {
    match column_mut(doc, index).and_then(Json::as_object_mut) {
        Some(col) => {
            if value.is_null() {
                col.remove(field);
            } else {
                col.insert(field.to_string(), value);
            }
            true
        }
        None => false,
    }
}

fn remove_column_field(doc: &mut Json, index: usize, field: &str) -> bool {
    set_column(doc, index, field, Json::Null)
}

/// Fills in missing key, label and type on a column. Applied once per
/// column, so repeated violations on the same column are no-ops.
fn fill_missing(doc: &mut Json, index: usize) -> bool {
    let Some(col) = column_mut(doc, index).and_then(Json::as_object_mut) else {
        return false;
    };
    let missing = |col: &serde_json::Map<String, Json>, f: &str| col.get(f).map_or(true, Json::is_null);

    if missing(col, "key") {
        col.insert("key".into(), json!(format!("column_{}", index)));
    }
    if missing(col, "label") {
        let label = crate::table::label_for_key(col.get("key").and_then(Json::as_str).unwrap_or_default());
        col.insert("label".into(), json!(label));
    }
    if missing(col, "type") {
        col.insert("type".into(), json!(CellType::Text.as_str()));
    }
    true
}

/// Coerces the value at `features.x` or `columns[i].x` to a boolean.
fn coerce_bool_at(doc: &mut Json, path: &str) -> bool {
    let target = if let Some(name) = path.strip_prefix("features.") {
        doc.get_mut("features").and_then(|f| f.get_mut(name))
    } else if let Some(rest) = path.strip_prefix("columns[") {
        let parsed = rest
            .split_once("].")
            .and_then(|(i, field)| i.parse::<usize>().ok().map(|i| (i, field)));
        match parsed {
            Some((index, field)) => column_mut(doc, index).and_then(|c| c.get_mut(field)),
            None => None,
        }
    } else {
        None
    };

    match target {
        Some(value) => {
            *value = json!(truthy(value));
            true
        }
        None => false,
    }
}

fn truthy(value: &Json) -> bool {
    match value {
        Json::Bool(b) => *b,
        Json::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Json::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "on" | "1"
        ),
        Json::Null => false,
        Json::Array(a) => !a.is_empty(),
        Json::Object(o) => !o.is_empty(),
    }
}
