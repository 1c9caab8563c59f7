//! Table data formatting.
//!
//! [`TableDataFormatter`] turns raw rows plus a [`TableConfig`] into a
//! [`FormattedTable`]: formatted cells with merge, rowspan, nesting and header
//! metadata, ready for a templating layer. It emits no markup for structure,
//! only values, spans, widths and CSS class names.
//!
//! # Pipeline
//!
//! A formatting pass runs these steps in order:
//!
//! 1. **Nested expansion**: rows holding a child sequence under the configured
//!    field become one row per child. Expansion runs first because it changes
//!    the row count, and every later step annotates rows by position.
//! 2. **Dynamic column inference** for data keys with no declared column
//!    (when the `dynamic_columns` feature is on).
//! 3. **Conditional filtering** of declared columns by `show_condition`.
//! 4. **Per-cell formatting** through the [`ValueFormatter`].
//! 5. **Merging**, one [`MergeDirective`](crate::MergeDirective) at a time.
//! 6. **Rowspan groups** for columns flagged `rowspan_group`.
//! 7. **Header rows** from `header_level`/`header_group`.
//! 8. **Width normalization** to percentages summing to 100.
//!
//! Every step is a pure function of `(rows, config)`. Grouping compares
//! values, so equal inputs always produce equal output.
//!
//! # Example
//!
//! ```rust
//! use tabula::{row, CellType, ColumnSpec, MergeDirective, TableConfig, TableDataFormatter};
//!
//! let config = TableConfig::builder()
//!     .column(ColumnSpec::new("first_name", "First", CellType::Text))
//!     .column(ColumnSpec::new("last_name", "Last", CellType::Text))
//!     .merge(MergeDirective::horizontal(["first_name", "last_name"]).separator(" "))
//!     .build();
//!
//! let table = TableDataFormatter::default()
//!     .format_table(&config, &[row([("first_name", "John"), ("last_name", "Doe")])])
//!     .unwrap();
//!
//! let first = &table.rows[0];
//! assert_eq!(first.cells["first_name"].value, "John Doe");
//! assert_eq!(first.cells["first_name"].colspan, 2);
//! assert!(first.hidden.contains("last_name"));
//! ```

mod condition;
mod header;
mod infer;
mod layout;
mod merge;
mod nested;
mod rowspan;
mod width;

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::EngineSettings;
use crate::error::{Result, TableError};
use crate::formatter::{escape_html, ValueFormatter};
use crate::types::{CellType, ColumnSpec, LayoutType, TableConfig, Width};
use crate::value::{CellValue, Row};

pub use condition::is_visible;
pub use header::build_header_rows;
pub use infer::{infer_cell_type, infer_columns, label_for_key};
pub use layout::{key_value_pairs, row_groups, table_classes};
pub(crate) use merge::check_template;
pub use nested::{expand_nested, ExpandedRow};
pub use rowspan::{compute_rowspans, value_runs};
pub use width::normalize_widths;

/// Feature flag enabling dynamic column inference.
pub const DYNAMIC_COLUMNS_FEATURE: &str = "dynamic_columns";

/// A formatted cell with its span metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedCell {
    pub value: String,
    pub colspan: usize,
    /// Rows this cell spans; 0 for cells covered by a cell above.
    pub rowspan: usize,
    /// Set when a merge directive touched this cell.
    pub merged: bool,
    /// False for cells covered by a vertical merge from an earlier row.
    pub is_first: bool,
}

impl FormattedCell {
    pub fn new(value: impl Into<String>) -> Self {
        FormattedCell {
            value: value.into(),
            colspan: 1,
            rowspan: 1,
            merged: false,
            is_first: true,
        }
    }
}

/// Position of a row within a contiguous equal-value group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpan {
    pub is_first: bool,
    pub group_size: usize,
    /// `group_size` on the first row of the group, 0 on the others.
    pub rowspan: usize,
}

/// Position of a row produced by nested-record expansion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedPosition {
    /// Index of the top-level input row this row came from.
    pub parent_index: usize,
    pub child_index: usize,
    pub is_first_child: bool,
    pub is_last_child: bool,
    /// 1 for direct children.
    pub depth: usize,
}

/// One output row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormattedRow {
    pub index: usize,
    pub raw: Row,
    pub cells: BTreeMap<String, FormattedCell>,
    /// Columns consumed by a horizontal merge in this row.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub hidden: BTreeSet<String>,
    /// Rowspan-group annotations keyed by column.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub groups: BTreeMap<String, GroupSpan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested: Option<NestedPosition>,
}

impl FormattedRow {
    /// Cells to emit for this row, in column order: hidden cells and cells
    /// covered from above are skipped.
    pub fn visible_cells<'a>(
        &'a self,
        columns: &'a [ResolvedColumn],
    ) -> impl Iterator<Item = (&'a ResolvedColumn, &'a FormattedCell)> + 'a {
        columns.iter().filter_map(move |col| {
            if self.hidden.contains(&col.key) {
                return None;
            }
            self.cells
                .get(&col.key)
                .filter(|cell| cell.rowspan > 0)
                .map(|cell| (col, cell))
        })
    }
}

/// A column as rendered, after inference, filtering and width resolution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedColumn {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub cell_type: CellType,
    pub width: Width,
    pub width_percent: f64,
    #[serde(default)]
    pub dynamic: bool,
    #[serde(default)]
    pub rowspan_group: bool,
}

/// A synthesized header cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderCell {
    pub label: String,
    pub colspan: usize,
    /// Keys of the columns under this cell.
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// One label/value pair of a `key_value_pairs` layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuePair {
    pub key: String,
    pub label: String,
    pub value: String,
}

/// A contiguous run of rows sharing the `group_by` value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RowGroup {
    pub key: String,
    pub value: CellValue,
    /// Indices into [`FormattedTable::rows`].
    pub rows: Vec<usize>,
}

/// The formatter's output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormattedTable {
    pub columns: Vec<ResolvedColumn>,
    /// Group header rows followed by the leaf row of column labels.
    pub header_rows: Vec<Vec<HeaderCell>>,
    pub rows: Vec<FormattedRow>,
    pub layout: LayoutType,
    pub classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pairs: Vec<Vec<KeyValuePair>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<RowGroup>,
}

impl FormattedTable {
    pub fn column(&self, key: &str) -> Option<&ResolvedColumn> {
        self.columns.iter().find(|c| c.key == key)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Columns and expanded rows for one dataset, computed once and shared by
/// full renders and chunked renders.
#[derive(Clone, Debug)]
pub struct TablePlan {
    pub columns: Vec<ColumnSpec>,
    pub rows: Vec<ExpandedRow>,
}

/// Applies a table configuration to raw rows.
#[derive(Clone, Debug)]
pub struct TableDataFormatter {
    formatter: ValueFormatter,
    viewport_width: f64,
    max_depth: usize,
    sample_size: usize,
}

impl Default for TableDataFormatter {
    fn default() -> Self {
        Self::new(ValueFormatter::new())
    }
}

impl TableDataFormatter {
    pub fn new(formatter: ValueFormatter) -> Self {
        let defaults = EngineSettings::default();
        TableDataFormatter {
            formatter,
            viewport_width: defaults.viewport_width,
            max_depth: defaults.max_depth,
            sample_size: defaults.inference_sample_size,
        }
    }

    pub fn from_settings(formatter: ValueFormatter, settings: &EngineSettings) -> Self {
        TableDataFormatter {
            formatter,
            viewport_width: settings.viewport_width,
            max_depth: settings.max_depth,
            sample_size: settings.inference_sample_size,
        }
    }

    /// Reference viewport for pixel widths.
    pub fn viewport_width(mut self, px: f64) -> Self {
        self.viewport_width = px;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn sample_size(mut self, n: usize) -> Self {
        self.sample_size = n;
        self
    }

    pub fn value_formatter(&self) -> &ValueFormatter {
        &self.formatter
    }

    /// Runs the full pipeline.
    pub fn format_table(&self, config: &TableConfig, rows: &[Row]) -> Result<FormattedTable> {
        let plan = self.plan(config, rows)?;
        self.format_plan(config, &plan, 0..plan.rows.len())
    }

    /// Formats a single record, e.g. a detail view.
    pub fn format_record(&self, config: &TableConfig, record: &Row) -> Result<FormattedTable> {
        self.format_table(config, std::slice::from_ref(record))
    }

    /// Expands nested rows and resolves the column set for a dataset.
    pub fn plan(&self, config: &TableConfig, rows: &[Row]) -> Result<TablePlan> {
        let expanded = match &config.nested {
            Some(spec) => expand_nested(rows, spec, self.max_depth)?,
            None => rows
                .iter()
                .map(|row| ExpandedRow {
                    row: row.clone(),
                    nested: None,
                })
                .collect(),
        };

        let mut columns: Vec<ColumnSpec> = config.columns.clone();
        if config.feature(DYNAMIC_COLUMNS_FEATURE) {
            let declared: HashSet<&str> = config.columns.iter().map(|c| c.key.as_str()).collect();
            let mut excluded: Vec<&str> = Vec::new();
            if let Some(spec) = &config.nested {
                excluded.push(spec.field.as_str());
            }
            let raw: Vec<&Row> = expanded.iter().map(|e| &e.row).collect();
            let inferred = infer_columns(&raw, &declared, &excluded, self.sample_size);
            if !inferred.is_empty() {
                tracing::debug!(count = inferred.len(), "inferred dynamic columns");
            }
            columns.extend(inferred);
        }

        let raw: Vec<&Row> = expanded.iter().map(|e| &e.row).collect();
        columns.retain(|column| is_visible(column, &raw));

        Ok(TablePlan {
            columns,
            rows: expanded,
        })
    }

    /// Formats the given range of a plan's rows, clamped to the plan. An
    /// inverted range formats no rows. Structure (columns, headers, widths,
    /// classes) always reflects the whole plan.
    pub fn format_plan(
        &self,
        config: &TableConfig,
        plan: &TablePlan,
        range: std::ops::Range<usize>,
    ) -> Result<FormattedTable> {
        let end = range.end.min(plan.rows.len());
        let start = range.start.min(end);
        let slice = &plan.rows[start..end];

        let mut rows: Vec<FormattedRow> = slice
            .iter()
            .enumerate()
            .map(|(i, expanded)| self.format_row(start + i, expanded, &plan.columns))
            .collect();

        for directive in &config.merges {
            merge::apply(directive, &mut rows)?;
        }

        let grouped: Vec<&str> = plan
            .columns
            .iter()
            .filter(|c| c.rowspan_group)
            .map(|c| c.key.as_str())
            .collect();
        compute_rowspans(&mut rows, &grouped);

        let widths: Vec<Width> = plan.columns.iter().map(|c| c.width).collect();
        let percents = normalize_widths(&widths, self.viewport_width);
        let columns: Vec<ResolvedColumn> = plan
            .columns
            .iter()
            .zip(percents)
            .map(|(c, pct)| ResolvedColumn {
                key: c.key.clone(),
                label: c.label.clone(),
                cell_type: c.cell_type,
                width: c.width,
                width_percent: pct,
                dynamic: c.dynamic,
                rowspan_group: c.rowspan_group,
            })
            .collect();

        let header_rows = build_header_rows(&plan.columns);
        let layout = config.layout.layout_type;
        let pairs = match layout {
            LayoutType::KeyValuePairs => {
                key_value_pairs(&columns, rows.first(), config.layout.columns_per_row)
            }
            _ => Vec::new(),
        };
        let groups = match layout {
            LayoutType::GroupedRows => row_groups(&rows, config.layout.group_by.as_deref()),
            _ => Vec::new(),
        };

        Ok(FormattedTable {
            columns,
            header_rows,
            rows,
            layout,
            classes: table_classes(config),
            pairs,
            groups,
        })
    }

    fn format_row(&self, index: usize, expanded: &ExpandedRow, columns: &[ColumnSpec]) -> FormattedRow {
        let cells = columns
            .iter()
            .map(|column| {
                let value = expanded.row.get(&column.key).unwrap_or(&CellValue::Null);
                let formatted = self.formatter.format_column(value, column);
                (column.key.clone(), FormattedCell::new(formatted))
            })
            .collect();

        FormattedRow {
            index,
            raw: expanded.row.clone(),
            cells,
            hidden: BTreeSet::new(),
            groups: BTreeMap::new(),
            nested: expanded.nested,
        }
    }
}

/// A plain table of escaped text built straight from raw rows, bypassing
/// configuration, merging and grouping. Used as the degraded rendering when
/// the full pipeline fails.
///
/// Fails only when rows are present but none carries any field.
pub fn minimal_table(rows: &[Row]) -> Result<FormattedTable> {
    let mut keys: Vec<&str> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !keys.contains(&key.as_str()) {
                keys.push(key);
            }
        }
    }
    if !rows.is_empty() && keys.is_empty() {
        return Err(TableError::Rendering(
            "rows carry no fields to display".to_string(),
        ));
    }

    let widths = vec![Width::Auto; keys.len()];
    let percents = normalize_widths(&widths, 0.0);
    let columns: Vec<ResolvedColumn> = keys
        .iter()
        .zip(percents)
        .map(|(key, pct)| ResolvedColumn {
            key: key.to_string(),
            label: escape_html(key),
            cell_type: CellType::Text,
            width: Width::Auto,
            width_percent: pct,
            dynamic: false,
            rowspan_group: false,
        })
        .collect();

    let formatted_rows = rows
        .iter()
        .enumerate()
        .map(|(index, row)| FormattedRow {
            index,
            raw: row.clone(),
            cells: keys
                .iter()
                .map(|key| {
                    let value = row.get(*key).map(|v| v.to_display_string()).unwrap_or_default();
                    (key.to_string(), FormattedCell::new(escape_html(&value)))
                })
                .collect(),
            hidden: BTreeSet::new(),
            groups: BTreeMap::new(),
            nested: None,
        })
        .collect();

    let header = columns
        .iter()
        .map(|c| HeaderCell {
            label: c.label.clone(),
            colspan: 1,
            columns: vec![c.key.clone()],
            group: None,
        })
        .collect();

    Ok(FormattedTable {
        columns,
        header_rows: vec![header],
        rows: formatted_rows,
        layout: LayoutType::StandardTable,
        classes: vec!["table".to_string(), "table-minimal".to_string()],
        pairs: Vec::new(),
        groups: Vec::new(),
    })
}
