//! Cell merging.
//!
//! Horizontal merges collapse several columns of one row into the first
//! column's slot. Vertical merges collapse runs of equal values down a column
//! into one spanning cell. Complex merges do both: the horizontally merged
//! value of the first column becomes the key for the vertical pass.

use std::collections::BTreeMap;

use minijinja::Environment;
use once_cell::sync::Lazy;

use crate::error::{Result, TableError};
use crate::types::{MergeCondition, MergeDirective, MergeType};
use crate::value::CellValue;

use super::rowspan::value_runs;
use super::FormattedRow;

static TEMPLATES: Lazy<Environment<'static>> = Lazy::new(Environment::new);

/// Applies one directive to the formatted rows in place.
pub fn apply(directive: &MergeDirective, rows: &mut [FormattedRow]) -> Result<()> {
    match directive.merge_type {
        MergeType::Horizontal => horizontal(directive, rows),
        MergeType::Vertical => {
            vertical(&directive.columns, rows);
            Ok(())
        }
        MergeType::Complex => {
            horizontal(directive, rows)?;
            complex_vertical(directive, rows);
            Ok(())
        }
    }
}

fn horizontal(directive: &MergeDirective, rows: &mut [FormattedRow]) -> Result<()> {
    if directive.columns.len() < 2 {
        return Err(TableError::InvalidMerge(format!(
            "horizontal merge needs at least two columns, got {:?}",
            directive.columns
        )));
    }
    let first = &directive.columns[0];

    for row in rows.iter_mut() {
        if !row.cells.contains_key(first) || row.hidden.contains(first) {
            continue;
        }
        if !condition_holds(&directive.condition, &directive.columns, row) {
            continue;
        }

        let present: Vec<&String> = directive
            .columns
            .iter()
            .filter(|key| row.cells.contains_key(*key) && !row.hidden.contains(*key))
            .collect();
        if present.len() < 2 {
            continue;
        }

        let value = match &directive.template {
            Some(template) => render_template(template, row)?,
            None => join_parts(directive, &present, row),
        };

        let colspan: usize = present
            .iter()
            .filter_map(|key| row.cells.get(*key))
            .map(|cell| cell.colspan)
            .sum();
        for key in present.iter().skip(1) {
            row.hidden.insert((*key).clone());
        }
        if let Some(cell) = row.cells.get_mut(first) {
            cell.value = value;
            cell.colspan = colspan;
            cell.merged = true;
        }
    }
    Ok(())
}

fn raw_value<'a>(row: &'a FormattedRow, key: &str) -> &'a CellValue {
    row.raw.get(key).unwrap_or(&CellValue::Null)
}

fn condition_holds(condition: &MergeCondition, columns: &[String], row: &FormattedRow) -> bool {
    match condition {
        MergeCondition::Always => true,
        MergeCondition::FieldNotEmpty(field) => {
            let field = field.as_deref().unwrap_or(&columns[0]);
            !raw_value(row, field).is_empty()
        }
        MergeCondition::AllNotEmpty => columns.iter().all(|c| !raw_value(row, c).is_empty()),
        MergeCondition::AnyNotEmpty => columns.iter().any(|c| !raw_value(row, c).is_empty()),
    }
}

/// Joins the formatted values of the non-empty merged columns. When every
/// part is empty, the first column's placeholder stands in.
fn join_parts(directive: &MergeDirective, present: &[&String], row: &FormattedRow) -> String {
    let separator = directive.separator.as_deref().unwrap_or(" ");
    let parts: Vec<&str> = present
        .iter()
        .filter(|key| !raw_value(row, key).is_empty())
        .filter_map(|key| row.cells.get(*key))
        .map(|cell| cell.value.as_str())
        .collect();

    if parts.is_empty() {
        present
            .first()
            .and_then(|key| row.cells.get(*key))
            .map(|cell| cell.value.clone())
            .unwrap_or_default()
    } else {
        parts.join(separator)
    }
}

fn render_template(template: &str, row: &FormattedRow) -> Result<String> {
    let context: BTreeMap<&str, &str> = row
        .cells
        .iter()
        .map(|(key, cell)| (key.as_str(), cell.value.as_str()))
        .collect();
    Ok(TEMPLATES.render_str(template, context)?)
}

/// Parses a merge template without rendering it.
pub fn check_template(template: &str) -> std::result::Result<(), minijinja::Error> {
    let env = Environment::new();
    env.template_from_str(template)?;
    Ok(())
}

/// Vertical merge over hierarchical keys: the run for column `i` is keyed on
/// the raw values of columns `0..=i`, so an inner column never spans across
/// a boundary of an outer one.
fn vertical(columns: &[String], rows: &mut [FormattedRow]) {
    for depth in 0..columns.len() {
        let keys: Vec<Vec<CellValue>> = rows
            .iter()
            .map(|row| {
                columns[..=depth]
                    .iter()
                    .map(|c| raw_value(row, c).clone())
                    .collect()
            })
            .collect();
        let runs = value_runs(&keys, |a, b| {
            a.iter().zip(b).all(|(x, y)| x.loosely_equals(y))
        });
        span_runs(&columns[depth], &runs, rows);
    }
}

fn complex_vertical(directive: &MergeDirective, rows: &mut [FormattedRow]) {
    let first = &directive.columns[0];
    let keys: Vec<Option<String>> = rows
        .iter()
        .map(|row| row.cells.get(first).map(|cell| cell.value.clone()))
        .collect();
    let runs = value_runs(&keys, |a, b| a == b);
    span_runs(first, &runs, rows);
}

fn span_runs(column: &str, runs: &[(usize, usize)], rows: &mut [FormattedRow]) {
    for &(start, len) in runs {
        for (offset, row) in rows[start..start + len].iter_mut().enumerate() {
            let Some(cell) = row.cells.get_mut(column) else {
                continue;
            };
            if offset == 0 {
                cell.rowspan = len;
                cell.is_first = true;
            } else {
                cell.rowspan = 0;
                cell.is_first = false;
            }
            if len > 1 {
                cell.merged = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::FormattedCell;
    use crate::value::{row, Row};

    fn formatted(raw: Row) -> FormattedRow {
        let cells = raw
            .iter()
            .map(|(k, v)| (k.clone(), FormattedCell::new(v.to_display_string())))
            .collect();
        FormattedRow {
            index: 0,
            raw,
            cells,
            hidden: Default::default(),
            groups: Default::default(),
            nested: None,
        }
    }

    #[test]
    fn horizontal_with_separator() {
        let mut rows = vec![formatted(row([("first_name", "John"), ("last_name", "Doe")]))];
        let directive = MergeDirective::horizontal(["first_name", "last_name"]).separator(" ");
        apply(&directive, &mut rows).unwrap();

        let cell = &rows[0].cells["first_name"];
        assert_eq!(cell.value, "John Doe");
        assert_eq!(cell.colspan, 2);
        assert!(cell.merged);
        assert!(rows[0].hidden.contains("last_name"));
    }

    #[test]
    fn horizontal_with_template() {
        let mut rows = vec![formatted(row([("first_name", "John"), ("last_name", "Doe")]))];
        let directive = MergeDirective::horizontal(["first_name", "last_name"])
            .template("{{ last_name }}, {{ first_name }}");
        apply(&directive, &mut rows).unwrap();
        assert_eq!(rows[0].cells["first_name"].value, "Doe, John");
    }

    #[test]
    fn horizontal_respects_condition() {
        let mut rows = vec![
            formatted(row([("a", "x"), ("b", "")])),
            formatted(row([("a", "x"), ("b", "y")])),
        ];
        let directive = MergeDirective::horizontal(["a", "b"]).when(MergeCondition::AllNotEmpty);
        apply(&directive, &mut rows).unwrap();

        assert!(rows[0].hidden.is_empty());
        assert_eq!(rows[0].cells["a"].colspan, 1);
        assert_eq!(rows[1].cells["a"].value, "x y");
    }

    #[test]
    fn horizontal_skips_empty_parts() {
        let mut rows = vec![formatted(row([("a", "x"), ("b", ""), ("c", "z")]))];
        let directive = MergeDirective::horizontal(["a", "b", "c"]).separator("/");
        apply(&directive, &mut rows).unwrap();
        assert_eq!(rows[0].cells["a"].value, "x/z");
        assert_eq!(rows[0].cells["a"].colspan, 3);
    }

    #[test]
    fn horizontal_needs_two_columns() {
        let mut rows = vec![formatted(row([("a", "x")]))];
        let err = apply(&MergeDirective::horizontal(["a"]), &mut rows).unwrap_err();
        assert!(matches!(err, TableError::InvalidMerge(_)));
    }

    #[test]
    fn vertical_runs() {
        let mut rows: Vec<FormattedRow> = ["Web", "Web", "API", "Web"]
            .iter()
            .map(|c| formatted(row([("category", *c)])))
            .collect();
        apply(&MergeDirective::vertical(["category"]), &mut rows).unwrap();

        let spans: Vec<(usize, bool)> = rows
            .iter()
            .map(|r| (r.cells["category"].rowspan, r.cells["category"].is_first))
            .collect();
        assert_eq!(spans, vec![(2, true), (0, false), (1, true), (1, true)]);
    }

    #[test]
    fn vertical_inner_column_breaks_at_outer_boundary() {
        let mut rows = vec![
            formatted(row([("region", "East"), ("office", "A")])),
            formatted(row([("region", "East"), ("office", "A")])),
            formatted(row([("region", "West"), ("office", "A")])),
        ];
        apply(&MergeDirective::vertical(["region", "office"]), &mut rows).unwrap();

        let offices: Vec<usize> = rows.iter().map(|r| r.cells["office"].rowspan).collect();
        assert_eq!(offices, vec![2, 0, 1]);
    }

    #[test]
    fn complex_merges_then_groups() {
        let mut rows = vec![
            formatted(row([("a", "x"), ("b", "1")])),
            formatted(row([("a", "x"), ("b", "1")])),
            formatted(row([("a", "x"), ("b", "2")])),
        ];
        apply(&MergeDirective::complex(["a", "b"]).separator("-"), &mut rows).unwrap();

        let cells: Vec<(&str, usize)> = rows
            .iter()
            .map(|r| (r.cells["a"].value.as_str(), r.cells["a"].rowspan))
            .collect();
        assert_eq!(cells, vec![("x-1", 2), ("x-1", 0), ("x-2", 1)]);
        assert!(rows.iter().all(|r| r.hidden.contains("b")));
    }
}
