//! Layout shaping and CSS class composition.

use crate::formatter::css_slug;
use crate::types::{LayoutType, TableConfig};
use crate::value::CellValue;

use super::rowspan::value_runs;
use super::{FormattedRow, KeyValuePair, ResolvedColumn, RowGroup};

/// Styling key holding the base table class list.
pub const TABLE_CLASS_KEY: &str = "table_class";

/// Label/value pairs of one record, `per_row` pairs to a line.
///
/// `per_row` is clamped to 1..=4. Hidden cells are skipped.
pub fn key_value_pairs(
    columns: &[ResolvedColumn],
    record: Option<&FormattedRow>,
    per_row: usize,
) -> Vec<Vec<KeyValuePair>> {
    let Some(record) = record else {
        return Vec::new();
    };
    let pairs: Vec<KeyValuePair> = columns
        .iter()
        .filter(|c| !record.hidden.contains(&c.key))
        .filter_map(|c| {
            record.cells.get(&c.key).map(|cell| KeyValuePair {
                key: c.key.clone(),
                label: c.label.clone(),
                value: cell.value.clone(),
            })
        })
        .collect();

    pairs
        .chunks(per_row.clamp(1, 4))
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Contiguous runs of rows sharing the raw `group_by` value.
///
/// Without a `group_by` field, all rows form one group.
pub fn row_groups(rows: &[FormattedRow], group_by: Option<&str>) -> Vec<RowGroup> {
    if rows.is_empty() {
        return Vec::new();
    }
    let Some(field) = group_by else {
        return vec![RowGroup {
            key: String::new(),
            value: CellValue::Null,
            rows: (0..rows.len()).collect(),
        }];
    };

    let keys: Vec<CellValue> = rows
        .iter()
        .map(|r| r.raw.get(field).cloned().unwrap_or_default())
        .collect();
    value_runs(&keys, |a, b| a.loosely_equals(b))
        .into_iter()
        .map(|(start, len)| RowGroup {
            key: keys[start].to_display_string(),
            value: keys[start].clone(),
            rows: (start..start + len).collect(),
        })
        .collect()
}

/// CSS classes for the table root: the configured base classes, then layout
/// and breakpoint modifiers.
pub fn table_classes(config: &TableConfig) -> Vec<String> {
    let mut classes: Vec<String> = config
        .styling(TABLE_CLASS_KEY)
        .unwrap_or("table")
        .split_whitespace()
        .map(str::to_string)
        .collect();

    let layout = match config.layout.layout_type {
        LayoutType::KeyValuePairs => "key-value",
        LayoutType::GroupedRows => "grouped",
        LayoutType::StandardTable => "standard",
    };
    classes.push(format!("table-layout-{}", layout));
    classes.push(format!(
        "table-responsive-{}",
        config.layout.responsive_breakpoint.as_str()
    ));
    if let Some(extra) = config.styling("class") {
        classes.extend(extra.split_whitespace().map(css_slug).filter(|c| !c.is_empty()));
    }
    classes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::FormattedCell;
    use crate::types::{CellType, Width};
    use crate::value::{row, Row};

    fn column(key: &str) -> ResolvedColumn {
        ResolvedColumn {
            key: key.into(),
            label: key.to_uppercase(),
            cell_type: CellType::Text,
            width: Width::Auto,
            width_percent: 0.0,
            dynamic: false,
            rowspan_group: false,
        }
    }

    fn formatted(raw: Row) -> FormattedRow {
        FormattedRow {
            index: 0,
            cells: raw
                .iter()
                .map(|(k, v)| (k.clone(), FormattedCell::new(v.to_display_string())))
                .collect(),
            raw,
            hidden: Default::default(),
            groups: Default::default(),
            nested: None,
        }
    }

    #[test]
    fn pairs_are_chunked() {
        let columns: Vec<ResolvedColumn> = ["a", "b", "c"].into_iter().map(column).collect();
        let record = formatted(row([("a", "1"), ("b", "2"), ("c", "3")]));

        let pairs = key_value_pairs(&columns, Some(&record), 2);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0][1].label, "B");
        assert_eq!(pairs[1][0].value, "3");

        let clamped = key_value_pairs(&columns, Some(&record), 0);
        assert_eq!(clamped.len(), 3);
        assert!(key_value_pairs(&columns, None, 2).is_empty());
    }

    #[test]
    fn groups_follow_contiguous_values() {
        let rows: Vec<FormattedRow> = ["a", "a", "b", "a"]
            .iter()
            .map(|s| formatted(row([("service", *s)])))
            .collect();

        let groups = row_groups(&rows, Some("service"));
        let shape: Vec<(&str, usize)> = groups.iter().map(|g| (g.key.as_str(), g.rows.len())).collect();
        assert_eq!(shape, vec![("a", 2), ("b", 1), ("a", 1)]);

        let single = row_groups(&rows, None);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].rows, vec![0, 1, 2, 3]);
    }

    #[test]
    fn classes_compose() {
        let config = TableConfig::builder()
            .layout_type(LayoutType::GroupedRows)
            .styling("table_class", "table table-striped")
            .styling("class", "Service List")
            .build();
        assert_eq!(
            table_classes(&config),
            vec![
                "table",
                "table-striped",
                "table-layout-grouped",
                "table-responsive-md",
                "service",
                "list"
            ]
        );
    }
}
