use crate::value::CellValue;

use super::{FormattedRow, GroupSpan};

/// Splits a sequence into maximal runs of consecutive equal keys.
///
/// Returns `(start, len)` pairs covering every index exactly once.
pub fn value_runs<T>(keys: &[T], eq: impl Fn(&T, &T) -> bool) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=keys.len() {
        if i == keys.len() || !eq(&keys[start], &keys[i]) {
            if i > start {
                runs.push((start, i - start));
            }
            start = i;
        }
    }
    runs
}

/// Annotates rows with contiguous equal-value groups for each listed column.
///
/// Columns are grouped independently of one another. Missing values count as
/// null, and nulls group with each other like any other value.
pub fn compute_rowspans(rows: &mut [FormattedRow], columns: &[&str]) {
    for column in columns {
        let keys: Vec<CellValue> = rows
            .iter()
            .map(|row| row.raw.get(*column).cloned().unwrap_or(CellValue::Null))
            .collect();

        for (start, len) in value_runs(&keys, |a, b| a.loosely_equals(b)) {
            for (offset, row) in rows[start..start + len].iter_mut().enumerate() {
                row.groups.insert(
                    column.to_string(),
                    GroupSpan {
                        is_first: offset == 0,
                        group_size: len,
                        rowspan: if offset == 0 { len } else { 0 },
                    },
                );
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
        FormattedRow {
            index: 0,
            cells: raw
                .keys()
                .map(|k| (k.clone(), FormattedCell::new("")))
                .collect(),
            raw,
            hidden: Default::default(),
            groups: Default::default(),
            nested: None,
        }
    }

    #[test]
    fn runs_cover_every_index() {
        assert_eq!(value_runs(&[1, 1, 2, 2, 2, 3], |a, b| a == b), vec![(0, 2), (2, 3), (5, 1)]);
        assert_eq!(value_runs::<i32>(&[], |a, b| a == b), vec![]);
        assert_eq!(value_runs(&[7], |a, b| a == b), vec![(0, 1)]);
    }

    #[test]
    fn web_web_api() {
        let mut rows: Vec<FormattedRow> = ["Web", "Web", "API"]
            .iter()
            .map(|c| formatted(row([("category", *c)])))
            .collect();
        compute_rowspans(&mut rows, &["category"]);

        let g: Vec<GroupSpan> = rows.iter().map(|r| r.groups["category"]).collect();
        assert_eq!(g[0], GroupSpan { is_first: true, group_size: 2, rowspan: 2 });
        assert!(!g[1].is_first);
        assert_eq!(g[1].rowspan, 0);
        assert_eq!(g[2], GroupSpan { is_first: true, group_size: 1, rowspan: 1 });
    }

    #[test]
    fn nulls_form_their_own_group() {
        let mut rows = vec![
            formatted(row([("k", CellValue::Null)])),
            formatted(Row::new()),
            formatted(row([("k", "x")])),
        ];
        compute_rowspans(&mut rows, &["k"]);
        assert_eq!(rows[0].groups["k"].group_size, 2);
        assert_eq!(rows[2].groups["k"].group_size, 1);
    }

    #[test]
    fn columns_group_independently() {
        let mut rows = vec![
            formatted(row([("a", "1"), ("b", "x")])),
            formatted(row([("a", "1"), ("b", "y")])),
            formatted(row([("a", "2"), ("b", "y")])),
        ];
        compute_rowspans(&mut rows, &["a", "b"]);
        assert_eq!(rows[0].groups["a"].rowspan, 2);
        assert_eq!(rows[0].groups["b"].rowspan, 1);
        assert_eq!(rows[1].groups["b"].rowspan, 2);
        assert_eq!(rows[2].groups["b"].rowspan, 0);
    }
}
