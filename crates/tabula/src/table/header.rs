use crate::types::ColumnSpec;

use super::HeaderCell;

/// Builds the header rows for a column set.
///
/// For each level from 1 up to the deepest `header_level`, consecutive
/// columns sharing a `header_group` at that level cluster into one cell with
/// `colspan` equal to the cluster size. Every other column gets an unlabeled
/// cell of its own at that level. The final row holds every column's label.
///
/// Every row's colspans therefore sum to the number of columns.
pub fn build_header_rows(columns: &[ColumnSpec]) -> Vec<Vec<HeaderCell>> {
    let max_level = columns
        .iter()
        .filter(|c| c.header_group.is_some())
        .filter_map(|c| c.header_level)
        .max()
        .unwrap_or(0);

    let mut rows = Vec::with_capacity(max_level + 1);
    for level in 1..=max_level {
        let mut row: Vec<HeaderCell> = Vec::new();
        for column in columns {
            let group = match (&column.header_group, column.header_level) {
                (Some(group), Some(l)) if l == level => Some(group),
                _ => None,
            };

            let extends_last = matches!(
                (group, row.last()),
                (Some(g), Some(last)) if last.group.as_ref() == Some(g)
            );
            match row.last_mut() {
                Some(last) if extends_last => {
                    last.colspan += 1;
                    last.columns.push(column.key.clone());
                }
                _ => row.push(HeaderCell {
                    label: group.cloned().unwrap_or_default(),
                    colspan: 1,
                    columns: vec![column.key.clone()],
                    group: group.cloned(),
                }),
            }
        }
        rows.push(row);
    }

    rows.push(
        columns
            .iter()
            .map(|c| HeaderCell {
                label: c.label.clone(),
                colspan: 1,
                columns: vec![c.key.clone()],
                group: None,
            })
            .collect(),
    );
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellType;

    fn col(key: &str) -> ColumnSpec {
        ColumnSpec::new(key, key.to_uppercase(), CellType::Text)
    }

    #[test]
    fn flat_columns_get_one_row() {
        let rows = build_header_rows(&[col("a"), col("b")]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1].label, "B");
    }

    #[test]
    fn groups_cluster_with_colspan() {
        let columns = vec![
            col("name"),
            col("tel").header_group(1, "Contact"),
            col("mail").header_group(1, "Contact"),
            col("city").header_group(1, "Address"),
        ];
        let rows = build_header_rows(&columns);
        assert_eq!(rows.len(), 2);

        let top: Vec<(&str, usize)> = rows[0].iter().map(|c| (c.label.as_str(), c.colspan)).collect();
        assert_eq!(top, vec![("", 1), ("Contact", 2), ("Address", 1)]);
        assert_eq!(rows[0][1].columns, vec!["tel", "mail"]);
        assert_eq!(rows[1].len(), 4);
    }

    #[test]
    fn non_adjacent_members_form_separate_cells() {
        let columns = vec![
            col("a").header_group(1, "G"),
            col("b"),
            col("c").header_group(1, "G"),
        ];
        let rows = build_header_rows(&columns);
        assert_eq!(rows[0].len(), 3);
    }

    #[test]
    fn colspans_cover_every_column_at_each_level() {
        let columns = vec![
            col("a").header_group(1, "Top"),
            col("b").header_group(2, "Sub"),
            col("c").header_group(2, "Sub"),
            col("d"),
        ];
        let rows = build_header_rows(&columns);
        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert_eq!(row.iter().map(|c| c.colspan).sum::<usize>(), columns.len());
        }
    }
}
