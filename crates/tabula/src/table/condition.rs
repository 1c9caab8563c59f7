use crate::types::{ColumnSpec, ShowCondition};
use crate::value::Row;

/// Evaluates a column's `show_condition` against the whole dataset.
///
/// Columns without a condition are always visible.
pub fn is_visible(column: &ColumnSpec, rows: &[&Row]) -> bool {
    let Some(condition) = &column.show_condition else {
        return true;
    };

    match condition {
        ShowCondition::HasData { field } => {
            let field = field.as_deref().unwrap_or(&column.key);
            rows.iter()
                .any(|row| row.get(field).is_some_and(|v| !v.is_empty()))
        }
        ShowCondition::DataEquals { field, value } => {
            let field = field.as_deref().unwrap_or(&column.key);
            rows.iter()
                .any(|row| row.get(field).is_some_and(|v| v.loosely_equals(value)))
        }
        ShowCondition::FieldExists { field } => {
            let field = field.as_deref().unwrap_or(&column.key);
            rows.iter().any(|row| row.contains_key(field))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellType;
    use crate::value::{row, CellValue};

    fn column(condition: ShowCondition) -> ColumnSpec {
        ColumnSpec::new("note", "Note", CellType::Text).show_when(condition)
    }

    #[test]
    fn has_data_ignores_blank_values() {
        let rows = [row([("note", "  ")]), row([("note", CellValue::Null)])];
        let refs: Vec<&Row> = rows.iter().collect();
        assert!(!is_visible(&column(ShowCondition::HasData { field: None }), &refs));

        let rows = [row([("note", "")]), row([("note", "hi")])];
        let refs: Vec<&Row> = rows.iter().collect();
        assert!(is_visible(&column(ShowCondition::HasData { field: None }), &refs));
    }

    #[test]
    fn data_equals_compares_values() {
        let rows = [row([("kind", 1)]), row([("kind", 2)])];
        let refs: Vec<&Row> = rows.iter().collect();
        let cond = |v: f64| ShowCondition::DataEquals {
            field: Some("kind".into()),
            value: CellValue::from(v),
        };
        assert!(is_visible(&column(cond(2.0)), &refs));
        assert!(!is_visible(&column(cond(3.0)), &refs));
    }

    #[test]
    fn field_exists_accepts_null() {
        let rows = [row([("note", CellValue::Null)])];
        let refs: Vec<&Row> = rows.iter().collect();
        assert!(is_visible(&column(ShowCondition::FieldExists { field: None }), &refs));
        assert!(!is_visible(&column(ShowCondition::FieldExists { field: Some("x".into()) }), &refs));
    }

    #[test]
    fn unconditional_columns_always_show() {
        let col = ColumnSpec::new("x", "X", CellType::Text);
        assert!(is_visible(&col, &[]));
    }
}
