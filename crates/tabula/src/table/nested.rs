use crate::error::{Result, TableError};
use crate::types::NestedSpec;
use crate::value::{CellValue, Row};

use super::NestedPosition;

/// A row after nested expansion, with its position if it was a child.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpandedRow {
    pub row: Row,
    pub nested: Option<NestedPosition>,
}

/// Expands rows holding a child sequence under `spec.field` into one row per
/// child.
///
/// Each child row carries the parent's fields (all of them, or only
/// `spec.parent_fields` when set) overlaid with the child's own fields; on a
/// key conflict the child wins. Children that are themselves parents are
/// expanded in turn, depth first, up to `max_depth` levels.
///
/// Rows where the field is absent, null or an empty list pass through
/// unchanged.
pub fn expand_nested(rows: &[Row], spec: &NestedSpec, max_depth: usize) -> Result<Vec<ExpandedRow>> {
    let mut out = Vec::with_capacity(rows.len());

    for (parent_index, row) in rows.iter().enumerate() {
        let mut stack: Vec<ExpandedRow> = vec![ExpandedRow {
            row: row.clone(),
            nested: None,
        }];

        while let Some(current) = stack.pop() {
            let children = match current.row.get(&spec.field) {
                Some(CellValue::List(items)) if !items.is_empty() => items.clone(),
                _ => {
                    out.push(current);
                    continue;
                }
            };

            let depth = current.nested.map_or(0, |p| p.depth) + 1;
            if depth > max_depth {
                return Err(TableError::NestingTooDeep { max_depth });
            }

            let inherited = inherit(&current.row, spec);
            let count = children.len();
            // Pushed in reverse so children pop in their original order.
            for (child_index, child) in children.into_iter().enumerate().rev() {
                let mut merged = inherited.clone();
                match child {
                    CellValue::Map(fields) => merged.extend(fields),
                    scalar => {
                        merged.insert(spec.field.clone(), scalar);
                    }
                }
                stack.push(ExpandedRow {
                    row: merged,
                    nested: Some(NestedPosition {
                        parent_index,
                        child_index,
                        is_first_child: child_index == 0,
                        is_last_child: child_index + 1 == count,
                        depth,
                    }),
                });
            }
        }
    }

    Ok(out)
}

fn inherit(parent: &Row, spec: &NestedSpec) -> Row {
    parent
        .iter()
        .filter(|(key, _)| **key != spec.field)
        .filter(|(key, _)| spec.parent_fields.is_empty() || spec.parent_fields.contains(*key))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::row;

    fn spec(parent_fields: &[&str]) -> NestedSpec {
        NestedSpec {
            field: "items".into(),
            parent_fields: parent_fields.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn order(name: &str, items: Vec<CellValue>) -> Row {
        let mut r = row([("order", name), ("customer", "ACME")]);
        r.insert("items".into(), CellValue::List(items));
        r
    }

    #[test]
    fn children_inherit_parent_fields() {
        let rows = vec![order(
            "A-1",
            vec![
                row([("sku", "x")]).into(),
                row([("sku", "y"), ("customer", "Override")]).into(),
            ],
        )];
        let out = expand_nested(&rows, &spec(&[]), 3).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].row["order"], CellValue::from("A-1"));
        assert_eq!(out[0].row["sku"], CellValue::from("x"));
        assert_eq!(out[1].row["customer"], CellValue::from("Override"));
        assert!(!out[0].row.contains_key("items"));

        let first = out[0].nested.unwrap();
        let last = out[1].nested.unwrap();
        assert!(first.is_first_child && !first.is_last_child);
        assert!(last.is_last_child && !last.is_first_child);
        assert_eq!(last.child_index, 1);
        assert_eq!(last.depth, 1);
    }

    #[test]
    fn parent_fields_restrict_inheritance() {
        let rows = vec![order("A-1", vec![row([("sku", "x")]).into()])];
        let out = expand_nested(&rows, &spec(&["order"]), 3).unwrap();
        assert!(out[0].row.contains_key("order"));
        assert!(!out[0].row.contains_key("customer"));
    }

    #[test]
    fn rows_without_children_pass_through() {
        let rows = vec![
            row([("order", "plain")]),
            order("empty", vec![]),
            order("A-2", vec![row([("sku", "z")]).into()]),
        ];
        let out = expand_nested(&rows, &spec(&[]), 3).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].nested, None);
        assert_eq!(out[1].nested, None);
        assert_eq!(out[2].nested.unwrap().parent_index, 2);
    }

    #[test]
    fn scalar_children_land_under_the_field() {
        let rows = vec![order("A-1", vec!["red".into(), "blue".into()])];
        let out = expand_nested(&rows, &spec(&[]), 3).unwrap();
        assert_eq!(out[1].row["items"], CellValue::from("blue"));
    }

    #[test]
    fn grandchildren_expand_depth_first() {
        let grandchild = {
            let mut r = row([("sku", "inner")]);
            r.insert("items".into(), CellValue::List(vec![row([("part", "p1")]).into()]));
            r
        };
        let rows = vec![order("A-1", vec![grandchild.into(), row([("sku", "outer")]).into()])];
        let out = expand_nested(&rows, &spec(&[]), 3).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].row["part"], CellValue::from("p1"));
        assert_eq!(out[0].nested.unwrap().depth, 2);
        assert_eq!(out[1].row["sku"], CellValue::from("outer"));
    }

    #[test]
    fn depth_limit_is_enforced() {
        let mut leaf = row([("v", 1)]);
        for _ in 0..3 {
            let mut parent = Row::new();
            parent.insert("items".into(), CellValue::List(vec![leaf.into()]));
            leaf = parent;
        }
        let rows = vec![leaf];
        assert!(expand_nested(&rows, &spec(&[]), 3).is_ok());
        let err = expand_nested(&rows, &spec(&[]), 2).unwrap_err();
        assert!(matches!(err, TableError::NestingTooDeep { max_depth: 2 }));
    }
}
