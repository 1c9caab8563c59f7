//! Built-in default skeleton for table declarations.
//!
//! Declarations are merged over this skeleton before validation, so a table
//! only has to declare its columns.

use once_cell::sync::Lazy;
use serde_json::{json, Value as Json};

static SKELETON: Lazy<Json> = Lazy::new(|| {
    json!({
        "layout": {
            "type": "standard_table",
            "columns_per_row": 2,
            "responsive_breakpoint": "md"
        },
        "styling": {
            "table_class": "table table-bordered",
            "header_class": "table-header",
            "empty_text": "not set"
        },
        "features": {
            "dynamic_columns": true,
            "responsive": true,
            "sortable": false
        }
    })
});

/// The default declaration every table type starts from.
pub fn skeleton() -> &'static Json {
    &SKELETON
}

/// Deep-merges `overlay` onto `base`.
///
/// Objects merge key by key. Any other overlay value, arrays included,
/// replaces the base value wholesale.
pub fn merge_json(base: &mut Json, overlay: Json) {
    match (base, overlay) {
        (Json::Object(base_map), Json::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Merges a declaration over the skeleton.
pub fn with_defaults(declared: Json) -> Json {
    let mut merged = skeleton().clone();
    merge_json(&mut merged, declared);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_keeps_untouched_defaults() {
        let merged = with_defaults(json!({
            "columns": [{"key": "a", "label": "A", "type": "text"}],
            "layout": {"type": "key_value_pairs"}
        }));
        assert_eq!(merged["layout"]["type"], "key_value_pairs");
        assert_eq!(merged["layout"]["columns_per_row"], 2);
        assert_eq!(merged["features"]["dynamic_columns"], true);
        assert_eq!(merged["columns"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn arrays_replace() {
        let mut base = json!({"a": [1, 2, 3]});
        merge_json(&mut base, json!({"a": [4]}));
        assert_eq!(base, json!({"a": [4]}));
    }

    #[test]
    fn non_object_overlay_replaces() {
        let mut base = json!({"a": {"b": 1}});
        merge_json(&mut base, json!({"a": "flat"}));
        assert_eq!(base, json!({"a": "flat"}));
    }
}
