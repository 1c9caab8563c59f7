//! End-to-end tests for the table engine.
//!
//! Table declarations are written to a temporary configuration directory and
//! resolved by name, the way an application would ship them.

use std::fs;
use std::sync::Arc;

use tabula::{
    row, CellType, CellValue, ConfigOrigin, ConfigRegistry, ConfigResolver, ConfigSource,
    ConfigValidator, ErrorHandler, ErrorKind, LayoutType, RenderStrategy, Row, TableEngine,
};
use tempfile::TempDir;

fn config_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("services.yaml"),
        r#"
columns:
  - key: category
    label: カテゴリ
    type: text
    rowspan_group: true
  - key: name
    label: サービス
    type: text
  - key: price
    label: 料金
    type: currency
    width: 20%
  - key: status
    label: 状態
    type: badge
    auto_class: true
layout:
  type: grouped_rows
  group_by: category
"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("contacts.json"),
        r#"{
  "columns": [
    {"key": "first_name", "label": "名", "type": "text"},
    {"key": "last_name", "label": "姓", "type": "text"},
    {"key": "email", "label": "メール", "type": "email"}
  ],
  "merges": [
    {"type": "horizontal", "columns": ["last_name", "first_name"], "separator": " "}
  ],
  "features": {"dynamic_columns": false}
}"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("partial.yml"),
        r#"
columns:
  - key: created_at
  - key: amount
    label: 金額
    type: number
    decimals: -1
layout:
  responsive_breakpoint: huge
"#,
    )
    .unwrap();
    fs::write(dir.path().join("garbled.yaml"), "columns: [unclosed").unwrap();
    dir
}

fn engine(dir: &TempDir) -> TableEngine {
    let mut registry = ConfigRegistry::new();
    registry.add_dir(dir.path()).unwrap();
    TableEngine::new(registry)
}

fn services() -> Vec<Row> {
    vec![
        row([("category", "Web"), ("name", "CMS"), ("price", "1000"), ("status", "active")]),
        row([("category", "Web"), ("name", "Shop"), ("price", "2500"), ("status", "pending")]),
        row([("category", "API"), ("name", "Gateway"), ("price", "800"), ("status", "error")]),
    ]
}

fn numbered(n: usize) -> Vec<Row> {
    (0..n)
        .map(|i| {
            row([
                ("category", CellValue::from(if i < n / 2 { "A" } else { "B" })),
                ("name", CellValue::from(format!("item {}", i))),
                ("price", CellValue::from(i * 100)),
                ("status", CellValue::from("active")),
            ])
        })
        .collect()
}

#[test]
fn grouped_services_render_with_rowspans() {
    let dir = config_dir();
    let output = engine(&dir).render("services", &services());

    assert_eq!(output.config_origin, ConfigOrigin::Declared);
    assert!(output.reports.is_empty(), "{:?}", output.reports);
    let table = output.table.unwrap();

    assert_eq!(table.layout, LayoutType::GroupedRows);
    assert_eq!(table.rows[0].cells["price"].value, "1,000円");
    assert!(table.rows[2].cells["status"].value.contains("badge-danger"));

    let spans: Vec<(bool, usize)> = table
        .rows
        .iter()
        .map(|r| {
            let g = r.groups["category"];
            (g.is_first, g.group_size)
        })
        .collect();
    assert_eq!(spans, vec![(true, 2), (false, 2), (true, 1)]);

    let groups: Vec<(&str, usize)> = table.groups.iter().map(|g| (g.key.as_str(), g.rows.len())).collect();
    assert_eq!(groups, vec![("Web", 2), ("API", 1)]);

    let total: f64 = table.columns.iter().map(|c| c.width_percent).sum();
    assert!((total - 100.0).abs() < 1e-6);
    assert_eq!(table.column("price").unwrap().width_percent, 20.0);
}

#[test]
fn json_declarations_merge_columns() {
    let dir = config_dir();
    let output = engine(&dir).render(
        "contacts",
        &[row([("first_name", "Taro"), ("last_name", "Yamada"), ("email", "taro@example.com")])],
    );
    let table = output.table.unwrap();
    let first = &table.rows[0];

    assert_eq!(first.cells["last_name"].value, "Yamada Taro");
    assert_eq!(first.cells["last_name"].colspan, 2);
    assert!(first.hidden.contains("first_name"));
    let visible: Vec<&str> = first.visible_cells(&table.columns).map(|(c, _)| c.key.as_str()).collect();
    assert_eq!(visible, vec!["last_name", "email"]);
}

#[test]
fn partial_declarations_are_repaired_and_revalidate() {
    let dir = config_dir();
    let mut registry = ConfigRegistry::new();
    registry.add_dir(dir.path()).unwrap();
    let resolver = ConfigResolver::new(Arc::new(registry));

    assert!(!resolver.validate_declared("partial").unwrap().valid);

    let resolved = resolver.resolve_detailed("partial");
    assert_eq!(resolved.origin, ConfigOrigin::Repaired);
    assert_eq!(resolved.reports[0].kind, ErrorKind::Validation);

    let config = resolved.config;
    assert_eq!(config.columns[0].cell_type, CellType::Text);
    assert_eq!(config.columns[0].label, "作成日時");
    assert_eq!(config.columns[1].format.decimals, Some(0));
    assert_eq!(config.layout.responsive_breakpoint.as_str(), "md");

    let revalidated = ConfigValidator::new().validate_config(&config);
    assert!(revalidated.valid, "{:?}", revalidated.errors);
}

#[test]
fn unparseable_and_missing_declarations_fall_back() {
    let dir = config_dir();
    let engine = engine(&dir);

    let garbled = engine.render("garbled", &services());
    assert_eq!(garbled.config_origin, ConfigOrigin::Fallback);
    assert_eq!(garbled.reports[0].kind, ErrorKind::Config);
    assert!(garbled.table.is_some());

    let missing = engine.render("basic_info", &[row([("name", "Tokyo office"), ("value", "open")])]);
    assert_eq!(missing.config_origin, ConfigOrigin::Fallback);
    assert_eq!(missing.table.unwrap().layout, LayoutType::KeyValuePairs);
}

#[test]
fn strategy_boundaries() {
    let dir = config_dir();
    let engine = engine(&dir);

    assert_eq!(engine.render("services", &numbered(50)).plan.strategy, RenderStrategy::FullRender);
    assert_eq!(engine.render("services", &numbered(51)).plan.strategy, RenderStrategy::LazyLoading);
    assert_eq!(engine.render("services", &numbered(100)).plan.strategy, RenderStrategy::LazyLoading);
    assert_eq!(engine.render("services", &numbered(101)).plan.strategy, RenderStrategy::VirtualScroll);
}

#[test]
fn large_dataset_selects_virtual_scroll() {
    let dir = config_dir();
    let engine = engine(&dir);
    let data = numbered(250);

    let output = engine.render("services", &data);
    assert_eq!(output.plan.strategy, RenderStrategy::VirtualScroll);
    assert_eq!(output.plan.total_rows, 250);
    assert_eq!(output.plan.chunk_size, Some(50));

    let json = serde_json::to_value(&output.plan).unwrap();
    assert_eq!(json["strategy"], "virtual_scroll");

    let mut offset = 0;
    let mut seen = 0;
    loop {
        let chunk = engine.render_chunk("services", &data, offset);
        seen += chunk.rows.len();
        if !chunk.has_more {
            break;
        }
        offset = chunk.next_offset;
    }
    assert_eq!(seen, 250);
}

#[test]
fn metrics_accumulate_per_table_type() {
    let dir = config_dir();
    let engine = engine(&dir);
    for _ in 0..3 {
        engine.render("services", &services());
    }
    let samples = engine.metrics("services", 2);
    assert_eq!(samples.len(), 2);
    assert!(samples.iter().all(|s| s.metrics.rows_rendered == 3));
    assert!(engine.metrics("contacts", 10).is_empty());
}

#[test]
fn source_priority_prefers_inline() {
    let dir = config_dir();
    let mut registry = ConfigRegistry::new();
    registry
        .add_inline_yaml("services", "columns:\n  - { key: only, label: Only, type: text }\n")
        .unwrap();
    registry.add_dir(dir.path()).unwrap();

    let loaded = registry.load("services").unwrap().unwrap();
    assert_eq!(loaded["columns"].as_array().unwrap().len(), 1);
}

#[test]
fn rendering_errors_report_without_detail() {
    let handler = ErrorHandler::new(false);
    let rows = vec![row([("note", "<script>alert(1)</script>")])];
    let recovery = handler.handle_rendering_error(&rows, &tabula::TableError::Rendering("internal".into()));
    assert!(recovery.report.technical_message.is_empty());
    assert!(recovery.report.id.starts_with("tbl_err_"));
    match recovery.value {
        tabula::RenderFallback::Minimal { table } => {
            assert!(!table.rows[0].cells["note"].value.contains('<'));
        }
        other => panic!("expected a minimal table, got {:?}", other),
    }
}
