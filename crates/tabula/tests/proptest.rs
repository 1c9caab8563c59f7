//! Property-based tests for the formatting pipeline using proptest.

use proptest::prelude::*;
use tabula::{
    row, CellType, CellValue, ColumnSpec, FormatOptions, InMemoryCache, MergeDirective,
    NoopCache, PerformanceOptimizer, RenderStrategy, Row, TableConfig, TableDataFormatter,
    ValueFormatter, Width,
};

use std::sync::Arc;

// ============================================================================
// Strategies
// ============================================================================

fn category_rows() -> impl Strategy<Value = Vec<Row>> {
    prop::collection::vec(prop::sample::select(vec!["Web", "API", "DB", ""]), 0..40).prop_map(
        |cats| {
            cats.into_iter()
                .enumerate()
                .map(|(i, c)| row([("category", CellValue::from(c)), ("n", CellValue::from(i))]))
                .collect()
        },
    )
}

fn width() -> impl Strategy<Value = Width> {
    prop_oneof![
        (0.0..120.0f64).prop_map(Width::Percent),
        (0.0..1500.0f64).prop_map(Width::Pixels),
        Just(Width::Auto),
    ]
}

fn cell_value() -> impl Strategy<Value = CellValue> {
    prop_oneof![
        Just(CellValue::Null),
        "[ a-z0-9@./:-]{0,30}".prop_map(CellValue::from),
        any::<i64>().prop_map(CellValue::from),
        (-1.0e9..1.0e9f64).prop_map(CellValue::from),
    ]
}

fn grouped_config() -> TableConfig {
    TableConfig::builder()
        .column(ColumnSpec::new("category", "Category", CellType::Text).rowspan_group())
        .column(ColumnSpec::new("n", "N", CellType::Number))
        .build()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Rowspans over first rows add up to the row count; covered rows carry 0.
    #[test]
    fn rowspans_partition_rows(rows in category_rows()) {
        let table = TableDataFormatter::default().format_table(&grouped_config(), &rows).unwrap();

        let mut total = 0;
        for r in &table.rows {
            let g = r.groups["category"];
            if g.is_first {
                prop_assert_eq!(g.rowspan, g.group_size);
                total += g.rowspan;
            } else {
                prop_assert_eq!(g.rowspan, 0);
            }
        }
        prop_assert_eq!(total, rows.len());
    }

    /// Vertical merges obey the same partition rule on cells.
    #[test]
    fn vertical_merges_partition_rows(rows in category_rows()) {
        let config = TableConfig::builder()
            .column(ColumnSpec::new("category", "Category", CellType::Text))
            .merge(MergeDirective::vertical(["category"]))
            .build();
        let table = TableDataFormatter::default().format_table(&config, &rows).unwrap();

        let first_spans: usize = table
            .rows
            .iter()
            .map(|r| &r.cells["category"])
            .filter(|c| c.is_first)
            .map(|c| c.rowspan)
            .sum();
        prop_assert_eq!(first_spans, rows.len());
        for r in &table.rows {
            let cell = &r.cells["category"];
            prop_assert_eq!(cell.is_first, cell.rowspan > 0);
        }
    }

    /// Grouping depends only on values: equal inputs give equal output.
    #[test]
    fn formatting_is_deterministic(rows in category_rows()) {
        let formatter = TableDataFormatter::default();
        let a = formatter.format_table(&grouped_config(), &rows).unwrap();
        let b = formatter.format_table(&grouped_config(), &rows.clone()).unwrap();
        prop_assert_eq!(a, b);
    }

    /// Resolved column widths always sum to 100%.
    #[test]
    fn widths_sum_to_one_hundred(widths in prop::collection::vec(width(), 1..10)) {
        let columns: Vec<ColumnSpec> = widths
            .iter()
            .enumerate()
            .map(|(i, w)| ColumnSpec::new(format!("c{}", i), format!("C{}", i), CellType::Text).width(*w))
            .collect();
        let config = TableConfig::builder().columns(columns).build();
        let table = TableDataFormatter::default().format_table(&config, &[]).unwrap();

        let total: f64 = table.columns.iter().map(|c| c.width_percent).sum();
        prop_assert!((total - 100.0).abs() < 1e-6, "total was {}", total);
    }

    /// Formatting is idempotent with and without the cache.
    #[test]
    fn value_formatting_is_idempotent(
        value in cell_value(),
        index in 0..CellType::ALL.len(),
    ) {
        let cell_type = CellType::ALL[index];
        let options = FormatOptions::default();
        let cached = ValueFormatter::with_cache(Arc::new(InMemoryCache::new())).cache_min_size(0);
        let uncached = ValueFormatter::with_cache(Arc::new(NoopCache));

        let first = cached.format(&value, cell_type, &options);
        let second = cached.format(&value, cell_type, &options);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(&first, &uncached.format(&value, cell_type, &options));
    }

    /// Each strategy bucket ends exactly at its threshold.
    #[test]
    fn strategy_is_monotonic(full in 1usize..200, extra in 0usize..200, n in 0usize..600) {
        let optimizer = PerformanceOptimizer::default().thresholds(full, full + extra);
        let rank = |s: RenderStrategy| match s {
            RenderStrategy::FullRender => 0,
            RenderStrategy::LazyLoading => 1,
            RenderStrategy::VirtualScroll => 2,
        };
        prop_assert!(rank(optimizer.select_strategy(n)) <= rank(optimizer.select_strategy(n + 1)));
        prop_assert_eq!(optimizer.select_strategy(full), RenderStrategy::FullRender);
    }
}
