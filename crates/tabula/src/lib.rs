//! # Tabula - Configuration-Driven Table Formatting
//!
//! `tabula` turns heterogeneous rows plus a declarative per-table
//! configuration into a fully formatted presentation model: display strings
//! per cell, merged and grouped spans, hierarchical headers, normalized
//! column widths, CSS class hooks and a render plan sized to the dataset. It
//! emits no markup of its own; the model is meant for a templating layer.
//!
//! ## Core Concepts
//!
//! - [`CellValue`] / [`Row`]: dynamic input values, readable from any serde format
//! - [`TableConfig`]: columns, layout, styling, features, merges and nesting
//! - [`ValueFormatter`]: one value to one display string, per [`CellType`]
//! - [`TableDataFormatter`]: the structural pipeline over a whole dataset
//! - [`PerformanceOptimizer`]: render strategy, chunking, pagination and metrics
//! - [`ErrorHandler`]: repair, fallback and reporting for every failure
//! - [`TableEngine`]: the facade tying it together per table type
//!
//! ## Quick Start
//!
//! ```rust
//! use tabula::{row, CellType, ColumnSpec, TableConfig, TableDataFormatter};
//!
//! let config = TableConfig::builder()
//!     .column(ColumnSpec::new("category", "Category", CellType::Text).rowspan_group())
//!     .column(ColumnSpec::new("price", "Price", CellType::Currency))
//!     .build();
//!
//! let rows = vec![
//!     row([("category", "Web"), ("price", "1000")]),
//!     row([("category", "Web"), ("price", "2500")]),
//!     row([("category", "API"), ("price", "800")]),
//! ];
//!
//! let table = TableDataFormatter::default().format_table(&config, &rows).unwrap();
//! assert_eq!(table.rows[0].cells["price"].value, "1,000円");
//! assert_eq!(table.rows[0].groups["category"].group_size, 2);
//! assert!(!table.rows[1].groups["category"].is_first);
//! ```
//!
//! ## Table Types
//!
//! In an application, configurations are declared per table type and resolved
//! by name. The [`TableEngine`] resolves, validates, formats and plans in one
//! call, and never fails: broken declarations are repaired or replaced, and
//! broken renders degrade to a minimal table, with an [`ErrorReport`] for each.
//!
//! ```rust
//! use tabula::{row, ConfigRegistry, ErrorKind, TableEngine};
//!
//! let engine = TableEngine::new(ConfigRegistry::new());
//! let output = engine.render("service_list", &[row([("category", "Web"), ("name", "CMS")])]);
//!
//! // No declaration exists, so the built-in grouped layout is used.
//! assert_eq!(output.reports[0].kind, ErrorKind::Config);
//! assert!(output.table.is_some());
//! ```

mod assets;
mod cache;
pub mod config;
pub mod data;
mod engine;
mod error;
pub mod formatter;
pub mod perf;
mod recovery;
pub mod table;
mod types;
mod validation;
mod value;

// Errors
pub use error::{ErrorKind, Result, TableError};

// Values and configuration model
pub use types::{
    Breakpoint, CellType, ColumnSpec, FormatOptions, LayoutSpec, LayoutType, MergeCondition,
    MergeDirective, MergeType, NestedSpec, ShowCondition, TableConfig, TableConfigBuilder,
    Transform, Width,
};
pub use value::{parse_numeric, row, CellValue, Number, Row, DATE_TIME_FORMAT};

// Caching
pub use cache::{cache_key, CacheStats, CacheStore, InMemoryCache, NoopCache};

// Formatting
pub use formatter::{FormatRequest, ValueFormatter, EMPTY_PLACEHOLDER};
pub use table::{
    minimal_table, FormattedCell, FormattedRow, FormattedTable, GroupSpan, HeaderCell,
    KeyValuePair, NestedPosition, ResolvedColumn, RowGroup, TableDataFormatter, TablePlan,
};

// Validation
pub use config::{
    ConfigOrigin, ConfigRegistry, ConfigResolver, ConfigSource, ConfigValidator, ConfigViolation,
    EngineSettings, ResolvedConfig, ScoreThresholds,
};
pub use data::{validate_rows, validate_table_data, DataValidationOptions};
pub use validation::ValidationResult;

// Performance
pub use perf::{
    cleanup_data_for_memory, paginate, Chunk, ChunkWindow, CleanupOptions, MetricSample,
    MetricsStore, Page, PageInfo, PerformanceOptimizer, PerformanceScore, RenderMetrics,
    RenderPlan, RenderStrategy,
};

// Recovery
pub use recovery::{
    fallback_config, ErrorHandler, ErrorReport, Outcome, Recovery, RenderFallback, Severity,
};

// Facade and assets
pub use assets::{generate_css, generate_js, perf_class};
pub use engine::{Assets, PagedOutput, PlanSummary, TableEngine, TableEngineBuilder, TableOutput};
