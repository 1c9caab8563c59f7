//! The engine facade.
//!
//! [`TableEngine`] wires the components together for one render:
//!
//! 1. resolve the table type to a configuration (repairing or falling back),
//! 2. validate the rows against it,
//! 3. expand and plan the rows and pick a render strategy,
//! 4. format what the strategy materializes,
//! 5. record render metrics.
//!
//! Every entry point returns a usable [`TableOutput`]. Failures along the way
//! end up as [`ErrorReport`]s on the output, and the table degrades to a
//! minimal rendering or a safe message instead of an error.
//!
//! ```rust
//! use tabula::{row, ConfigRegistry, RenderStrategy, TableEngine};
//!
//! let mut registry = ConfigRegistry::new();
//! registry
//!     .add_inline_yaml(
//!         "prices",
//!         "columns:\n  - { key: item, label: Item, type: text }\n  - { key: price, label: Price, type: currency }\n",
//!     )
//!     .unwrap();
//!
//! let engine = TableEngine::builder().source(registry).build();
//! let output = engine.render("prices", &[row([("item", "Plan A"), ("price", "1000")])]);
//!
//! assert!(!output.degraded);
//! assert_eq!(output.plan.strategy, RenderStrategy::FullRender);
//! let table = output.table.unwrap();
//! assert_eq!(table.rows[0].cells["price"].value, "1,000円");
//! ```

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::assets::{generate_css, generate_js, perf_class};
use crate::cache::{cache_key, CacheStore, InMemoryCache};
use crate::config::{ConfigOrigin, ConfigRegistry, ConfigResolver, ConfigSource, EngineSettings};
use crate::data::{validate_rows, DataValidationOptions};
use crate::error::{Result, TableError};
use crate::formatter::ValueFormatter;
use crate::perf::{
    Chunk, InMemoryMetrics, MetricSample, MetricsStore, PageInfo, PerformanceOptimizer,
    RenderMetrics, RenderStrategy,
};
use crate::recovery::{ErrorHandler, ErrorReport, RenderFallback};
use crate::table::{FormattedRow, FormattedTable, TableDataFormatter, TablePlan};
use crate::types::{Breakpoint, TableConfig};
use crate::validation::ValidationResult;
use crate::value::{CellValue, Row};

/// What a render materialized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub strategy: RenderStrategy,
    /// Rows after nested expansion.
    pub total_rows: usize,
    /// Rows formatted in this output.
    pub loaded_rows: usize,
    /// Rows per follow-up chunk; absent under full rendering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<usize>,
}

/// Result of one render.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableOutput {
    pub table_type: String,
    pub config_origin: ConfigOrigin,
    pub config: TableConfig,
    /// The formatted table, possibly a degraded minimal one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<FormattedTable>,
    /// Safe inline message shown when no table could be produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_message: Option<String>,
    pub plan: PlanSummary,
    /// Rows left for later chunks under lazy loading.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deferred_rows: Vec<Row>,
    /// Configuration warnings and data validation findings.
    pub validation: ValidationResult,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reports: Vec<ErrorReport>,
    /// True when the output is a fallback rather than the configured table.
    pub degraded: bool,
}

/// A render of one page of a dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PagedOutput {
    #[serde(flatten)]
    pub output: TableOutput,
    pub pagination: PageInfo,
}

/// Companion assets for embedding next to rendered tables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assets {
    pub css: String,
    pub js: String,
}

/// Builder for [`TableEngine`].
#[derive(Default)]
pub struct TableEngineBuilder {
    source: Option<Arc<dyn ConfigSource>>,
    cache: Option<Arc<dyn CacheStore>>,
    metrics: Option<Arc<dyn MetricsStore>>,
    settings: EngineSettings,
}

impl TableEngineBuilder {
    pub fn source(self, source: impl ConfigSource + 'static) -> Self {
        self.shared_source(Arc::new(source))
    }

    pub fn shared_source(mut self, source: Arc<dyn ConfigSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn metrics(mut self, metrics: Arc<dyn MetricsStore>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> TableEngine {
        let settings = self.settings;
        let source = self
            .source
            .unwrap_or_else(|| Arc::new(ConfigRegistry::new()));
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(InMemoryCache::new()));
        let metrics = self
            .metrics
            .unwrap_or_else(|| Arc::new(InMemoryMetrics::new(settings.metrics_retention)));

        let handler = Arc::new(ErrorHandler::new(settings.debug));
        let values = ValueFormatter::with_cache(Arc::clone(&cache))
            .cache_min_size(settings.cache_min_size)
            .cache_ttl(settings.cache_ttl());

        TableEngine {
            resolver: ConfigResolver::with_handler(source, Arc::clone(&handler)),
            formatter: TableDataFormatter::from_settings(values, &settings),
            optimizer: PerformanceOptimizer::from_settings(&settings).with_metrics(metrics),
            handler,
            cache,
            settings,
        }
    }
}

/// Configuration-driven table rendering.
pub struct TableEngine {
    resolver: ConfigResolver,
    formatter: TableDataFormatter,
    optimizer: PerformanceOptimizer,
    handler: Arc<ErrorHandler>,
    cache: Arc<dyn CacheStore>,
    settings: EngineSettings,
}

impl std::fmt::Debug for TableEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableEngine")
            .field("resolver", &self.resolver)
            .field("optimizer", &self.optimizer)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl TableEngine {
    pub fn builder() -> TableEngineBuilder {
        TableEngineBuilder::default()
    }

    /// An engine with default settings reading from `source`.
    pub fn new(source: impl ConfigSource + 'static) -> Self {
        Self::builder().source(source).build()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn resolver(&self) -> &ConfigResolver {
        &self.resolver
    }

    pub fn optimizer(&self) -> &PerformanceOptimizer {
        &self.optimizer
    }

    pub fn error_handler(&self) -> &ErrorHandler {
        &self.handler
    }

    /// Renders `rows` as the table type `table_type`.
    pub fn render(&self, table_type: &str, rows: &[Row]) -> TableOutput {
        let started = Instant::now();
        let resolved = self.resolver.resolve_detailed(table_type);

        let cache_key = self.table_cache_key(table_type, &resolved.config, rows);
        if let Some(hit) = cache_key.as_deref().and_then(|key| self.cached_output(key)) {
            tracing::debug!(table_type, "table cache hit");
            self.record(table_type, started, &hit);
            return hit;
        }

        let mut validation = ValidationResult::new();
        for warning in &resolved.warnings {
            validation.add_warning(warning.clone());
        }
        let mut output = TableOutput {
            table_type: table_type.to_string(),
            config_origin: resolved.origin,
            config: resolved.config,
            table: None,
            fallback_message: None,
            plan: PlanSummary {
                strategy: RenderStrategy::FullRender,
                total_rows: rows.len(),
                loaded_rows: 0,
                chunk_size: None,
            },
            deferred_rows: Vec::new(),
            validation,
            reports: resolved.reports,
            degraded: false,
        };

        let data_check = validate_rows(rows, &output.config, &DataValidationOptions::default());
        let data_errors = data_check.errors.clone();
        output.validation.merge(data_check);

        let rendered = if data_errors.is_empty() {
            self.format(&output.config, rows)
        } else {
            let error = TableError::InvalidData(data_errors);
            output
                .reports
                .push(self.handler.handle_data_error(table_type, rows, &error));
            Err(error)
        };

        match rendered {
            Ok(rendered) => {
                output.plan = rendered.plan;
                output.deferred_rows = rendered.deferred_rows;
                output.table = Some(rendered.table);
            }
            Err(error) => self.degrade(&mut output, rows, &error),
        }

        self.record(table_type, started, &output);

        if let Some(key) = cache_key {
            if !output.degraded && output.reports.is_empty() {
                if let Ok(serialized) = serde_json::to_string(&output) {
                    self.cache.set(&key, serialized, self.settings.cache_ttl());
                }
            }
        }
        output
    }

    /// Renders a single record, e.g. for a detail view.
    pub fn render_record(&self, table_type: &str, record: &Row) -> TableOutput {
        self.render(table_type, std::slice::from_ref(record))
    }

    /// Renders one page of `rows` (1-indexed).
    pub fn render_page(&self, table_type: &str, rows: &[Row], page: usize, per_page: usize) -> PagedOutput {
        let pagination = PageInfo::new(rows.len(), page, per_page);
        let output = self.render(table_type, &rows[pagination.range()]);
        PagedOutput { output, pagination }
    }

    /// Formats the chunk of rows starting at `offset`, sized for the strategy
    /// the whole dataset selects. Positions refer to the expanded rows.
    pub fn render_chunk(&self, table_type: &str, rows: &[Row], offset: usize) -> Chunk<FormattedRow> {
        let config = self.resolver.resolve(table_type);
        let plan = match self.formatter.plan(&config, rows) {
            Ok(plan) => plan,
            Err(error) => return self.degraded_chunk(rows, offset, &error),
        };

        let strategy = self.optimizer.select_for(&config, plan.rows.len());
        let size = self.optimizer.chunk_size(strategy).min(plan.rows.len().max(1));
        let window = self.optimizer.chunk_window(plan.rows.len(), offset, size);

        match self.formatter.format_plan(&config, &plan, window.range()) {
            Ok(table) => window.with_rows(table.rows),
            Err(error) => self.degraded_chunk(rows, offset, &error),
        }
    }

    /// Forgets resolved configurations (one table type or all). Clearing all
    /// also empties the formatting cache.
    pub fn clear_cache(&self, table_type: Option<&str>) {
        self.resolver.clear_cache(table_type);
        if table_type.is_none() {
            self.cache.clear();
        }
    }

    pub fn metrics(&self, table_type: &str, limit: usize) -> Vec<MetricSample> {
        self.optimizer.get_metrics(table_type, limit)
    }

    /// Companion CSS for `breakpoints` (all when empty) and the behavior script.
    pub fn assets(&self, breakpoints: &[Breakpoint]) -> Result<Assets> {
        Ok(Assets {
            css: generate_css(breakpoints)?,
            js: generate_js(self.settings.lazy_chunk_size)?,
        })
    }

    fn format(&self, config: &TableConfig, rows: &[Row]) -> Result<Rendered> {
        let plan = self.formatter.plan(config, rows)?;
        let total = plan.rows.len();
        let strategy = self.optimizer.select_for(config, total);

        let (range, chunk_size) = match strategy {
            RenderStrategy::FullRender => (0..total, None),
            RenderStrategy::LazyLoading => {
                let size = self.optimizer.chunk_size(strategy);
                (0..size.min(total), Some(size))
            }
            RenderStrategy::VirtualScroll => (0..0, Some(self.optimizer.chunk_size(strategy))),
        };

        let mut table = self.formatter.format_plan(config, &plan, range.clone())?;
        table.classes.push(perf_class(strategy));

        Ok(Rendered {
            deferred_rows: deferred(&plan, strategy, range.end),
            plan: PlanSummary {
                strategy,
                total_rows: total,
                loaded_rows: table.rows.len(),
                chunk_size,
            },
            table,
        })
    }

    fn degrade(&self, output: &mut TableOutput, rows: &[Row], error: &TableError) {
        let recovery = self.handler.handle_rendering_error(rows, error);
        output.reports.push(recovery.report);
        output.degraded = true;
        output.plan = PlanSummary {
            strategy: RenderStrategy::FullRender,
            total_rows: rows.len(),
            loaded_rows: 0,
            chunk_size: None,
        };
        match recovery.value {
            RenderFallback::Minimal { table } => {
                output.plan.loaded_rows = table.rows.len();
                output.table = Some(table);
            }
            RenderFallback::Message { html } => output.fallback_message = Some(html),
        }
    }

    fn degraded_chunk(&self, rows: &[Row], offset: usize, error: &TableError) -> Chunk<FormattedRow> {
        let size = self.optimizer.chunk_size(RenderStrategy::LazyLoading);
        let window = self.optimizer.chunk_window(rows.len(), offset, size);
        let formatted = match self.handler.handle_rendering_error(&rows[window.range()], error).value {
            RenderFallback::Minimal { table } => table.rows,
            RenderFallback::Message { .. } => Vec::new(),
        };
        window.with_rows(formatted)
    }

    /// Cache key for a render, or `None` when the rows are below the size
    /// threshold or hold values a cached copy could not reproduce exactly.
    fn table_cache_key(&self, table_type: &str, config: &TableConfig, rows: &[Row]) -> Option<String> {
        if !rows.iter().flat_map(|r| r.values()).all(CellValue::is_json_exact) {
            tracing::trace!(table_type, "rows not cacheable");
            return None;
        }
        let size = serde_json::to_string(rows).map(|s| s.len()).unwrap_or(0);
        (size > self.settings.cache_min_size)
            .then(|| cache_key("table", &(table_type, config, &self.settings, rows)))
    }

    fn cached_output(&self, key: &str) -> Option<TableOutput> {
        let raw = self.cache.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(output) => Some(output),
            Err(error) => {
                tracing::warn!(%error, "discarding unreadable cached table");
                self.cache.remove(key);
                None
            }
        }
    }

    fn record(&self, table_type: &str, started: Instant, output: &TableOutput) {
        let memory_usage = output
            .table
            .as_ref()
            .and_then(|t| serde_json::to_vec(t).ok())
            .map_or(0, |bytes| bytes.len() as u64);
        self.optimizer.record_metrics(
            table_type,
            RenderMetrics {
                render_time_ms: started.elapsed().as_secs_f64() * 1000.0,
                memory_usage,
                rows_rendered: output.plan.loaded_rows,
            },
        );
    }
}

struct Rendered {
    table: FormattedTable,
    plan: PlanSummary,
    deferred_rows: Vec<Row>,
}

/// Raw rows a lazy render leaves for later chunks.
fn deferred(plan: &TablePlan, strategy: RenderStrategy, loaded: usize) -> Vec<Row> {
    match strategy {
        RenderStrategy::LazyLoading => plan.rows[loaded..].iter().map(|e| e.row.clone()).collect(),
        _ => Vec::new(),
    }
}
