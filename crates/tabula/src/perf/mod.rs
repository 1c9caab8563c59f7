//! Render strategy selection, chunking, pagination and render metrics.
//!
//! The [`PerformanceOptimizer`] picks how much of a dataset is materialized
//! at once, by row count against two thresholds:
//!
//! | rows                                   | strategy         |
//! |----------------------------------------|------------------|
//! | `<= full_render_max`                   | `full_render`    |
//! | `<= lazy_loading_max`                  | `lazy_loading`   |
//! | more                                   | `virtual_scroll` |
//!
//! A dataset exactly at a threshold stays in the lower bucket.
//!
//! ```rust
//! use tabula::{PerformanceOptimizer, RenderStrategy};
//!
//! let optimizer = PerformanceOptimizer::default();
//! assert_eq!(optimizer.select_strategy(50), RenderStrategy::FullRender);
//! assert_eq!(optimizer.select_strategy(51), RenderStrategy::LazyLoading);
//! assert_eq!(optimizer.select_strategy(250), RenderStrategy::VirtualScroll);
//! ```

mod cleanup;
mod metrics;
mod pagination;

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::{EngineSettings, ScoreThresholds};
use crate::types::TableConfig;

pub use cleanup::{cleanup_data_for_memory, CleanupOptions, TRUNCATED_FIELD};
pub use metrics::{
    performance_score, InMemoryMetrics, MetricSample, MetricsStore, NoopMetrics, PerformanceScore,
    RenderMetrics,
};
pub use pagination::{paginate, Page, PageInfo};

/// Feature flag forcing full rendering regardless of size.
pub const FULL_RENDER_ONLY_FEATURE: &str = "full_render_only";

/// How much formatted data is materialized at once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStrategy {
    FullRender,
    LazyLoading,
    VirtualScroll,
}

impl RenderStrategy {
    pub const ALL: [RenderStrategy; 3] = [
        RenderStrategy::FullRender,
        RenderStrategy::LazyLoading,
        RenderStrategy::VirtualScroll,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStrategy::FullRender => "full_render",
            RenderStrategy::LazyLoading => "lazy_loading",
            RenderStrategy::VirtualScroll => "virtual_scroll",
        }
    }
}

impl std::fmt::Display for RenderStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dataset arranged for its strategy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum RenderPlan<T> {
    /// Everything, unchanged.
    FullRender { rows: Vec<T> },
    /// An initial slice now, the remainder for later chunks.
    LazyLoading {
        initial: Vec<T>,
        remaining: Vec<T>,
        loaded_rows: usize,
        total_rows: usize,
        chunk_size: usize,
    },
    /// Only the shape; slices are requested on demand.
    VirtualScroll { total_rows: usize, chunk_size: usize },
}

impl<T> RenderPlan<T> {
    pub fn strategy(&self) -> RenderStrategy {
        match self {
            RenderPlan::FullRender { .. } => RenderStrategy::FullRender,
            RenderPlan::LazyLoading { .. } => RenderStrategy::LazyLoading,
            RenderPlan::VirtualScroll { .. } => RenderStrategy::VirtualScroll,
        }
    }

    pub fn total_rows(&self) -> usize {
        match self {
            RenderPlan::FullRender { rows } => rows.len(),
            RenderPlan::LazyLoading { total_rows, .. }
            | RenderPlan::VirtualScroll { total_rows, .. } => *total_rows,
        }
    }
}

/// One on-demand slice of a dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chunk<T> {
    pub rows: Vec<T>,
    pub offset: usize,
    /// Where the following chunk starts.
    pub next_offset: usize,
    pub total_rows: usize,
    pub has_more: bool,
    /// Share of the dataset delivered through this chunk, in percent.
    pub progress: f64,
}

/// Where one chunk sits in a dataset, without the rows themselves.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChunkWindow {
    pub offset: usize,
    pub next_offset: usize,
    pub total_rows: usize,
    pub has_more: bool,
    pub progress: f64,
}

impl ChunkWindow {
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.next_offset
    }

    /// Pairs the window with the rows it covers.
    pub fn with_rows<T>(self, rows: Vec<T>) -> Chunk<T> {
        Chunk {
            rows,
            offset: self.offset,
            next_offset: self.next_offset,
            total_rows: self.total_rows,
            has_more: self.has_more,
            progress: self.progress,
        }
    }
}

/// Chooses render strategies and slices datasets accordingly.
#[derive(Clone)]
pub struct PerformanceOptimizer {
    full_render_max: usize,
    lazy_loading_max: usize,
    lazy_chunk_size: usize,
    virtual_chunk_size: usize,
    thresholds: ScoreThresholds,
    metrics: Arc<dyn MetricsStore>,
}

impl std::fmt::Debug for PerformanceOptimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerformanceOptimizer")
            .field("full_render_max", &self.full_render_max)
            .field("lazy_loading_max", &self.lazy_loading_max)
            .field("lazy_chunk_size", &self.lazy_chunk_size)
            .field("virtual_chunk_size", &self.virtual_chunk_size)
            .finish_non_exhaustive()
    }
}

impl Default for PerformanceOptimizer {
    fn default() -> Self {
        Self::from_settings(&EngineSettings::default())
    }
}

impl PerformanceOptimizer {
    pub fn from_settings(settings: &EngineSettings) -> Self {
        PerformanceOptimizer {
            full_render_max: settings.full_render_max,
            lazy_loading_max: settings.lazy_loading_max.max(settings.full_render_max),
            lazy_chunk_size: settings.lazy_chunk_size.max(1),
            virtual_chunk_size: settings.virtual_chunk_size.max(1),
            thresholds: settings.score_thresholds.clone(),
            metrics: Arc::new(InMemoryMetrics::new(settings.metrics_retention)),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsStore>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Sets both strategy thresholds.
    pub fn thresholds(mut self, full_render_max: usize, lazy_loading_max: usize) -> Self {
        self.full_render_max = full_render_max;
        self.lazy_loading_max = lazy_loading_max.max(full_render_max);
        self
    }

    pub fn lazy_chunk_size(mut self, size: usize) -> Self {
        self.lazy_chunk_size = size.max(1);
        self
    }

    pub fn virtual_chunk_size(mut self, size: usize) -> Self {
        self.virtual_chunk_size = size.max(1);
        self
    }

    pub fn select_strategy(&self, row_count: usize) -> RenderStrategy {
        let strategy = if row_count <= self.full_render_max {
            RenderStrategy::FullRender
        } else if row_count <= self.lazy_loading_max {
            RenderStrategy::LazyLoading
        } else {
            RenderStrategy::VirtualScroll
        };
        tracing::debug!(row_count, %strategy, "selected render strategy");
        strategy
    }

    /// Strategy for a table, honoring the `full_render_only` feature.
    pub fn select_for(&self, config: &TableConfig, row_count: usize) -> RenderStrategy {
        if config.feature(FULL_RENDER_ONLY_FEATURE) {
            RenderStrategy::FullRender
        } else {
            self.select_strategy(row_count)
        }
    }

    /// Rows per chunk under `strategy`. Full rendering has a single chunk.
    pub fn chunk_size(&self, strategy: RenderStrategy) -> usize {
        match strategy {
            RenderStrategy::FullRender => usize::MAX,
            RenderStrategy::LazyLoading => self.lazy_chunk_size,
            RenderStrategy::VirtualScroll => self.virtual_chunk_size,
        }
    }

    /// Arranges `rows` for the strategy their count selects.
    pub fn plan<T: Clone>(&self, rows: &[T]) -> RenderPlan<T> {
        self.plan_with(rows, self.select_strategy(rows.len()))
    }

    pub fn plan_with<T: Clone>(&self, rows: &[T], strategy: RenderStrategy) -> RenderPlan<T> {
        match strategy {
            RenderStrategy::FullRender => RenderPlan::FullRender { rows: rows.to_vec() },
            RenderStrategy::LazyLoading => {
                let split = self.lazy_chunk_size.min(rows.len());
                RenderPlan::LazyLoading {
                    initial: rows[..split].to_vec(),
                    remaining: rows[split..].to_vec(),
                    loaded_rows: split,
                    total_rows: rows.len(),
                    chunk_size: self.lazy_chunk_size,
                }
            }
            RenderStrategy::VirtualScroll => RenderPlan::VirtualScroll {
                total_rows: rows.len(),
                chunk_size: self.virtual_chunk_size,
            },
        }
    }

    /// The window of a `total`-row dataset starting at `offset`, `size` rows
    /// long. Offsets past the end give an empty final window.
    pub fn chunk_window(&self, total: usize, offset: usize, size: usize) -> ChunkWindow {
        let start = offset.min(total);
        let end = start.saturating_add(size.max(1)).min(total);
        let progress = if total == 0 {
            100.0
        } else {
            (end as f64 / total as f64 * 1000.0).round() / 10.0
        };
        ChunkWindow {
            offset: start,
            next_offset: end,
            total_rows: total,
            has_more: end < total,
            progress,
        }
    }

    /// The chunk of `rows` starting at `offset`, `size` rows long.
    pub fn next_chunk<T: Clone>(&self, rows: &[T], offset: usize, size: usize) -> Chunk<T> {
        let window = self.chunk_window(rows.len(), offset, size);
        window.with_rows(rows[window.range()].to_vec())
    }

    pub fn paginate<T: Clone>(&self, rows: &[T], page: usize, per_page: usize) -> Page<T> {
        paginate(rows, page, per_page)
    }

    /// Appends a render's measurements to the table type's series.
    pub fn record_metrics(&self, table_type: &str, metrics: RenderMetrics) {
        let score = performance_score(&metrics, &self.thresholds);
        tracing::debug!(
            table_type,
            render_time_ms = metrics.render_time_ms,
            memory_usage = metrics.memory_usage,
            rows = metrics.rows_rendered,
            ?score,
            "render metrics"
        );
        self.metrics.record(
            table_type,
            MetricSample {
                timestamp: Utc::now(),
                metrics,
            },
        );
    }

    /// The most recent `limit` samples for a table type.
    pub fn get_metrics(&self, table_type: &str, limit: usize) -> Vec<MetricSample> {
        self.metrics.recent(table_type, limit)
    }

    pub fn score(&self, metrics: &RenderMetrics) -> PerformanceScore {
        performance_score(metrics, &self.thresholds)
    }

    pub fn clear_metrics(&self, table_type: Option<&str>) {
        self.metrics.clear(table_type);
    }
}
