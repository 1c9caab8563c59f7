use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ScoreThresholds;

/// Measurements of one render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderMetrics {
    pub render_time_ms: f64,
    /// Approximate bytes held by the formatted output.
    pub memory_usage: u64,
    pub rows_rendered: usize,
}

/// A timestamped [`RenderMetrics`] entry in a table type's series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub metrics: RenderMetrics,
}

/// Metrics port: an append-only time series per table type.
pub trait MetricsStore: Send + Sync {
    fn record(&self, table_type: &str, sample: MetricSample);

    /// The most recent `limit` samples, oldest first.
    fn recent(&self, table_type: &str, limit: usize) -> Vec<MetricSample>;

    /// Drops one table type's series, or all of them.
    fn clear(&self, table_type: Option<&str>);
}

/// Process-local series keeping the newest `retention` samples per type.
#[derive(Debug)]
pub struct InMemoryMetrics {
    retention: usize,
    series: Mutex<HashMap<String, VecDeque<MetricSample>>>,
}

impl InMemoryMetrics {
    pub fn new(retention: usize) -> Self {
        InMemoryMetrics {
            retention: retention.max(1),
            series: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryMetrics {
    fn default() -> Self {
        Self::new(100)
    }
}

impl MetricsStore for InMemoryMetrics {
    fn record(&self, table_type: &str, sample: MetricSample) {
        let mut series = self.series.lock().unwrap_or_else(|e| e.into_inner());
        let samples = series.entry(table_type.to_string()).or_default();
        samples.push_back(sample);
        while samples.len() > self.retention {
            samples.pop_front();
        }
    }

    fn recent(&self, table_type: &str, limit: usize) -> Vec<MetricSample> {
        let series = self.series.lock().unwrap_or_else(|e| e.into_inner());
        series
            .get(table_type)
            .map(|samples| {
                let skip = samples.len().saturating_sub(limit);
                samples.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default()
    }

    fn clear(&self, table_type: Option<&str>) {
        let mut series = self.series.lock().unwrap_or_else(|e| e.into_inner());
        match table_type {
            Some(name) => {
                series.remove(name);
            }
            None => series.clear(),
        }
    }
}

/// Discards every sample.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMetrics;

impl MetricsStore for NoopMetrics {
    fn record(&self, _table_type: &str, _sample: MetricSample) {}

    fn recent(&self, _table_type: &str, _limit: usize) -> Vec<MetricSample> {
        Vec::new()
    }

    fn clear(&self, _table_type: Option<&str>) {}
}

/// Advisory rating of a render.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceScore {
    Good,
    Fair,
    Poor,
}

/// Rates a render against the thresholds. The worse of the time and memory
/// ratings wins.
pub fn performance_score(metrics: &RenderMetrics, thresholds: &ScoreThresholds) -> PerformanceScore {
    let time = if metrics.render_time_ms <= thresholds.good_render_ms {
        PerformanceScore::Good
    } else if metrics.render_time_ms <= thresholds.fair_render_ms {
        PerformanceScore::Fair
    } else {
        PerformanceScore::Poor
    };
    let memory = if metrics.memory_usage <= thresholds.good_memory_bytes {
        PerformanceScore::Good
    } else if metrics.memory_usage <= thresholds.fair_memory_bytes {
        PerformanceScore::Fair
    } else {
        PerformanceScore::Poor
    };

    match (time, memory) {
        (PerformanceScore::Poor, _) | (_, PerformanceScore::Poor) => PerformanceScore::Poor,
        (PerformanceScore::Fair, _) | (_, PerformanceScore::Fair) => PerformanceScore::Fair,
        _ => PerformanceScore::Good,
    }
}
