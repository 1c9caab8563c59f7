//! Engine tunables.
//!
//! Every threshold the engine uses lives in [`EngineSettings`]. All fields are
//! defaulted, so a settings document only needs to name what it changes:
//!
//! ```rust
//! use tabula::EngineSettings;
//!
//! let settings = EngineSettings::from_yaml("full_render_max: 20\ndebug: true").unwrap();
//! assert_eq!(settings.full_render_max, 20);
//! assert_eq!(settings.lazy_loading_max, 100);
//! assert!(settings.debug);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Render-time and memory limits for the advisory performance score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreThresholds {
    /// Render time (ms) at or below which a render scores "good".
    pub good_render_ms: f64,
    /// Render time (ms) at or below which a render scores "fair".
    pub fair_render_ms: f64,
    /// Memory (bytes) at or below which a render scores "good".
    pub good_memory_bytes: u64,
    /// Memory (bytes) at or below which a render scores "fair".
    pub fair_memory_bytes: u64,
}

impl Default for ScoreThresholds {
    fn default() -> Self {
        ScoreThresholds {
            good_render_ms: 100.0,
            fair_render_ms: 500.0,
            good_memory_bytes: 1024 * 1024,
            fair_memory_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Tunables for formatting, strategy selection, caching and recovery.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Largest row count rendered in full.
    pub full_render_max: usize,
    /// Largest row count rendered with lazy loading; above it, virtual scroll.
    pub lazy_loading_max: usize,
    /// Initial slice and chunk size for lazy loading.
    pub lazy_chunk_size: usize,
    /// Rows per on-demand slice under virtual scroll.
    pub virtual_chunk_size: usize,
    /// Serialized size an input must exceed before results are cached.
    pub cache_min_size: usize,
    pub cache_ttl_secs: u64,
    /// Strings longer than this many bytes are truncated by memory cleanup.
    pub cleanup_max_bytes: usize,
    /// Metric samples kept per table type.
    pub metrics_retention: usize,
    pub score_thresholds: ScoreThresholds,
    /// Reference viewport for converting pixel widths to percentages.
    pub viewport_width: f64,
    /// Maximum nesting depth for nested-record expansion.
    pub max_depth: usize,
    /// Number of rows sampled when inferring dynamic column types.
    pub inference_sample_size: usize,
    /// Surface technical error detail to callers.
    pub debug: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            full_render_max: 50,
            lazy_loading_max: 100,
            lazy_chunk_size: 50,
            virtual_chunk_size: 50,
            cache_min_size: 100,
            cache_ttl_secs: 3600,
            cleanup_max_bytes: 1000,
            metrics_retention: 100,
            score_thresholds: ScoreThresholds::default(),
            viewport_width: 1200.0,
            max_depth: 3,
            inference_sample_size: 10,
            debug: false,
        }
    }
}

impl EngineSettings {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cache_ttl_secs)
    }
}
