//! Value formatting.
//!
//! [`ValueFormatter`] turns a single raw [`CellValue`] into its display string
//! according to a [`CellType`] and the column's [`FormatOptions`]. Formatting
//! never fails: malformed input degrades to an escaped rendering of the input.
//!
//! Empty values (null, blank strings, empty lists and maps) render as the
//! column's `empty_text`, or [`EMPTY_PLACEHOLDER`], regardless of cell type.
//!
//! ```rust
//! use tabula::{CellType, CellValue, FormatOptions, ValueFormatter};
//!
//! let formatter = ValueFormatter::new();
//! let out = formatter.format(&CellValue::from(1000), CellType::Currency, &FormatOptions::default());
//! assert_eq!(out, "1,000円");
//!
//! let out = formatter.format(&CellValue::Null, CellType::Email, &FormatOptions::default());
//! assert_eq!(out, "not set");
//! ```
//!
//! Results for large inputs are memoized through a [`CacheStore`]; inputs whose
//! serialization is at or below the size gate skip the cache entirely.

mod kinds;
mod text;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{cache_key, CacheStore, InMemoryCache};
use crate::types::{CellType, ColumnSpec, FormatOptions};
use crate::value::CellValue;

pub use kinds::{badge_class_for, file_icon, parse_date, DEFAULT_CURRENCY, DEFAULT_DATE_FORMAT};
pub use text::{escape_html, truncate_to_width, ELLIPSIS};

pub(crate) use kinds::is_numeric_str;
pub(crate) use text::css_slug;

/// Placeholder rendered for empty values when a column sets no `empty_text`.
pub const EMPTY_PLACEHOLDER: &str = "not set";

/// One entry of a batch formatting call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormatRequest {
    pub value: CellValue,
    #[serde(rename = "type")]
    pub cell_type: CellType,
    #[serde(default)]
    pub options: FormatOptions,
}

impl FormatRequest {
    pub fn new(value: impl Into<CellValue>, cell_type: CellType) -> Self {
        FormatRequest {
            value: value.into(),
            cell_type,
            options: FormatOptions::default(),
        }
    }

    pub fn options(mut self, options: FormatOptions) -> Self {
        self.options = options;
        self
    }
}

/// Formats raw values by cell type, memoizing large inputs.
#[derive(Clone)]
pub struct ValueFormatter {
    cache: Arc<dyn CacheStore>,
    cache_min_size: usize,
    cache_ttl: Duration,
}

impl Default for ValueFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ValueFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueFormatter")
            .field("cache_min_size", &self.cache_min_size)
            .field("cache_ttl", &self.cache_ttl)
            .finish_non_exhaustive()
    }
}

impl ValueFormatter {
    /// A formatter with its own in-memory cache and default thresholds.
    pub fn new() -> Self {
        Self::with_cache(Arc::new(InMemoryCache::new()))
    }

    pub fn with_cache(cache: Arc<dyn CacheStore>) -> Self {
        ValueFormatter {
            cache,
            cache_min_size: 100,
            cache_ttl: Duration::from_secs(3600),
        }
    }

    /// Serialized size a value must exceed before its result is cached.
    pub fn cache_min_size(mut self, bytes: usize) -> Self {
        self.cache_min_size = bytes;
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Formats one value.
    pub fn format(&self, value: &CellValue, cell_type: CellType, options: &FormatOptions) -> String {
        self.format_with_choices(value, cell_type, options, None)
    }

    /// Formats one value using a column's type, options and select choices.
    pub fn format_column(&self, value: &CellValue, column: &ColumnSpec) -> String {
        self.format_with_choices(
            value,
            column.cell_type,
            &column.format,
            column.options.as_ref(),
        )
    }

    /// Formats many values in one call. Empty inputs are skipped and come back
    /// as `None`, keeping positions aligned with the requests.
    pub fn format_batch(&self, requests: &[FormatRequest]) -> Vec<Option<String>> {
        requests
            .iter()
            .map(|req| {
                if req.value.is_empty() {
                    None
                } else {
                    Some(self.format(&req.value, req.cell_type, &req.options))
                }
            })
            .collect()
    }

    /// Rendering for an empty value under the given options.
    pub fn format_empty(options: &FormatOptions) -> String {
        match &options.empty_text {
            Some(text) => escape_html(text),
            None => EMPTY_PLACEHOLDER.to_string(),
        }
    }

    fn format_with_choices(
        &self,
        value: &CellValue,
        cell_type: CellType,
        options: &FormatOptions,
        choices: Option<&BTreeMap<String, String>>,
    ) -> String {
        if value.is_empty() {
            return Self::format_empty(options);
        }

        if value.serialized_len() <= self.cache_min_size {
            return dispatch(value, cell_type, options, choices);
        }

        let key = cache_key("value", &(value, cell_type, options, choices));
        if let Some(hit) = self.cache.get(&key) {
            return hit;
        }
        let out = dispatch(value, cell_type, options, choices);
        self.cache.set(&key, out.clone(), self.cache_ttl);
        tracing::trace!(%cell_type, "cached formatted value");
        out
    }
}

fn dispatch(
    value: &CellValue,
    cell_type: CellType,
    options: &FormatOptions,
    choices: Option<&BTreeMap<String, String>>,
) -> String {
    match cell_type {
        CellType::Text => kinds::text(value, options),
        CellType::Badge => kinds::badge(value, options),
        CellType::Email => kinds::email(value, options),
        CellType::Url => kinds::url(value, options),
        CellType::Date => kinds::date(value, options),
        CellType::DateRange => kinds::date_range(value, options),
        CellType::Currency => kinds::currency(value, options),
        CellType::Number => kinds::number(value, options),
        CellType::Select => kinds::select(value, choices),
        CellType::File => kinds::file(value, options),
        CellType::Phone => kinds::phone(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::NoopCache;

    #[test]
    fn empty_values_render_placeholder_for_every_type() {
        let formatter = ValueFormatter::new();
        let empties = [
            CellValue::Null,
            CellValue::from(""),
            CellValue::from("   "),
            CellValue::List(vec![]),
        ];
        for cell_type in CellType::ALL {
            for value in &empties {
                assert_eq!(
                    formatter.format(value, cell_type, &FormatOptions::default()),
                    EMPTY_PLACEHOLDER,
                    "{} / {:?}",
                    cell_type,
                    value
                );
            }
        }
    }

    #[test]
    fn custom_empty_text() {
        let formatter = ValueFormatter::new();
        let options = FormatOptions::new().empty_text("-");
        assert_eq!(formatter.format(&CellValue::Null, CellType::Date, &options), "-");
    }

    #[test]
    fn large_values_hit_the_cache() {
        let cache = Arc::new(InMemoryCache::new());
        let formatter = ValueFormatter::with_cache(cache.clone());
        let long = CellValue::from("x".repeat(200));

        let first = formatter.format(&long, CellType::Text, &FormatOptions::default());
        let second = formatter.format(&long, CellType::Text, &FormatOptions::default());
        assert_eq!(first, second);

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
    }

    #[test]
    fn small_values_bypass_the_cache() {
        let cache = Arc::new(InMemoryCache::new());
        let formatter = ValueFormatter::with_cache(cache.clone());
        formatter.format(&CellValue::from("short"), CellType::Text, &FormatOptions::default());
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn cached_and_uncached_agree() {
        let cached = ValueFormatter::new().cache_min_size(0);
        let uncached = ValueFormatter::with_cache(Arc::new(NoopCache));
        let value = CellValue::from("2024-04-01");
        for cell_type in CellType::ALL {
            let options = FormatOptions::default();
            let a = cached.format(&value, cell_type, &options);
            let b = cached.format(&value, cell_type, &options);
            let c = uncached.format(&value, cell_type, &options);
            assert_eq!(a, b);
            assert_eq!(a, c);
        }
    }

    #[test]
    fn column_select_uses_choices() {
        let formatter = ValueFormatter::new();
        let column = ColumnSpec::new("status", "Status", CellType::Select)
            .options([("a", "Approved"), ("r", "Rejected")]);
        assert_eq!(formatter.format_column(&CellValue::from("r"), &column), "Rejected");
    }

    #[test]
    fn batch_skips_empty_entries() {
        let formatter = ValueFormatter::new();
        let out = formatter.format_batch(&[
            FormatRequest::new(1000, CellType::Currency),
            FormatRequest::new(CellValue::Null, CellType::Text),
            FormatRequest::new("hi", CellType::Text),
        ]);
        assert_eq!(
            out,
            vec![Some("1,000円".to_string()), None, Some("hi".to_string())]
        );
    }
}
