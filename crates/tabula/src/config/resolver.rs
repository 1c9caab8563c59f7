//! Resolution of table types to usable configurations.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::{Result, TableError};
use crate::recovery::{ErrorHandler, ErrorReport, Outcome, Recovery};
use crate::types::TableConfig;
use crate::validation::ValidationResult;

use super::defaults::with_defaults;
use super::source::ConfigSource;
use super::validator::ConfigValidator;

/// Where a resolved configuration came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    /// The declaration, merged over defaults, validated as-is.
    Declared,
    /// The declaration failed validation and was repaired.
    Repaired,
    /// The built-in configuration for the table type.
    Fallback,
}

/// A configuration plus how it was obtained.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedConfig {
    pub table_type: String,
    pub config: TableConfig,
    pub origin: ConfigOrigin,
    /// Non-fatal validation warnings on the declaration.
    pub warnings: Vec<String>,
    /// Reports for anything that had to be repaired or replaced.
    pub reports: Vec<ErrorReport>,
}

/// Resolves table type names to validated configurations.
///
/// Resolution never fails: a missing or broken declaration yields a repaired
/// or built-in configuration, with the failure recorded as a report. Results
/// are memoized per table type until [`clear_cache`](Self::clear_cache).
pub struct ConfigResolver {
    source: Arc<dyn ConfigSource>,
    validator: ConfigValidator,
    handler: Arc<ErrorHandler>,
    cache: RwLock<HashMap<String, ResolvedConfig>>,
}

impl std::fmt::Debug for ConfigResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = self.cache.read().map(|c| c.len()).unwrap_or(0);
        f.debug_struct("ConfigResolver")
            .field("handler", &self.handler)
            .field("cached", &cached)
            .finish_non_exhaustive()
    }
}

impl ConfigResolver {
    pub fn new(source: Arc<dyn ConfigSource>) -> Self {
        Self::with_handler(source, Arc::new(ErrorHandler::default()))
    }

    pub fn with_handler(source: Arc<dyn ConfigSource>, handler: Arc<ErrorHandler>) -> Self {
        ConfigResolver {
            source,
            validator: ConfigValidator::new(),
            handler,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Configuration for `table_type`.
    pub fn resolve(&self, table_type: &str) -> TableConfig {
        self.resolve_detailed(table_type).config
    }

    /// Configuration for `table_type` with its origin and reports.
    pub fn resolve_detailed(&self, table_type: &str) -> ResolvedConfig {
        if let Some(hit) = self
            .cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(table_type)
        {
            return hit.clone();
        }

        let resolved = self.load_and_validate(table_type);
        tracing::debug!(table_type, origin = ?resolved.origin, "resolved table configuration");

        self.cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(table_type.to_string(), resolved.clone());
        resolved
    }

    /// Forgets memoized configurations: one table type, or all of them.
    pub fn clear_cache(&self, table_type: Option<&str>) {
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        match table_type {
            Some(name) => {
                cache.remove(name);
            }
            None => cache.clear(),
        }
    }

    /// Validates the stored declaration for `table_type` without repairing
    /// it. Fails when no declaration exists or it cannot be parsed.
    pub fn validate_declared(&self, table_type: &str) -> Result<ValidationResult> {
        let raw = self
            .source
            .load(table_type)?
            .ok_or_else(|| TableError::ConfigNotFound(table_type.to_string()))?;
        Ok(self.validator.validate(&with_defaults(raw)))
    }

    fn load_and_validate(&self, table_type: &str) -> ResolvedConfig {
        let raw = match self.source.load(table_type) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                let error = TableError::ConfigNotFound(table_type.to_string());
                return self.fallback(table_type, self.handler.handle_config_error(table_type, &error));
            }
            Err(error) => {
                return self.fallback(table_type, self.handler.handle_config_error(table_type, &error));
            }
        };

        let merged = with_defaults(raw);
        let check = self.validator.check(&merged);

        if check.is_valid() {
            return match serde_json::from_value::<TableConfig>(merged) {
                Ok(config) => ResolvedConfig {
                    table_type: table_type.to_string(),
                    config,
                    origin: ConfigOrigin::Declared,
                    warnings: check.warnings,
                    reports: Vec::new(),
                },
                Err(error) => self.fallback(
                    table_type,
                    self.handler
                        .handle_config_error(table_type, &TableError::Json(error)),
                ),
            };
        }

        let recovery = self
            .handler
            .handle_validation_error(table_type, &merged, &check.violations);
        let mut resolved = self.fallback(table_type, recovery);
        if resolved.origin == ConfigOrigin::Repaired {
            resolved.warnings = check.warnings;
        }
        resolved
    }

    fn fallback(&self, table_type: &str, recovery: Recovery<TableConfig>) -> ResolvedConfig {
        ResolvedConfig {
            table_type: table_type.to_string(),
            config: recovery.value,
            origin: match recovery.outcome {
                Outcome::Recovered => ConfigOrigin::Repaired,
                Outcome::Fallback => ConfigOrigin::Fallback,
            },
            warnings: Vec::new(),
            reports: vec![recovery.report],
        }
    }
}
