//! Table declarations and engine settings.
//!
//! A table type is declared once, as YAML or JSON, either inline or as a file
//! named after the type in a configuration directory:
//!
//! ```yaml
//! columns:
//!   - key: service
//!     label: サービス
//!     type: text
//!     rowspan_group: true
//!   - key: price
//!     label: 料金
//!     type: currency
//!     width: 20%
//! layout:
//!   type: grouped_rows
//!   group_by: service
//! ```
//!
//! Loading goes through a [`ConfigSource`] ([`ConfigRegistry`] by default).
//! The [`ConfigResolver`] merges the declaration over the default
//! [`skeleton`], validates it with the [`ConfigValidator`] and memoizes the
//! outcome. Engine-wide knobs live in [`EngineSettings`].

pub mod defaults;
mod resolver;
mod settings;
mod source;
pub mod validator;

pub use defaults::{merge_json, skeleton, with_defaults};
pub use resolver::{ConfigOrigin, ConfigResolver, ResolvedConfig};
pub use settings::{EngineSettings, ScoreThresholds};
pub use source::{ConfigRegistry, ConfigSource, CONFIG_EXTENSIONS};
pub use validator::{ConfigCheck, ConfigValidator, ConfigViolation};
