//! Core types for table configuration.
//!
//! This module defines the declarative structures a table type is configured
//! with: columns and their cell types, widths, display conditions, layout,
//! merge directives and nested-record expansion.
//!
//! Everything here is read-only during a formatting pass. Declarations are
//! usually loaded from YAML or JSON through a
//! [`ConfigResolver`](crate::ConfigResolver), but can be built in code:
//!
//! ```rust
//! use tabula::{CellType, ColumnSpec, TableConfig, Width};
//!
//! let config = TableConfig::builder()
//!     .column(ColumnSpec::new("name", "Name", CellType::Text).width(Width::Percent(40.0)))
//!     .column(ColumnSpec::new("price", "Price", CellType::Currency))
//!     .build();
//!
//! assert_eq!(config.columns.len(), 2);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::value::CellValue;

/// Semantic cell type governing value formatting.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CellType {
    #[default]
    Text,
    Badge,
    Email,
    Url,
    Date,
    DateRange,
    Currency,
    Number,
    Select,
    File,
    Phone,
}

impl CellType {
    /// Every supported cell type, in declaration order.
    pub const ALL: [CellType; 11] = [
        CellType::Text,
        CellType::Badge,
        CellType::Email,
        CellType::Url,
        CellType::Date,
        CellType::DateRange,
        CellType::Currency,
        CellType::Number,
        CellType::Select,
        CellType::File,
        CellType::Phone,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CellType::Text => "text",
            CellType::Badge => "badge",
            CellType::Email => "email",
            CellType::Url => "url",
            CellType::Date => "date",
            CellType::DateRange => "date_range",
            CellType::Currency => "currency",
            CellType::Number => "number",
            CellType::Select => "select",
            CellType::File => "file",
            CellType::Phone => "phone",
        }
    }
}

impl FromStr for CellType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CellType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown cell type '{}'", s))
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Specifies a column's display width.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WidthRaw", into = "WidthRaw")]
pub enum Width {
    /// Percentage of the table width, e.g. `"25%"`.
    Percent(f64),
    /// Absolute pixels, e.g. `"120px"`; converted against a reference viewport.
    Pixels(f64),
    /// Share whatever is left.
    #[default]
    Auto,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WidthRaw {
    Pixels(f64),
    StringVariant(String),
}

impl From<Width> for WidthRaw {
    fn from(width: Width) -> Self {
        WidthRaw::StringVariant(width.to_string())
    }
}

impl TryFrom<WidthRaw> for Width {
    type Error = String;

    fn try_from(raw: WidthRaw) -> Result<Self, Self::Error> {
        match raw {
            WidthRaw::Pixels(px) if px >= 0.0 => Ok(Width::Pixels(px)),
            WidthRaw::Pixels(px) => Err(format!("Invalid width: {}. Must not be negative.", px)),
            WidthRaw::StringVariant(s) => Width::parse(&s).ok_or_else(|| {
                format!(
                    "Invalid width string: '{}'. Expected '<n>%', '<n>px' or 'auto'.",
                    s
                )
            }),
        }
    }
}

impl Width {
    /// Parses `"25%"`, `"120px"` or `"auto"`.
    pub fn parse(s: &str) -> Option<Width> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Some(Width::Auto);
        }
        let (num, make): (&str, fn(f64) -> Width) = if let Some(n) = s.strip_suffix('%') {
            (n, Width::Percent)
        } else if let Some(n) = s.strip_suffix("px") {
            (n, Width::Pixels)
        } else {
            return None;
        };
        num.trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(make)
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, Width::Auto)
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Width::Percent(p) => write!(f, "{}%", p),
            Width::Pixels(px) => write!(f, "{}px", px),
            Width::Auto => f.write_str("auto"),
        }
    }
}

/// Named text transform applied by the `text` formatter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    Uppercase,
    Lowercase,
    /// First character uppercased.
    Capitalize,
    /// First character of every word uppercased.
    Title,
}

impl Transform {
    pub const NAMES: [&'static str; 4] = ["uppercase", "lowercase", "capitalize", "title"];
}

/// Per-column formatting options.
///
/// Options are declared inline on the column (`decimals: 2`, `max_length: 20`).
/// Each formatter reads the subset that applies to its cell type and ignores
/// the rest.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    /// Replacement for empty values (default: "not set").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_text: Option<String>,
    /// Maximum display width of text before truncation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
    /// Explicit badge class (e.g. "success").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Infer the badge class from the value's content.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub auto_class: bool,
    /// Icon class rendered before link text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Custom link text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Link target (default `_blank` for urls).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// strftime-style output pattern for dates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Separator between the two ends of a date range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u32>,
    /// Unit suffix for numbers (e.g. "名").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Currency suffix (default "円").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Non-numeric input formats as zero when true (default), unchanged otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lenient: Option<bool>,
    /// Display name for file links.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Whether file links carry the `download` attribute (default true).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download: Option<bool>,
    /// Prefix joined onto file paths to build the link href.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_prefix: Option<String>,
}

impl FormatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty_text(mut self, text: impl Into<String>) -> Self {
        self.empty_text = Some(text.into());
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn auto_class(mut self) -> Self {
        self.auto_class = true;
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn format(mut self, pattern: impl Into<String>) -> Self {
        self.format = Some(pattern.into());
        self
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    pub fn decimals(mut self, decimals: u32) -> Self {
        self.decimals = Some(decimals);
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn lenient(mut self, lenient: bool) -> Self {
        self.lenient = Some(lenient);
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn download(mut self, download: bool) -> Self {
        self.download = Some(download);
        self
    }

    pub fn url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = Some(prefix.into());
        self
    }
}

/// Predicate deciding whether a declared column is shown for a dataset.
///
/// `field` defaults to the column's own key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShowCondition {
    /// At least one row has a non-empty value.
    HasData {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },
    /// At least one row's value equals `value`.
    DataEquals {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
        value: CellValue,
    },
    /// The key is present in at least one row.
    FieldExists {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },
}

/// Configuration for a single column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Unique identifier; also the data key.
    pub key: String,
    /// Header text.
    pub label: String,
    #[serde(rename = "type", default)]
    pub cell_type: CellType,
    #[serde(default)]
    pub width: Width,
    /// Value-to-label table for `select` columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_condition: Option<ShowCondition>,
    /// Compute contiguous equal-value groups for this column.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub rowspan_group: bool,
    /// Header row (1 = top) holding this column's group header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_level: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_group: Option<String>,
    /// Set on columns inferred from data rather than declared.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub dynamic: bool,
    #[serde(flatten)]
    pub format: FormatOptions,
}

impl ColumnSpec {
    pub fn new(key: impl Into<String>, label: impl Into<String>, cell_type: CellType) -> Self {
        ColumnSpec {
            key: key.into(),
            label: label.into(),
            cell_type,
            width: Width::Auto,
            options: None,
            show_condition: None,
            rowspan_group: false,
            header_level: None,
            header_group: None,
            dynamic: false,
            format: FormatOptions::default(),
        }
    }

    pub fn width(mut self, width: Width) -> Self {
        self.width = width;
        self
    }

    /// Set the select options (value to label).
    pub fn options<K, V, I>(mut self, options: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.options = Some(
            options
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn show_when(mut self, condition: ShowCondition) -> Self {
        self.show_condition = Some(condition);
        self
    }

    /// Flag the column for rowspan grouping.
    pub fn rowspan_group(mut self) -> Self {
        self.rowspan_group = true;
        self
    }

    /// Place the column under a group header at the given level.
    pub fn header_group(mut self, level: usize, group: impl Into<String>) -> Self {
        self.header_level = Some(level);
        self.header_group = Some(group.into());
        self
    }

    pub fn format(mut self, format: FormatOptions) -> Self {
        self.format = format;
        self
    }

    pub fn dynamic(mut self) -> Self {
        self.dynamic = true;
        self
    }
}

/// Overall table layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutType {
    KeyValuePairs,
    GroupedRows,
    #[default]
    StandardTable,
}

impl LayoutType {
    pub const NAMES: [&'static str; 3] = ["key_value_pairs", "grouped_rows", "standard_table"];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutType::KeyValuePairs => "key_value_pairs",
            LayoutType::GroupedRows => "grouped_rows",
            LayoutType::StandardTable => "standard_table",
        }
    }
}

/// Responsive breakpoint below which the table collapses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    Xs,
    Sm,
    #[default]
    Md,
    Lg,
    Xl,
}

impl Breakpoint {
    pub const ALL: [Breakpoint; 5] = [
        Breakpoint::Xs,
        Breakpoint::Sm,
        Breakpoint::Md,
        Breakpoint::Lg,
        Breakpoint::Xl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Breakpoint::Xs => "xs",
            Breakpoint::Sm => "sm",
            Breakpoint::Md => "md",
            Breakpoint::Lg => "lg",
            Breakpoint::Xl => "xl",
        }
    }

    /// Minimum viewport width in pixels at which the breakpoint applies.
    pub fn min_width(&self) -> u32 {
        match self {
            Breakpoint::Xs => 0,
            Breakpoint::Sm => 576,
            Breakpoint::Md => 768,
            Breakpoint::Lg => 992,
            Breakpoint::Xl => 1200,
        }
    }
}

/// Layout settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSpec {
    #[serde(rename = "type", default)]
    pub layout_type: LayoutType,
    /// Label/value pairs per line in `key_value_pairs` layouts (1 to 4).
    #[serde(default = "default_columns_per_row")]
    pub columns_per_row: usize,
    #[serde(default)]
    pub responsive_breakpoint: Breakpoint,
    /// Field rows are grouped by in `grouped_rows` layouts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
}

fn default_columns_per_row() -> usize {
    2
}

impl Default for LayoutSpec {
    fn default() -> Self {
        LayoutSpec {
            layout_type: LayoutType::default(),
            columns_per_row: default_columns_per_row(),
            responsive_breakpoint: Breakpoint::default(),
            group_by: None,
        }
    }
}

/// Kind of cell merge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeType {
    /// Collapse several columns of one row into the first column's slot.
    Horizontal,
    /// Collapse consecutive rows with equal values into one spanning cell.
    Vertical,
    /// Horizontal first, then vertical on the merged values.
    Complex,
}

/// When a horizontal merge applies to a row.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MergeConditionRaw", into = "MergeConditionRaw")]
pub enum MergeCondition {
    #[default]
    Always,
    /// The named field (default: the first merged column) is non-empty.
    FieldNotEmpty(Option<String>),
    /// Every merged column is non-empty.
    AllNotEmpty,
    /// At least one merged column is non-empty.
    AnyNotEmpty,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum MergeConditionRaw {
    Name(String),
    Tagged {
        #[serde(rename = "type")]
        kind: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },
}

impl From<MergeCondition> for MergeConditionRaw {
    fn from(condition: MergeCondition) -> Self {
        match condition {
            MergeCondition::Always => MergeConditionRaw::Name("always".into()),
            MergeCondition::FieldNotEmpty(None) => MergeConditionRaw::Name("field_not_empty".into()),
            MergeCondition::FieldNotEmpty(field) => MergeConditionRaw::Tagged {
                kind: "field_not_empty".into(),
                field,
            },
            MergeCondition::AllNotEmpty => MergeConditionRaw::Name("all_not_empty".into()),
            MergeCondition::AnyNotEmpty => MergeConditionRaw::Name("any_not_empty".into()),
        }
    }
}

impl TryFrom<MergeConditionRaw> for MergeCondition {
    type Error = String;

    fn try_from(raw: MergeConditionRaw) -> Result<Self, Self::Error> {
        let (kind, field) = match raw {
            MergeConditionRaw::Name(kind) => (kind, None),
            MergeConditionRaw::Tagged { kind, field } => (kind, field),
        };
        match kind.as_str() {
            "always" => Ok(MergeCondition::Always),
            "field_not_empty" => Ok(MergeCondition::FieldNotEmpty(field)),
            "all_not_empty" => Ok(MergeCondition::AllNotEmpty),
            "any_not_empty" => Ok(MergeCondition::AnyNotEmpty),
            other => Err(format!("Invalid merge condition: '{}'.", other)),
        }
    }
}

/// A merge applied to formatted rows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MergeDirective {
    #[serde(rename = "type")]
    pub merge_type: MergeType,
    /// Target columns. Horizontal merges keep the first and hide the rest.
    pub columns: Vec<String>,
    /// Literal joiner for horizontal merges (default: a single space).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
    /// Template with named substitutions, e.g. `"{{ last_name }} {{ first_name }}"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default)]
    pub condition: MergeCondition,
}

impl MergeDirective {
    pub fn horizontal<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self::of(MergeType::Horizontal, columns)
    }

    pub fn vertical<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self::of(MergeType::Vertical, columns)
    }

    pub fn complex<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self::of(MergeType::Complex, columns)
    }

    fn of<S: Into<String>>(merge_type: MergeType, columns: impl IntoIterator<Item = S>) -> Self {
        MergeDirective {
            merge_type,
            columns: columns.into_iter().map(Into::into).collect(),
            separator: None,
            template: None,
            condition: MergeCondition::Always,
        }
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn when(mut self, condition: MergeCondition) -> Self {
        self.condition = condition;
        self
    }
}

/// Expansion of rows carrying a nested sequence of child records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedSpec {
    /// Field holding the child sequence.
    pub field: String,
    /// Parent fields copied onto every child row (default: all of them).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_fields: Vec<String>,
}

/// Complete configuration for one table type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub layout: LayoutSpec,
    #[serde(default)]
    pub styling: BTreeMap<String, String>,
    #[serde(default)]
    pub features: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merges: Vec<MergeDirective>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested: Option<NestedSpec>,
}

impl TableConfig {
    pub fn builder() -> TableConfigBuilder {
        TableConfigBuilder::default()
    }

    /// Value of a feature flag; unset flags are off.
    pub fn feature(&self, name: &str) -> bool {
        self.features.get(name).copied().unwrap_or(false)
    }

    pub fn column(&self, key: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.key == key)
    }

    pub fn styling(&self, name: &str) -> Option<&str> {
        self.styling.get(name).map(String::as_str)
    }
}

/// Builder for constructing [`TableConfig`] instances.
#[derive(Clone, Debug, Default)]
pub struct TableConfigBuilder {
    columns: Vec<ColumnSpec>,
    layout: LayoutSpec,
    styling: BTreeMap<String, String>,
    features: BTreeMap<String, bool>,
    merges: Vec<MergeDirective>,
    nested: Option<NestedSpec>,
}

impl TableConfigBuilder {
    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    pub fn columns(mut self, columns: impl IntoIterator<Item = ColumnSpec>) -> Self {
        self.columns.extend(columns);
        self
    }

    pub fn layout(mut self, layout: LayoutSpec) -> Self {
        self.layout = layout;
        self
    }

    pub fn layout_type(mut self, layout_type: LayoutType) -> Self {
        self.layout.layout_type = layout_type;
        self
    }

    pub fn group_by(mut self, field: impl Into<String>) -> Self {
        self.layout.group_by = Some(field.into());
        self
    }

    pub fn columns_per_row(mut self, n: usize) -> Self {
        self.layout.columns_per_row = n;
        self
    }

    pub fn styling(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.styling.insert(name.into(), value.into());
        self
    }

    pub fn feature(mut self, name: impl Into<String>, enabled: bool) -> Self {
        self.features.insert(name.into(), enabled);
        self
    }

    pub fn merge(mut self, directive: MergeDirective) -> Self {
        self.merges.push(directive);
        self
    }

    pub fn nested(mut self, field: impl Into<String>, parent_fields: &[&str]) -> Self {
        self.nested = Some(NestedSpec {
            field: field.into(),
            parent_fields: parent_fields.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn build(self) -> TableConfig {
        TableConfig {
            columns: self.columns,
            layout: self.layout,
            styling: self.styling,
            features: self.features,
            merges: self.merges,
            nested: self.nested,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cell_type_names_roundtrip() {
        for t in CellType::ALL {
            assert_eq!(t.as_str().parse::<CellType>().unwrap(), t);
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
        }
        assert!("textarea".parse::<CellType>().is_err());
    }

    #[test]
    fn width_parse() {
        assert_eq!(Width::parse("25%"), Some(Width::Percent(25.0)));
        assert_eq!(Width::parse("120px"), Some(Width::Pixels(120.0)));
        assert_eq!(Width::parse("auto"), Some(Width::Auto));
        assert_eq!(Width::parse("wide"), None);
        assert_eq!(Width::parse("-5%"), None);
        assert_eq!(Width::parse("10"), None);
    }

    #[test]
    fn width_serde() {
        let w: Width = serde_json::from_value(json!("30%")).unwrap();
        assert_eq!(w, Width::Percent(30.0));
        assert_eq!(serde_json::to_value(w).unwrap(), json!("30%"));

        let w: Width = serde_json::from_value(json!(200)).unwrap();
        assert_eq!(w, Width::Pixels(200.0));

        assert!(serde_json::from_value::<Width>(json!("huge")).is_err());
    }

    #[test]
    fn column_deserializes_with_inline_options() {
        let col: ColumnSpec = serde_json::from_value(json!({
            "key": "price",
            "label": "Price",
            "type": "currency",
            "width": "20%",
            "decimals": 2,
            "currency": "$"
        }))
        .unwrap();

        assert_eq!(col.cell_type, CellType::Currency);
        assert_eq!(col.format.decimals, Some(2));
        assert_eq!(col.format.currency.as_deref(), Some("$"));
        assert!(!col.rowspan_group);
    }

    #[test]
    fn show_condition_serde() {
        let cond: ShowCondition =
            serde_json::from_value(json!({"type": "data_equals", "value": "yes"})).unwrap();
        assert_eq!(
            cond,
            ShowCondition::DataEquals {
                field: None,
                value: CellValue::from("yes")
            }
        );

        let cond: ShowCondition = serde_json::from_value(json!({"type": "has_data"})).unwrap();
        assert_eq!(cond, ShowCondition::HasData { field: None });
    }

    #[test]
    fn merge_condition_accepts_name_or_map() {
        let c: MergeCondition = serde_json::from_value(json!("always")).unwrap();
        assert_eq!(c, MergeCondition::Always);

        let c: MergeCondition =
            serde_json::from_value(json!({"type": "field_not_empty", "field": "x"})).unwrap();
        assert_eq!(c, MergeCondition::FieldNotEmpty(Some("x".into())));

        assert!(serde_json::from_value::<MergeCondition>(json!("sometimes")).is_err());
    }

    #[test]
    fn layout_defaults() {
        let layout: LayoutSpec = serde_json::from_value(json!({})).unwrap();
        assert_eq!(layout.layout_type, LayoutType::StandardTable);
        assert_eq!(layout.columns_per_row, 2);
        assert_eq!(layout.responsive_breakpoint, Breakpoint::Md);
    }

    #[test]
    fn config_builder() {
        let config = TableConfig::builder()
            .column(ColumnSpec::new("a", "A", CellType::Text))
            .feature("dynamic_columns", true)
            .merge(MergeDirective::horizontal(["a", "b"]).separator("/"))
            .build();

        assert!(config.feature("dynamic_columns"));
        assert!(!config.feature("missing"));
        assert!(config.column("a").is_some());
        assert_eq!(config.merges[0].separator.as_deref(), Some("/"));
    }
}
