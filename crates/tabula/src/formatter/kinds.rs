//! Per-type cell formatters.
//!
//! Each function receives a non-empty value and returns markup-safe output.
//! None of them fail: input a formatter cannot interpret comes back escaped
//! and otherwise unchanged.

use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::text::{apply_transform, css_slug, escape_html, group_thousands, truncate_to_width};
use crate::types::FormatOptions;
use crate::value::{parse_numeric, CellValue};

/// Output pattern used when a date column sets no `format`.
pub const DEFAULT_DATE_FORMAT: &str = "%Y/%m/%d";

/// Suffix used when a currency column sets no `currency`.
pub const DEFAULT_CURRENCY: &str = "円";

const DATE_INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
];

const DATE_ONLY_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y年%m月%d日"];

pub fn text(value: &CellValue, options: &FormatOptions) -> String {
    let mut s = value.to_display_string();
    if let Some(transform) = options.transform {
        s = apply_transform(&s, transform);
    }
    if let Some(max) = options.max_length {
        s = truncate_to_width(&s, max);
    }
    let mut out = escape_html(&s);
    if let Some(prefix) = &options.prefix {
        out.insert_str(0, &escape_html(prefix));
    }
    if let Some(suffix) = &options.suffix {
        out.push_str(&escape_html(suffix));
    }
    out
}

/// Semantic badge classes, checked in order. Negative keywords come first so
/// that "inactive" is not taken for "active".
const BADGE_KEYWORDS: &[(&str, &[&str])] = &[
    ("danger", &["danger", "error", "inactive", "無効", "エラー"]),
    ("warning", &["warning", "pending", "保留", "注意"]),
    ("secondary", &["secondary", "draft", "下書き"]),
    ("info", &["info", "情報"]),
    ("success", &["success", "active", "有", "完了"]),
];

/// Infers a badge class from the value's content.
pub fn badge_class_for(value: &str) -> &'static str {
    let lowered = value.to_lowercase();
    BADGE_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lowered.contains(w)))
        .map(|(class, _)| *class)
        .unwrap_or("primary")
}

pub fn badge(value: &CellValue, options: &FormatOptions) -> String {
    let s = value.to_display_string();
    let class = match &options.class {
        Some(explicit) => {
            let slug = css_slug(explicit);
            if slug.is_empty() {
                "primary".to_string()
            } else {
                slug
            }
        }
        None if options.auto_class => badge_class_for(&s).to_string(),
        None => "primary".to_string(),
    };
    format!(
        r#"<span class="badge badge-{}">{}</span>"#,
        class,
        escape_html(&s)
    )
}

fn icon_html(options: &FormatOptions) -> String {
    match &options.icon {
        Some(icon) => format!(r#"<i class="{}"></i> "#, escape_html(icon)),
        None => String::new(),
    }
}

pub fn email(value: &CellValue, options: &FormatOptions) -> String {
    let address = value.to_display_string();
    let address = address.trim();
    let label = options.text.as_deref().unwrap_or(address);
    format!(
        r#"<a href="mailto:{}">{}{}</a>"#,
        escape_html(address),
        icon_html(options),
        escape_html(label)
    )
}

fn has_scheme(s: &str) -> bool {
    s.contains("://") || s.starts_with("mailto:") || s.starts_with("tel:")
}

pub fn url(value: &CellValue, options: &FormatOptions) -> String {
    let raw = value.to_display_string();
    let raw = raw.trim();
    let href = if has_scheme(raw) {
        raw.to_string()
    } else {
        format!("https://{}", raw.trim_start_matches('/'))
    };
    let target = options.target.as_deref().unwrap_or("_blank");
    let rel = if target == "_blank" {
        r#" rel="noopener noreferrer""#
    } else {
        ""
    };
    let label = options.text.as_deref().unwrap_or(raw);
    format!(
        r#"<a href="{}" target="{}"{}>{}{}</a>"#,
        escape_html(&href),
        escape_html(target),
        rel,
        icon_html(options),
        escape_html(label)
    )
}

/// Interprets a value as a date: typed dates, common string layouts, RFC 3339
/// and unix timestamps in seconds.
pub fn parse_date(value: &CellValue) -> Option<NaiveDateTime> {
    match value {
        CellValue::Date(d) => Some(*d),
        CellValue::Number(n) => {
            let secs = n.to_f64();
            if secs.fract() != 0.0 {
                return None;
            }
            DateTime::from_timestamp(secs as i64, 0).map(|dt| dt.naive_utc())
        }
        CellValue::String(s) => parse_date_str(s.trim()),
        _ => None,
    }
}

pub fn parse_date_str(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for fmt in DATE_INPUT_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    DATE_ONLY_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .map(|d| d.and_time(chrono::NaiveTime::MIN))
}

fn render_date(dt: &NaiveDateTime, pattern: &str) -> Option<String> {
    let mut out = String::new();
    // An invalid strftime pattern surfaces as a fmt error here.
    write!(out, "{}", dt.format(pattern)).ok()?;
    Some(out)
}

pub fn date(value: &CellValue, options: &FormatOptions) -> String {
    let pattern = options.format.as_deref().unwrap_or(DEFAULT_DATE_FORMAT);
    parse_date(value)
        .and_then(|dt| render_date(&dt, pattern))
        .map(|s| escape_html(&s))
        .unwrap_or_else(|| escape_html(&value.to_display_string()))
}

pub fn date_range(value: &CellValue, options: &FormatOptions) -> String {
    let separator = options.separator.as_deref().unwrap_or("~");
    let ends: Option<(CellValue, CellValue)> = match value {
        CellValue::List(items) if items.len() == 2 => Some((items[0].clone(), items[1].clone())),
        CellValue::String(s) => s
            .split_once(separator)
            .map(|(a, b)| (CellValue::from(a.trim()), CellValue::from(b.trim()))),
        _ => None,
    };

    match ends {
        Some((start, end)) => {
            let fmt_end = |v: &CellValue| {
                if v.is_empty() {
                    String::new()
                } else {
                    date(v, options)
                }
            };
            format!("{} {} {}", fmt_end(&start), escape_html(separator.trim()), fmt_end(&end))
                .trim()
                .to_string()
        }
        None => escape_html(&value.to_display_string()),
    }
}

fn numeric_or_fallback(value: &CellValue, options: &FormatOptions) -> Result<f64, String> {
    match value.as_f64() {
        Some(n) if n.is_finite() => Ok(n),
        _ if options.lenient.unwrap_or(true) => Ok(0.0),
        _ => Err(escape_html(&value.to_display_string())),
    }
}

pub fn currency(value: &CellValue, options: &FormatOptions) -> String {
    let n = match numeric_or_fallback(value, options) {
        Ok(n) => n,
        Err(unchanged) => return unchanged,
    };
    let decimals = options.decimals.unwrap_or(0) as usize;
    let symbol = options.currency.as_deref().unwrap_or(DEFAULT_CURRENCY);
    format!(
        "{}{}{}",
        escape_html(options.prefix.as_deref().unwrap_or("")),
        group_thousands(n, decimals),
        escape_html(symbol)
    )
}

pub fn number(value: &CellValue, options: &FormatOptions) -> String {
    let n = match numeric_or_fallback(value, options) {
        Ok(n) => n,
        Err(unchanged) => return unchanged,
    };
    let decimals = match options.decimals {
        Some(d) => d as usize,
        None if n.fract() == 0.0 => 0,
        None => 2,
    };
    let mut out = group_thousands(n, decimals);
    if let Some(unit) = &options.unit {
        out.push_str(&escape_html(unit));
    }
    out
}

pub fn select(value: &CellValue, choices: Option<&BTreeMap<String, String>>) -> String {
    let raw = value.to_display_string();
    let label = choices.and_then(|c| c.get(&raw)).unwrap_or(&raw);
    escape_html(label)
}

/// Icon and color class for a file extension.
pub fn file_icon(extension: &str) -> (&'static str, &'static str) {
    match extension.to_ascii_lowercase().as_str() {
        "pdf" => ("fa-file-pdf", "text-danger"),
        "doc" | "docx" => ("fa-file-word", "text-primary"),
        "xls" | "xlsx" | "csv" => ("fa-file-excel", "text-success"),
        "ppt" | "pptx" => ("fa-file-powerpoint", "text-warning"),
        "jpg" | "jpeg" | "png" | "gif" | "svg" | "webp" | "bmp" => ("fa-file-image", "text-info"),
        "zip" | "rar" | "7z" | "tar" | "gz" => ("fa-file-archive", "text-secondary"),
        "txt" | "md" | "log" => ("fa-file-alt", "text-muted"),
        _ => ("fa-file", "text-muted"),
    }
}

pub fn file(value: &CellValue, options: &FormatOptions) -> String {
    let path = value.to_display_string();
    let path = path.trim();
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let extension = file_name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    let (icon, color) = file_icon(extension);

    let href = match &options.url_prefix {
        Some(prefix) => format!(
            "{}/{}",
            prefix.trim_end_matches('/'),
            path.trim_start_matches('/')
        ),
        None => path.to_string(),
    };
    let name = options.display_name.as_deref().unwrap_or(file_name);
    let download = if options.download.unwrap_or(true) {
        " download"
    } else {
        ""
    };

    format!(
        r#"<a href="{}" class="file-link {}"{}><i class="fas {}"></i> {}</a>"#,
        escape_html(&href),
        color,
        download,
        icon,
        escape_html(name)
    )
}

pub fn phone(value: &CellValue) -> String {
    let raw = value.to_display_string();
    let raw = raw.trim();
    let mut digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return escape_html(raw);
    }
    if raw.starts_with('+') {
        digits.insert(0, '+');
    }
    format!(r#"<a href="tel:{}">{}</a>"#, digits, escape_html(raw))
}

/// True when `s` parses as a number after thousands separators are removed.
pub fn is_numeric_str(s: &str) -> bool {
    parse_numeric(s).is_some()
}
