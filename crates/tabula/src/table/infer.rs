//! Dynamic column inference.
//!
//! Keys that appear in the data but have no declared column get a column
//! whose type is sniffed from sampled values and whose label is built from the
//! key's snake-case fragments.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::formatter::is_numeric_str;
use crate::types::{CellType, ColumnSpec};
use crate::value::{CellValue, Row};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(https?://|www\.)\S+$").expect("valid url regex"));

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}[-/]\d{1,2}[-/]\d{1,2}([ T]\d{1,2}:\d{2}(:\d{2})?)?$")
        .expect("valid date regex")
});

/// Key fragment translations used for generated labels.
const LABEL_FRAGMENTS: &[(&str, &str)] = &[
    ("id", "ID"),
    ("name", "名"),
    ("date", "日付"),
    ("created", "作成"),
    ("updated", "更新"),
    ("at", "日時"),
    ("email", "メール"),
    ("mail", "メール"),
    ("phone", "電話"),
    ("tel", "電話"),
    ("address", "住所"),
    ("url", "URL"),
    ("status", "状態"),
    ("type", "種別"),
    ("price", "価格"),
    ("amount", "金額"),
    ("count", "件数"),
    ("total", "合計"),
    ("note", "備考"),
    ("notes", "備考"),
    ("code", "コード"),
    ("description", "説明"),
    ("file", "ファイル"),
    ("start", "開始"),
    ("end", "終了"),
    ("user", "ユーザー"),
    ("title", "タイトル"),
    ("category", "カテゴリ"),
];

/// Sniffs the cell type for a set of sample values.
///
/// Types are tried in the order email, url, date, number; the first one every
/// sample satisfies wins. Anything else, including an empty sample, is text.
pub fn infer_cell_type(samples: &[&CellValue]) -> CellType {
    if samples.is_empty() {
        return CellType::Text;
    }

    let all = |pred: &dyn Fn(&CellValue) -> bool| samples.iter().all(|v| pred(*v));

    if all(&|v: &CellValue| matches_pattern(v, &EMAIL_RE)) {
        CellType::Email
    } else if all(&|v: &CellValue| matches_pattern(v, &URL_RE)) {
        CellType::Url
    } else if all(&|v: &CellValue| matches!(v, CellValue::Date(_)) || matches_pattern(v, &DATE_RE)) {
        CellType::Date
    } else if all(&|v: &CellValue| matches!(v, CellValue::Number(_)) || v.as_str().is_some_and(is_numeric_str)) {
        CellType::Number
    } else {
        CellType::Text
    }
}

fn matches_pattern(value: &CellValue, re: &Regex) -> bool {
    value.as_str().is_some_and(|s| re.is_match(s.trim()))
}

/// Builds a display label from a snake-case key.
///
/// Known fragments are translated and concatenated; as soon as one fragment
/// has no translation the label falls back to space-separated title case.
pub fn label_for_key(key: &str) -> String {
    let fragments: Vec<&str> = key.split('_').filter(|f| !f.is_empty()).collect();
    let translated: Option<Vec<&str>> = fragments
        .iter()
        .map(|f| {
            let lower = f.to_ascii_lowercase();
            LABEL_FRAGMENTS
                .iter()
                .find(|(k, _)| *k == lower)
                .map(|(_, v)| *v)
        })
        .collect();

    match translated {
        Some(parts) if !parts.is_empty() => parts.concat(),
        _ => fragments
            .iter()
            .map(|f| {
                let mut chars = f.chars();
                match chars.next() {
                    Some(c) => c.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// Infers columns for keys absent from `declared`.
///
/// Keys are taken in first-seen order across rows. Keys starting with `_`
/// (internal annotations) and keys in `excluded` are skipped. Up to
/// `sample_size` non-empty values per key are sampled.
pub fn infer_columns(
    rows: &[&Row],
    declared: &HashSet<&str>,
    excluded: &[&str],
    sample_size: usize,
) -> Vec<ColumnSpec> {
    let mut keys: Vec<&str> = Vec::new();
    for row in rows {
        for key in row.keys() {
            let key = key.as_str();
            if key.starts_with('_')
                || declared.contains(key)
                || excluded.contains(&key)
                || keys.contains(&key)
            {
                continue;
            }
            keys.push(key);
        }
    }

    keys.into_iter()
        .map(|key| {
            let samples: Vec<&CellValue> = rows
                .iter()
                .filter_map(|row| row.get(key))
                .filter(|v| !v.is_empty())
                .take(sample_size.max(1))
                .collect();
            ColumnSpec::new(key, label_for_key(key), infer_cell_type(&samples)).dynamic()
        })
        .collect()
}
