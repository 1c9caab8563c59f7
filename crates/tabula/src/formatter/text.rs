//! Text helpers shared by the cell formatters.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::types::Transform;

/// Marker appended to truncated text.
pub const ELLIPSIS: &str = "...";

/// Escapes the five HTML-significant characters.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Truncates a string to a maximum display width, appending [`ELLIPSIS`].
///
/// Width is measured in terminal columns, so CJK characters count double. The
/// result including the marker fits in `max_width` whenever the marker itself
/// does.
///
/// ```rust
/// use tabula::formatter::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Hello", 10), "Hello");
/// assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }

    let limit = max_width.saturating_sub(ELLIPSIS.len());
    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > limit {
            break;
        }
        result.push(c);
        current_width += char_width;
    }
    result.push_str(ELLIPSIS);
    result
}

/// Applies a named case transform.
pub fn apply_transform(s: &str, transform: Transform) -> String {
    match transform {
        Transform::Uppercase => s.to_uppercase(),
        Transform::Lowercase => s.to_lowercase(),
        Transform::Capitalize => capitalize(s),
        Transform::Title => s
            .split(' ')
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Formats a number with comma thousands grouping and fixed decimals.
///
/// The sign is kept for negative values, except when rounding leaves only
/// zeros.
pub fn group_thousands(n: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, n.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }

    let is_zero = fixed.chars().all(|c| c == '0' || c == '.');
    if n < 0.0 && !is_zero {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Lowercase ASCII slug usable as a CSS class fragment.
pub fn css_slug(s: &str) -> String {
    let folded = deunicode::deunicode(s).to_lowercase();
    let mut slug = String::with_capacity(folded.len());
    for c in folded.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#x27;Jerry&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn truncation_respects_display_width() {
        assert_eq!(truncate_to_width("abcdef", 6), "abcdef");
        assert_eq!(truncate_to_width("abcdefg", 6), "abc...");
        // Each CJK character is two columns wide.
        assert_eq!(truncate_to_width("日本語テキスト", 7), "日本...");
        assert_eq!(truncate_to_width("abcdef", 2), "...");
    }

    #[test]
    fn transforms() {
        assert_eq!(apply_transform("hello world", Transform::Uppercase), "HELLO WORLD");
        assert_eq!(apply_transform("Hello", Transform::Lowercase), "hello");
        assert_eq!(apply_transform("hello world", Transform::Capitalize), "Hello world");
        assert_eq!(apply_transform("hello world", Transform::Title), "Hello World");
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(1000.0, 0), "1,000");
        assert_eq!(group_thousands(999.0, 0), "999");
        assert_eq!(group_thousands(1234567.891, 2), "1,234,567.89");
        assert_eq!(group_thousands(-1500.0, 0), "-1,500");
        assert_eq!(group_thousands(-0.2, 0), "0");
        assert_eq!(group_thousands(0.0, 0), "0");
    }

    #[test]
    fn slugs() {
        assert_eq!(css_slug("Very Important"), "very-important");
        assert_eq!(css_slug("  --x--  "), "x");
        assert_eq!(css_slug("Café"), "cafe");
    }
}
