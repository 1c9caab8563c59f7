use crate::types::Width;

/// Reference viewport used when the configured one is not positive.
const FALLBACK_VIEWPORT: f64 = 1200.0;

/// Resolves column widths to percentages that sum to 100.
///
/// Pixel widths convert against `viewport_width`. Unspecified (`auto`)
/// columns share whatever the explicit widths leave. When explicit widths
/// already reach 100%, every auto column takes an equal `100 / n` share and
/// the whole row is scaled down to fit. Widths are rounded to two decimals,
/// with the last column absorbing the rounding remainder.
pub fn normalize_widths(widths: &[Width], viewport_width: f64) -> Vec<f64> {
    let n = widths.len();
    if n == 0 {
        return Vec::new();
    }
    let viewport = if viewport_width > 0.0 {
        viewport_width
    } else {
        FALLBACK_VIEWPORT
    };

    let explicit: Vec<Option<f64>> = widths
        .iter()
        .map(|w| match w {
            Width::Percent(p) => Some(*p),
            Width::Pixels(px) => Some(px / viewport * 100.0),
            Width::Auto => None,
        })
        .collect();
    let specified: f64 = explicit.iter().flatten().sum();
    let auto_count = explicit.iter().filter(|w| w.is_none()).count();

    let raw: Vec<f64> = if auto_count > 0 && specified < 100.0 {
        let share = (100.0 - specified) / auto_count as f64;
        explicit.iter().map(|w| w.unwrap_or(share)).collect()
    } else if auto_count > 0 {
        let share = 100.0 / n as f64;
        let scale = 100.0 / (specified + share * auto_count as f64);
        explicit.iter().map(|w| w.unwrap_or(share) * scale).collect()
    } else if specified > 0.0 {
        let scale = 100.0 / specified;
        explicit.iter().map(|w| w.unwrap_or(0.0) * scale).collect()
    } else {
        vec![100.0 / n as f64; n]
    };

    let mut out: Vec<f64> = raw.iter().map(|w| (w * 100.0).round() / 100.0).collect();
    let head: f64 = out[..n - 1].iter().sum();
    out[n - 1] = 100.0 - head;
    out
}
