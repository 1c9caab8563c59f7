//! Companion style rules and behavior script.
//!
//! The engine emits no markup, but templating layers need the CSS hooks its
//! class names refer to and a small script driving lazy loading. Both are
//! rendered from embedded minijinja templates and returned as opaque text for
//! the caller to embed.

use minijinja::{context, Environment};
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::error::Result;
use crate::perf::RenderStrategy;
use crate::types::Breakpoint;

static ENV: Lazy<Environment<'static>> = Lazy::new(Environment::new);

const CSS_TEMPLATE: &str = r#"/* tabula: table styles */
.table-cell-empty { color: #6c757d; font-style: italic; }
.table-cell-merged { text-align: center; }
.table-layout-key-value th { width: 20%; white-space: nowrap; }
.table-layout-grouped .table-group-first { border-top: 2px solid #dee2e6; }
{%- for bp in breakpoints %}
@media (max-width: {{ bp.max_width }}px) {
  .table-responsive-{{ bp.name }} thead { display: none; }
  .table-responsive-{{ bp.name }} tr { display: block; margin-bottom: .75rem; }
  .table-responsive-{{ bp.name }} td { display: flex; justify-content: space-between; }
  .table-responsive-{{ bp.name }} td::before { content: attr(data-label); font-weight: 600; }
}
{%- endfor %}
{%- for mode in modes %}
.{{ mode.class }} { {{ mode.rules }} }
{%- endfor %}
"#;

const JS_TEMPLATE: &str = r#"/* tabula: table behavior */
(function () {
  "use strict";
  var CHUNK_SIZE = {{ chunk_size }};
  var observers = new WeakMap();

  function loadMore(table) {
    var offset = parseInt(table.dataset.nextOffset || "0", 10);
    table.dispatchEvent(new CustomEvent("tabula:load", {
      bubbles: true,
      detail: { offset: offset, size: CHUNK_SIZE }
    }));
  }

  function watch(table) {
    var sentinel = table.querySelector("[data-table-sentinel]");
    if (!sentinel || observers.has(table)) return;
    var observer = new IntersectionObserver(function (entries) {
      entries.forEach(function (entry) {
        if (entry.isIntersecting && table.dataset.hasMore === "true") loadMore(table);
      });
    });
    observer.observe(sentinel);
    observers.set(table, observer);
  }

  function unwatch(table) {
    var observer = observers.get(table);
    if (observer) {
      observer.disconnect();
      observers.delete(table);
    }
  }

  document.addEventListener("click", function (event) {
    var toggle = event.target.closest("[data-table-toggle]");
    if (!toggle) return;
    var row = toggle.closest("tr");
    if (row) row.classList.toggle("table-row-expanded");
  });

  function scan(root) {
    root.querySelectorAll("table{% for c in lazy_classes %}.{{ c }}{% if not loop.last %}, table{% endif %}{% endfor %}").forEach(watch);
  }

  new MutationObserver(function (mutations) {
    mutations.forEach(function (m) {
      m.removedNodes.forEach(function (node) {
        if (node.nodeType === 1) {
          if (node.matches("table")) unwatch(node);
          node.querySelectorAll("table").forEach(unwatch);
        }
      });
      m.addedNodes.forEach(function (node) {
        if (node.nodeType === 1) scan(node);
      });
    });
  }).observe(document.documentElement, { childList: true, subtree: true });

  if (document.readyState === "loading") {
    document.addEventListener("DOMContentLoaded", function () { scan(document); });
  } else {
    scan(document);
  }
})();
"#;

#[derive(Serialize)]
struct BreakpointRule {
    name: &'static str,
    max_width: String,
}

#[derive(Serialize)]
struct ModeRule {
    class: String,
    rules: &'static str,
}

/// CSS class marking a table rendered under `strategy`.
pub fn perf_class(strategy: RenderStrategy) -> String {
    format!("table-perf-{}", strategy.as_str().replace('_', "-"))
}

/// Style rules for the given responsive breakpoints (all of them when empty)
/// plus the performance-mode classes.
pub fn generate_css(breakpoints: &[Breakpoint]) -> Result<String> {
    let selected: &[Breakpoint] = if breakpoints.is_empty() {
        &Breakpoint::ALL
    } else {
        breakpoints
    };
    let rules: Vec<BreakpointRule> = selected
        .iter()
        .filter(|bp| bp.min_width() > 0)
        .map(|bp| BreakpointRule {
            name: bp.as_str(),
            max_width: format!("{:.2}", bp.min_width() as f64 - 0.02),
        })
        .collect();
    let modes: Vec<ModeRule> = RenderStrategy::ALL
        .iter()
        .map(|s| ModeRule {
            class: perf_class(*s),
            rules: match s {
                RenderStrategy::FullRender => "contain: content;",
                RenderStrategy::LazyLoading => "min-height: 200px;",
                RenderStrategy::VirtualScroll => "display: block; max-height: 600px; overflow-y: auto;",
            },
        })
        .collect();

    Ok(ENV.render_str(CSS_TEMPLATE, context! { breakpoints => rules, modes => modes })?)
}

/// The behavior script; lazy tables request `chunk_size` rows at a time.
pub fn generate_js(chunk_size: usize) -> Result<String> {
    let lazy_classes = [
        perf_class(RenderStrategy::LazyLoading),
        perf_class(RenderStrategy::VirtualScroll),
    ];
    Ok(ENV.render_str(
        JS_TEMPLATE,
        context! { chunk_size => chunk_size.max(1), lazy_classes => lazy_classes },
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perf_classes() {
        assert_eq!(perf_class(RenderStrategy::VirtualScroll), "table-perf-virtual-scroll");
        assert_eq!(perf_class(RenderStrategy::FullRender), "table-perf-full-render");
    }

    #[test]
    fn css_covers_requested_breakpoints() {
        let css = generate_css(&[Breakpoint::Md]).unwrap();
        assert!(css.contains("@media (max-width: 767.98px)"));
        assert!(css.contains(".table-responsive-md td::before"));
        assert!(!css.contains("table-responsive-lg"));
        assert!(css.contains(".table-perf-lazy-loading"));

        let all = generate_css(&[]).unwrap();
        for name in ["sm", "md", "lg", "xl"] {
            assert!(all.contains(&format!(".table-responsive-{} thead", name)), "{}", name);
        }
        assert!(!all.contains("table-responsive-xs"));
    }

    #[test]
    fn js_embeds_chunk_size_and_selectors() {
        let js = generate_js(25).unwrap();
        assert!(js.contains("var CHUNK_SIZE = 25;"));
        assert!(js.contains("table.table-perf-lazy-loading, table.table-perf-virtual-scroll"));
        assert!(js.contains("disconnect()"));
    }
}
