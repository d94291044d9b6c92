//! Extractors: `parse(html, base_url) -> ordered list of unique absolute URLs`.
//! Three variants share one trait; selection and ordering for a page is
//! driven by the configured `PARSERS_TO_USE` list (see [`crate::core::config`]).

mod config_pattern;
mod model;
mod pattern;

pub use config_pattern::DomainPatternExtractor;
pub use model::{HttpModelClient, ModelClient, ModelExtractor};
pub use pattern::PatternExtractor;

use async_trait::async_trait;
use scraper::{Html, Selector};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParserKind {
    Simple,
    Config,
    Ai,
}

impl ParserKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ParserKind::Simple => "simple",
            ParserKind::Config => "config",
            ParserKind::Ai => "ai",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "simple" => Some(ParserKind::Simple),
            "config" => Some(ParserKind::Config),
            "ai" => Some(ParserKind::Ai),
            _ => None,
        }
    }
}

#[async_trait]
pub trait Extractor: Send + Sync {
    fn kind(&self) -> ParserKind;

    /// Pure function of its inputs (the AI variant is pure modulo the model).
    /// Never panics; internal failures surface as an empty vector.
    async fn parse(&self, html: &str, base_url: &str) -> Vec<String>;
}

/// Collect the resolved-absolute `href` of every `<a href>` tag whose target
/// matches any of `patterns`, stripping the trailing slash and returning the
/// set sorted ascending. Shared by the Pattern and Domain-pattern extractors,
/// mirroring the reference implementation's single shared `parse()` helper.
pub(crate) fn pattern_scan(html: &str, base_url: &str, patterns: &[regex::Regex]) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    let Ok(base) = url::Url::parse(base_url) else {
        return Vec::new();
    };

    let mut found = std::collections::BTreeSet::new();
    for el in document.select(&selector) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let Ok(full) = base.join(href) else {
            continue;
        };
        let full = full.to_string();
        if patterns.iter().any(|p| p.is_match(&full)) {
            found.insert(full.trim_end_matches('/').to_string());
        }
    }
    found.into_iter().collect()
}

/// Ten common e-commerce product-URL shapes, compiled once per extractor
/// instance (not per call) — deliberately precompiled, unlike a style of
/// helper seen elsewhere in this codebase that recompiles regexes per call.
pub fn default_simple_patterns() -> Vec<regex::Regex> {
    const RAW: &[&str] = &[
        r"/product/[\w-]+",
        r"/products/[\w-]+",
        r"/p/\d+",
        r"/item/[\w-]+",
        r"/items/[\w-]+",
        r"/dp/[A-Z0-9]{10}",
        r"-p\d+\.html",
        r"/shop/[\w-]+/[\w-]+",
        r"/catalog/product/view/id/\d+",
        r"_\d+\.html$",
    ];
    RAW.iter()
        .filter_map(|p| regex::Regex::new(p).ok())
        .collect()
}
