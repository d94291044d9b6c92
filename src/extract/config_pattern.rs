use async_trait::async_trait;
use tracing::warn;

use super::{default_simple_patterns, pattern_scan, Extractor, ParserKind};

/// Domain-pattern extractor (CONFIG): selects a regex list by matching a
/// `host-matching regex -> patterns` table against the base URL's host, in
/// table order, falling back to `"default"` when nothing matches — mirroring
/// the reference `ConfigParser`'s `for/else` selection.
pub struct DomainPatternExtractor {
    table: Vec<(regex::Regex, Vec<regex::Regex>)>,
    default_patterns: Vec<regex::Regex>,
}

impl DomainPatternExtractor {
    pub fn new(table: Vec<(regex::Regex, Vec<regex::Regex>)>) -> Self {
        Self {
            table,
            default_patterns: default_simple_patterns(),
        }
    }

    fn select(&self, host: &str) -> &[regex::Regex] {
        for (host_pattern, patterns) in &self.table {
            if host_pattern.is_match(host) {
                return patterns;
            }
        }
        warn!(host, "domain-pattern extractor: no table entry matched, using default patterns");
        &self.default_patterns
    }
}

impl Default for DomainPatternExtractor {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl Extractor for DomainPatternExtractor {
    fn kind(&self) -> ParserKind {
        ParserKind::Config
    }

    async fn parse(&self, html: &str, base_url: &str) -> Vec<String> {
        let Ok(base) = url::Url::parse(base_url) else {
            return Vec::new();
        };
        let host = base.host_str().unwrap_or("");
        let patterns = self.select(host);
        pattern_scan(html, base_url, patterns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn selects_first_matching_table_entry() {
        let table = vec![(
            regex::Regex::new(r"shop\.test$").unwrap(),
            vec![regex::Regex::new(r"/widgets/[\w-]+").unwrap()],
        )];
        let extractor = DomainPatternExtractor::new(table);
        let html = r#"<a href="/widgets/abc">Widget</a><a href="/product/1">Other</a>"#;
        let urls = extractor.parse(html, "https://shop.test/").await;
        assert_eq!(urls, vec!["https://shop.test/widgets/abc".to_string()]);
    }

    #[tokio::test]
    async fn falls_back_to_default_when_no_entry_matches() {
        let extractor = DomainPatternExtractor::new(Vec::new());
        let html = r#"<a href="/product/1">One</a>"#;
        let urls = extractor.parse(html, "https://unlisted.example/").await;
        assert_eq!(urls, vec!["https://unlisted.example/product/1".to_string()]);
    }
}
