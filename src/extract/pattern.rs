use async_trait::async_trait;

use super::{default_simple_patterns, pattern_scan, Extractor, ParserKind};

/// Pattern extractor (SIMPLE): a global, compiled regex list matched against
/// every `<a href>` in the document.
pub struct PatternExtractor {
    patterns: Vec<regex::Regex>,
}

impl PatternExtractor {
    pub fn new() -> Self {
        Self {
            patterns: default_simple_patterns(),
        }
    }

    pub fn with_patterns(patterns: Vec<regex::Regex>) -> Self {
        Self { patterns }
    }
}

impl Default for PatternExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for PatternExtractor {
    fn kind(&self) -> ParserKind {
        ParserKind::Simple
    }

    async fn parse(&self, html: &str, base_url: &str) -> Vec<String> {
        pattern_scan(html, base_url, &self.patterns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn s1_pattern_extraction_scenario() {
        let html = r#"
            <a href="/product/42">Widget</a>
            <a href="/about">About</a>
            <a href="/p/99?utm_source=x">Gadget</a>
        "#;
        let extractor = PatternExtractor::new();
        let mut urls = extractor.parse(html, "https://example.com/").await;
        urls.sort();
        assert_eq!(
            urls,
            vec![
                "https://example.com/p/99?utm_source=x".to_string(),
                "https://example.com/product/42".to_string(),
            ]
        );
    }
}
