//! Link Discoverer: `find_links(html, base_url, host_filter) -> ordered list`.
//! Pagination links are classified and returned first (deduplicated), then
//! the remaining internal links minus the pagination set.

use std::collections::BTreeSet;

use pagination::pagination_regexes;
use scraper::{Html, Selector};

const PAGINATION_TEXT_INDICATORS: &[&str] =
    &["next", "page", "»", ">", "load more", "show more"];

mod pagination {
    use std::sync::OnceLock;

    static PAGINATION: OnceLock<Vec<regex::Regex>> = OnceLock::new();

    pub fn pagination_regexes() -> &'static [regex::Regex] {
        PAGINATION
            .get_or_init(|| {
                const RAW: &[&str] = &[
                    r"[?&]page=\d+",
                    r"[?&]p=\d+",
                    r"/page/\d+",
                    r"/p/\d+$",
                    r"-page-\d+",
                    r"_p\d+",
                    r"offset=\d+",
                    r"start=\d+",
                    r"from=\d+",
                ];
                RAW.iter().filter_map(|p| regex::Regex::new(p).ok()).collect()
            })
            .as_slice()
    }
}

fn is_pagination_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    PAGINATION_TEXT_INDICATORS
        .iter()
        .any(|needle| lower.contains(needle))
}

fn is_pagination_href(href: &str) -> bool {
    pagination_regexes().iter().any(|re| re.is_match(href))
}

/// `host_filter` is the base domain's host; an empty resolved host (a
/// relative href with no authority) is treated as internal.
pub fn find_links(html: &str, base_url: &str, host_filter: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let Ok(base) = url::Url::parse(base_url) else {
        return Vec::new();
    };

    let mut pagination = Vec::new();
    let mut pagination_seen = BTreeSet::new();
    let mut generic = Vec::new();
    let mut generic_seen = BTreeSet::new();

    for el in document.select(&selector) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = base.join(href) else {
            continue;
        };
        let resolved_host = resolved.host_str().unwrap_or("");
        let is_internal = resolved_host.is_empty() || resolved_host == host_filter;
        if !is_internal {
            continue;
        }

        let text: String = el.text().collect();
        let full = resolved.to_string();
        let is_pagination = is_pagination_text(&text) || is_pagination_href(href);

        if is_pagination {
            if pagination_seen.insert(full.clone()) {
                pagination.push(full);
            }
        } else if generic_seen.insert(full.clone()) {
            generic.push(full);
        }
    }

    let mut out = pagination.clone();
    let pagination_set: BTreeSet<&String> = pagination.iter().collect();
    out.extend(generic.into_iter().filter(|u| !pagination_set.contains(u)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s2_pagination_ordering_scenario() {
        let html = r#"
            <a href="/products/a">A</a>
            <a href="/?page=2">Next</a>
        "#;
        let links = find_links(html, "https://shop.test/", "shop.test");
        assert_eq!(
            links,
            vec![
                "https://shop.test/?page=2".to_string(),
                "https://shop.test/products/a".to_string(),
            ]
        );
    }

    #[test]
    fn ignores_external_links() {
        let html = r#"<a href="https://elsewhere.test/x">Off-site</a>"#;
        let links = find_links(html, "https://shop.test/", "shop.test");
        assert!(links.is_empty());
    }

    #[test]
    fn classifies_by_text_even_without_url_shape() {
        let html = r#"<a href="/browse/more">Show More</a>"#;
        let links = find_links(html, "https://shop.test/", "shop.test");
        assert_eq!(links, vec!["https://shop.test/browse/more".to_string()]);
    }
}
