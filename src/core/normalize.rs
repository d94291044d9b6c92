//! URL normalization: the invariant every persisted `ProductURL` satisfies —
//! absolute, no trailing slash, no fragment, no tracking query parameters,
//! lower-cased host, scheme preserved.

use url::Url;

/// Query parameter names/substrings treated as tracking noise and stripped.
/// Matched as a case-insensitive *substring* of the parameter name, mirroring
/// the reference crawler (`utm_source` matches via the `utm_` prefix member,
/// but a plain substring check also picks up `campaign_ref` etc.).
const TRACKING_PARAM_SUBSTRINGS: &[&str] = &[
    "utm_",
    "ref",
    "session",
    "tracking",
    "click",
    "affiliate",
    "source",
];

/// Normalize a URL per the spec's invariant. Falls back to returning the
/// input unchanged if it does not parse — normalization never fails loudly,
/// matching the reference implementation's "log and return original" policy.
///
/// Built from the parsed components directly (scheme, lower-cased host,
/// path with trailing slashes stripped, filtered query) rather than via
/// `Url`'s `Display`, since the latter always renders at least `/` for the
/// path and would fight the no-trailing-slash invariant.
pub fn normalize(raw: &str) -> String {
    let Ok(url) = Url::parse(raw) else {
        return raw.to_string();
    };

    let scheme = url.scheme();
    let host = url.host_str().unwrap_or("").to_lowercase();
    let port = url
        .port()
        .map(|p| format!(":{p}"))
        .unwrap_or_default();
    let path = url.path().trim_end_matches('/');

    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let query = if retained.is_empty() {
        String::new()
    } else {
        let joined = retained
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("?{joined}")
    };

    format!("{scheme}://{host}{port}{path}{query}")
}

fn is_tracking_param(name: &str) -> bool {
    let lower = name.to_lowercase();
    TRACKING_PARAM_SUBSTRINGS.iter().any(|needle| lower.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s4_normalization_scenario() {
        let input = "https://Shop.Test/products/X/?utm_source=fb&ref=abc#top";
        assert_eq!(normalize(input), "https://shop.test/products/X");
    }

    #[test]
    fn normalization_is_idempotent() {
        let input = "https://Shop.Test/products/X/?utm_source=fb&ref=abc#top";
        let once = normalize(input);
        let twice = normalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn strips_trailing_slash_on_bare_root() {
        assert_eq!(normalize("https://example.com/"), "https://example.com");
    }

    #[test]
    fn preserves_non_tracking_query_params() {
        let input = "https://example.com/search?q=shoes&utm_medium=cpc";
        assert_eq!(normalize(input), "https://example.com/search?q=shoes");
    }

    #[test]
    fn unparseable_url_is_returned_unchanged() {
        assert_eq!(normalize("not a url"), "not a url");
    }
}
