//! `simplified_domain`: registrable name + public suffix, dots replaced by
//! underscores. Deliberately built on the public-suffix list, not a naive
//! `url`-crate netloc split — the spec calls this out explicitly: one
//! reference storage variant gets this wrong for multi-label suffixes
//! (`co.uk`, `com.au`, ...) and only the public-suffix form is stable.

use std::sync::OnceLock;

use publicsuffix::{List, Psl};

const BUNDLED_SNAPSHOT: &str = include_str!("public_suffix_snapshot.dat");

fn list() -> &'static List {
    static LIST: OnceLock<List> = OnceLock::new();
    LIST.get_or_init(|| {
        BUNDLED_SNAPSHOT
            .parse()
            .expect("bundled public suffix snapshot is valid PSL syntax")
    })
}

/// Compute the persistence-key form of a URL or bare hostname:
/// `registrable_name + "_" + suffix`, lower-cased, dots replaced by
/// underscores. Falls back to a lowercased, dot-replaced copy of the raw
/// host when the public suffix list can't find a registrable domain (e.g.
/// `localhost`, bare IP addresses).
pub fn simplified_domain(url_or_host: &str) -> String {
    let host = extract_host(url_or_host).to_lowercase();

    match list().domain(host.as_bytes()) {
        Some(domain) => String::from_utf8_lossy(domain.as_bytes())
            .replace('.', "_"),
        None => host.replace('.', "_"),
    }
}

fn extract_host(url_or_host: &str) -> String {
    match url::Url::parse(url_or_host) {
        Ok(u) => u.host_str().unwrap_or(url_or_host).to_string(),
        Err(_) => url_or_host.trim_end_matches('/').to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_literal_example() {
        assert_eq!(
            simplified_domain("https://www.Foo.Co.UK/x"),
            "foo_co_uk"
        );
    }

    #[test]
    fn single_label_suffix() {
        assert_eq!(simplified_domain("https://shop.example.com/"), "example_com");
    }

    #[test]
    fn bare_hostname_without_scheme() {
        assert_eq!(simplified_domain("shop.test.com"), "test_com");
    }

    #[test]
    fn unrecognized_host_falls_back_to_dot_replacement() {
        assert_eq!(simplified_domain("http://localhost:8080/"), "localhost");
    }
}
