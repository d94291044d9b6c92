//! Sequential Expander: synthesizes nearby-ID sibling URLs by detecting a
//! numeric pattern shared by a sample of already-discovered product URLs.

use rand::seq::SliceRandom;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

const MAX_SAMPLE: usize = 10;
const MAX_OUTPUT: usize = 30;

fn shapes() -> &'static [Regex] {
    static SHAPES: OnceLock<Vec<Regex>> = OnceLock::new();
    SHAPES
        .get_or_init(|| {
            const RAW: &[&str] = &[
                r"/(\d+)(?:/|$)",
                r"p=(\d+)",
                r"page=(\d+)",
                r"-p(\d+)",
                r"_(\d+)\.html",
            ];
            RAW.iter().filter_map(|p| Regex::new(p).ok()).collect()
        })
        .as_slice()
}

/// Expand a set of discovered product URLs into candidate ID-adjacent
/// siblings. Returns at most 30 URLs, none of which were already present in
/// `product_urls`. Returns an empty vector if fewer than 3 URLs are given.
pub fn expand(product_urls: &[String]) -> Vec<String> {
    if product_urls.len() < 3 {
        return Vec::new();
    }

    let mut rng = rand::rng();
    let mut sample: Vec<&String> = product_urls.iter().collect();
    sample.shuffle(&mut rng);
    sample.truncate(MAX_SAMPLE);

    let input_set: HashSet<&str> = product_urls.iter().map(String::as_str).collect();
    let mut generated = Vec::new();
    let mut generated_seen = HashSet::new();

    for shape in shapes() {
        let mut matched_any = false;
        for url in &sample {
            let Some(caps) = shape.captures(url) else {
                continue;
            };
            let Some(num_match) = caps.get(1) else {
                continue;
            };
            let Ok(num) = num_match.as_str().parse::<i64>() else {
                continue;
            };
            matched_any = true;

            for delta in 1..=3i64 {
                for candidate_num in [num + delta, num - delta] {
                    if candidate_num < 1 {
                        continue;
                    }
                    let mut candidate = url.to_string();
                    candidate.replace_range(
                        num_match.start()..num_match.end(),
                        &candidate_num.to_string(),
                    );
                    if !input_set.contains(candidate.as_str())
                        && generated_seen.insert(candidate.clone())
                    {
                        generated.push(candidate);
                    }
                }
            }
        }
        if matched_any {
            break;
        }
    }

    generated.truncate(MAX_OUTPUT);
    generated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s3_sequential_expansion_scenario() {
        let inputs = vec![
            "https://shop.test/product/100".to_string(),
            "https://shop.test/product/101".to_string(),
            "https://shop.test/product/102".to_string(),
        ];
        let out = expand(&inputs);
        for n in [97, 98, 99, 103, 104, 105] {
            let expected = format!("https://shop.test/product/{n}");
            assert!(out.contains(&expected), "missing {expected} in {out:?}");
        }
        for original in &inputs {
            assert!(!out.contains(original));
        }
    }

    #[test]
    fn fewer_than_three_urls_yields_empty() {
        let inputs = vec![
            "https://shop.test/product/1".to_string(),
            "https://shop.test/product/2".to_string(),
        ];
        assert!(expand(&inputs).is_empty());
    }

    #[test]
    fn never_decrements_below_one() {
        let inputs = vec![
            "https://shop.test/product/1".to_string(),
            "https://shop.test/product/2".to_string(),
            "https://shop.test/product/3".to_string(),
        ];
        let out = expand(&inputs);
        assert!(!out.iter().any(|u| u.ends_with("/product/0")
            || u.ends_with("/product/-1")
            || u.ends_with("/product/-2")));
    }

    #[test]
    fn output_capped_at_thirty() {
        let inputs: Vec<String> = (100..130)
            .map(|n| format!("https://shop.test/product/{n}"))
            .collect();
        let out = expand(&inputs);
        assert!(out.len() <= 30);
    }
}
