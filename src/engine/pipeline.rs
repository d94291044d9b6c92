//! Per-domain BFS traversal (`DomainPipeline`): the per-depth algorithm from
//! §4.6, including the parser pipeline, sequential expansion, link discovery,
//! ranking/truncation, and periodic persistence.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::normalize::normalize;
use crate::core::types::{DomainReport, ParserStatEntry, ProgressEvent};
use crate::core::CrawlerConfig;
use crate::extract::Extractor;
use crate::fetch::Fetcher;
use crate::links::find_links;
use crate::sequential;
use crate::storage::Storage;

/// Category-prefix patterns used to rank the next-depth frontier (§4.6 step 7).
const CATEGORY_RANK_PATTERNS: &[&str] = &[
    "/category/",
    "/collection",
    "/product",
    "/shop/",
    "/department/",
    "/catalog/",
    "/item",
];

const RETRYABLE_SUBSTRINGS: &[&str] = &["product", "category", "collection"];

const SHORT_CIRCUIT_THRESHOLD: usize = 5;
const SEQUENTIAL_TRIGGER_THRESHOLD: usize = 3;
const MAX_NEXT_DEPTH_URLS: usize = 500;

pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Outcome of processing a single fetched page, before it is folded into the
/// pipeline's shared accumulators. Kept free of any shared mutable state so
/// concurrent pages within one batch never contend on a lock while fetching.
struct PageOutcome {
    /// Every distinct product URL this page contributed, each already
    /// normalized, paired with the parser that first found it *on this page*.
    local_first_finder: Vec<(String, &'static str)>,
    /// Raw per-parser emission counts for stats — every emission, including
    /// ones that lose the cross-page first-finder tie-break.
    parser_emissions: Vec<(&'static str, usize)>,
    next_urls: Vec<String>,
}

struct PipelineState {
    visited: HashSet<String>,
    product_urls: HashSet<String>,
    first_finder: HashMap<String, &'static str>,
    parser_stats: HashMap<&'static str, ParserStatEntry>,
}

impl PipelineState {
    fn new() -> Self {
        let mut parser_stats = HashMap::new();
        for name in ["simple", "config", "ai", "sequential"] {
            parser_stats.insert(name, ParserStatEntry::default());
        }
        Self {
            visited: HashSet::new(),
            product_urls: HashSet::new(),
            first_finder: HashMap::new(),
            parser_stats,
        }
    }
}

pub struct DomainPipelineRunner<'a> {
    pub config: &'a CrawlerConfig,
    pub fetcher: &'a Fetcher,
    pub extractors: &'a [Arc<dyn Extractor>],
    pub storage: &'a dyn Storage,
}

impl<'a> DomainPipelineRunner<'a> {
    pub async fn run(
        &self,
        task_id: &str,
        seed: &str,
        max_depth: u32,
        progress: Option<ProgressSink>,
        cancel: CancellationToken,
    ) -> DomainReport {
        let host = url::Url::parse(seed)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();

        let mut state = PipelineState::new();
        let mut frontier = vec![seed.to_string()];
        let mut depth = 0u32;
        let mut cancelled = false;

        'depths: while depth < max_depth && !frontier.is_empty() {
            if cancel.is_cancelled() {
                cancelled = true;
                break 'depths;
            }

            let this_depth_urls: Vec<String> = frontier
                .drain(..)
                .filter(|u| state.visited.insert(u.clone()))
                .collect();

            let mut next_depth_acc: Vec<String> = Vec::new();
            let mut next_depth_seen: HashSet<String> = HashSet::new();

            for batch in this_depth_urls.chunks(self.config.max_concurrent_fetches) {
                // Honor cancellation between batches, the coarsest suspension
                // point named in the concurrency model.
                if cancel.is_cancelled() {
                    cancelled = true;
                    break 'depths;
                }

                let outcomes: Vec<PageOutcome> = stream::iter(batch.iter().cloned())
                    .map(|url| self.process_url(&url, &host, depth, max_depth, &cancel))
                    .buffer_unordered(self.config.max_concurrent_fetches)
                    .collect()
                    .await;

                for outcome in outcomes {
                    self.fold_outcome(&mut state, outcome, &mut next_depth_acc, &mut next_depth_seen);
                }

                if let Some(cb) = &progress {
                    cb(ProgressEvent {
                        status: "PROGRESS".to_string(),
                        domain: host.clone(),
                        depth,
                        depth_progress: state.visited.len(),
                        urls_discovered: state.product_urls.len(),
                    });
                }

                if cancel.is_cancelled() {
                    cancelled = true;
                    break 'depths;
                }

                tokio::select! {
                    _ = tokio::time::sleep(self.config.crawl_delay) => {}
                    _ = cancel.cancelled() => {
                        cancelled = true;
                        break 'depths;
                    }
                }
            }

            if !state.product_urls.is_empty() {
                let to_persist: Vec<String> = state.product_urls.iter().cloned().collect();
                if let Err(e) = self.storage.save_urls(&host, task_id, &to_persist).await {
                    warn!(domain = %host, task_id, error = ?e, "periodic persist failed, will retry at next persist point");
                }
            }

            frontier = rank_and_truncate(next_depth_acc);
            depth += 1;
        }

        // Even a cancelled pipeline performs this final persist of whatever
        // it discovered so far, and still emits a terminal status below —
        // cancellation never skips the recovery point.
        if !state.product_urls.is_empty() {
            let to_persist: Vec<String> = state.product_urls.iter().cloned().collect();
            if let Err(e) = self.storage.save_urls(&host, task_id, &to_persist).await {
                warn!(domain = %host, task_id, error = ?e, "final persist failed");
            }
        }

        if let Some(cb) = &progress {
            cb(ProgressEvent {
                status: if cancelled { "CANCELLED".to_string() } else { "SUCCESS".to_string() },
                domain: host.clone(),
                depth,
                depth_progress: state.visited.len(),
                urls_discovered: state.product_urls.len(),
            });
        }

        self.build_report(&host, &state, cancelled)
    }

    /// Fetch and process one URL: run the extractor pipeline, maybe expand
    /// sequentially, maybe discover next-depth links. Never panics; a failed
    /// fetch yields an outcome with no product URLs and no next-depth links.
    /// Checked against `cancel` before the fetch so a cancellation signal
    /// raised mid-batch stops outstanding work from starting new fetches,
    /// honoring the "between URL fetches" suspension point.
    async fn process_url(
        &self,
        url: &str,
        host_filter: &str,
        current_depth: u32,
        max_depth: u32,
        cancel: &CancellationToken,
    ) -> PageOutcome {
        if cancel.is_cancelled() {
            return PageOutcome {
                local_first_finder: Vec::new(),
                parser_emissions: Vec::new(),
                next_urls: Vec::new(),
            };
        }

        let mut html = self.fetcher.fetch(url).await;
        if html.is_none() && is_retry_worthy(url) {
            tokio::time::sleep(Duration::from_secs(2)).await;
            html = self.fetcher.fetch(url).await;
        }

        let Some(html) = html else {
            debug!(url, "process_url: fetch failed, skipping this URL entirely");
            return PageOutcome {
                local_first_finder: Vec::new(),
                parser_emissions: Vec::new(),
                next_urls: Vec::new(),
            };
        };

        let mut page_product_urls: HashSet<String> = HashSet::new();
        let mut local_first_finder: Vec<(String, &'static str)> = Vec::new();
        let mut parser_emissions: Vec<(&'static str, usize)> = Vec::new();

        for extractor in self.extractors {
            let raw_urls = extractor.parse(&html, url).await;
            parser_emissions.push((extractor.kind().as_str(), raw_urls.len()));

            for raw in raw_urls {
                let normalized = normalize(&raw);
                if page_product_urls.insert(normalized.clone()) {
                    local_first_finder.push((normalized, extractor.kind().as_str()));
                }
            }

            if page_product_urls.len() >= SHORT_CIRCUIT_THRESHOLD {
                break;
            }
        }

        if page_product_urls.len() >= SEQUENTIAL_TRIGGER_THRESHOLD {
            let sample: Vec<String> = page_product_urls.iter().cloned().collect();
            let generated = sequential::expand(&sample);
            parser_emissions.push(("sequential", generated.len()));
            for url in generated {
                if page_product_urls.insert(url.clone()) {
                    local_first_finder.push((url, "sequential"));
                }
            }
        }

        let next_urls = if current_depth < max_depth.saturating_sub(1) {
            find_links(&html, url, host_filter)
        } else {
            Vec::new()
        };

        PageOutcome {
            local_first_finder,
            parser_emissions,
            next_urls,
        }
    }

    fn fold_outcome(
        &self,
        state: &mut PipelineState,
        outcome: PageOutcome,
        next_depth_acc: &mut Vec<String>,
        next_depth_seen: &mut HashSet<String>,
    ) {
        for (parser_name, count) in outcome.parser_emissions {
            if count == 0 {
                continue;
            }
            let entry = state.parser_stats.entry(parser_name).or_default();
            entry.total += count;
        }

        for (url, parser) in outcome.local_first_finder {
            state.first_finder.entry(url.clone()).or_insert(parser);
            state.product_urls.insert(url);
        }

        for raw in outcome.next_urls {
            let normalized = normalize(&raw);
            if state.visited.contains(&normalized) {
                continue;
            }
            if next_depth_seen.insert(normalized.clone()) {
                next_depth_acc.push(normalized);
            }
        }
    }

    fn build_report(&self, host: &str, state: &PipelineState, cancelled: bool) -> DomainReport {
        let mut unique_counts: HashMap<&'static str, usize> = HashMap::new();
        for parser in state.first_finder.values() {
            *unique_counts.entry(parser).or_insert(0) += 1;
        }

        let mut parser_stats = HashMap::new();
        for (name, stat) in &state.parser_stats {
            let mut stat = stat.clone();
            stat.unique = *unique_counts.get(name).unwrap_or(&0);
            // Within a single DomainPipeline there is exactly one host, so
            // "domains" collapses to 0/1 here. The engine recomputes the real
            // per-parser domain count itself from `report.domain` + `total >
            // 0` across all reports rather than summing this field.
            stat.domains = if stat.total > 0 { 1 } else { 0 };
            parser_stats.insert(name.to_string(), stat);
        }

        let urls_by_parser: HashMap<String, usize> = unique_counts
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        DomainReport {
            status: if cancelled { "cancelled".to_string() } else { "completed".to_string() },
            domain: host.to_string(),
            urls_count: state.product_urls.len(),
            error: None,
            parser_stats,
            urls_by_parser,
        }
    }
}

fn is_retry_worthy(url: &str) -> bool {
    let lower = url.to_lowercase();
    RETRYABLE_SUBSTRINGS.iter().any(|s| lower.contains(s))
}

/// Rank a next-depth candidate list: category-shaped URLs first, the rest in
/// original order; then truncate at 500. Ranking always runs, even when the
/// list is short — see DESIGN.md's resolution of the ranking/truncation
/// open question.
pub fn rank_and_truncate(urls: Vec<String>) -> Vec<String> {
    let (mut priority, mut other): (Vec<String>, Vec<String>) = (Vec::new(), Vec::new());
    for url in urls {
        let lower = url.to_lowercase();
        if CATEGORY_RANK_PATTERNS.iter().any(|p| lower.contains(p)) {
            priority.push(url);
        } else {
            other.push(url);
        }
    }
    priority.append(&mut other);
    priority.truncate(MAX_NEXT_DEPTH_URLS);
    priority
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranking_prioritizes_category_shapes_even_for_short_lists() {
        let urls = vec![
            "https://shop.test/about".to_string(),
            "https://shop.test/category/shoes".to_string(),
        ];
        let ranked = rank_and_truncate(urls);
        assert_eq!(ranked[0], "https://shop.test/category/shoes");
    }

    #[test]
    fn truncates_at_five_hundred() {
        let urls: Vec<String> = (0..600).map(|i| format!("https://shop.test/{i}")).collect();
        assert_eq!(rank_and_truncate(urls).len(), 500);
    }

    #[test]
    fn retry_worthy_substrings() {
        assert!(is_retry_worthy("https://shop.test/product/1"));
        assert!(is_retry_worthy("https://shop.test/Category/shoes"));
        assert!(!is_retry_worthy("https://shop.test/about"));
    }
}
