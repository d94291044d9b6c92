//! `CrawlEngine`: the public entry point. Fans a crawl task out across its
//! `domains` with bounded concurrency, runs one [`pipeline::DomainPipelineRunner`]
//! per domain, and folds the per-domain reports into a single `AggregateReport`.
//! Usable directly by tests and non-HTTP callers — the Control API in
//! `crate::api` is a thin adapter around this type, not a second copy of it.

mod pipeline;

pub use pipeline::{rank_and_truncate, ProgressSink};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::core::types::{AggregateReport, DomainReport, ParserStatEntry};
use crate::core::{CrawlerConfig, EngineError, EngineResult};
use crate::extract::Extractor;
use crate::fetch::Fetcher;
use crate::storage::Storage;

use pipeline::DomainPipelineRunner;

/// Immutable collaborators shared by every domain pipeline a given engine
/// instance runs. Cloned cheaply (`Arc`/`Clone` types only) per task.
pub struct CrawlEngine {
    config: CrawlerConfig,
    fetcher: Fetcher,
    extractors: Vec<Arc<dyn Extractor>>,
    storage: Arc<dyn Storage>,
}

impl CrawlEngine {
    pub fn new(
        config: CrawlerConfig,
        fetcher: Fetcher,
        extractors: Vec<Arc<dyn Extractor>>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            config,
            fetcher,
            extractors,
            storage,
        }
    }

    /// The `max_crawl_depth` this engine falls back to when a caller omits
    /// `max_depth`; the Control API echoes it back in `CrawlAccepted`.
    pub fn default_max_depth(&self) -> u32 {
        self.config.max_crawl_depth
    }

    /// Run one crawl task to completion. `max_depth` overrides the engine's
    /// configured default when present. Each domain runs in its own task so a
    /// panic in one pipeline can never poison the others (§7's `PipelineFatal`
    /// contract); a panicking domain is reported with `status: "error"`.
    ///
    /// `cancel` is the cooperative cancellation signal (§5): checked between
    /// fetches and between batches inside each domain pipeline. A cancelled
    /// crawl still performs its final persist and returns `Ok` with a report
    /// whose affected domains carry `status: "cancelled"` — cancellation is
    /// a terminal status reached through the normal return path, not a hard
    /// kill. Callers that omit a token (most tests, and any caller with no
    /// revocation mechanism) get one that is never triggered.
    pub async fn crawl(
        &self,
        task_id: &str,
        domains: Vec<String>,
        max_depth: Option<u32>,
        progress: Option<ProgressSink>,
        cancel: Option<CancellationToken>,
    ) -> EngineResult<AggregateReport> {
        if domains.is_empty() {
            return Err(EngineError::InvalidInput("domains must not be empty".to_string()));
        }
        let max_depth = max_depth.unwrap_or(self.config.max_crawl_depth);
        if max_depth < 1 {
            return Err(EngineError::InvalidInput("max_depth must be >= 1".to_string()));
        }

        let started = Instant::now();
        let fanout = self.config.domain_fanout.max(1);
        let cancel = cancel.unwrap_or_else(CancellationToken::new);

        let reports: Vec<DomainReport> = stream::iter(domains.clone())
            .map(|domain| {
                self.run_one_domain(task_id.to_string(), domain, max_depth, progress.clone(), cancel.clone())
            })
            .buffer_unordered(fanout)
            .collect()
            .await;

        Ok(aggregate(task_id, domains, reports, started.elapsed()))
    }

    async fn run_one_domain(
        &self,
        task_id: String,
        domain: String,
        max_depth: u32,
        progress: Option<ProgressSink>,
        cancel: CancellationToken,
    ) -> DomainReport {
        let config = self.config.clone();
        let fetcher = self.fetcher.clone();
        let extractors = self.extractors.clone();
        let storage = Arc::clone(&self.storage);
        let domain_for_panic = domain.clone();

        let handle = tokio::spawn(async move {
            let runner = DomainPipelineRunner {
                config: &config,
                fetcher: &fetcher,
                extractors: extractors.as_slice(),
                storage: storage.as_ref(),
            };
            runner.run(&task_id, &domain, max_depth, progress, cancel).await
        });

        match handle.await {
            Ok(report) => report,
            Err(join_err) => {
                warn!(domain = %domain_for_panic, error = %join_err, "domain pipeline task panicked");
                DomainReport {
                    status: "error".to_string(),
                    domain: domain_for_panic,
                    urls_count: 0,
                    error: Some(join_err.to_string()),
                    parser_stats: HashMap::new(),
                    urls_by_parser: HashMap::new(),
                }
            }
        }
    }
}

fn aggregate(
    task_id: &str,
    domains: Vec<String>,
    reports: Vec<DomainReport>,
    elapsed: Duration,
) -> AggregateReport {
    let mut urls_count = HashMap::new();
    let mut total_urls = 0usize;
    let mut parser_stats: HashMap<String, ParserStatEntry> = HashMap::new();
    let mut urls_by_parser: HashMap<String, usize> = HashMap::new();
    // Real domain identity per parser, not a summed 0/1 flag — union these
    // sets rather than adding scalars so the count can never drift from the
    // number of distinct domains that actually emitted via a given parser,
    // even if a domain were ever represented by more than one report.
    let mut parser_domain_hits: HashMap<String, HashSet<String>> = HashMap::new();

    for report in &reports {
        urls_count.insert(report.domain.clone(), report.urls_count);
        total_urls += report.urls_count;
        for (name, stat) in &report.parser_stats {
            let entry = parser_stats.entry(name.clone()).or_default();
            entry.total += stat.total;
            entry.unique += stat.unique;
            if stat.total > 0 {
                parser_domain_hits
                    .entry(name.clone())
                    .or_default()
                    .insert(report.domain.clone());
            }
        }
        for (name, count) in &report.urls_by_parser {
            *urls_by_parser.entry(name.clone()).or_insert(0) += count;
        }
    }

    for (name, hits) in parser_domain_hits {
        parser_stats.entry(name).or_default().domains = hits.len();
    }

    let status = if reports.iter().any(|r| r.status == "cancelled") {
        "cancelled".to_string()
    } else {
        "completed".to_string()
    };

    AggregateReport {
        status,
        task_id: task_id.to_string(),
        duration_secs: elapsed.as_secs_f64(),
        domains,
        urls_count,
        total_urls,
        parser_stats,
        urls_by_parser,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::PatternExtractor;
    use crate::storage::InMemoryStorage;

    fn test_engine() -> CrawlEngine {
        CrawlEngine::new(
            CrawlerConfig::default(),
            Fetcher::new(Duration::from_millis(1), 1, Duration::from_secs(5)),
            vec![Arc::new(PatternExtractor::new())],
            Arc::new(InMemoryStorage::default()),
        )
    }

    #[tokio::test]
    async fn empty_domains_is_invalid_input() {
        let engine = test_engine();
        let result = engine.crawl("T1", Vec::new(), Some(1), None, None).await;
        assert!(matches!(result, Err(EngineError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn zero_max_depth_is_invalid_input() {
        let engine = test_engine();
        let result = engine
            .crawl("T1", vec!["https://example.com".to_string()], Some(0), None, None)
            .await;
        assert!(matches!(result, Err(EngineError::InvalidInput(_))));
    }
}
