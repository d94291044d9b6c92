//! Environment-driven configuration, mirroring the file-then-env precedence
//! pattern used throughout this crate's config surface: every field has a
//! hardcoded default, independently overridable by its own environment
//! variable, resolved once at startup.

use std::env;
use std::time::Duration;

use crate::extract::ParserKind;

const ENV_CRAWL_DELAY_MS: &str = "CRAWL_DELAY_MS";
const ENV_MAX_RETRIES: &str = "MAX_RETRIES";
const ENV_TIMEOUT_SECS: &str = "TIMEOUT";
const ENV_MAX_CRAWL_DEPTH: &str = "MAX_CRAWL_DEPTH";
const ENV_PARSERS_TO_USE: &str = "PARSERS_TO_USE";
const ENV_FAST_STORE_TTL_SECS: &str = "FAST_STORE_TTL_SECS";
const ENV_MAX_CONCURRENT_FETCHES: &str = "MAX_CONCURRENT_FETCHES";
const ENV_DOMAIN_FANOUT: &str = "DOMAIN_FANOUT";

/// Tunables for one `CrawlEngine`. Construct with [`CrawlerConfig::from_env`] in
/// production; [`Default`] supplies the same literal defaults the spec names.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Minimum delay observed before each fetch attempt.
    pub crawl_delay: Duration,
    /// Retry budget for transport errors / non-2xx responses.
    pub max_retries: u32,
    /// Per-request fetch timeout.
    pub timeout: Duration,
    /// Upper bound on BFS depth for a domain pipeline.
    pub max_crawl_depth: u32,
    /// Ordered extractor pipeline; determines `first_finder` tie-breaking.
    pub parsers_to_use: Vec<ParserKind>,
    /// Sliding TTL for the fast store, refreshed on every write.
    pub fast_store_ttl: Duration,
    /// Bound on concurrent in-flight fetches within one depth's batch.
    pub max_concurrent_fetches: usize,
    /// Bound on concurrent domain pipelines within one crawl task.
    /// Setting this to 1 degenerates cross-domain fan-out to sequential.
    pub domain_fanout: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            crawl_delay: Duration::from_secs(1),
            max_retries: 3,
            timeout: Duration::from_secs(30),
            max_crawl_depth: 3,
            parsers_to_use: vec![ParserKind::Simple, ParserKind::Config, ParserKind::Ai],
            fast_store_ttl: Duration::from_secs(86_400),
            max_concurrent_fetches: 10,
            domain_fanout: 4,
        }
    }
}

impl CrawlerConfig {
    /// Resolve a full config from defaults overridden field-by-field by
    /// environment variables. Malformed values fall back to the default and
    /// log a warning rather than failing startup.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            crawl_delay: resolve_millis(ENV_CRAWL_DELAY_MS, default.crawl_delay),
            max_retries: resolve_u32(ENV_MAX_RETRIES, default.max_retries),
            timeout: resolve_secs(ENV_TIMEOUT_SECS, default.timeout),
            max_crawl_depth: resolve_u32(ENV_MAX_CRAWL_DEPTH, default.max_crawl_depth),
            parsers_to_use: resolve_parsers(ENV_PARSERS_TO_USE, default.parsers_to_use),
            fast_store_ttl: resolve_secs(ENV_FAST_STORE_TTL_SECS, default.fast_store_ttl),
            max_concurrent_fetches: resolve_usize(
                ENV_MAX_CONCURRENT_FETCHES,
                default.max_concurrent_fetches,
            ),
            domain_fanout: resolve_usize(ENV_DOMAIN_FANOUT, default.domain_fanout),
        }
    }
}

fn resolve_u32(key: &str, default: u32) -> u32 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn resolve_usize(key: &str, default: usize) -> usize {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn resolve_secs(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn resolve_millis(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

fn resolve_parsers(key: &str, default: Vec<ParserKind>) -> Vec<ParserKind> {
    match env::var(key) {
        Ok(raw) => {
            let parsed: Vec<ParserKind> = raw
                .split(',')
                .filter_map(|s| ParserKind::parse_str(s.trim()))
                .collect();
            if parsed.is_empty() {
                default
            } else {
                parsed
            }
        }
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_literals() {
        let cfg = CrawlerConfig::default();
        assert_eq!(cfg.max_crawl_depth, 3);
        assert_eq!(cfg.fast_store_ttl, Duration::from_secs(86_400));
        assert_eq!(
            cfg.parsers_to_use,
            vec![ParserKind::Simple, ParserKind::Config, ParserKind::Ai]
        );
    }

    #[test]
    fn resolve_parsers_falls_back_on_empty_or_unknown() {
        assert_eq!(
            resolve_parsers("__NO_SUCH_VAR__", vec![ParserKind::Simple]),
            vec![ParserKind::Simple]
        );
    }
}
