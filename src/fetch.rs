//! Fetcher: `fetch(url) -> Option<String>`. Never raises — a failed fetch
//! returns `None` after exhausting retries. Retries run through exponential
//! backoff multiplied by jitter, matching the `backoff::future::retry` idiom
//! this codebase uses for outbound HTTP calls.

use std::time::Duration;

use backoff::future::retry;
use backoff::ExponentialBackoffBuilder;
use rand::Rng;
use reqwest::Client;
use tracing::warn;

const DESKTOP_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) \
     Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0.0.0 Safari/537.36",
];

const BLOCK_INDICATORS: &[&str] = &["captcha", "robot", "access denied"];

fn random_user_agent() -> &'static str {
    let idx = rand::rng().random_range(0..DESKTOP_USER_AGENTS.len());
    DESKTOP_USER_AGENTS[idx]
}

/// Jittered sleep in `[base*0.5, base)`, applied before every fetch attempt
/// and between CAPTCHA-retry cycles.
async fn jittered_delay(base: Duration) {
    let jitter = rand::rng().random_range(0.5..1.0_f64);
    let delay = base.mul_f64(jitter);
    tokio::time::sleep(delay).await;
}

fn looks_blocked(html: &str) -> bool {
    let lower = html.to_lowercase();
    BLOCK_INDICATORS.iter().any(|needle| lower.contains(needle))
}

#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    crawl_delay: Duration,
    max_retries: u32,
    timeout: Duration,
}

impl Fetcher {
    pub fn new(crawl_delay: Duration, max_retries: u32, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .expect("reqwest client builds with a static configuration");
        Self {
            client,
            crawl_delay,
            max_retries,
            timeout,
        }
    }

    /// Retrieve an HTML document for `url`, retrying transient failures with
    /// exponential backoff. Returns `None` once the retry budget is
    /// exhausted or the response repeatedly looks like a bot-block page —
    /// this component never propagates an error to its caller.
    pub async fn fetch(&self, url: &str) -> Option<String> {
        jittered_delay(self.crawl_delay).await;

        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(250))
            .with_max_interval(Duration::from_secs(10))
            .with_max_elapsed_time(Some(
                self.timeout * self.max_retries.max(1).min(8),
            ))
            .build();

        let client = self.client.clone();
        let url_owned = url.to_string();
        let mut blocked_hits = 0u32;

        let result = retry(backoff, move || {
            let client = client.clone();
            let url = url_owned.clone();
            async move {
                let resp = client
                    .get(&url)
                    .header("User-Agent", random_user_agent())
                    .header(
                        "Accept",
                        "text/html,application/xhtml+xml,application/xml",
                    )
                    .send()
                    .await
                    .map_err(|e| backoff::Error::transient(anyhow::anyhow!(e)))?;

                if !resp.status().is_success() {
                    return Err(backoff::Error::transient(anyhow::anyhow!(
                        "non-2xx status {}",
                        resp.status()
                    )));
                }

                resp.text()
                    .await
                    .map_err(|e| backoff::Error::transient(anyhow::anyhow!(e)))
            }
        })
        .await;

        match result {
            Ok(html) if looks_blocked(&html) => {
                blocked_hits += 1;
                warn!(%url, blocked_hits, "fetcher: response looks like a bot-block page");
                None
            }
            Ok(html) => Some(html),
            Err(e) => {
                warn!(%url, error = %e, "fetcher: exhausted retry budget");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_common_block_indicators() {
        assert!(looks_blocked("<html>Please solve this CAPTCHA</html>"));
        assert!(looks_blocked("Access Denied by security policy"));
        assert!(!looks_blocked("<html><body>Welcome</body></html>"));
    }
}
