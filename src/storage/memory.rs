//! In-memory implementations of the [`Storage`] contract: a `moka` TTL cache
//! for the fast tier, a mutex-guarded map for the durable tier. Real
//! Redis/Mongo-backed implementations are swappable behind the same trait;
//! these are what this crate ships and what its tests run against.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use moka::future::Cache;
use tokio::sync::Mutex;

use super::{simplified_domain, DurableRecord, Storage};
use crate::core::EngineResult;

fn fast_key(task_id: &str, domain: &str) -> String {
    format!("crawler_urls:{task_id}:{}", simplified_domain(domain))
}

pub struct InMemoryStorage {
    fast: Cache<String, Arc<Mutex<HashSet<String>>>>,
    durable: Mutex<HashMap<(String, String), DurableRecord>>,
    ttl: Duration,
}

impl InMemoryStorage {
    pub fn new(ttl: Duration) -> Self {
        Self {
            fast: Cache::builder().time_to_live(ttl).build(),
            durable: Mutex::new(HashMap::new()),
            ttl,
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new(Duration::from_secs(86_400))
    }
}

impl InMemoryStorage {
    pub fn fast_ttl(&self) -> Duration {
        self.ttl
    }

    /// Force-expire the fast-tier entry for `(task_id, domain)`, used by
    /// tests that exercise the durable-store read fallback (S6).
    pub async fn expire_fast(&self, domain: &str, task_id: &str) {
        self.fast.invalidate(&fast_key(task_id, domain)).await;
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn save_urls(&self, domain: &str, task_id: &str, urls: &[String]) -> EngineResult<()> {
        if urls.is_empty() {
            return Ok(());
        }

        // Fast tier: set-add url-by-url, TTL refreshed on every write because
        // `moka`'s `insert` resets the entry's time-to-live.
        let key = fast_key(task_id, domain);
        let entry = self
            .fast
            .get_with(key.clone(), async { Arc::new(Mutex::new(HashSet::new())) })
            .await;
        {
            let mut set = entry.lock().await;
            for u in urls {
                set.insert(u.clone());
            }
        }
        // Re-insert to refresh the sliding TTL on this write.
        self.fast.insert(key, entry).await;

        // Durable tier: upsert via set-union, never overwrite.
        let simplified = simplified_domain(domain);
        let compound_key = (task_id.to_string(), simplified.clone());
        let mut durable = self.durable.lock().await;
        durable
            .entry(compound_key)
            .and_modify(|rec| {
                let mut set: HashSet<String> = rec.urls.iter().cloned().collect();
                set.extend(urls.iter().cloned());
                rec.urls = set.into_iter().collect();
                rec.timestamp = Utc::now();
            })
            .or_insert_with(|| DurableRecord {
                urls: urls.to_vec(),
                timestamp: Utc::now(),
            });
        Ok(())
    }

    async fn get_fast(&self, domain: &str, task_id: &str) -> EngineResult<Vec<String>> {
        let key = fast_key(task_id, domain);
        match self.fast.get(&key).await {
            Some(set) => Ok(set.lock().await.iter().cloned().collect()),
            None => Ok(Vec::new()),
        }
    }

    async fn get_durable(&self, domain: &str, task_id: &str) -> EngineResult<Option<DurableRecord>> {
        let simplified = simplified_domain(domain);
        let durable = self.durable.lock().await;
        Ok(durable.get(&(task_id.to_string(), simplified)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_read_round_trips_both_tiers() {
        let storage = InMemoryStorage::default();
        let urls = vec![
            "https://example.com/product/1".to_string(),
            "https://example.com/product/2".to_string(),
        ];
        storage.save_urls("https://example.com", "T1", &urls).await.unwrap();

        let mut fast = storage.get_fast("https://example.com", "T1").await.unwrap();
        fast.sort();
        assert_eq!(fast, urls);

        let durable = storage
            .get_durable("https://example.com", "T1")
            .await
            .unwrap()
            .expect("durable record should exist");
        let mut durable_urls = durable.urls.clone();
        durable_urls.sort();
        assert_eq!(durable_urls, urls);
    }

    #[tokio::test]
    async fn durable_write_is_set_union_not_overwrite() {
        let storage = InMemoryStorage::default();
        storage
            .save_urls("https://example.com", "T1", &["https://example.com/a".to_string()])
            .await
            .unwrap();
        storage
            .save_urls("https://example.com", "T1", &["https://example.com/b".to_string()])
            .await
            .unwrap();

        let durable = storage
            .get_durable("https://example.com", "T1")
            .await
            .unwrap()
            .unwrap();
        let mut urls = durable.urls.clone();
        urls.sort();
        assert_eq!(
            urls,
            vec![
                "https://example.com/a".to_string(),
                "https://example.com/b".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn running_the_same_save_twice_does_not_change_the_stored_set() {
        let storage = InMemoryStorage::default();
        let urls = vec!["https://example.com/a".to_string()];
        storage.save_urls("https://example.com", "T1", &urls).await.unwrap();
        storage.save_urls("https://example.com", "T1", &urls).await.unwrap();

        let durable = storage
            .get_durable("https://example.com", "T1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(durable.urls.len(), 1);
    }

    #[tokio::test]
    async fn keys_are_scoped_by_simplified_domain_not_raw_host() {
        let storage = InMemoryStorage::default();
        storage
            .save_urls(
                "https://www.Foo.Co.UK/x",
                "T1",
                &["https://www.foo.co.uk/product/1".to_string()],
            )
            .await
            .unwrap();

        let durable = storage.get_durable("https://foo.co.uk", "T1").await.unwrap();
        assert!(durable.is_some(), "different hosts sharing a registrable domain must hit the same record");
    }
}
