//! Two-tier storage: a fast TTL set-store and a durable merged-document
//! store, both addressed by `(task_id, simplified_domain)`.

mod domain_key;
mod memory;

pub use domain_key::simplified_domain;
pub use memory::InMemoryStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core::EngineResult;

#[derive(Debug, Clone)]
pub struct DurableRecord {
    pub urls: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Injected collaborator — never a global singleton — so tests can
/// substitute an in-memory implementation with the same contract.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Idempotent append-set to both the fast and durable tiers.
    async fn save_urls(&self, domain: &str, task_id: &str, urls: &[String]) -> EngineResult<()>;

    /// Members of the fast set, or an empty vector if the key has expired or
    /// never existed.
    async fn get_fast(&self, domain: &str, task_id: &str) -> EngineResult<Vec<String>>;

    /// Single document lookup by compound key.
    async fn get_durable(&self, domain: &str, task_id: &str) -> EngineResult<Option<DurableRecord>>;
}
