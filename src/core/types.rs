//! Request/response DTOs for the Control API and the aggregate report shape,
//! following this crate's convention of `#[serde(default)]` on optional
//! request fields and `skip_serializing_if` on response fields that are often
//! absent.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct CrawlRequest {
    pub domains: Vec<String>,
    #[serde(default)]
    pub max_depth: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrawlAccepted {
    pub task_id: String,
    pub status: String,
    pub domains: Vec<String>,
    pub max_depth: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Pending,
    Started,
    Progress,
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AggregateReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `{status, domain, depth, depth_progress, urls_discovered}` progress snapshot.
/// Consumers must treat these as eventually-consistent; the engine makes no
/// ordering guarantee across callback invocations.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub status: String,
    pub domain: String,
    pub depth: u32,
    pub depth_progress: usize,
    pub urls_discovered: usize,
}

/// Per-parser-name statistics, keyed by `ParserKind::as_str()` plus `"sequential"`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParserStatEntry {
    pub total: usize,
    pub unique: usize,
    pub domains: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DomainReport {
    pub status: String,
    pub domain: String,
    pub urls_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub parser_stats: HashMap<String, ParserStatEntry>,
    pub urls_by_parser: HashMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    pub status: String,
    pub task_id: String,
    pub duration_secs: f64,
    pub domains: Vec<String>,
    pub urls_count: HashMap<String, usize>,
    pub total_urls: usize,
    pub parser_stats: HashMap<String, ParserStatEntry>,
    pub urls_by_parser: HashMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UrlsResponse {
    pub source: &'static str,
    pub task_id: String,
    pub domain: String,
    pub urls_count: usize,
    pub urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub fast_store_reachable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
