//! Distributed crawl engine for discovering e-commerce product-page URLs.
//!
//! `core` holds config/error/DTO/normalization primitives; `fetch` is the
//! stealth HTTP client; `extract` holds the three URL extractors; `links`
//! and `sequential` are the link-discovery and numeric-ID-expansion helpers;
//! `storage` is the two-tier (fast TTL + durable) persistence layer;
//! `engine` is the per-domain BFS pipeline plus the cross-domain orchestrator;
//! `api` is the thin Control API adapter around `engine::CrawlEngine`.

pub mod api;
pub mod core;
pub mod engine;
pub mod extract;
pub mod fetch;
pub mod links;
pub mod sequential;
pub mod storage;

pub use core::{CrawlerConfig, EngineError, EngineResult};
pub use engine::CrawlEngine;
pub use fetch::Fetcher;
