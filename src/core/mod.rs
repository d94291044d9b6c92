pub mod config;
pub mod error;
pub mod normalize;
pub mod types;

pub use config::CrawlerConfig;
pub use error::{EngineError, EngineResult};
