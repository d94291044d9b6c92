use thiserror::Error;

/// Error taxonomy surfaced at the engine/storage/extractor boundary.
///
/// Per-URL and per-parser failures (transient fetch errors, blocked pages, parse
/// exceptions, storage write hiccups) are absorbed internally and never reach this
/// type — they are logged and the pipeline continues. Only input validation and
/// whole-domain-pipeline failures are represented here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("domain pipeline for '{domain}' failed: {source}")]
    PipelineFatal {
        domain: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("storage error: {0}")]
    Storage(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
