//! Domain error categories for the recorder pipeline.

use thiserror::Error;

/// Errors surfaced to a caller (construction-time) or logged in place
/// (runtime, absorbed into [`crate::stats::Stats`] counters).
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("capture failure: {0}")]
    Capture(String),

    #[error("encode failure: {0}")]
    Encode(String),

    #[error("ring full, packet dropped")]
    BackpressureDrop,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker thread failed to join within {0:?}")]
    Shutdown(std::time::Duration),
}
