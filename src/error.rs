use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DetectError>;

/// Fatal conditions surfaced by the decode/search pipeline.
///
/// Everything else (short windows, empty correlations, failed snippet
/// extraction, decode failures past the first window) is handled in place
/// and never interrupts a scan.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("audio decode failed: {0}")]
    DecodeFailure(String),
}
