use std::path::PathBuf;
use thiserror::Error;

/// Everything that can abort a patch run.
///
/// None of these are recovered from: the run stops, the file on disk is left
/// as it was, and the caller prints the message.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("marker not found: {marker:?}")]
    MarkerNotFound { marker: String },

    #[error("pattern matched nothing: {pattern:?}")]
    PatternNotMatched { pattern: String },

    #[error("marker {marker:?} occurs {count} times (expected exactly 1)")]
    AmbiguousMarker { marker: String, count: usize },

    #[error("end marker {end:?} does not follow start marker {start:?}")]
    RegionOrderInvalid { start: String, end: String },

    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("span [{byte_start}, {byte_end}) no longer holds the located text")]
    StaleRegion { byte_start: usize, byte_end: usize },

    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("{} is not valid UTF-8: {source}", path.display())]
    DecodeError {
        path: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PatchError {
    /// True for failures of the Locator stage.
    ///
    /// These are the errors that already-applied detection may turn into a
    /// no-op; I/O and verification failures always stand.
    pub fn is_locate_failure(&self) -> bool {
        matches!(
            self,
            PatchError::MarkerNotFound { .. }
                | PatchError::PatternNotMatched { .. }
                | PatchError::RegionOrderInvalid { .. }
        )
    }
}
