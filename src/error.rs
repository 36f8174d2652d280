//! Library error type.
//!
//! The detector itself is infallible at sample time (spec §7): any failure
//! surface is confined to construction-time I/O, namely optional WAV taps.

use std::path::PathBuf;

/// Errors raised at the library boundary.
///
/// The hot path (`PulseDetector::package`) never returns this type — per
/// spec §7 the sample loop is infallible, and WAV tap failures are demoted
/// to a warning rather than propagated.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A WAV tap file could not be created.
    #[error("failed to create wav tap at {path}: {source}")]
    WavTapCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A WAV tap write failed after creation (disk full, permissions revoked
    /// mid-run, etc).
    #[error("failed to write wav tap at {path}: {source}")]
    WavTapWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
