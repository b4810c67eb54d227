//! Typed failure causes. Stage APIs return `anyhow::Result`; callers that need to react to a
//! specific cause can `downcast_ref::<EtlError>()` on the error chain.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EtlError {
    #[error("{0:?} is not a valid timeframe (expected YYYY-MM, 2000-2099)")]
    InvalidTimeframe(String),

    #[error("line {line}: required field `{field}` is missing or malformed")]
    MissingField { line: u64, field: &'static str },

    #[error("line {line}: invalid JSON record: {message}")]
    MalformedRecord { line: u64, message: String },

    #[error("raw input for {timeframe} not found at {}", path.display())]
    MissingRawInput { timeframe: String, path: PathBuf },

    #[error("store for year {year} not found at {} (run the previous stage first)", path.display())]
    MissingStore { year: u16, path: PathBuf },

    #[error("prepared export for year {year} not found at {}", path.display())]
    MissingPrepared { year: u16, path: PathBuf },

    #[error("cannot create directory {}: {source}", path.display())]
    Bootstrap {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
