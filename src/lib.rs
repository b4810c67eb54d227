mod config;
mod date;
mod error;
mod paths;
mod util;

mod filters;
mod records;
mod ndjson;
mod progress;
mod concurrency;
mod logging;

mod batcher;
mod store;

mod ingest;
mod clean;
mod prepare;
mod export;
mod pipeline;

pub use crate::config::{GroupingKey, PipelineOptions};
pub use crate::date::{group_by_year, parse_timeframes, unique_years, Timeframe};
pub use crate::error::EtlError;
pub use crate::pipeline::{PonchoETL, RunSummary};

// Body normalization and the acceptance gate.
pub use crate::filters::{normalize_body, AcceptancePolicy, DELETED_MARKER, REMOVED_MARKER};

// Raw record parsing and parent classification.
pub use crate::records::{parse_comment, strip_marker, ParentMarker, RawComment};

// Batched writes, usable against any connection.
pub use crate::batcher::{BatchOutcome, StatementFailure, TransactionBatcher};

// Stage reports.
pub use crate::ingest::IngestReport;
pub use crate::clean::CleanReport;
pub use crate::prepare::{append_csv, PrepareReport, PreparedRow};
pub use crate::export::ExportReport;

// Paths and discovery.
pub use crate::paths::{discover_timeframes, DataLayout, RawEncoding, RawInput};

// Logging and progress helpers for the binary.
pub use crate::logging::{init_tracing_once, RunLog};
pub use crate::progress::{set_global_multiprogress, ProgressScope};
