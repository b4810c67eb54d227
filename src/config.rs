use crate::filters::AcceptancePolicy;
use std::path::{Path, PathBuf};

/// Key used to collapse a comment's replies down to the best one during cleanup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupingKey {
    /// Group by comment text. Identical bodies from different comments collapse into one pair.
    CommentBody,
    /// Group by the stable comment id.
    CommentId,
}

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct PipelineOptions {
    pub base_dir: PathBuf,            // data/ lives under here
    pub training_dir: PathBuf,        // external training system input dir (train.from / train.to)
    pub batch_threshold: usize,       // flush once pending statements exceed this
    pub acceptance: AcceptancePolicy,
    pub grouping_key: GroupingKey,
    pub shuffle_seed: Option<u64>,    // None = fresh OS entropy each run
    pub year_concurrency: usize,      // year partitions processed in parallel
    pub progress: bool,               // show progress bars
    pub progress_every: u64,          // rows between progress log lines
    pub write_log_file: bool,         // per-invocation log under data/logs

    // IO tuning
    pub read_buffer_bytes: usize,     // BufReader capacity for raw input
    pub write_buffer_bytes: usize,    // BufWriter capacity for exports
}

impl Default for PipelineOptions {
    fn default() -> Self {
        let base = PathBuf::from(".");
        Self {
            training_dir: default_training_dir(&base),
            base_dir: base,
            batch_threshold: 1000,
            acceptance: AcceptancePolicy::default(),
            grouping_key: GroupingKey::CommentBody,
            shuffle_seed: None,
            year_concurrency: 1, // one writer per year store; raise only for many-year runs
            progress: true,
            progress_every: 10_000,
            write_log_file: true,

            read_buffer_bytes: 10 * 1024 * 1024,
            write_buffer_bytes: 256 * 1024,
        }
    }
}

/// The training system checks out next to the project: `<base>/../nmt-chatbot/new_data`.
fn default_training_dir(base: &Path) -> PathBuf {
    base.join("..").join("nmt-chatbot").join("new_data")
}

impl PipelineOptions {
    /// Moves the data root. The training dir follows unless it was set explicitly afterwards.
    pub fn with_base_dir(mut self, base_dir: impl AsRef<Path>) -> Self {
        let base = base_dir.as_ref().to_path_buf();
        self.training_dir = default_training_dir(&base);
        self.base_dir = base;
        self
    }
    pub fn with_training_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.training_dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn with_batch_threshold(mut self, n: usize) -> Self {
        self.batch_threshold = n;
        self
    }
    pub fn with_acceptance(mut self, policy: AcceptancePolicy) -> Self {
        self.acceptance = policy;
        self
    }
    pub fn with_grouping_key(mut self, key: GroupingKey) -> Self {
        self.grouping_key = key;
        self
    }
    pub fn with_shuffle_seed(mut self, seed: Option<u64>) -> Self {
        self.shuffle_seed = seed;
        self
    }
    pub fn with_year_concurrency(mut self, n: usize) -> Self {
        self.year_concurrency = n.max(1);
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_progress_every(mut self, rows: u64) -> Self {
        self.progress_every = rows.max(1);
        self
    }
    pub fn with_log_file(mut self, yes: bool) -> Self {
        self.write_log_file = yes;
        self
    }

    // IO buffers tuning
    pub fn with_io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self {
        self.read_buffer_bytes = read_bytes.max(8 * 1024);
        self.write_buffer_bytes = write_bytes.max(8 * 1024);
        self
    }

    /// Apply `PONCHO_BASE_DIR`, `PONCHO_TRAINING_DIR` and `PONCHO_SHUFFLE_SEED` when set.
    /// An unparsable seed is ignored with a warning.
    pub fn merge_env(mut self) -> Self {
        if let Ok(dir) = std::env::var("PONCHO_BASE_DIR") {
            if !dir.trim().is_empty() {
                self = self.with_base_dir(dir.trim());
            }
        }
        if let Ok(dir) = std::env::var("PONCHO_TRAINING_DIR") {
            if !dir.trim().is_empty() {
                self = self.with_training_dir(dir.trim());
            }
        }
        if let Ok(raw) = std::env::var("PONCHO_SHUFFLE_SEED") {
            match raw.trim().parse::<u64>() {
                Ok(seed) => self.shuffle_seed = Some(seed),
                Err(_) => tracing::warn!("PONCHO_SHUFFLE_SEED is set but not a u64: {}", raw),
            }
        }
        self
    }
}
