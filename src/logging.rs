//! Tracing setup: a process-wide console subscriber for the binary, and a per-stage
//! `RunLog` that tees events to the console and to `data/logs/<stage>_<unix>.txt`.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use time::OffsetDateTime;
use tracing::Dispatch;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

static INIT_ONCE: std::sync::Once = std::sync::Once::new();
pub fn init_tracing_once() {
    INIT_ONCE.call_once(|| {
        let _ = tracing_subscriber::fmt().with_env_filter(env_filter()).with_writer(std::io::stderr).try_init();
    });
}

/// Logging scope for one stage invocation.
pub struct RunLog {
    dispatch: Dispatch,
    path: Option<PathBuf>,
}

impl RunLog {
    /// `to_file = false` logs to the console only (no file is created).
    pub fn open(logs_dir: &Path, stage: &str, to_file: bool) -> Result<Self> {
        let (file, path) = if to_file {
            let stamp = OffsetDateTime::now_utc().unix_timestamp();
            let path = logs_dir.join(format!("{stage}_{stamp}.txt"));
            let f = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("open log {}", path.display()))?;
            (Some(f), Some(path))
        } else {
            (None, None)
        };

        let console = fmt::layer().with_target(false).with_writer(std::io::stderr);
        let file_layer = file.map(|f| fmt::layer().with_ansi(false).with_target(false).with_writer(Mutex::new(f)));
        let subscriber = tracing_subscriber::registry().with(env_filter()).with(console).with(file_layer);

        Ok(Self { dispatch: Dispatch::new(subscriber), path })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `f` with this log as the thread's default subscriber.
    /// Worker threads must enter the scope themselves (see `concurrency`).
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }
}
