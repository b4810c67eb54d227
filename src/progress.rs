//! Progress reporting utilities: byte bars for raw scans and count spinners for row moves.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::{Arc, OnceLock};

/// Optional global MultiProgress that allows multiple bars to render concurrently.
/// If unset, progress bars draw to the default terminal target.
static GLOBAL_MP: OnceLock<Arc<MultiProgress>> = OnceLock::new();

/// Install a global MultiProgress used by all subsequently created progress bars.
/// Safe to call once; additional calls are ignored.
pub fn set_global_multiprogress(mp: Arc<MultiProgress>) {
    let _ = GLOBAL_MP.set(mp);
}

fn register(pb: ProgressBar) -> ProgressBar {
    if let Some(mp) = GLOBAL_MP.get() {
        mp.add(pb)
    } else {
        pb
    }
}

pub fn make_progress_bar_labeled(total_bytes: u64, label: &str) -> ProgressBar {
    let pb = register(ProgressBar::new(total_bytes));
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} {msg} {bytes:>10}/{total_bytes:<10} [{bar:.cyan/blue}] {percent:>3}%  \
         {bytes_per_sec}  elapsed: {elapsed_precise}  eta: {eta_precise}",
    ) {
        pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
    }
    if !label.is_empty() {
        pb.set_message(label.to_string());
    }
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Open-ended row counter (total unknown up front).
pub fn make_count_spinner(label: &str) -> ProgressBar {
    let pb = register(ProgressBar::new_spinner());
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg} {pos} rows  it/s: {per_sec}  elapsed: {elapsed_precise}") {
        pb.set_style(style);
    }
    if !label.is_empty() {
        pb.set_message(label.to_string());
    }
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// A small wrapper over an optional bar, so stages can report unconditionally.
/// - `bytes(..)` / `count(..)` build a bar when `enabled`
/// - `inc(delta)` increments progress
/// - `finish(msg)` finalizes the bar with a message
pub struct ProgressScope {
    pb: Option<ProgressBar>,
}

impl ProgressScope {
    pub fn bytes(enabled: bool, label: impl AsRef<str>, total_bytes: u64) -> Self {
        Self { pb: enabled.then(|| make_progress_bar_labeled(total_bytes, label.as_ref())) }
    }
    pub fn count(enabled: bool, label: impl AsRef<str>) -> Self {
        Self { pb: enabled.then(|| make_count_spinner(label.as_ref())) }
    }
    #[inline]
    pub fn inc(&self, delta: u64) {
        if let Some(pb) = &self.pb { pb.inc(delta); }
    }
    pub fn finish(&self, msg: impl Into<String>) {
        if let Some(pb) = &self.pb { pb.finish_with_message(msg.into()); }
    }
}
