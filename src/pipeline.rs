use crate::clean::{clean_year, CleanReport};
use crate::concurrency::for_each_year_limited;
use crate::config::{GroupingKey, PipelineOptions};
use crate::date::{group_by_year, unique_years, Timeframe};
use crate::export::{export_years, ExportReport};
use crate::filters::AcceptancePolicy;
use crate::ingest::{ingest_year, IngestReport};
use crate::logging::RunLog;
use crate::paths::{DataLayout, RawInput};
use crate::prepare::{prepare_year, PrepareReport};
use anyhow::Result;
use std::path::Path;
use std::time::Instant;

/// Entry point: configure with the builder methods, then run stages.
///
/// Stages read what the previous stage persisted, so each can be run on its own:
/// `ingest` (raw month -> dirty store), `clean` (dirty -> clean store),
/// `prepare` (clean store -> prepared CSV), `export_training` (CSV -> train.from/train.to).
#[derive(Clone)]
pub struct PonchoETL {
    pub(crate) opts: PipelineOptions,
}

/// Everything `run_all` produced.
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub ingest: Vec<IngestReport>,
    pub clean: Vec<CleanReport>,
    pub prepare: Vec<PrepareReport>,
    pub export: ExportReport,
}

impl Default for PonchoETL {
    fn default() -> Self {
        Self::new()
    }
}

impl PonchoETL {
    pub fn new() -> Self {
        Self { opts: PipelineOptions::default() }
    }

    pub fn with_options(opts: PipelineOptions) -> Self {
        Self { opts }
    }

    // -------- Builder methods --------
    pub fn base_dir(mut self, base: impl AsRef<Path>) -> Self { self.opts = self.opts.with_base_dir(base); self }
    pub fn training_dir(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_training_dir(dir); self }
    pub fn batch_threshold(mut self, n: usize) -> Self { self.opts = self.opts.with_batch_threshold(n); self }
    pub fn acceptance(mut self, policy: AcceptancePolicy) -> Self { self.opts = self.opts.with_acceptance(policy); self }
    pub fn grouping_key(mut self, key: GroupingKey) -> Self { self.opts = self.opts.with_grouping_key(key); self }
    pub fn shuffle_seed(mut self, seed: u64) -> Self { self.opts = self.opts.with_shuffle_seed(Some(seed)); self }
    pub fn year_concurrency(mut self, n: usize) -> Self { self.opts = self.opts.with_year_concurrency(n); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn progress_every(mut self, rows: u64) -> Self { self.opts = self.opts.with_progress_every(rows); self }
    pub fn log_file(mut self, yes: bool) -> Self { self.opts = self.opts.with_log_file(yes); self }
    pub fn io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self { self.opts = self.opts.with_io_buffers(read_bytes, write_bytes); self }

    pub fn options(&self) -> &PipelineOptions {
        &self.opts
    }

    pub fn layout(&self) -> DataLayout {
        DataLayout::new(&self.opts.base_dir, &self.opts.training_dir)
    }

    // -------- Stages --------

    /// Populate `RC_dirty_<year>.db` from the raw files of `timeframes`.
    /// Every raw file is located before any store is touched; a missing one aborts the run.
    pub fn ingest(&self, timeframes: &[Timeframe]) -> Result<Vec<IngestReport>> {
        self.run_stage("dirty", |layout, log| {
            let mut groups: Vec<(u16, Vec<RawInput>)> = Vec::new();
            for (year, months) in group_by_year(timeframes) {
                let inputs = months.into_iter().map(|tf| layout.resolve_raw(tf)).collect::<Result<Vec<_>, _>>()?;
                groups.push((year, inputs));
            }
            tracing::info!("Planned {} timeframes across {} years.", timeframes.len(), groups.len());

            let per_year = for_each_year_limited(&groups, self.opts.year_concurrency, log.dispatch(), |(year, inputs)| {
                let reports = ingest_year(&layout.dirty_db(*year), inputs, &self.opts)?;
                for r in &reports {
                    tracing::info!("Finished {}", r);
                }
                Ok(reports)
            })?;
            Ok(per_year.into_iter().flatten().collect())
        })
    }

    /// Select the best reply per comment into `RC_clean_<year>.db`.
    pub fn clean(&self, years: &[u16]) -> Result<Vec<CleanReport>> {
        self.run_stage("clean", |layout, log| {
            for_each_year_limited(years, self.opts.year_concurrency, log.dispatch(), |year| {
                let r = clean_year(layout, *year, &self.opts)?;
                tracing::info!("Finished {}", r);
                Ok(r)
            })
        })
    }

    /// Append each year's shuffled, filtered pairs to `prepared_<year>.csv`.
    pub fn prepare(&self, years: &[u16]) -> Result<Vec<PrepareReport>> {
        self.run_stage("prepared", |layout, log| {
            for_each_year_limited(years, self.opts.year_concurrency, log.dispatch(), |year| {
                let r = prepare_year(layout, *year, &self.opts)?;
                tracing::info!("Finished {}", r);
                Ok(r)
            })
        })
    }

    /// Rewrite `train.from` / `train.to` from the prepared exports of `years`.
    pub fn export_training(&self, years: &[u16]) -> Result<ExportReport> {
        self.run_stage("train", |layout, _log| {
            let r = export_years(layout, years, self.opts.write_buffer_bytes)?;
            tracing::info!("Finished {}", r);
            Ok(r)
        })
    }

    /// All four stages over `timeframes`, in order; later stages use the distinct years.
    pub fn run_all(&self, timeframes: &[Timeframe]) -> Result<RunSummary> {
        let years = unique_years(timeframes);
        let ingest = self.ingest(timeframes)?;
        let clean = self.clean(&years)?;
        let prepare = self.prepare(&years)?;
        let export = self.export_training(&years)?;
        Ok(RunSummary { ingest, clean, prepare, export })
    }

    /// Bootstrap directories, open the stage's log, and wrap `body` in start/finish banners.
    fn run_stage<T>(&self, stage: &str, body: impl FnOnce(&DataLayout, &RunLog) -> Result<T>) -> Result<T> {
        let layout = self.layout();
        layout.ensure_dirs()?;
        let log = RunLog::open(&layout.logs_dir, stage, self.opts.write_log_file)?;
        log.in_scope(|| {
            let started = Instant::now();
            tracing::info!("Beginning stage `{}`", stage);
            if let Some(p) = log.path() {
                tracing::debug!("Logging to {}", p.display());
            }
            let res = body(&layout, &log);
            match &res {
                Ok(_) => tracing::info!("Finishing up `{}`... elapsed {:.1?}", stage, started.elapsed()),
                Err(e) => tracing::error!("Stage `{}` failed: {:#}", stage, e),
            }
            tracing::info!("==================================================================");
            res
        })
    }
}
