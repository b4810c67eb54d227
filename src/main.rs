use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use indicatif::MultiProgress;
use poncho::{
    discover_timeframes, init_tracing_once, parse_timeframes, set_global_multiprogress, unique_years,
    GroupingKey, PipelineOptions, PonchoETL, Timeframe,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Action {
    /// Populate the per-year dirty stores from raw RC files.
    Createdirtydb,
    /// Select the best reply per comment into the clean stores.
    Cleanupdb,
    /// Append shuffled pairs to the per-year prepared CSVs.
    Preparedata,
    /// Rewrite train.from / train.to from the prepared CSVs.
    Trainexport,
    /// Run every stage in order.
    All,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliGroupBy {
    Body,
    Id,
}

impl From<CliGroupBy> for GroupingKey {
    fn from(g: CliGroupBy) -> Self {
        match g {
            CliGroupBy::Body => GroupingKey::CommentBody,
            CliGroupBy::Id => GroupingKey::CommentId,
        }
    }
}

/// CLI to build poncho's comment/reply training data.
#[derive(Parser, Debug)]
#[command(name = "poncho", version, about)]
struct Cli {
    /// Action to be performed.
    #[arg(value_enum)]
    action: Action,

    /// Timeframes (YYYY-MM) that have to be processed.
    #[arg(short = 't', long = "timeframe", num_args = 1.., required_unless_present = "all_available")]
    timeframe: Vec<String>,

    /// Process every month that has a raw file under data/raw.
    #[arg(long)]
    all_available: bool,

    /// Run "cleanupdb" after "createdirtydb".
    #[arg(short = 'a', long)]
    autoclean: bool,

    /// Run "preparedata" after "cleanupdb".
    #[arg(short = 'p', long)]
    prepare: bool,

    /// Seed for the prepared-data shuffle (unseeded when absent).
    #[arg(long, env = "PONCHO_SHUFFLE_SEED")]
    seed: Option<u64>,

    /// Grouping key for best-reply selection.
    #[arg(long, value_enum, default_value = "body")]
    group_by: CliGroupBy,

    /// Project directory containing data/.
    #[arg(long, env = "PONCHO_BASE_DIR")]
    base_dir: Option<PathBuf>,

    /// Output directory for train.from / train.to.
    #[arg(long, env = "PONCHO_TRAINING_DIR")]
    training_dir: Option<PathBuf>,

    /// Years processed in parallel.
    #[arg(long, default_value_t = 1)]
    jobs: usize,

    /// Disable progress bars.
    #[arg(long)]
    no_progress: bool,
}

fn main() -> Result<()> {
    init_tracing_once();
    let cli = Cli::parse();

    let mut opts = PipelineOptions::default().merge_env();
    if let Some(dir) = &cli.base_dir {
        opts = opts.with_base_dir(dir);
    }
    if let Some(dir) = &cli.training_dir {
        opts = opts.with_training_dir(dir);
    }
    let seed = cli.seed.or(opts.shuffle_seed);
    opts = opts
        .with_shuffle_seed(seed)
        .with_grouping_key(cli.group_by.into())
        .with_year_concurrency(cli.jobs)
        .with_progress(!cli.no_progress);

    if opts.progress && opts.year_concurrency > 1 {
        set_global_multiprogress(Arc::new(MultiProgress::new()));
    }
    let etl = PonchoETL::with_options(opts);

    let timeframes: Vec<Timeframe> = if cli.all_available {
        let found = discover_timeframes(&etl.layout().raw_dir);
        if found.is_empty() {
            bail!("no raw RC files found under {}", etl.layout().raw_dir.display());
        }
        found
    } else {
        parse_timeframes(&cli.timeframe)?
    };
    let years = unique_years(&timeframes);

    match cli.action {
        Action::Createdirtydb => {
            for r in etl.ingest(&timeframes)? {
                println!("{r}");
            }
            if cli.autoclean {
                for r in etl.clean(&years)? {
                    println!("{r}");
                }
                if cli.prepare {
                    for r in etl.prepare(&years)? {
                        println!("{r}");
                    }
                }
            }
        }
        Action::Cleanupdb => {
            for r in etl.clean(&years)? {
                println!("{r}");
            }
            if cli.prepare {
                for r in etl.prepare(&years)? {
                    println!("{r}");
                }
            }
        }
        Action::Preparedata => {
            for r in etl.prepare(&years)? {
                println!("{r}");
            }
        }
        Action::Trainexport => {
            println!("{}", etl.export_training(&years)?);
        }
        Action::All => {
            let summary = etl.run_all(&timeframes)?;
            summary.ingest.iter().for_each(|r| println!("{r}"));
            summary.clean.iter().for_each(|r| println!("{r}"));
            summary.prepare.iter().for_each(|r| println!("{r}"));
            println!("{}", summary.export);
        }
    }
    Ok(())
}
