use crate::date::Timeframe;
use crate::error::EtlError;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Encoding of a monthly raw file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RawEncoding {
    Plain, // RC_YYYY-MM
    Zstd,  // RC_YYYY-MM.zst
}

#[derive(Clone, Debug)]
pub struct RawInput {
    pub timeframe: Timeframe,
    pub path: PathBuf,
    pub encoding: RawEncoding,
}

/// Every on-disk location the pipeline reads or writes.
#[derive(Clone, Debug)]
pub struct DataLayout {
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub prepared_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub training_dir: PathBuf,
}

impl DataLayout {
    pub fn new(base_dir: &Path, training_dir: &Path) -> Self {
        let data = base_dir.join("data");
        Self {
            raw_dir: data.join("raw"),
            processed_dir: data.join("processed"),
            prepared_dir: data.join("prepared"),
            logs_dir: data.join("logs"),
            training_dir: training_dir.to_path_buf(),
        }
    }

    pub fn raw_path(&self, tf: Timeframe) -> PathBuf {
        self.raw_dir.join(format!("RC_{tf}"))
    }

    pub fn dirty_db(&self, year: u16) -> PathBuf {
        self.processed_dir.join(format!("RC_dirty_{year}.db"))
    }

    pub fn clean_db(&self, year: u16) -> PathBuf {
        self.processed_dir.join(format!("RC_clean_{year}.db"))
    }

    pub fn prepared_csv(&self, year: u16) -> PathBuf {
        self.prepared_dir.join(format!("prepared_{year}.csv"))
    }

    pub fn train_from(&self) -> PathBuf {
        self.training_dir.join("train.from")
    }

    pub fn train_to(&self) -> PathBuf {
        self.training_dir.join("train.to")
    }

    /// Locate the raw file for `tf`: the plain file wins, a `.zst` sibling is the fallback.
    pub fn resolve_raw(&self, tf: Timeframe) -> Result<RawInput, EtlError> {
        let plain = self.raw_path(tf);
        if plain.is_file() {
            return Ok(RawInput { timeframe: tf, path: plain, encoding: RawEncoding::Plain });
        }
        let zst = self.raw_dir.join(format!("RC_{tf}.zst"));
        if zst.is_file() {
            return Ok(RawInput { timeframe: tf, path: zst, encoding: RawEncoding::Zstd });
        }
        Err(EtlError::MissingRawInput { timeframe: tf.to_string(), path: plain })
    }

    /// Create the data directories. Existing directories are fine; anything else is fatal.
    pub fn ensure_dirs(&self) -> Result<(), EtlError> {
        for dir in [&self.raw_dir, &self.processed_dir, &self.prepared_dir, &self.logs_dir] {
            ensure_dir(dir)?;
        }
        Ok(())
    }
}

pub fn ensure_dir(dir: &Path) -> Result<(), EtlError> {
    match fs::create_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(EtlError::Bootstrap { path: dir.to_path_buf(), source: e }),
    }
}

/// Monthly raw files present under `raw_dir`, keyed by timeframe. When both the plain and
/// the `.zst` file exist for a month, the plain one is kept.
pub fn discover_raw(raw_dir: &Path) -> BTreeMap<Timeframe, PathBuf> {
    let re = Regex::new(r"^RC_(20[0-9]{2})-(0[1-9]|1[0-2])(\.zst)?$").expect("static raw name regex");
    let mut map: BTreeMap<Timeframe, PathBuf> = BTreeMap::new();
    if !raw_dir.exists() {
        return map;
    }
    for ent in WalkDir::new(raw_dir).min_depth(1).max_depth(1).into_iter().flatten() {
        if !ent.file_type().is_file() {
            continue;
        }
        let Some(name) = ent.file_name().to_str() else { continue };
        let Some(caps) = re.captures(name) else { continue };
        let (Ok(year), Ok(month)) = (caps[1].parse::<u16>(), caps[2].parse::<u8>()) else { continue };
        let tf = Timeframe { year, month };
        let compressed = caps.get(3).is_some();
        if compressed && map.contains_key(&tf) {
            continue;
        }
        map.insert(tf, ent.path().to_path_buf());
    }
    map
}

/// Timeframes with a raw file on disk, ascending.
pub fn discover_timeframes(raw_dir: &Path) -> Vec<Timeframe> {
    discover_raw(raw_dir).into_keys().collect()
}
