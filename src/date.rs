use crate::error::EtlError;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Accepted timeframe shape: a month of the 2000s.
const TIMEFRAME_PATTERN: &str = r"^20[0-9]{2}-(0[1-9]|1[0-2])$";

fn timeframe_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TIMEFRAME_PATTERN).expect("static timeframe regex"))
}

/// "YYYY-MM" identifier selecting one monthly raw file. The year is the partition key
/// for every persisted store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timeframe {
    pub year: u16,
    pub month: u8, // 1..=12
}

impl Timeframe {
    pub fn new(year: u16, month: u8) -> Self {
        assert!((1..=12).contains(&month), "Month must be 1..=12");
        Self { year, month }
    }

    /// Year identifier this timeframe belongs to.
    pub fn year(self) -> u16 {
        self.year
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Timeframe {
    type Err = EtlError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !timeframe_re().is_match(s) {
            return Err(EtlError::InvalidTimeframe(s.to_string()));
        }
        // Shape is guaranteed by the regex above.
        let year: u16 = s[..4].parse().map_err(|_| EtlError::InvalidTimeframe(s.to_string()))?;
        let month: u8 = s[5..].parse().map_err(|_| EtlError::InvalidTimeframe(s.to_string()))?;
        Ok(Self { year, month })
    }
}

/// Parse a list of user-supplied timeframes; the first invalid entry aborts.
pub fn parse_timeframes<I, S>(raw: I) -> Result<Vec<Timeframe>, EtlError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter().map(|s| s.as_ref().trim().parse()).collect()
}

/// Group timeframes by year, keeping each year's months in first-seen order without duplicates.
pub fn group_by_year(timeframes: &[Timeframe]) -> BTreeMap<u16, Vec<Timeframe>> {
    let mut map: BTreeMap<u16, Vec<Timeframe>> = BTreeMap::new();
    for tf in timeframes {
        let months = map.entry(tf.year).or_default();
        if !months.contains(tf) {
            months.push(*tf);
        }
    }
    map
}

/// Distinct years in first-seen order.
pub fn unique_years(timeframes: &[Timeframe]) -> Vec<u16> {
    let mut years: Vec<u16> = Vec::new();
    for tf in timeframes {
        if !years.contains(&tf.year) {
            years.push(tf.year);
        }
    }
    years
}
