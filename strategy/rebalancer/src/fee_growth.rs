//! Append-only JSONL log of a pool's global fee-growth accumulators, and the annualized
//! fee estimate derived from it. The controller never reads this log.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use clients_uniswapv3::FeeGrowthGlobal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Pool;

#[derive(Debug, Error)]
pub enum FeeLogError {
    #[error("fee log io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed fee log line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },

    #[error("fee log encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("fee log line {line} holds a malformed accumulator {value:?}")]
    InvalidAccumulator { line: usize, value: String },

    #[error("record at {timestamp} holds a malformed accumulator {value:?}")]
    CorruptRecord {
        timestamp: DateTime<Utc>,
        value: String,
    },

    #[error("no record at least {window:?} older than the latest one")]
    WindowNotCovered { window: Duration },
}

/// One snapshot of the pool accumulators. Values are Q128.128 decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeGrowthRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "feeGrowthGlobal0X128")]
    pub fee_growth_global0_x128: String,
    #[serde(rename = "feeGrowthGlobal1X128")]
    pub fee_growth_global1_x128: String,
}

impl FeeGrowthRecord {
    pub fn new(timestamp: DateTime<Utc>, growth: &FeeGrowthGlobal) -> Self {
        Self {
            timestamp,
            fee_growth_global0_x128: growth.fee_growth_global0_x128.to_string(),
            fee_growth_global1_x128: growth.fee_growth_global1_x128.to_string(),
        }
    }

    /// Both accumulators, or the string that does not parse as a decimal U256.
    fn accumulators(&self) -> std::result::Result<(U256, U256), String> {
        let parse = |value: &String| value.parse::<U256>().map_err(|_| value.clone());
        Ok((
            parse(&self.fee_growth_global0_x128)?,
            parse(&self.fee_growth_global1_x128)?,
        ))
    }
}

/// Fees earned per unit of liquidity over a year at the observed rate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnualizedFee {
    pub fee0: f64,
    pub fee1: f64,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// `<dir>/<SYM0>_<SYM1>_<fee>.jsonl`
pub fn log_path(dir: &Path, pool: &Pool) -> PathBuf {
    dir.join(format!(
        "{}_{}_{}.jsonl",
        pool.token0().symbol,
        pool.token1().symbol,
        pool.fee()
    ))
}

pub fn append_record(path: &Path, record: &FeeGrowthRecord) -> Result<(), FeeLogError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

/// Reads every record in file order. A missing file is an empty log.
pub fn read_records(path: &Path) -> Result<Vec<FeeGrowthRecord>, FeeLogError> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };
    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: FeeGrowthRecord =
            serde_json::from_str(&line).map_err(|source| FeeLogError::Parse {
                line: index + 1,
                source,
            })?;
        record
            .accumulators()
            .map_err(|value| FeeLogError::InvalidAccumulator {
                line: index + 1,
                value,
            })?;
        records.push(record);
    }
    Ok(records)
}

/// Annualizes the accumulator growth between the latest record and the newest record at
/// least `window` older. Accumulators wrap, so differences are taken modulo 2^256.
pub fn estimate_annualized_fee(
    records: &[FeeGrowthRecord],
    window: Duration,
) -> Result<AnnualizedFee, FeeLogError> {
    let not_covered = || FeeLogError::WindowNotCovered { window };
    let latest = records.last().ok_or_else(not_covered)?;
    let window = chrono::Duration::from_std(window).map_err(|_| not_covered())?;
    let cutoff = latest.timestamp - window;
    let previous = records
        .iter()
        .rev()
        .find(|record| record.timestamp <= cutoff)
        .ok_or_else(not_covered)?;

    let elapsed = (latest.timestamp - previous.timestamp).num_milliseconds() as f64 / 1000.0;
    if elapsed <= 0.0 {
        return Err(not_covered());
    }
    let corrupt = |record: &FeeGrowthRecord| {
        let timestamp = record.timestamp;
        move |value: String| FeeLogError::CorruptRecord { timestamp, value }
    };
    let (latest0, latest1) = latest.accumulators().map_err(corrupt(latest))?;
    let (previous0, previous1) = previous.accumulators().map_err(corrupt(previous))?;
    let per_year = 365.0 * 24.0 * 3600.0 / elapsed;
    Ok(AnnualizedFee {
        fee0: x128_to_f64(latest0.wrapping_sub(previous0)) * per_year,
        fee1: x128_to_f64(latest1.wrapping_sub(previous1)) * per_year,
        from: previous.timestamp,
        to: latest.timestamp,
    })
}

fn x128_to_f64(value: U256) -> f64 {
    let integer = (value >> 128usize).to::<u128>();
    let fraction = (value & U256::from(u128::MAX)).to::<u128>();
    integer as f64 + fraction as f64 / 2f64.powi(128)
}
