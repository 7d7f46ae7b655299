use std::path::PathBuf;
use std::time::Duration;

use adfit_core::eligibility::{EligibilityPolicy, ELIGIBLE_CHANNEL_THRESHOLD};
use adfit_core::ratio::DEFAULT_MIN_SCALE_FACTOR;

use crate::error::WorkerError;

/// Default number of assets analyzed per partition.
const DEFAULT_PARTITION_SIZE: usize = 64;

/// How a catalog file relates to the built-in catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogMode {
    /// Append the file's channels after the built-in ones.
    Extend,
    /// Use only the file's channels.
    Replace,
}

/// Worker configuration loaded from environment variables.
///
/// All fields have defaults suitable for a local run.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    /// Optional JSON catalog file.
    pub catalog_path: Option<PathBuf>,
    pub catalog_mode: CatalogMode,
    /// Maximum partitions analyzed at once.
    pub concurrency: usize,
    pub partition_size: usize,
    /// Wall-clock budget for a scan; unfinished partitions are omitted.
    pub budget: Option<Duration>,
    pub policy: EligibilityPolicy,
}

/// Settings the runner needs for one scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOptions {
    pub concurrency: usize,
    pub partition_size: usize,
    pub budget: Option<Duration>,
    pub policy: EligibilityPolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            partition_size: DEFAULT_PARTITION_SIZE,
            budget: None,
            policy: EligibilityPolicy::default(),
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                  |
    /// |------------------------------|--------------------------|
    /// | `CATALOG_PATH`               | unset (built-in catalog) |
    /// | `CATALOG_MODE`               | `extend`                 |
    /// | `SCAN_CONCURRENCY`           | available parallelism    |
    /// | `SCAN_PARTITION_SIZE`        | `64`                     |
    /// | `SCAN_BUDGET_SECS`           | unset (no budget)        |
    /// | `ELIGIBLE_CHANNEL_THRESHOLD` | `3`                      |
    /// | `MIN_SCALE_FACTOR`           | `0.5`                    |
    pub fn from_env() -> Result<Self, WorkerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, WorkerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let catalog_path = var("CATALOG_PATH").map(PathBuf::from);

        let catalog_mode = match var("CATALOG_MODE").as_deref() {
            None | Some("extend") => CatalogMode::Extend,
            Some("replace") => CatalogMode::Replace,
            Some(other) => {
                return Err(WorkerError::Config(format!(
                    "CATALOG_MODE must be 'extend' or 'replace', got '{other}'"
                )))
            }
        };

        let concurrency = match var("SCAN_CONCURRENCY") {
            Some(v) => parse_positive("SCAN_CONCURRENCY", &v)?,
            None => default_concurrency(),
        };

        let partition_size = match var("SCAN_PARTITION_SIZE") {
            Some(v) => parse_positive("SCAN_PARTITION_SIZE", &v)?,
            None => DEFAULT_PARTITION_SIZE,
        };

        let budget = var("SCAN_BUDGET_SECS")
            .map(|v| {
                v.parse::<u64>().map(Duration::from_secs).map_err(|_| {
                    WorkerError::Config(format!("SCAN_BUDGET_SECS must be a valid u64, got '{v}'"))
                })
            })
            .transpose()?;

        let eligible_threshold = match var("ELIGIBLE_CHANNEL_THRESHOLD") {
            Some(v) => parse_positive("ELIGIBLE_CHANNEL_THRESHOLD", &v)?,
            None => ELIGIBLE_CHANNEL_THRESHOLD,
        };

        let min_scale_factor = match var("MIN_SCALE_FACTOR") {
            Some(v) => match v.parse::<f64>() {
                Ok(f) if f > 0.0 && f <= 1.0 => f,
                _ => {
                    return Err(WorkerError::Config(format!(
                        "MIN_SCALE_FACTOR must be a number in (0, 1], got '{v}'"
                    )))
                }
            },
            None => DEFAULT_MIN_SCALE_FACTOR,
        };

        Ok(Self {
            catalog_path,
            catalog_mode,
            concurrency,
            partition_size,
            budget,
            policy: EligibilityPolicy {
                eligible_threshold,
                min_scale_factor,
            },
        })
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            concurrency: self.concurrency,
            partition_size: self.partition_size,
            budget: self.budget,
            policy: self.policy,
        }
    }
}

fn parse_positive(key: &str, value: &str) -> Result<usize, WorkerError> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(WorkerError::Config(format!(
            "{key} must be a positive integer, got '{value}'"
        ))),
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
