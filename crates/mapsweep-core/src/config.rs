use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Worker start retry parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts to start a worker (including the first).
    pub max_attempts: u32,
    /// Fixed delay in seconds between attempts (e.g. 0.5 = 500ms).
    pub backoff_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_secs: 5.0,
        }
    }
}

impl RetryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::try_from_secs_f64(self.backoff_secs.max(0.0)).unwrap_or(Duration::ZERO)
    }

    /// Backoff that fits a [`Duration`]; negative values count as zero.
    fn backoff_is_valid(&self) -> bool {
        Duration::try_from_secs_f64(self.backoff_secs.max(0.0)).is_ok()
    }
}

/// External browser-automation worker command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Program spawned once per job.
    pub program: String,
    /// Extra arguments passed before the job is written on stdin.
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            program: "mapsweep-worker".to_string(),
            args: Vec::new(),
        }
    }
}

/// How result files are named: one per industry, or one per industry and run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKeyStyle {
    #[default]
    Industry,
    IndustryTimestamp,
}

/// What to do with records already present in a result file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateMode {
    /// Concatenate; reruns may repeat entities.
    #[default]
    Append,
    /// Drop records whose `dedupe_key` fields match an earlier record.
    Dedupe,
}

fn default_dedupe_key() -> Vec<String> {
    vec!["Name".to_string(), "Address".to_string()]
}

fn default_max_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Global configuration loaded from `~/.config/mapsweep/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapsweepConfig {
    /// Lower bound of the adaptive job concurrency limit.
    pub min_concurrency: usize,
    /// Upper bound of the adaptive job concurrency limit.
    pub max_concurrency: usize,
    /// Starting limit; defaults to `min_concurrency`.
    #[serde(default)]
    pub initial_concurrency: Option<usize>,
    /// Host CPU utilization (percent) above which concurrency shrinks.
    pub cpu_ceiling_pct: f32,
    /// Used RAM in bytes above which concurrency shrinks. None = 80% of total memory.
    #[serde(default)]
    pub ram_ceiling_bytes: Option<u64>,
    /// Jobs yielding fewer records than this are not persisted.
    pub min_records: usize,
    /// Progress checkpoint file. None = `progress.json` in the working directory.
    #[serde(default)]
    pub progress_file: Option<PathBuf>,
    /// Directory for result files. None = `output/` in the working directory.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub result_key: ResultKeyStyle,
    #[serde(default)]
    pub duplicates: DuplicateMode,
    /// Record fields forming the natural key when `duplicates = "dedupe"`.
    #[serde(default = "default_dedupe_key")]
    pub dedupe_key: Vec<String>,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub worker: WorkerConfig,
}

impl Default for MapsweepConfig {
    fn default() -> Self {
        Self {
            min_concurrency: 1,
            max_concurrency: default_max_concurrency(),
            initial_concurrency: None,
            cpu_ceiling_pct: 80.0,
            ram_ceiling_bytes: None,
            min_records: 5,
            progress_file: None,
            output_dir: None,
            result_key: ResultKeyStyle::Industry,
            duplicates: DuplicateMode::Append,
            dedupe_key: default_dedupe_key(),
            retry: None,
            worker: WorkerConfig::default(),
        }
    }
}

/// Invalid combination of configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("min_concurrency must be at least 1")]
    ZeroMinConcurrency,
    #[error("min_concurrency ({min}) exceeds max_concurrency ({max})")]
    InvertedConcurrency { min: usize, max: usize },
    #[error("retry.max_attempts must be at least 1")]
    ZeroAttempts,
    #[error("retry.backoff_secs must be a finite number of seconds")]
    InvalidBackoff,
    #[error("dedupe_key must name at least one field when duplicates = \"dedupe\"")]
    EmptyDedupeKey,
}

impl MapsweepConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_concurrency == 0 {
            return Err(ConfigError::ZeroMinConcurrency);
        }
        if self.min_concurrency > self.max_concurrency {
            return Err(ConfigError::InvertedConcurrency {
                min: self.min_concurrency,
                max: self.max_concurrency,
            });
        }
        let retry = self.retry();
        if retry.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if !retry.backoff_is_valid() {
            return Err(ConfigError::InvalidBackoff);
        }
        if self.duplicates == DuplicateMode::Dedupe && self.dedupe_key.is_empty() {
            return Err(ConfigError::EmptyDedupeKey);
        }
        Ok(())
    }

    /// Retry section, or the built-in defaults when absent.
    pub fn retry(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }

    /// Starting concurrency limit clamped into `[min, max]`.
    pub fn initial_concurrency(&self) -> usize {
        self.initial_concurrency
            .unwrap_or(self.min_concurrency)
            .clamp(self.min_concurrency, self.max_concurrency)
    }

    pub fn progress_path(&self) -> PathBuf {
        self.progress_file
            .clone()
            .unwrap_or_else(|| PathBuf::from("progress.json"))
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("output"))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mapsweep")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<MapsweepConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = MapsweepConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load and validate configuration from an explicit path.
pub fn load_from_path(path: &Path) -> Result<MapsweepConfig> {
    let data = fs::read_to_string(path)?;
    let cfg: MapsweepConfig = toml::from_str(&data)?;
    cfg.validate()?;
    Ok(cfg)
}
