// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: state paths, `config.toml`, env overrides.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use ks_core::{JobType, RetentionLimits};
use ks_engine::ConcurrencyLimits;
use serde::Deserialize;
use thiserror::Error;

use crate::env;
use crate::lifecycle::LifecycleError;

/// Cron resolution of the scheduler loop
pub const SCHEDULER_TICK: Duration = Duration::from_secs(1);

pub const DEFAULT_DISPATCH_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_RESYNC_INTERVAL: Duration = Duration::from_secs(60);

/// Safety net for a downstream job that never exits
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(6 * 60 * 60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("no administrative namespace configured (set admin_namespace or KS_ADMIN_NAMESPACE)")]
    MissingAdminNamespace,
    #[error("unknown job type '{0}' in [{1}]")]
    UnknownJobType(String, &'static str),
}

/// On-disk shape of `config.toml`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    admin_namespace: Option<String>,
    dispatch_interval_ms: Option<u64>,
    resync_interval_secs: Option<u64>,
    declarations: Option<PathBuf>,
    /// Max running jobs per job type across repositories
    concurrency: BTreeMap<String, usize>,
    /// Per-job-type timeout in seconds
    timeouts: BTreeMap<String, u64>,
    history: RetentionLimits,
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/keepsake)
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to the optional config file
    pub config_path: PathBuf,
    /// Persisted effective schedules
    pub schedules_path: PathBuf,
    /// Schedule declarations read on every resync
    pub declarations_path: PathBuf,
    pub admin_namespace: String,
    pub dispatch_interval: Duration,
    pub resync_interval: Duration,
    pub concurrency: ConcurrencyLimits,
    pub timeouts: HashMap<JobType, Duration>,
    /// Operator-wide history limits, used where a declaration sets none
    pub history: RetentionLimits,
}

impl Config {
    /// Load configuration for the user-level daemon.
    pub fn load() -> Result<Self, LifecycleError> {
        Ok(Self::load_from(env::state_dir()?)?)
    }

    /// Load from an explicit state directory, then apply env overrides.
    pub fn load_from(state_dir: PathBuf) -> Result<Self, ConfigError> {
        let config_path = state_dir.join("config.toml");
        let file = read_file_config(&config_path)?;

        let admin_namespace = env::admin_namespace()
            .or_else(|| {
                file.admin_namespace
                    .map(|ns| ns.trim().to_string())
                    .filter(|ns| !ns.is_empty())
            })
            .ok_or(ConfigError::MissingAdminNamespace)?;

        let dispatch_interval = env::tick_ms()
            .or_else(|| {
                file.dispatch_interval_ms
                    .filter(|ms| *ms > 0)
                    .map(Duration::from_millis)
            })
            .unwrap_or(DEFAULT_DISPATCH_INTERVAL);

        let resync_interval = env::resync_secs()
            .or_else(|| {
                file.resync_interval_secs
                    .filter(|secs| *secs > 0)
                    .map(Duration::from_secs)
            })
            .unwrap_or(DEFAULT_RESYNC_INTERVAL);

        let declarations_path = env::declarations_path()
            .or(file.declarations)
            .map(|path| {
                if path.is_relative() {
                    state_dir.join(path)
                } else {
                    path
                }
            })
            .unwrap_or_else(|| state_dir.join("schedules.toml"));

        let concurrency = file
            .concurrency
            .into_iter()
            .map(|(name, limit)| Ok((job_type(&name, "concurrency")?, limit)))
            .collect::<Result<ConcurrencyLimits, ConfigError>>()?;

        let timeouts = file
            .timeouts
            .into_iter()
            .map(|(name, secs)| Ok((job_type(&name, "timeouts")?, Duration::from_secs(secs))))
            .collect::<Result<HashMap<_, _>, ConfigError>>()?;

        Ok(Self {
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
            schedules_path: state_dir.join("effective-schedules.json"),
            config_path,
            declarations_path,
            admin_namespace,
            dispatch_interval,
            resync_interval,
            concurrency,
            timeouts,
            history: file.history,
            state_dir,
        })
    }

    /// Timeout for one job of `job_type`.
    pub fn job_timeout(&self, job_type: JobType) -> Duration {
        self.timeouts
            .get(&job_type)
            .copied()
            .unwrap_or(DEFAULT_JOB_TIMEOUT)
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(FileConfig::default()),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_owned(),
                source,
            })
        }
    };
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_owned(),
        source,
    })
}

fn job_type(name: &str, section: &'static str) -> Result<JobType, ConfigError> {
    name.parse()
        .map_err(|_| ConfigError::UnknownJobType(name.to_string(), section))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
