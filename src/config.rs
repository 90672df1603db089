use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::sequencer::Timing;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Seconds the fixation cross stays up before the stimulus.
    pub fixation_secs: f64,
    /// Response deadline in seconds, measured from stimulus onset.
    pub stroop_secs: f64,
    /// Blank seconds after a trial has been recorded.
    pub iti_secs: f64,
    /// Input poll granularity of the response window.
    pub poll_ms: u64,
    pub trials_path: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fixation_secs: 0.7,
            stroop_secs: 2.5,
            iti_secs: 0.5,
            poll_ms: 10,
            trials_path: PathBuf::from("trials.csv"),
            output_dir: PathBuf::from("."),
        }
    }
}

/// Longest accepted phase duration, in seconds.
pub const MAX_PHASE_SECS: f64 = 3600.0;

fn secs(field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    if !(0.0..=MAX_PHASE_SECS).contains(&value) {
        return Err(ConfigError::InvalidDuration { field, value });
    }
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::InvalidDuration { field, value })
}

impl Config {
    pub fn timing(&self) -> Result<Timing, ConfigError> {
        let response_deadline = secs("stroop_secs", self.stroop_secs)?;
        if response_deadline.is_zero() {
            return Err(ConfigError::InvalidDuration {
                field: "stroop_secs",
                value: self.stroop_secs,
            });
        }
        if self.poll_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.poll_ms as f64 > MAX_PHASE_SECS * 1000.0 {
            return Err(ConfigError::InvalidDuration {
                field: "poll_ms",
                value: self.poll_ms as f64,
            });
        }
        Ok(Timing {
            fixation: secs("fixation_secs", self.fixation_secs)?,
            response_deadline,
            iti: secs("iti_secs", self.iti_secs)?,
            poll: Duration::from_millis(self.poll_ms),
        })
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "stroop") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("stroop_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(cfg) = serde_json::from_slice::<Config>(&bytes) {
                return cfg;
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
