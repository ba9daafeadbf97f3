use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Time between wallpaper changes.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Root directory scanned for wallpapers.
    pub wallpaper_root: PathBuf,
    /// Durable cursor + permutation record.
    pub state_file: PathBuf,
    /// Append-only log of fatal errors.
    pub error_log: PathBuf,
    /// Consecutive missing-file reconciliations tolerated before giving up.
    pub failsafe_limit: u32,
    /// Optional deterministic seed for shuffling and insertion slots.
    pub shuffle_seed: Option<u64>,
    /// Reshuffle the whole order after every completed pass.
    pub reshuffle_each_pass: bool,
    pub presenter: PresenterConfig,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        serde_yaml::from_str(&s)
            .with_context(|| format!("failed to parse config at {}", path.display()))
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(!self.interval.is_zero(), "interval must be greater than zero");
        ensure!(
            self.failsafe_limit > 0,
            "failsafe-limit must be greater than zero"
        );
        self.presenter.validate()?;
        Ok(self)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            wallpaper_root: PathBuf::from("."),
            state_file: PathBuf::from("status"),
            error_log: PathBuf::from("error.log"),
            failsafe_limit: 5,
            shuffle_seed: None,
            reshuffle_each_pass: false,
            presenter: PresenterConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PresenterConfig {
    /// Program and arguments; `{path}` and `{fill}` are substituted.
    pub command: Vec<String>,
}

impl PresenterConfig {
    fn validate(&self) -> Result<()> {
        ensure!(
            !self.command.is_empty(),
            "presenter.command must not be empty"
        );
        ensure!(
            self.command.iter().skip(1).any(|arg| arg.contains("{path}")),
            "presenter.command must pass {{path}} to the program"
        );
        Ok(())
    }
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            command: ["feh", "--no-fehbg", "--bg-scale", "{path}"]
                .map(String::from)
                .to_vec(),
        }
    }
}
