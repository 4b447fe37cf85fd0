use crate::projector::{ProjectionOptions, View};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// User settings read from `config.yml`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub default_view: View,
    pub data_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub recent_days: u32,
    pub recent_per_day: usize,
}

impl Default for Config {
    fn default() -> Self {
        let projection = ProjectionOptions::default();
        Config {
            default_view: View::Day,
            data_dir: None,
            log_level: None,
            recent_days: projection.recent_days,
            recent_per_day: projection.recent_per_day,
        }
    }
}

impl Config {
    /// Reads `path`, or the per-user config file when none is given. A
    /// missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => return Ok(Config::default()),
            },
        };
        if !path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
        Config::parse(&data).with_context(|| format!("parsing config {:?}", path))
    }

    pub fn parse(data: &str) -> Result<Config> {
        if data.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(data)?)
    }

    pub fn projection(&self) -> ProjectionOptions {
        ProjectionOptions {
            recent_days: self.recent_days,
            recent_per_day: self.recent_per_day,
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "epoch").map(|dirs| dirs.config_dir().join("config.yml"))
}
