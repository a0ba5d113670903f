use anyhow::{bail, Context, Result};
use finsort_import::CsvImportProfile;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "finsort.toml";
const CATEGORY_FILE: &str = "categories.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where categories and learned keywords live.
    pub categories_path: Option<PathBuf>,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
    pub csv: CsvImportProfile,
}

impl Config {
    pub fn categories_path(&self) -> Result<PathBuf> {
        match &self.categories_path {
            Some(p) => Ok(p.clone()),
            None => Ok(project_dirs()?.data_dir().join(CATEGORY_FILE)),
        }
    }
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "finsort", "Finsort")
        .context("could not determine a home directory")
}

/// Loads `explicit` if given (it must exist), otherwise the platform config
/// file when present, otherwise defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(p) => {
            if !p.exists() {
                bail!("config file not found: {}", p.display());
            }
            p.to_path_buf()
        }
        None => match project_dirs() {
            Ok(dirs) => dirs.config_dir().join(CONFIG_FILE),
            Err(_) => return Ok(Config::default()),
        },
    };
    if !path.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    parse_config(&s).with_context(|| format!("parse {}", path.display()))
}

pub fn parse_config(s: &str) -> Result<Config> {
    Ok(toml::from_str(s)?)
}
