//! User configuration.
//!
//! Settings live in `config.toml` under the platform config directory
//! (`~/.config/issue-templates/config.toml` on Linux). A missing file means
//! defaults. Command-line flags override these values per invocation.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::render::{BooleanLabels, RenderOptions};

const APP_DIR: &str = "issue-templates";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Template store location; defaults to the platform data directory.
    pub store: Option<PathBuf>,
    #[serde(default)]
    pub render: RenderSettings,
}

/// Defaults for render calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RenderSettings {
    pub textile: bool,
    pub value_only: bool,
    pub yes_label: String,
    pub no_label: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        let labels = BooleanLabels::default();
        Self {
            textile: true,
            value_only: false,
            yes_label: labels.yes,
            no_label: labels.no,
        }
    }
}

impl Config {
    /// `<config dir>/issue-templates/config.toml`, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
    }

    /// Load from `path`, or from the default location when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(p) => p,
            None => return Ok(Self::default()),
        };
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        debug!("Loading config from {}", path.display());
        let content = fs::read_to_string(&path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        info!("Wrote config to {}", path.display());
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Where templates are stored.
    pub fn store_path(&self) -> PathBuf {
        if let Some(store) = &self.store {
            return store.clone();
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("templates.json")
    }

    /// Render options from configured defaults.
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            textile: self.render.textile,
            value_only: self.render.value_only,
            labels: BooleanLabels {
                yes: self.render.yes_label.clone(),
                no: self.render.no_label.clone(),
            },
        }
    }
}
