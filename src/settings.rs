//! Persisted user choices and the first-run marker.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const SETTINGS_FILE: &str = "settings.json";
const FIRST_RUN_MARKER: &str = "first_run_done";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub premiere_path: Option<PathBuf>,
    #[serde(default)]
    pub last_project_folder: Option<PathBuf>,
}

/// Directory holding the settings file and marker.
pub struct SettingsStore {
    dir: PathBuf,
}

impl SettingsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<config dir>/quickpremiere`
    pub fn default_location() -> Result<Self> {
        let base = dirs::config_dir().context("no config directory for this user")?;
        Ok(Self::new(base.join("quickpremiere")))
    }

    fn settings_path(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE)
    }

    /// Missing file means defaults; a file that doesn't parse is an error.
    pub fn load(&self) -> Result<Settings> {
        let path = self.settings_path();
        if !path.exists() {
            return Ok(Settings::default());
        }
        let data =
            std::fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&data).with_context(|| format!("parse {}", path.display()))
    }

    pub fn save(&self, settings: &Settings) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create {}", self.dir.display()))?;
        let path = self.settings_path();
        let data = serde_json::to_string_pretty(settings)?;
        std::fs::write(&path, data).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    pub fn is_first_run(&self) -> bool {
        !self.dir.join(FIRST_RUN_MARKER).exists()
    }

    pub fn mark_returning_user(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create {}", self.dir.display()))?;
        std::fs::write(self.dir.join(FIRST_RUN_MARKER), b"This is not the first time.")
            .context("write first-run marker")
    }
}
