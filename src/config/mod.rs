pub mod settings;
pub mod store;
pub mod watch;

pub use settings::{Credentials, Settings};
pub use store::{read_store, write_store, ConfigStore, SharedStore};
pub use watch::RulesWatcher;

use crate::error::AppError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Locations of the files the daemon and the rules CLI share.
#[derive(Debug, Clone)]
pub struct Paths {
    config_dir: PathBuf,
}

impl Paths {
    /// Per-user config directory, e.g. `~/.config/autoswitch` on Linux.
    pub fn discover() -> Result<Self, AppError> {
        let proj_dirs = ProjectDirs::from("com", "autoswitch", "Autoswitch")
            .ok_or_else(|| AppError::Config("could not determine project directories".into()))?;
        Ok(Self::at(proj_dirs.config_dir()))
    }

    pub fn at(dir: &Path) -> Self {
        Self {
            config_dir: dir.to_path_buf(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn rules_file(&self) -> PathBuf {
        self.config_dir.join("rules.json")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }

    pub fn credentials_file(&self) -> PathBuf {
        self.config_dir.join("credentials.json")
    }
}
