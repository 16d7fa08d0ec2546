pub mod settings;

pub use settings::{GitConfig, ReviewConfig, Settings, StackSettings, TOKEN_ENV_VAR};

use crate::errors::{LadderError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Per-repository directory holding ladder's files
pub const CONFIG_DIR_NAME: &str = ".ladder";

/// Get the Ladder configuration directory for a specific repository
pub fn get_repo_config_dir(repo_path: &Path) -> PathBuf {
    repo_path.join(CONFIG_DIR_NAME)
}

pub fn get_repo_config_file(repo_path: &Path) -> PathBuf {
    get_repo_config_dir(repo_path).join("config.json")
}

/// Ensure the configuration directory exists
pub fn ensure_config_dir(config_dir: &Path) -> Result<()> {
    if !config_dir.exists() {
        fs::create_dir_all(config_dir).map_err(|e| {
            LadderError::config(format!("Failed to create config directory: {e}"))
        })?;
    }
    Ok(())
}

/// Load the settings for a repository, falling back to defaults
pub fn load_repo_settings(repo_path: &Path) -> Result<Settings> {
    let settings = Settings::load_from_file(&get_repo_config_file(repo_path))?;
    settings.validate()?;
    Ok(settings)
}

pub fn save_repo_settings(repo_path: &Path, settings: &Settings) -> Result<()> {
    settings.validate()?;
    ensure_config_dir(&get_repo_config_dir(repo_path))?;
    settings.save_to_file(&get_repo_config_file(repo_path))?;
    tracing::info!("Saved settings for {}", repo_path.display());
    Ok(())
}
