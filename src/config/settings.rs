use crate::errors::{LadderError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable that overrides the configured review token
pub const TOKEN_ENV_VAR: &str = "LADDER_TOKEN";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub git: GitConfig,
    pub review: ReviewConfig,
    pub stack: StackSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Remote that stack branches are pushed to
    pub remote_name: String,
    /// Origin for new stacks, and where purge lands when nothing better is known
    pub default_branch: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Explicit API root; derived from the remote URL when unset
    pub api_url: Option<String>,
    pub token: Option<String>,
    pub api_version: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackSettings {
    /// Generations walked on each side when comparing two branches
    pub ancestry_search_rounds: usize,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            remote_name: "origin".to_string(),
            default_branch: "master".to_string(),
        }
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            token: None,
            api_version: "6.0".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for StackSettings {
    fn default() -> Self {
        Self {
            ancestry_search_rounds: crate::git::ancestry::DEFAULT_SEARCH_ROUNDS,
        }
    }
}

impl ReviewConfig {
    /// Token from the environment, falling back to the config file
    pub fn resolved_token(&self) -> Option<String> {
        std::env::var(TOKEN_ENV_VAR)
            .ok()
            .filter(|token| !token.is_empty())
            .or_else(|| self.token.clone())
    }
}

impl Settings {
    /// Load settings from a file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| LadderError::config(format!("Failed to read config file: {e}")))?;

        let settings: Settings = serde_json::from_str(&content)
            .map_err(|e| LadderError::config(format!("Failed to parse config file: {e}")))?;

        Ok(settings)
    }

    /// Save settings to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| LadderError::config(format!("Failed to serialize config: {e}")))?;

        fs::write(path, content)
            .map_err(|e| LadderError::config(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Update a configuration value by key
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();
        if parts.len() != 2 {
            return Err(LadderError::config(format!(
                "Invalid config key format: {key}"
            )));
        }

        match (parts[0], parts[1]) {
            ("git", "remote_name") => self.git.remote_name = value.to_string(),
            ("git", "default_branch") => self.git.default_branch = value.to_string(),
            ("review", "api_url") => self.review.api_url = optional(value),
            ("review", "token") => self.review.token = optional(value),
            ("review", "api_version") => self.review.api_version = value.to_string(),
            ("review", "timeout_secs") => {
                self.review.timeout_secs = value
                    .parse()
                    .map_err(|_| LadderError::config(format!("Invalid number: {value}")))?;
            }
            ("stack", "ancestry_search_rounds") => {
                self.stack.ancestry_search_rounds = value
                    .parse()
                    .map_err(|_| LadderError::config(format!("Invalid number: {value}")))?;
            }
            _ => return Err(LadderError::config(format!("Unknown config key: {key}"))),
        }

        Ok(())
    }

    /// Get a configuration value by key
    pub fn get_value(&self, key: &str) -> Result<String> {
        let parts: Vec<&str> = key.split('.').collect();
        if parts.len() != 2 {
            return Err(LadderError::config(format!(
                "Invalid config key format: {key}"
            )));
        }

        let value = match (parts[0], parts[1]) {
            ("git", "remote_name") => self.git.remote_name.clone(),
            ("git", "default_branch") => self.git.default_branch.clone(),
            ("review", "api_url") => self.review.api_url.clone().unwrap_or_default(),
            ("review", "token") => self
                .review
                .token
                .as_ref()
                .map(|_| "********".to_string())
                .unwrap_or_default(),
            ("review", "api_version") => self.review.api_version.clone(),
            ("review", "timeout_secs") => self.review.timeout_secs.to_string(),
            ("stack", "ancestry_search_rounds") => self.stack.ancestry_search_rounds.to_string(),
            _ => return Err(LadderError::config(format!("Unknown config key: {key}"))),
        };

        Ok(value)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.git.remote_name.trim().is_empty() {
            return Err(LadderError::config("git.remote_name cannot be empty"));
        }
        if self.git.default_branch.trim().is_empty() {
            return Err(LadderError::config("git.default_branch cannot be empty"));
        }

        if let Some(url) = &self.review.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(LadderError::config(
                    "review.api_url must start with http:// or https://",
                ));
            }
        }
        if self.review.timeout_secs == 0 {
            return Err(LadderError::config("review.timeout_secs must be at least 1"));
        }
        if self.stack.ancestry_search_rounds == 0 {
            return Err(LadderError::config(
                "stack.ancestry_search_rounds must be at least 1",
            ));
        }

        Ok(())
    }
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
