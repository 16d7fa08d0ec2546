use crate::cli::output::Output;
use crate::cli::ConfigAction;
use crate::config::{get_repo_config_file, load_repo_settings, save_repo_settings, TOKEN_ENV_VAR};
use crate::errors::{LadderError, Result};
use crate::git::find_repository_root;
use console::style;
use std::env;
use std::path::Path;

const KEYS: &[&str] = &[
    "git.remote_name",
    "git.default_branch",
    "review.api_url",
    "review.token",
    "review.api_version",
    "review.timeout_secs",
    "stack.ancestry_search_rounds",
];

/// Handle configuration commands
pub fn run(action: ConfigAction) -> Result<()> {
    let current_dir = env::current_dir()
        .map_err(|e| LadderError::config(format!("Could not get current directory: {e}")))?;
    let repo_root = find_repository_root(&current_dir)?;

    match action {
        ConfigAction::Set { key, value } => set_config_value(&repo_root, &key, &value),
        ConfigAction::Get { key } => get_config_value(&repo_root, &key),
        ConfigAction::List => list_config_values(&repo_root),
    }
}

fn set_config_value(repo_root: &Path, key: &str, value: &str) -> Result<()> {
    let mut settings = load_repo_settings(repo_root)?;
    settings.set_value(key, value)?;
    save_repo_settings(repo_root, &settings)?;

    let shown = settings.get_value(key)?;
    Output::success(format!("Configuration updated: {key} = {shown}"));

    if key == "review.token" {
        Output::tip(format!(
            "The token is stored in plain text in {}. {} takes precedence when set.",
            get_repo_config_file(repo_root).display(),
            TOKEN_ENV_VAR
        ));
    }
    Ok(())
}

fn get_config_value(repo_root: &Path, key: &str) -> Result<()> {
    let settings = load_repo_settings(repo_root)?;
    println!("{key} = {}", display_value(settings.get_value(key)?));
    Ok(())
}

fn list_config_values(repo_root: &Path) -> Result<()> {
    let settings = load_repo_settings(repo_root)?;

    Output::section("Ladder Configuration");
    for key in KEYS {
        println!(
            "  {} = {}",
            style(key).cyan(),
            display_value(settings.get_value(key)?)
        );
    }
    if env::var(TOKEN_ENV_VAR).is_ok() {
        Output::info(format!("{TOKEN_ENV_VAR} is set and overrides review.token"));
    }
    Ok(())
}

fn display_value(value: String) -> String {
    if value.is_empty() {
        "(not set)".to_string()
    } else {
        value
    }
}
