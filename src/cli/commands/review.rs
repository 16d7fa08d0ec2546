use super::open_engine;
use crate::cli::output::Output;
use crate::engine::StackEngine;
use crate::errors::Result;
use tracing::warn;

pub async fn push(verbose: bool) -> Result<()> {
    let engine = open_engine(verbose)?;
    let pushed = engine.push_level().await?;

    match pushed {
        Some(pushed) if pushed.is_empty() => Output::info("Nothing new to push"),
        Some(pushed) => {
            Output::success(format!("Pushed {} commit(s)", pushed.len()));
            for commit in pushed.iter().rev() {
                Output::sub_item(&commit.short_message);
            }
        }
        None => Output::warning("Pushed, but the pushed commits could not be determined"),
    }
    Ok(())
}

pub async fn create(verbose: bool, description: Option<&str>, open_in_browser: bool) -> Result<()> {
    let engine = open_engine(verbose)?;
    let Some(pr) = engine.create_pull_request(description).await? else {
        return Ok(());
    };

    Output::success(format!("Pull request #{}: {}", pr.id, pr.title));
    if !pr.url.is_empty() {
        Output::sub_item(&pr.url);
        if open_in_browser {
            if let Err(e) = open::that(&pr.url) {
                warn!("Could not open {}: {}", pr.url, e);
            }
        }
    }
    Ok(())
}

pub async fn abandon(verbose: bool) -> Result<()> {
    let engine = open_engine(verbose)?;
    if let Some(pr) = engine.abandon_pull_request().await? {
        Output::success(format!("Abandoned pull request #{}", pr.id));
    }
    Ok(())
}
