use super::open_engine;
use crate::cli::output::Output;
use crate::engine::StackEngine;
use crate::errors::{LadderError, Result};
use crate::stack::{DanglingWorkStatus, LevelSelector, StackLevel};
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

fn print_new_level(level: &StackLevel) {
    Output::success(format!(
        "Now on level {} of '{}'",
        level.number, level.stack_name
    ));
    Output::sub_item(format!("Branch: {}", style(&level.local_branch).cyan()));
    Output::sub_item(format!("Tracks: {}", style(&level.tracking_branch).dim()));
}

pub async fn new(verbose: bool, name: Option<&str>, origin: Option<&str>) -> Result<()> {
    let engine = open_engine(verbose)?;
    let level = engine.create_stack(name, origin).await?;
    print_new_level(&level);

    if level.number == 1 {
        Output::next_steps(&[
            "Commit your first change on this level",
            "ladder pr to open a pull request for it",
            "ladder next to start the next level",
        ]);
    }
    Ok(())
}

pub async fn next(verbose: bool) -> Result<()> {
    let engine = open_engine(verbose)?;
    let level = engine.create_stack(None, None).await?;
    print_new_level(&level);
    Ok(())
}

pub async fn go(verbose: bool, level: &str, stack: Option<&str>) -> Result<()> {
    let selector: LevelSelector = level.parse()?;
    let engine = open_engine(verbose)?;
    let level = engine.go_to_level(stack, selector).await?;
    Output::success(format!(
        "On level {} of '{}' ({})",
        level.number, level.stack_name, level.local_branch
    ));
    Ok(())
}

pub async fn list(verbose: bool) -> Result<()> {
    let engine = open_engine(verbose)?;
    let stacks = engine.stacks().await?;

    if stacks.is_empty() {
        Output::info("No stacks found");
        Output::tip("Start one with: ladder new <name>");
        return Ok(());
    }

    for stack in &stacks {
        Output::stack_header(stack);
        for level in stack.levels.values() {
            Output::level_line(level);
        }
        let gaps = stack.level_gaps();
        if !gaps.is_empty() {
            Output::warning(format!("Missing levels: {gaps:?}"));
        }
    }
    Ok(())
}

pub async fn status(verbose: bool, name: Option<&str>, level: Option<&str>) -> Result<()> {
    let selector = level.map(str::parse::<LevelSelector>).transpose()?;
    let engine = open_engine(verbose)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .map_err(|e| LadderError::config(format!("Progress bar template error: {e}")))?,
    );
    spinner.set_message("Collecting commits and pull requests");
    spinner.enable_steady_tick(Duration::from_millis(100));
    let result = engine.stack_status(name, selector).await;
    spinner.finish_and_clear();
    let stack = result?;

    Output::stack_header(&stack);
    for level in stack.levels.values().filter(|level| level.has_details()) {
        Output::level_details(level);
    }

    match engine.dangling_work_status().await? {
        DanglingWorkStatus::UncommittedChanges => {
            Output::warning("There are uncommitted changes")
        }
        DanglingWorkStatus::UnpushedCommits => {
            Output::info("The current level has unpushed commits")
        }
        DanglingWorkStatus::Clean => {}
    }
    Ok(())
}

pub async fn update(verbose: bool, start: Option<u32>, stop: Option<u32>) -> Result<()> {
    let engine = open_engine(verbose)?;
    let updates = engine.update_stack(start, stop).await?;

    if updates.is_empty() {
        Output::info("No levels in range");
        return Ok(());
    }
    for update in &updates {
        match update.pushed_commits {
            Some(0) => Output::bullet(format!("{}: up to date", update.branch)),
            Some(count) => {
                Output::bullet(format!("{}: pushed {} commit(s)", update.branch, count))
            }
            None => Output::bullet(format!("{}: pushed", update.branch)),
        }
    }
    Output::success(format!("Updated {} level(s)", updates.len()));
    Ok(())
}

pub async fn branches(verbose: bool, name: &str, include_remote: bool) -> Result<()> {
    let engine = open_engine(verbose)?;
    for branch in engine.branch_names(name, include_remote).await? {
        println!("{branch}");
    }
    Ok(())
}

pub async fn purge(verbose: bool, name: &str, include_remote: bool, yes: bool) -> Result<()> {
    let engine = open_engine(verbose)?;
    let branches = engine.branch_names(name, include_remote).await?;

    if branches.is_empty() {
        Output::info(format!("No branches found for stack '{name}'"));
        return Ok(());
    }

    if !yes {
        Output::section(format!("Purging stack '{name}'"));
        for branch in &branches {
            Output::bullet(branch);
        }
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Delete these branches and abandon their pull requests?")
            .default(false)
            .interact()
            .map_err(|e| LadderError::config(format!("Input error: {e}")))?;
        if !confirmed {
            Output::info("Purge cancelled");
            return Ok(());
        }
    }

    let result = engine.purge_stack(name, include_remote).await?;
    if result.is_complete() {
        Output::success(format!(
            "Purged '{}': {} branch(es) deleted, {} pull request(s) abandoned",
            name,
            result.deleted_branches.len(),
            result.abandoned_pull_requests.len()
        ));
    } else {
        Output::warning(format!("Purge of '{name}' was incomplete"));
        for (item, error) in &result.failed {
            Output::sub_item(format!("{item}: {error}"));
        }
    }
    Ok(())
}
