use crate::review::PullRequest;
use crate::stack::{Stack, StackLevel};
use console::style;
use std::fmt::Display;

/// Centralized output formatting utilities for consistent CLI presentation
pub struct Output;

impl Output {
    /// Print a success message with checkmark
    pub fn success<T: Display>(message: T) {
        println!("{} {}", style("✓").green(), message);
    }

    /// Print an error message with X mark
    pub fn error<T: Display>(message: T) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning<T: Display>(message: T) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info<T: Display>(message: T) {
        println!("{} {}", style("ℹ").cyan(), message);
    }

    /// Print a sub-item with arrow prefix
    pub fn sub_item<T: Display>(message: T) {
        println!("  {} {}", style("→").dim(), message);
    }

    pub fn bullet<T: Display>(message: T) {
        println!("  {} {}", style("•").dim(), message);
    }

    /// Print a section header
    pub fn section<T: Display>(title: T) {
        println!("\n{}", style(title).bold().underlined());
    }

    pub fn tip<T: Display>(message: T) {
        println!("{} {}", style("TIP:").cyan(), style(message).dim());
    }

    /// One line per level: marker, branch, tracking branch
    pub fn level_line(level: &StackLevel) {
        let marker = if level.is_current {
            style("*").green().bold()
        } else {
            style(" ").dim()
        };
        let branch = if level.is_current {
            style(level.local_branch.as_str()).green()
        } else {
            style(level.local_branch.as_str()).cyan()
        };
        println!(
            "  {} {} {}",
            marker,
            branch,
            style(format!("(tracks {})", level.tracking_branch)).dim()
        );
    }

    /// A level with its filled-in commit and pull request details
    pub fn level_details(level: &StackLevel) {
        Self::level_line(level);
        if let Some(summary) = &level.recent_commit_summary {
            Self::sub_item(format!("Latest: {summary}"));
        }

        let count = |commits: &Option<Vec<_>>| match commits {
            Some(commits) => commits.len().to_string(),
            None => "?".to_string(),
        };
        Self::sub_item(format!(
            "Commits: {} total, {} unpushed, {} to pull",
            count(&level.all_commits),
            count(&level.unpushed_commits),
            count(&level.unpulled_commits)
        ));

        match &level.pull_request {
            Some(pr) => Self::pull_request(pr),
            None => Self::sub_item(style("No pull request").dim()),
        }
    }

    pub fn pull_request(pr: &PullRequest) {
        Self::sub_item(format!(
            "PR #{} {} [{:?}]",
            style(pr.id).yellow(),
            pr.title,
            pr.status
        ));
        if !pr.url.is_empty() {
            Self::sub_item(style(pr.url.as_str()).dim());
        }
    }

    pub fn stack_header(stack: &Stack) {
        let name = if stack.is_current() {
            style(stack.name.as_str()).green().bold()
        } else {
            style(stack.name.as_str()).bold()
        };
        println!("{} {}", name, style(format!("({} levels)", stack.len())).dim());
    }

    /// Print next steps guidance
    pub fn next_steps(steps: &[&str]) {
        println!();
        Self::tip("Next steps:");
        for step in steps {
            Self::bullet(step);
        }
    }
}
