//! Progress events emitted by stack operations.
//!
//! Every operation reports what it does as a stream of [`StackEvent`]s. They
//! are always logged through `tracing`; an [`EventSink`] can additionally
//! receive them, which is how the CLI prints progress.

use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Detail,
    Information,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackEvent {
    BranchCreated { branch: String, tracking: String },
    BranchCheckedOut { branch: String },
    BranchPushed { branch: String },
    BranchPulled { branch: String },
    LevelCreated { stack: String, level: u32 },
    CommitCreated { branch: String, message: String },
    PullRequestCreated { id: i64, url: String },
    PullRequestAmended { id: i64 },
    PullRequestAbandoned { id: i64 },
    BranchDeleted { branch: String },
    Message { severity: Severity, text: String },
}

/// Callback receiving events as they happen
pub type EventSink = Arc<dyn Fn(&StackEvent) + Send + Sync>;

impl StackEvent {
    pub fn detail(text: impl Into<String>) -> Self {
        StackEvent::Message {
            severity: Severity::Detail,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        StackEvent::Message {
            severity: Severity::Information,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        StackEvent::Message {
            severity: Severity::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        StackEvent::Message {
            severity: Severity::Error,
            text: text.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            StackEvent::BranchCheckedOut { .. }
            | StackEvent::BranchPulled { .. }
            | StackEvent::CommitCreated { .. } => Severity::Detail,
            StackEvent::BranchCreated { .. }
            | StackEvent::BranchPushed { .. }
            | StackEvent::LevelCreated { .. }
            | StackEvent::PullRequestCreated { .. }
            | StackEvent::PullRequestAmended { .. }
            | StackEvent::PullRequestAbandoned { .. }
            | StackEvent::BranchDeleted { .. } => Severity::Information,
            StackEvent::Message { severity, .. } => *severity,
        }
    }

    /// Write the event to the log at a level matching its severity
    pub fn log(&self) {
        match self.severity() {
            Severity::Detail => tracing::debug!("{}", self),
            Severity::Information => tracing::info!("{}", self),
            Severity::Warning => tracing::warn!("{}", self),
            Severity::Error => tracing::error!("{}", self),
        }
    }
}

impl fmt::Display for StackEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackEvent::BranchCreated { branch, tracking } => {
                write!(f, "Created branch {branch} tracking {tracking}")
            }
            StackEvent::BranchCheckedOut { branch } => write!(f, "Checked out {branch}"),
            StackEvent::BranchPushed { branch } => write!(f, "Pushed {branch}"),
            StackEvent::BranchPulled { branch } => write!(f, "Pulled {branch}"),
            StackEvent::LevelCreated { stack, level } => {
                write!(f, "Created level {level} of stack {stack}")
            }
            StackEvent::CommitCreated { branch, message } => {
                write!(f, "Committed \"{message}\" on {branch}")
            }
            StackEvent::PullRequestCreated { id, url } => {
                write!(f, "Created pull request {id}: {url}")
            }
            StackEvent::PullRequestAmended { id } => write!(f, "Updated pull request {id}"),
            StackEvent::PullRequestAbandoned { id } => write!(f, "Abandoned pull request {id}"),
            StackEvent::BranchDeleted { branch } => write!(f, "Deleted {branch}"),
            StackEvent::Message { text, .. } => write!(f, "{text}"),
        }
    }
}
