/// Ladder Error Types
#[derive(Debug, thiserror::Error)]
pub enum LadderError {
    /// A stack rule was violated (dirty tree, unknown stack, bad override, ...).
    /// The message is shown to the user as-is.
    #[error("{0}")]
    DomainRule(String),

    /// A git operation against a named branch failed
    #[error("Git {operation} failed for '{branch}': {source}")]
    GitOperation {
        operation: String,
        branch: String,
        #[source]
        source: git2::Error,
    },

    /// Git errors without branch context
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// The code review service rejected a call or answered with garbage
    #[error("Review service error{}: {message}", status_suffix(.status))]
    RemoteService {
        status: Option<u16>,
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// Coarse classification of [`LadderError`] so callers can branch on the
/// kind of failure without matching on messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DomainRule,
    GitOperation,
    RemoteService,
    Other,
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|code| format!(" ({code})")).unwrap_or_default()
}

impl LadderError {
    pub fn domain<S: Into<String>>(msg: S) -> Self {
        LadderError::DomainRule(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        LadderError::Config(msg.into())
    }

    pub fn git_op<O: Into<String>, B: Into<String>>(
        operation: O,
        branch: B,
        source: git2::Error,
    ) -> Self {
        LadderError::GitOperation {
            operation: operation.into(),
            branch: branch.into(),
            source,
        }
    }

    pub fn remote_service<S: Into<String>>(status: Option<u16>, msg: S) -> Self {
        LadderError::RemoteService {
            status,
            message: msg.into(),
        }
    }

    pub fn uncommitted_changes() -> Self {
        LadderError::domain(
            "There are uncommitted edits. Please resolve or stash these before attempting this operation.",
        )
    }

    pub fn not_on_stack() -> Self {
        LadderError::domain(
            "You are not in a stacked branch. Use 'ladder list' to see available stacks.",
        )
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LadderError::DomainRule(_) => ErrorKind::DomainRule,
            LadderError::GitOperation { .. } | LadderError::Git(_) => ErrorKind::GitOperation,
            LadderError::RemoteService { .. } | LadderError::Http(_) => ErrorKind::RemoteService,
            _ => ErrorKind::Other,
        }
    }

    pub fn is_domain_rule(&self) -> bool {
        self.kind() == ErrorKind::DomainRule
    }
}

pub type Result<T> = std::result::Result<T, LadderError>;
