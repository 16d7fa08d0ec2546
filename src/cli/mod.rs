pub mod commands;
pub mod output;

use crate::errors::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ladder")]
#[command(about = "Ladder - stacked pull requests on plain git branches")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a new stack, or add a level to an existing one
    New {
        /// Stack name (defaults to growing the current stack)
        name: Option<String>,
        /// Branch the stack starts from (defaults to git.default_branch)
        #[arg(long, short)]
        origin: Option<String>,
    },

    /// Add a level on top of the current stack
    Next,

    /// Check out a level
    Go {
        /// Level position, or top, bottom or root
        level: String,
        /// Stack to switch to (defaults to the current stack)
        #[arg(long, short)]
        stack: Option<String>,
    },

    /// List all stacks
    List,

    /// Show commits and pull requests of a stack
    Status {
        /// Stack name (defaults to the current stack)
        name: Option<String>,
        /// Only this level (position, or top, bottom or root)
        level: Option<String>,
    },

    /// Push the current level
    Push,

    /// Create a pull request for the current level
    Pr {
        /// Commit uncommitted work with this message before creating the pull request
        description: Option<String>,
        /// Open the pull request in the browser
        #[arg(long)]
        open: bool,
    },

    /// Abandon the pull request of the current level
    Abandon,

    /// Delete a stack's branches and abandon its pull requests
    Purge {
        /// Stack name
        name: String,
        /// Also delete the branches on the remote
        #[arg(long)]
        remote: bool,
        /// Skip confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },

    /// Pull and push levels of the current stack
    Update {
        /// First level number (defaults to 1)
        start: Option<u32>,
        /// Last level number (defaults to the current level)
        stop: Option<u32>,
    },

    /// List the branches of a stack
    Branches {
        /// Stack name
        name: String,
        /// Include remote-tracking branches
        #[arg(long)]
        remote: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., git.default_branch)
        key: String,
        /// Configuration value
        value: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// List all configuration values
    List,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        self.setup_logging();
        let verbose = self.verbose;

        match self.command {
            Commands::Config { action } => commands::config::run(action),
            Commands::New { name, origin } => {
                commands::stack::new(verbose, name.as_deref(), origin.as_deref()).await
            }
            Commands::Next => commands::stack::next(verbose).await,
            Commands::Go { level, stack } => {
                commands::stack::go(verbose, &level, stack.as_deref()).await
            }
            Commands::List => commands::stack::list(verbose).await,
            Commands::Status { name, level } => {
                commands::stack::status(verbose, name.as_deref(), level.as_deref()).await
            }
            Commands::Update { start, stop } => {
                commands::stack::update(verbose, start, stop).await
            }
            Commands::Branches { name, remote } => {
                commands::stack::branches(verbose, &name, remote).await
            }
            Commands::Purge { name, remote, yes } => {
                commands::stack::purge(verbose, &name, remote, yes).await
            }
            Commands::Push => commands::review::push(verbose).await,
            Commands::Pr { description, open } => {
                commands::review::create(verbose, description.as_deref(), open).await
            }
            Commands::Abandon => commands::review::abandon(verbose).await,
        }
    }

    fn setup_logging(&self) {
        // Progress is printed through the event sink; the log carries
        // warnings and errors unless verbose
        let level = if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        };

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .without_time();

        if self.no_color {
            console::set_colors_enabled(false);
            subscriber.with_ansi(false).init();
        } else {
            subscriber.init();
        }
    }
}
