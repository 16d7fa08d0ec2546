//! Stack management module
//!
//! This module implements the stacked pull request model:
//! - Branch naming that encodes stack and level into plain git branch names
//! - Stack and level data rebuilt from the branch list
//! - Lifecycle operations (create, add level, switch level)
//! - Review synchronization (push, pull requests, status)
//! - Purging a stack

pub mod cleanup;
pub mod events;
pub mod manager;
pub mod naming;
pub mod selector;
pub mod stack;
pub mod sync;
pub mod topology;

pub use cleanup::PurgeResult;
pub use events::{EventSink, Severity, StackEvent};
pub use manager::{DanglingWorkStatus, StackManager};
pub use naming::{StackBranchName, MAX_LEVEL};
pub use selector::LevelSelector;
pub use stack::{Stack, StackLevel, StackSet};
pub use sync::LevelUpdate;
pub use topology::{Discovery, DiscoveryWarning, RepositoryContext};
