//! Branch naming codec
//!
//! A stack level lives in a branch named `<stack>/ssNNN`, where `NNN` is the
//! zero-padded level number. Nothing else is persisted: the branch name alone
//! carries the stack membership.

use regex::Regex;
use std::sync::LazyLock;

/// Highest level number that fits the three-digit suffix
pub const MAX_LEVEL: u32 = 999;

static STACK_BRANCH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<stack>.+)/ss(?P<level>\d{3})$").expect("valid stack branch pattern")
});

/// A branch name decoded into its stack coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackBranchName {
    pub stack_name: String,
    pub level: u32,
}

/// Build the branch name for `level` of `stack_name`.
pub fn encode(stack_name: &str, level: u32) -> String {
    format!("{stack_name}/ss{level:03}")
}

/// Parse a branch name; `None` when the branch is not part of any stack.
pub fn decode(branch_name: &str) -> Option<StackBranchName> {
    let captures = STACK_BRANCH_PATTERN.captures(branch_name)?;
    let level = captures.name("level")?.as_str().parse().ok()?;
    Some(StackBranchName {
        stack_name: captures.name("stack")?.as_str().to_string(),
        level,
    })
}

/// Level number of `branch_name` if it belongs to `stack_name` (case-insensitive).
pub fn level_in_stack(branch_name: &str, stack_name: &str) -> Option<u32> {
    decode(branch_name)
        .filter(|decoded| decoded.stack_name.eq_ignore_ascii_case(stack_name))
        .map(|decoded| decoded.level)
}

/// Whether `name` can be used as a stack name.
pub fn is_valid_stack_name(name: &str) -> bool {
    !name.trim().is_empty()
        && name.trim() == name
        && decode(name).is_none()
        && git2::Reference::is_valid_name(&format!("refs/heads/{}", encode(name, 0)))
}
