use crate::errors::{LadderError, Result};
use std::fmt;
use std::str::FromStr;

/// A level as the user names it on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelSelector {
    /// The highest level
    Top,
    /// The first level above the origin
    Bottom,
    /// Level 0, which sits directly on the origin branch
    Root,
    Index(i64),
}

impl LevelSelector {
    /// Position in the ordered level list. `Top` resolves past the end and is
    /// clamped by the caller.
    pub fn to_index(self) -> i64 {
        match self {
            LevelSelector::Top => i64::MAX,
            LevelSelector::Bottom => 1,
            LevelSelector::Root => 0,
            LevelSelector::Index(index) => index,
        }
    }
}

impl FromStr for LevelSelector {
    type Err = LadderError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "top" => Ok(LevelSelector::Top),
            "bottom" => Ok(LevelSelector::Bottom),
            "root" => Ok(LevelSelector::Root),
            other => other.parse().map(LevelSelector::Index).map_err(|_| {
                LadderError::domain(format!(
                    "Invalid level '{value}'. Use a number, 'top', 'bottom' or 'root'."
                ))
            }),
        }
    }
}

impl fmt::Display for LevelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelSelector::Top => write!(f, "top"),
            LevelSelector::Bottom => write!(f, "bottom"),
            LevelSelector::Root => write!(f, "root"),
            LevelSelector::Index(index) => write!(f, "{index}"),
        }
    }
}
