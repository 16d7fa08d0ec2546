//! Bounded bidirectional ancestry search
//!
//! Given a parent tip and a child tip, walk both histories one generation per
//! round until one side reaches a commit the other side has already seen. The
//! visited commits on each side, minus the shared history, are the commits
//! unique to that side. The walk gives up after a fixed number of rounds so a
//! badly diverged pair of branches cannot turn a status query into a full
//! history scan.

use crate::errors::Result;
use serde::Serialize;
use std::collections::HashSet;

/// Default number of generations explored on each side
pub const DEFAULT_SEARCH_ROUNDS: usize = 50;

/// A commit as seen by the ancestry walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitNode {
    pub id: String,
    pub short_message: String,
    pub parents: Vec<String>,
}

/// The parts of a commit shown to users
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub id: String,
    pub short_message: String,
}

impl From<&CommitNode> for CommitSummary {
    fn from(node: &CommitNode) -> Self {
        Self {
            id: node.id.clone(),
            short_message: node.short_message.clone(),
        }
    }
}

/// Read access to commits by id
pub trait CommitGraph {
    fn commit(&self, id: &str) -> Result<CommitNode>;
}

/// Outcome of comparing two tips
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAncestryResult {
    pub parent_tip: String,
    pub child_tip: String,
    /// `None` when no shared commit was found within the round budget
    pub common_ancestor: Option<CommitSummary>,
    /// Commits reachable from the parent tip but not the child tip, nearest first
    pub commits_only_in_parent: Option<Vec<CommitSummary>>,
    /// Commits reachable from the child tip but not the parent tip, nearest first
    pub commits_only_in_child: Option<Vec<CommitSummary>>,
}

/// Commits seen by one side of the walk, kept in discovery order
#[derive(Default)]
struct Visited {
    order: Vec<CommitSummary>,
    ids: HashSet<String>,
}

impl Visited {
    fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    fn insert(&mut self, node: &CommitNode) -> bool {
        if self.ids.insert(node.id.clone()) {
            self.order.push(CommitSummary::from(node));
            true
        } else {
            false
        }
    }

    fn into_unique(self, shared: &HashSet<String>) -> Vec<CommitSummary> {
        self.order
            .into_iter()
            .filter(|commit| !shared.contains(&commit.id))
            .collect()
    }
}

pub struct AncestryAnalyzer<'a, G: CommitGraph + ?Sized> {
    graph: &'a G,
    max_rounds: usize,
}

impl<'a, G: CommitGraph + ?Sized> AncestryAnalyzer<'a, G> {
    pub fn new(graph: &'a G) -> Self {
        Self::with_max_rounds(graph, DEFAULT_SEARCH_ROUNDS)
    }

    pub fn with_max_rounds(graph: &'a G, max_rounds: usize) -> Self {
        Self {
            graph,
            max_rounds: max_rounds.max(1),
        }
    }

    /// Compare `parent_tip` with `child_tip`.
    pub fn analyze(&self, parent_tip: &str, child_tip: &str) -> Result<CommitAncestryResult> {
        let mut parent_visited = Visited::default();
        let mut child_visited = Visited::default();
        let mut parent_frontier = vec![parent_tip.to_string()];
        let mut child_frontier = vec![child_tip.to_string()];

        let mut ancestor = None;
        for round in 0..self.max_rounds {
            if parent_frontier.is_empty() && child_frontier.is_empty() {
                break;
            }

            ancestor = self.step(&mut child_frontier, &mut child_visited, &parent_visited)?;
            if ancestor.is_none() {
                ancestor = self.step(&mut parent_frontier, &mut parent_visited, &child_visited)?;
            }

            if let Some(found) = &ancestor {
                tracing::debug!(
                    "Found common ancestor {} of {} and {} after {} rounds",
                    found.id,
                    parent_tip,
                    child_tip,
                    round + 1
                );
                break;
            }
        }

        let Some(ancestor) = ancestor else {
            tracing::debug!(
                "No common ancestor of {} and {} within {} rounds",
                parent_tip,
                child_tip,
                self.max_rounds
            );
            return Ok(CommitAncestryResult {
                parent_tip: parent_tip.to_string(),
                child_tip: child_tip.to_string(),
                common_ancestor: None,
                commits_only_in_parent: None,
                commits_only_in_child: None,
            });
        };

        let shared = self.shared_history(&ancestor.id, &parent_visited, &child_visited)?;
        Ok(CommitAncestryResult {
            parent_tip: parent_tip.to_string(),
            child_tip: child_tip.to_string(),
            common_ancestor: Some(ancestor),
            commits_only_in_parent: Some(parent_visited.into_unique(&shared)),
            commits_only_in_child: Some(child_visited.into_unique(&shared)),
        })
    }

    /// Advance one side by a generation. Returns the first frontier commit the
    /// other side has already visited.
    fn step(
        &self,
        frontier: &mut Vec<String>,
        visited: &mut Visited,
        other: &Visited,
    ) -> Result<Option<CommitSummary>> {
        let mut next = Vec::new();
        for id in frontier.drain(..) {
            let node = self.graph.commit(&id)?;
            if other.contains(&node.id) {
                return Ok(Some(CommitSummary::from(&node)));
            }
            if visited.insert(&node) {
                next.extend(node.parents.iter().cloned());
            }
        }
        *frontier = next;
        Ok(None)
    }

    /// The ancestor plus every visited commit that sits below it. Bounded by
    /// the same round budget as the main walk.
    fn shared_history(
        &self,
        ancestor: &str,
        parent_visited: &Visited,
        child_visited: &Visited,
    ) -> Result<HashSet<String>> {
        let mut shared = HashSet::new();
        shared.insert(ancestor.to_string());

        let mut frontier = vec![ancestor.to_string()];
        let mut seen: HashSet<String> = HashSet::new();
        for _ in 0..self.max_rounds {
            if frontier.is_empty() {
                break;
            }
            let mut next = Vec::new();
            for id in frontier.drain(..) {
                if !seen.insert(id.clone()) {
                    continue;
                }
                let node = self.graph.commit(&id)?;
                for parent in node.parents {
                    if parent_visited.contains(&parent) || child_visited.contains(&parent) {
                        shared.insert(parent.clone());
                    }
                    next.push(parent);
                }
            }
            frontier = next;
        }
        Ok(shared)
    }
}
