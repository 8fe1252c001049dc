//! Replay of trajectories into materialized file sets.

use super::{FileChange, Solution};
use crate::actor::ActorOutput;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Two concurrent branches touched the same path; the later branch won.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationConflict {
    pub path: String,
    /// Branch whose change was overwritten
    pub overwritten: String,
    /// Branch whose change was kept
    pub winner: String,
}

/// Materialized result of replaying one or more trajectories.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    /// Paths whose final change is a write, with that content
    pub files: BTreeMap<String, String>,
    /// Paths whose final change is a tombstone
    pub deleted: BTreeSet<String>,
    pub conflicts: Vec<AggregationConflict>,
}

impl Aggregation {
    /// Overlay this result onto an existing file set: tombstoned paths are
    /// removed, written paths replaced.
    pub fn apply_to(&self, files: &mut BTreeMap<String, String>) {
        for path in &self.deleted {
            files.remove(path);
        }
        for (path, content) in &self.files {
            files.insert(path.clone(), content.clone());
        }
    }

    fn overlay(&mut self, path: &str, change: &FileChange) {
        match change {
            FileChange::Write(content) => {
                self.deleted.remove(path);
                self.files.insert(path.to_string(), content.clone());
            }
            FileChange::Delete => {
                self.files.remove(path);
                self.deleted.insert(path.to_string());
            }
        }
    }
}

/// Replay a solution's ancestor chain, root first.
///
/// Later nodes win on conflicting paths. A path whose last change is a
/// tombstone is left out of `files` and listed in `deleted`.
///
/// # Example
///
/// ```rust
/// use waypoint::trajectory::{aggregate, FileChange, FileChanges, Solution, Trajectory};
/// use std::sync::Arc;
///
/// let mut trajectory = Trajectory::new();
/// let root = trajectory.push_root(FileChanges::from([
///     ("a.ts".to_string(), FileChange::Write("x".to_string())),
///     ("b.ts".to_string(), FileChange::Write("y".to_string())),
/// ]));
/// let leaf = trajectory
///     .push(root, FileChanges::from([("a.ts".to_string(), FileChange::Delete)]))
///     .unwrap();
///
/// let result = aggregate(&Solution::new(Arc::new(trajectory), leaf).unwrap());
/// assert_eq!(result.files.len(), 1);
/// assert_eq!(result.files["b.ts"], "y");
/// assert!(result.deleted.contains("a.ts"));
/// ```
pub fn aggregate(solution: &Solution) -> Aggregation {
    let mut result = Aggregation::default();
    for node in solution.steps() {
        for (path, change) in node.files() {
            result.overlay(path, change);
        }
    }
    result
}

/// Aggregate an actor's output.
///
/// Named outputs are aggregated branch by branch and merged in ascending
/// name order, so on a shared path the branch whose name sorts last wins.
/// Every such overwrite is reported in `conflicts`.
pub fn aggregate_output(output: &ActorOutput) -> Aggregation {
    merge_output(output, None)
}

fn merge_output(output: &ActorOutput, label: Option<&str>) -> Aggregation {
    let branches = match output {
        ActorOutput::Node(solution) => return aggregate(solution),
        ActorOutput::Named(branches) => branches,
    };

    let mut merged = Aggregation::default();
    let mut owners: BTreeMap<String, String> = BTreeMap::new();

    for (name, branch) in branches {
        let branch_label = match label {
            Some(parent) => format!("{parent}/{name}"),
            None => name.clone(),
        };
        let part = merge_output(branch, Some(&branch_label));
        merged.conflicts.extend(part.conflicts.iter().cloned());

        let touched = part
            .deleted
            .iter()
            .map(|path| (path, FileChange::Delete))
            .chain(
                part.files
                    .iter()
                    .map(|(path, content)| (path, FileChange::Write(content.clone()))),
            );

        for (path, change) in touched {
            if let Some(previous) = owners.insert(path.clone(), branch_label.clone()) {
                warn!(
                    path = %path,
                    overwritten = %previous,
                    winner = %branch_label,
                    "Concurrent branches changed the same path"
                );
                merged.conflicts.push(AggregationConflict {
                    path: path.clone(),
                    overwritten: previous,
                    winner: branch_label.clone(),
                });
            }
            merged.overlay(path, &change);
        }
    }

    merged
}
