//! Append-only generation trajectories.
//!
//! A [`Trajectory`] is an arena of [`Node`]s. Each node records the file
//! changes one generation step produced and the index of the step it built
//! on. Walking a node's parents (index chasing, never pointer traversal)
//! yields the ordered sequence of edits that led to it; [`aggregate`] replays
//! that sequence into a materialized file set.
//!
//! Actors grow a trajectory privately while they search, then freeze it
//! behind an `Arc` and hand out a [`Solution`] naming the chosen node.

mod aggregate;

pub use aggregate::{aggregate, aggregate_output, Aggregation, AggregationConflict};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// One recorded change to a file path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileChange {
    /// The file now has this content.
    Write(String),
    /// Tombstone: the file was deleted.
    Delete,
}

impl FileChange {
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Write(content) => Some(content),
            Self::Delete => None,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, Self::Delete)
    }
}

/// File changes of one node, keyed by path.
pub type FileChanges = BTreeMap<String, FileChange>;

/// Index of a node inside its trajectory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors building or addressing a trajectory.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TrajectoryError {
    #[error("Node {node} does not exist (trajectory has {len} nodes)")]
    UnknownNode { node: NodeId, len: usize },
}

/// One generation step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    parent: Option<NodeId>,
    depth: usize,
    files: FileChanges,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Number of ancestors above this node.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn files(&self) -> &FileChanges {
        &self.files
    }
}

/// Arena of generation steps.
///
/// Nodes are only ever appended; a node's ancestor chain cannot change once
/// it exists.
///
/// # Example
///
/// ```rust
/// use waypoint::trajectory::{FileChange, FileChanges, Trajectory};
///
/// let mut trajectory = Trajectory::new();
/// let root = trajectory.push_root(FileChanges::from([
///     ("a.ts".to_string(), FileChange::Write("x".to_string())),
/// ]));
/// let child = trajectory
///     .push(root, FileChanges::from([("a.ts".to_string(), FileChange::Delete)]))
///     .unwrap();
///
/// assert_eq!(trajectory.path(child).unwrap(), vec![root, child]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    nodes: Vec<Node>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Append a node with no parent.
    pub fn push_root(&mut self, files: FileChanges) -> NodeId {
        self.nodes.push(Node {
            parent: None,
            depth: 0,
            files,
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Append a node built on `parent`.
    pub fn push(&mut self, parent: NodeId, files: FileChanges) -> Result<NodeId, TrajectoryError> {
        let depth = self.node(parent)?.depth + 1;
        self.nodes.push(Node {
            parent: Some(parent),
            depth,
            files,
        });
        Ok(NodeId(self.nodes.len() - 1))
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn node(&self, id: NodeId) -> Result<&Node, TrajectoryError> {
        self.get(id).ok_or(TrajectoryError::UnknownNode {
            node: id,
            len: self.nodes.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ancestor chain from the root down to `id`, inclusive.
    pub fn path(&self, id: NodeId) -> Result<Vec<NodeId>, TrajectoryError> {
        let mut chain = Vec::with_capacity(self.node(id)?.depth + 1);
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            chain.push(current);
            cursor = self.node(current)?.parent;
        }
        chain.reverse();
        Ok(chain)
    }

    /// Direct children of `id`, in creation order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.parent == Some(id))
            .map(|(index, _)| NodeId(index))
            .collect()
    }

    /// Nodes nothing has been built on yet.
    pub fn leaves(&self) -> Vec<NodeId> {
        let mut has_child = vec![false; self.nodes.len()];
        for node in &self.nodes {
            if let Some(parent) = node.parent {
                has_child[parent.0] = true;
            }
        }
        has_child
            .iter()
            .enumerate()
            .filter(|(_, has)| !**has)
            .map(|(index, _)| NodeId(index))
            .collect()
    }
}

/// Handle to a chosen node of a frozen trajectory.
#[derive(Clone, Debug)]
pub struct Solution {
    trajectory: Arc<Trajectory>,
    node: NodeId,
}

impl Solution {
    pub fn new(trajectory: Arc<Trajectory>, node: NodeId) -> Result<Self, TrajectoryError> {
        trajectory.node(node)?;
        Ok(Self { trajectory, node })
    }

    /// A one-step trajectory holding just these changes.
    pub fn from_changes(files: FileChanges) -> Self {
        let mut trajectory = Trajectory::new();
        let node = trajectory.push_root(files);
        Self {
            trajectory: Arc::new(trajectory),
            node,
        }
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn depth(&self) -> usize {
        self.trajectory
            .get(self.node)
            .map(Node::depth)
            .unwrap_or_default()
    }

    /// Nodes from the trajectory root to the chosen node.
    pub fn steps(&self) -> impl Iterator<Item = &Node> + '_ {
        // `new` checked the node, so the chain is complete.
        self.trajectory
            .path(self.node)
            .unwrap_or_default()
            .into_iter()
            .filter_map(move |id| self.trajectory.get(id))
    }
}
