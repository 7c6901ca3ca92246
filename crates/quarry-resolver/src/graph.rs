//! The dependency tree produced by collection.
//!
//! Every traversed edge gets its own node: a library reached along two paths
//! appears twice, and nodes competing for the same coordinate share a
//! conflict id.

use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use quarry_core::artifact::Artifact;
use quarry_core::dependency::Dependency;
use quarry_core::repository::{ArtifactRepository, RemoteRepository};

pub type NodeId = NodeIndex;

/// A node of the dependency tree.
#[derive(Debug, Clone, Default)]
pub struct DependencyNode {
    /// `None` for a root collected from a plain list of dependencies.
    pub dependency: Option<Dependency>,
    /// Set on a dependency-less root that still names an artifact.
    pub artifact: Option<Artifact>,
    pub depth: usize,
    /// Nodes sharing this id compete for one version.
    pub conflict_id: Option<String>,
    /// Artifacts relocated on the way to this node's artifact.
    pub relocations: Vec<Artifact>,
    /// The version constraint the node was collected for: the declared
    /// version after dependency management, before range expansion.
    pub requested_version: Option<String>,
    pub premanaged_version: Option<String>,
    pub premanaged_scope: Option<String>,
    pub repositories: Vec<RemoteRepository>,
    /// Where the node's descriptor came from.
    pub repository: Option<ArtifactRepository>,
}

impl DependencyNode {
    pub fn root(dependency: Option<Dependency>, artifact: Option<Artifact>) -> Self {
        Self {
            dependency,
            artifact,
            ..Self::default()
        }
    }

    /// The node's artifact, from its dependency when it has one.
    pub fn artifact(&self) -> Option<&Artifact> {
        self.dependency
            .as_ref()
            .map(|d| &d.artifact)
            .or(self.artifact.as_ref())
    }

    pub fn scope(&self) -> Option<&str> {
        self.dependency.as_ref().map(|d| d.scope.as_str())
    }
}

impl fmt::Display for DependencyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.dependency, &self.artifact) {
            (Some(dependency), _) => {
                write!(f, "{}", dependency.artifact)?;
                if !dependency.scope.is_empty() {
                    write!(f, " ({}", dependency.scope)?;
                    if dependency.is_optional() {
                        write!(f, ", optional")?;
                    }
                    write!(f, ")")?;
                }
                if let Some(premanaged) = &self.premanaged_version {
                    write!(f, " [managed from {premanaged}]")?;
                }
                Ok(())
            }
            (None, Some(artifact)) => write!(f, "{artifact}"),
            (None, None) => write!(f, "(root)"),
        }
    }
}

/// A rooted tree of [`DependencyNode`]s backed by petgraph.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<DependencyNode, ()>,
    root: NodeId,
}

impl DependencyGraph {
    pub fn new(root: DependencyNode) -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(root);
        Self { graph, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Append `node` as the last child of `parent`, fixing up its depth.
    pub fn add_child(&mut self, parent: NodeId, mut node: DependencyNode) -> NodeId {
        node.depth = self.graph[parent].depth + 1;
        let child = self.graph.add_node(node);
        self.graph.add_edge(parent, child, ());
        child
    }

    pub fn node(&self, id: NodeId) -> &DependencyNode {
        &self.graph[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut DependencyNode {
        &mut self.graph[id]
    }

    /// Children of `id` in the order they were added.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut children: Vec<NodeId> = self
            .graph
            .neighbors_directed(id, Direction::Outgoing)
            .collect();
        children.sort();
        children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.graph
            .neighbors_directed(id, Direction::Incoming)
            .next()
    }

    /// `id` and its ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            path.push(parent);
            current = parent;
        }
        path
    }

    /// Every node in pre-order, starting at the root.
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.graph.node_count());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            let mut children = self.children(id);
            children.reverse();
            stack.extend(children);
        }
        order
    }

    /// Number of nodes (excluding root).
    pub fn len(&self) -> usize {
        self.graph.node_count().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render the tree, cutting branches deeper than `max_depth`.
    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut output = format!("{}\n", self.graph[self.root]);
        let children = self.children(self.root);
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            self.print_subtree(&mut output, child, "", i == count - 1, max_depth);
        }
        output
    }

    fn print_subtree(
        &self,
        output: &mut String,
        id: NodeId,
        prefix: &str,
        is_last: bool,
        max_depth: Option<usize>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let node = &self.graph[id];
        output.push_str(&format!("{prefix}{connector}{node}\n"));

        if max_depth.is_some_and(|max| node.depth >= max) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let children = self.children(id);
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            self.print_subtree(output, child, &child_prefix, i == count - 1, max_depth);
        }
    }

    /// Find the path from the root to the first node (pre-order) whose
    /// artifact matches `target_key`.
    ///
    /// Accepts either `group:artifact` or just `artifact` (partial match).
    pub fn find_path(&self, target_key: &str) -> Option<Vec<&DependencyNode>> {
        let target = self.nodes().into_iter().skip(1).find(|&id| {
            self.graph[id].artifact().is_some_and(|a| {
                a.ga() == target_key || a.artifact_id == target_key
            })
        })?;
        let mut path: Vec<&DependencyNode> = self
            .ancestors(target)
            .into_iter()
            .map(|id| &self.graph[id])
            .collect();
        path.reverse();
        Some(path)
    }
}
