//! Dependency conflict detection.
//!
//! Collection keeps every candidate node; this only reports the conflict
//! groups in which more than one version was collected. Choosing a winner is
//! left to the caller.

use std::collections::HashMap;
use std::fmt;

use crate::graph::{DependencyGraph, NodeId};

/// A report of all version conflicts present in a collected graph.
#[derive(Debug, Default)]
pub struct ConflictReport {
    pub conflicts: Vec<VersionConflict>,
}

/// Nodes sharing a conflict id but carrying different versions.
#[derive(Debug, Clone)]
pub struct VersionConflict {
    pub conflict_id: String,
    /// Distinct versions, in pre-order of first appearance.
    pub versions: Vec<String>,
    pub nodes: Vec<NodeId>,
}

impl ConflictReport {
    pub fn from_graph(graph: &DependencyGraph) -> Self {
        let mut groups: HashMap<&str, VersionConflict> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();

        for id in graph.nodes() {
            let node = graph.node(id);
            let (Some(conflict_id), Some(artifact)) = (node.conflict_id.as_deref(), node.artifact())
            else {
                continue;
            };
            let group = groups.entry(conflict_id).or_insert_with(|| {
                order.push(conflict_id);
                VersionConflict {
                    conflict_id: conflict_id.to_string(),
                    versions: Vec::new(),
                    nodes: Vec::new(),
                }
            });
            if !group.versions.contains(&artifact.version) {
                group.versions.push(artifact.version.clone());
            }
            group.nodes.push(id);
        }

        let conflicts = order
            .into_iter()
            .filter_map(|id| groups.remove(id))
            .filter(|c| c.versions.len() > 1)
            .collect();
        Self { conflicts }
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conflicts.is_empty() {
            return write!(f, "No version conflicts.");
        }
        writeln!(f, "Version conflicts ({}):", self.conflicts.len())?;
        for c in &self.conflicts {
            writeln!(f, "  {c}")?;
        }
        Ok(())
    }
}

impl fmt::Display for VersionConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({} nodes)",
            self.conflict_id,
            self.versions.join(", "),
            self.nodes.len()
        )
    }
}
