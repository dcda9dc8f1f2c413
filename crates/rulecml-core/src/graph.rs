//! Relation graph and navigation path search.
//!
//! Each node is one relation edge `parent.relation -> target`; node `a` links
//! to node `b` when `a.target == b.parent`. Searching over edges rather than
//! type names keeps two relations to the same type apart.

use std::fmt;

use indexmap::IndexSet;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::cml::CmlModel;

/// One relation between two types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    /// Owning type.
    pub parent: String,
    /// Relation name.
    pub relation: String,
    /// Target type.
    pub target: String,
}

/// A sequence of edges navigated from one type to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationPath {
    edges: Vec<Edge>,
}

impl RelationPath {
    /// Returns the edges in navigation order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Renders the path followed by `.`, ready to prefix an attribute name.
    #[must_use]
    pub fn prefix(&self) -> String {
        format!("{self}.")
    }
}

impl fmt::Display for RelationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<String> = self
            .edges
            .iter()
            .map(|e| format!("{}[{}]", e.relation, e.target))
            .collect();
        f.write_str(&steps.join("."))
    }
}

/// Snapshot of a model's relations.
#[derive(Debug, Clone, Default)]
pub struct RelationGraph {
    graph: DiGraph<Edge, ()>,
}

impl RelationGraph {
    /// Collects every relation of `model`.
    ///
    /// Relations of virtual types also get one edge per type whose parent
    /// is the relation's target, so a virtual root reaches every concrete
    /// line item directly.
    #[must_use]
    pub fn build(model: &CmlModel) -> Self {
        let mut edges: IndexSet<Edge> = IndexSet::new();
        for cml_type in model.types() {
            for relation in cml_type.relations() {
                edges.insert(Edge {
                    parent: cml_type.name().to_string(),
                    relation: relation.name.clone(),
                    target: relation.target_type.clone(),
                });
            }
        }
        for cml_type in model.types().filter(|t| t.is_virtual()) {
            for relation in cml_type.relations() {
                for concrete in model
                    .types()
                    .filter(|t| t.parent() == Some(relation.target_type.as_str()))
                {
                    edges.insert(Edge {
                        parent: cml_type.name().to_string(),
                        relation: relation.name.clone(),
                        target: concrete.name().to_string(),
                    });
                }
            }
        }

        let mut graph = DiGraph::with_capacity(edges.len(), 0);
        let nodes: Vec<NodeIndex> = edges.into_iter().map(|e| graph.add_node(e)).collect();
        for &from in &nodes {
            for &to in &nodes {
                if graph[from].target == graph[to].parent {
                    graph.add_edge(from, to, ());
                }
            }
        }
        debug!(
            "Relation graph: {} edge(s), {} adjacency link(s)",
            graph.node_count(),
            graph.edge_count()
        );
        Self { graph }
    }

    /// Number of relation edges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns `true` if the model has no relations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Finds one path for every pair of an edge leaving `from` and an edge
    /// entering `to`. Pairs that are not connected yield nothing.
    #[must_use]
    pub fn find_all_paths(&self, from: &str, to: &str) -> Vec<RelationPath> {
        let starts = self.graph.node_indices().filter(|&n| self.graph[n].parent == from);
        let ends: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&n| self.graph[n].target == to)
            .collect();

        let mut paths = Vec::new();
        for start in starts {
            for &end in &ends {
                if let Some(path) = self.find_path(start, end) {
                    paths.push(path);
                }
            }
        }
        paths
    }

    /// Returns the first path found from `from` to `to`, if any.
    #[must_use]
    pub fn first_path(&self, from: &str, to: &str) -> Option<RelationPath> {
        self.find_all_paths(from, to).into_iter().next()
    }

    /// Depth-first search from `start` to `end`, last pushed explored first.
    fn find_path(&self, start: NodeIndex, end: NodeIndex) -> Option<RelationPath> {
        let mut stack: Vec<Vec<NodeIndex>> = vec![vec![start]];
        let mut visited: IndexSet<NodeIndex> = IndexSet::new();

        while let Some(trail) = stack.pop() {
            let current = *trail.last()?;
            if current == end {
                return Some(RelationPath {
                    edges: trail.iter().map(|&n| self.graph[n].clone()).collect(),
                });
            }
            if !visited.insert(current) {
                continue;
            }
            let mut neighbors: Vec<NodeIndex> = self
                .graph
                .neighbors(current)
                .filter(|n| !visited.contains(n))
                .collect();
            neighbors.sort_unstable();
            for neighbor in neighbors {
                let mut next = trail.clone();
                next.push(neighbor);
                stack.push(next);
            }
        }
        None
    }
}
