//! Resource dependency graph
//!
//! Builds a DAG over the resources of a template so that references can be
//! checked and a deployment order derived. Edges point from a resource to the
//! resources that need it:
//!
//! - `Ref` and `Fn::GetAtt` inside properties
//! - explicit `DependsOn` entries

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::template::Template;

/// A node in the dependency graph representing one resource
#[derive(Debug, Clone, Serialize)]
pub struct ResourceNode {
    /// Logical id
    pub id: String,
    /// CloudFormation resource type
    pub resource_type: String,
    /// Construct path, when the template recorded one
    pub path: Option<String>,
}

/// How one resource came to depend on another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    /// `Ref` / `Fn::GetAtt` in a property
    Reference,
    /// `DependsOn`
    Explicit,
}

/// The dependency graph for template resources
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<ResourceNode, DependencyKind>,
    node_indices: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Build the graph for every resource in `template`.
    ///
    /// Fails with [`Error::DanglingReference`] when a resource points at a
    /// logical id the template does not declare.
    pub fn from_template(template: &Template) -> Result<Self> {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for (id, resource) in &template.resources {
            let idx = graph.add_node(ResourceNode {
                id: id.clone(),
                resource_type: resource.resource_type.clone(),
                path: resource.path().map(str::to_string),
            });
            node_indices.insert(id.clone(), idx);
        }

        for (id, resource) in &template.resources {
            let to_idx = node_indices[id];
            for target in resource.references() {
                let Some(&from_idx) = node_indices.get(&target) else {
                    return Err(Error::DanglingReference {
                        from: id.clone(),
                        to: target,
                    });
                };
                let kind = if resource.depends_on.contains(&target) {
                    DependencyKind::Explicit
                } else {
                    DependencyKind::Reference
                };
                graph.update_edge(from_idx, to_idx, kind);
            }
        }

        tracing::debug!(
            "Built dependency graph with {} resources and {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        Ok(Self {
            graph,
            node_indices,
        })
    }

    /// Check for dependency cycles
    pub fn has_cycles(&self) -> bool {
        tarjan_scc(&self.graph)
            .iter()
            .any(|scc| scc.len() > 1 || self.is_self_loop(scc[0]))
    }

    /// Get all cycles in the graph, each as a list of logical ids
    pub fn get_cycles(&self) -> Vec<Vec<String>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.is_self_loop(scc[0]))
            .map(|mut scc| {
                scc.sort();
                scc.into_iter()
                    .filter_map(|idx| self.graph.node_weight(idx).map(|n| n.id.clone()))
                    .collect()
            })
            .collect()
    }

    fn is_self_loop(&self, idx: NodeIndex) -> bool {
        self.graph.contains_edge(idx, idx)
    }

    /// Topological order of resources.
    ///
    /// Among resources whose dependencies are satisfied, the one declared
    /// first in the template comes first, so the order is deterministic.
    pub fn deployment_order(&self) -> Result<Vec<String>> {
        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .count()
            })
            .collect();

        let mut ready: BinaryHeap<Reverse<NodeIndex>> = self
            .graph
            .node_indices()
            .filter(|idx| in_degree[idx.index()] == 0)
            .map(Reverse)
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse(idx)) = ready.pop() {
            order.push(self.graph[idx].id.clone());
            for next in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                in_degree[next.index()] -= 1;
                if in_degree[next.index()] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if order.len() != self.graph.node_count() {
            let cycles = self
                .get_cycles()
                .iter()
                .map(|cycle| cycle.join(" -> "))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::DependencyCycle(cycles));
        }

        Ok(order)
    }

    /// Direct dependencies of a resource, in declaration order
    pub fn direct_dependencies(&self, id: &str) -> Vec<String> {
        self.neighbors_sorted(id, Direction::Incoming)
    }

    /// Direct dependents of a resource, in declaration order
    pub fn direct_dependents(&self, id: &str) -> Vec<String> {
        self.neighbors_sorted(id, Direction::Outgoing)
    }

    /// All resources a given resource depends on (direct and transitive)
    pub fn dependencies_of(&self, id: &str) -> Vec<String> {
        self.reachable(id, Direction::Incoming)
    }

    /// All resources that depend on a given resource (direct and transitive)
    pub fn dependents_of(&self, id: &str) -> Vec<String> {
        self.reachable(id, Direction::Outgoing)
    }

    fn neighbors_sorted(&self, id: &str, direction: Direction) -> Vec<String> {
        let Some(&idx) = self.node_indices.get(id) else {
            return Vec::new();
        };
        let mut neighbors: Vec<NodeIndex> =
            self.graph.neighbors_directed(idx, direction).collect();
        neighbors.sort();
        neighbors.dedup();
        neighbors
            .into_iter()
            .map(|n| self.graph[n].id.clone())
            .collect()
    }

    fn reachable(&self, id: &str, direction: Direction) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();

        if let Some(&start_idx) = self.node_indices.get(id) {
            queue.push_back(start_idx);

            while let Some(current) = queue.pop_front() {
                for neighbor in self.graph.neighbors_directed(current, direction) {
                    if neighbor != start_idx && seen.insert(neighbor) {
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        let mut found: Vec<NodeIndex> = seen.into_iter().collect();
        found.sort();
        found
            .into_iter()
            .map(|idx| self.graph[idx].id.clone())
            .collect()
    }

    /// Get a node by logical id
    pub fn get_node(&self, id: &str) -> Option<&ResourceNode> {
        self.node_indices
            .get(id)
            .and_then(|idx| self.graph.node_weight(*idx))
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get the number of edges
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Generate a DOT format representation for visualization
    pub fn to_dot(&self) -> String {
        let mut output = String::new();
        output.push_str("digraph resources {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box];\n\n");

        for node in self.graph.node_weights() {
            output.push_str(&format!(
                "  \"{}\" [label=\"{}\\n{}\"];\n",
                node.id, node.id, node.resource_type
            ));
        }

        output.push('\n');

        for edge in self.graph.edge_references() {
            let source = &self.graph[edge.source()].id;
            let target = &self.graph[edge.target()].id;
            let style = match edge.weight() {
                DependencyKind::Reference => "solid",
                DependencyKind::Explicit => "dashed",
            };
            output.push_str(&format!(
                "  \"{}\" -> \"{}\" [style={}];\n",
                source, target, style
            ));
        }

        output.push_str("}\n");
        output
    }
}
