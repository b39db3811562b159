//! Model Reference Graph Analysis
//!
//! Projects a frozen model onto a petgraph directed graph of declared types
//! and containers, finds reference cycles (SCCs), and renders GraphViz DOT
//! for inspection. Resolution poisons rather than fails, so the projection
//! always succeeds; unresolvable references simply contribute no edge.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;

use crate::model::{Model, TypeHandle, TypeKind, TypeRef};

// =============================================================================
// Graph Node and Edge Kinds
// =============================================================================

/// What a projected node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Entity,
    Complex,
    Container,
}

impl NodeKind {
    fn of_type(handle: &TypeHandle) -> Self {
        match handle.kind() {
            TypeKind::Entity => NodeKind::Entity,
            TypeKind::Complex => NodeKind::Complex,
        }
    }

    fn fill_color(self) -> &'static str {
        match self {
            NodeKind::Entity => "#00BCD4",
            NodeKind::Complex => "#FF9800",
            NodeKind::Container => "#9C27B0",
        }
    }
}

/// Why one node refers to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefEdge {
    /// The source type derives from the target.
    Base,
    /// A navigation property on the source targets the target.
    Navigation { containment: bool },
    /// An entity set in the source container holds the target.
    SetElement,
}

impl RefEdge {
    fn dot_attributes(self) -> &'static str {
        match self {
            RefEdge::Base => "style=bold, label=\"base\"",
            RefEdge::Navigation { containment: true } => {
                "style=dashed, color=\"#F44336\", label=\"contains\""
            }
            RefEdge::Navigation { containment: false } => "style=dashed, label=\"nav\"",
            RefEdge::SetElement => "style=dotted, label=\"set\"",
        }
    }
}

#[derive(Debug)]
struct NodeWeight {
    name: String,
    kind: NodeKind,
}

// =============================================================================
// Cycle Groups
// =============================================================================

/// A strongly connected component with more than one member, or a single
/// node that refers to itself.
#[derive(Debug, Clone, Serialize)]
pub struct SccGroup {
    pub id: usize,
    /// Member names, sorted for stable output.
    pub members: Vec<String>,
    pub is_self_referential: bool,
}

// =============================================================================
// Reference Graph
// =============================================================================

/// The projected reference graph of one model.
///
/// Nodes cover the model's own declarations plus any referenced-model types
/// they resolve to; names collide only when the models themselves do.
pub struct ReferenceGraph {
    graph: DiGraph<NodeWeight, RefEdge>,
    indices: HashMap<String, NodeIndex>,
}

impl ReferenceGraph {
    /// Project a frozen model, forcing base, navigation, and set-element
    /// resolution along the way.
    pub fn project(model: &Arc<Model>) -> Self {
        let mut graph = ReferenceGraph {
            graph: DiGraph::new(),
            indices: HashMap::new(),
        };

        for handle in model.types() {
            let source = graph.ensure_node(handle.full_name().to_string(), NodeKind::of_type(&handle));
            if let Some(TypeRef::Declared(base)) = handle.base_type() {
                let target = graph.ensure_node(base.full_name().to_string(), NodeKind::of_type(&base));
                graph.graph.add_edge(source, target, RefEdge::Base);
            }
            for navigation in handle.navigations() {
                if let TypeRef::Declared(target_type) = navigation.target() {
                    let target = graph
                        .ensure_node(target_type.full_name().to_string(), NodeKind::of_type(&target_type));
                    graph.graph.add_edge(
                        source,
                        target,
                        RefEdge::Navigation {
                            containment: navigation.contains_target(),
                        },
                    );
                }
            }
        }

        for container in model.containers() {
            let source = graph.ensure_node(container.full_name(), NodeKind::Container);
            for set in container.entity_sets() {
                if let TypeRef::Declared(element) = set.element_type() {
                    let target =
                        graph.ensure_node(element.full_name().to_string(), NodeKind::of_type(&element));
                    graph.graph.add_edge(source, target, RefEdge::SetElement);
                }
            }
        }

        graph
    }

    fn ensure_node(&mut self, name: String, kind: NodeKind) -> NodeIndex {
        if let Some(index) = self.indices.get(&name) {
            return *index;
        }
        let index = self.graph.add_node(NodeWeight {
            name: name.clone(),
            kind,
        });
        self.indices.insert(name, index);
        index
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Reference cycles: SCCs with more than one member, plus single nodes
    /// with an edge to themselves.
    pub fn cycle_groups(&self) -> Vec<SccGroup> {
        let mut groups = Vec::new();
        for scc in kosaraju_scc(&self.graph) {
            let is_self_referential = scc.len() == 1
                && self
                    .graph
                    .edges_directed(scc[0], Direction::Outgoing)
                    .any(|e| e.target() == scc[0]);
            if scc.len() == 1 && !is_self_referential {
                continue;
            }
            let mut members: Vec<String> = scc
                .iter()
                .map(|index| self.graph[*index].name.clone())
                .collect();
            members.sort();
            groups.push(SccGroup {
                id: groups.len(),
                members,
                is_self_referential,
            });
        }
        groups
    }

    pub fn has_cycles(&self) -> bool {
        !self.cycle_groups().is_empty()
    }

    /// Render the graph as GraphViz DOT.
    pub fn to_dot(&self) -> String {
        let mut output = String::new();
        output.push_str("digraph ModelReferences {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  bgcolor=\"#1e1e1e\";\n");
        output.push_str(
            "  node [shape=box, style=\"filled,rounded\", fontname=\"Helvetica\", fontsize=10, fontcolor=\"white\", color=\"#404040\"];\n",
        );
        output.push_str("  edge [fontname=\"Helvetica\", fontsize=8, fontcolor=\"#808080\"];\n\n");

        for weight in self.graph.node_weights() {
            let _ = writeln!(
                output,
                "  \"{}\" [label=\"{}\", fillcolor=\"{}\"];",
                dot_id(&weight.name),
                weight.name,
                weight.kind.fill_color()
            );
        }
        output.push('\n');

        for edge in self.graph.edge_references() {
            let source = &self.graph[edge.source()];
            let target = &self.graph[edge.target()];
            let _ = writeln!(
                output,
                "  \"{}\" -> \"{}\" [{}];",
                dot_id(&source.name),
                dot_id(&target.name),
                edge.weight().dot_attributes()
            );
        }

        output.push_str("}\n");
        output
    }
}

fn dot_id(name: &str) -> String {
    name.replace(['.', '-'], "_")
}
