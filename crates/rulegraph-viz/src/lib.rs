//! Visual projection of rule graphs.
//!
//! Renderers never see `CanonicalGraph` or `DiffResult` directly; they get a
//! `VisualGraph`, a flat list of styled nodes and edges. Rendering itself is
//! an asynchronous collaborator behind the `Renderer` trait; this crate ships
//! no backend.
//!
//! Output conventions:
//! - parameters are ellipses (derived ones drawn double),
//! - rules are boxes,
//! - diff projections carry the status style and a `present/total` label.

use serde::{Deserialize, Serialize};

use rulegraph_diff::{DiffResult, StatusStyle};
use rulegraph_model::{CanonicalGraph, GraphNode, ParamSource};

pub mod render;

pub use render::{RenderError, RenderedSvg, Renderer};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankDir {
    #[default]
    #[serde(rename = "LR")]
    LeftRight,
    #[serde(rename = "TB")]
    TopBottom,
}

impl RankDir {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LR" => Some(Self::LeftRight),
            "TB" => Some(Self::TopBottom),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RankDir::LeftRight => "LR",
            RankDir::TopBottom => "TB",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VizOptions {
    /// Append parameter descriptions to node labels.
    #[serde(default)]
    pub include_descriptions: bool,
    #[serde(default)]
    pub rankdir: RankDir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeShape {
    Ellipse,
    DoubleEllipse,
    Box,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Parameter,
    Rule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualNode {
    /// Unique across kinds (`param:<id>` / `rule:<id>`).
    pub key: String,
    pub kind: NodeKind,
    pub label: String,
    pub shape: NodeShape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StatusStyle>,
    /// Presence label such as `2/3`, diff projections only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualEdge {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StatusStyle>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualGraph {
    pub rankdir: RankDir,
    pub nodes: Vec<VisualNode>,
    pub edges: Vec<VisualEdge>,
}

impl VisualGraph {
    pub fn node(&self, key: &str) -> Option<&VisualNode> {
        self.nodes.iter().find(|n| n.key == key)
    }
}

pub fn node_key(node: &GraphNode) -> String {
    match node {
        GraphNode::Parameter(id) => format!("param:{id}"),
        GraphNode::Rule(id) => format!("rule:{id}"),
    }
}

fn parameter_label(id: &str, description: Option<&str>, options: &VizOptions) -> String {
    match description {
        Some(desc) if options.include_descriptions => format!("{id}\n{desc}"),
        _ => id.to_string(),
    }
}

/// Project a single canonical graph.
pub fn from_canonical(graph: &CanonicalGraph, options: &VizOptions) -> VisualGraph {
    let mut nodes = Vec::with_capacity(graph.parameters.len() + graph.rules.len());
    for param in graph.parameters.values() {
        nodes.push(VisualNode {
            key: node_key(&GraphNode::Parameter(param.id.clone())),
            kind: NodeKind::Parameter,
            label: parameter_label(&param.id, param.description.as_deref(), options),
            shape: if param.is_derived() {
                NodeShape::DoubleEllipse
            } else {
                NodeShape::Ellipse
            },
            style: None,
            presence: None,
        });
    }
    for rule in graph.rules.values() {
        nodes.push(VisualNode {
            key: node_key(&GraphNode::Rule(rule.id.clone())),
            kind: NodeKind::Rule,
            label: rule.id.clone(),
            shape: NodeShape::Box,
            style: None,
            presence: None,
        });
    }
    let edges = graph
        .edges()
        .iter()
        .map(|(from, to)| VisualEdge {
            from: node_key(from),
            to: node_key(to),
            style: None,
        })
        .collect();
    VisualGraph {
        rankdir: options.rankdir,
        nodes,
        edges,
    }
}

/// Project a diff; every element is styled by its agreement status.
pub fn from_diff(diff: &DiffResult, options: &VizOptions) -> VisualGraph {
    let graph = &diff.graph;
    let mut nodes = Vec::with_capacity(graph.parameters.len() + graph.rules.len());
    for param in graph.parameters.values() {
        nodes.push(VisualNode {
            key: node_key(&GraphNode::Parameter(param.id.clone())),
            kind: NodeKind::Parameter,
            label: parameter_label(&param.id, param.description.as_deref(), options),
            shape: if param.source == ParamSource::Derived {
                NodeShape::DoubleEllipse
            } else {
                NodeShape::Ellipse
            },
            style: Some(param.status.style()),
            presence: Some(param.presence.fraction()),
        });
    }
    for rule in graph.rules.values() {
        nodes.push(VisualNode {
            key: node_key(&GraphNode::Rule(rule.synthetic_id.clone())),
            kind: NodeKind::Rule,
            label: rule.id.clone(),
            shape: NodeShape::Box,
            style: Some(rule.status.style()),
            presence: Some(rule.presence.fraction()),
        });
    }
    let edges = graph
        .edges
        .iter()
        .map(|edge| VisualEdge {
            from: node_key(&edge.from),
            to: node_key(&edge.to),
            style: Some(edge.status.style()),
        })
        .collect();
    VisualGraph {
        rankdir: options.rankdir,
        nodes,
        edges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulegraph_diff::{compute_diff, DiffStatus, LabeledGraph, LineStyle};
    use rulegraph_model::{ParamType, Parameter, Rule};

    fn bmi_graph() -> CanonicalGraph {
        CanonicalGraph::from_parts(
            [
                Parameter::new("weight", ParamType::Number).with_description(Some("kg".into())),
                Parameter::new("bmi", ParamType::Number).derived(),
            ],
            [Rule::new("compute_bmi", ["weight"], ["bmi"], "bmi = weight")],
        )
    }

    #[test]
    fn canonical_projection_shapes_nodes_by_kind() {
        let visual = from_canonical(&bmi_graph(), &VizOptions::default());
        assert_eq!(visual.nodes.len(), 3);
        assert_eq!(visual.node("param:weight").unwrap().shape, NodeShape::Ellipse);
        assert_eq!(visual.node("param:bmi").unwrap().shape, NodeShape::DoubleEllipse);
        assert_eq!(visual.node("rule:compute_bmi").unwrap().shape, NodeShape::Box);
        assert_eq!(visual.edges.len(), 2);
        assert_eq!(visual.edges[0].from, "param:weight");
        assert_eq!(visual.edges[0].to, "rule:compute_bmi");
    }

    #[test]
    fn descriptions_are_opt_in() {
        let plain = from_canonical(&bmi_graph(), &VizOptions::default());
        assert_eq!(plain.node("param:weight").unwrap().label, "weight");

        let options = VizOptions {
            include_descriptions: true,
            rankdir: RankDir::TopBottom,
        };
        let described = from_canonical(&bmi_graph(), &options);
        assert_eq!(described.node("param:weight").unwrap().label, "weight\nkg");
        assert_eq!(described.rankdir, RankDir::TopBottom);
    }

    #[test]
    fn diff_projection_carries_status_styles() {
        let other = CanonicalGraph::from_parts(
            [Parameter::new("weight", ParamType::Number)],
            Vec::<Rule>::new(),
        );
        let diff = compute_diff(&[LabeledGraph::new("a", bmi_graph()), LabeledGraph::new("b", other)]).unwrap();
        let visual = from_diff(&diff, &VizOptions::default());

        let weight = visual.node("param:weight").unwrap();
        assert_eq!(weight.style, Some(DiffStatus::Common.style()));
        assert_eq!(weight.presence.as_deref(), Some("2/2"));

        let bmi = visual.node("param:bmi").unwrap();
        assert_eq!(bmi.style.map(|s| s.line), Some(LineStyle::Bold));
        assert!(visual.edges.iter().all(|e| e.style == Some(DiffStatus::Unique.style())));
        assert!(visual.nodes.iter().any(|n| n.kind == NodeKind::Rule && n.label == "compute_bmi"));
    }
}
