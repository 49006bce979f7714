//! Multi-source graph diff
//!
//! Joins N labeled, already-validated canonical graphs into one unified
//! graph. Every parameter, rule and edge carries a presence vector (which
//! sources contain it) and a status derived from it:
//!
//! | status | present in |
//! |---|---|
//! | `common` | every source |
//! | `partial` | more than one, not all |
//! | `unique` | exactly one |
//!
//! Nothing is merged or repaired; divergence is only classified and counted.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use rulegraph_model::error::finish;
use rulegraph_model::{CanonicalGraph, ErrorType, GraphError, GraphNode, GraphResult, ParamSource, ParamType};

mod engine;
pub mod metrics;
pub mod presence;

pub use engine::{compute_diff, synthetic_rule_id};
pub use metrics::{AgreementMetrics, CategoryMetrics};
pub use presence::{DiffStatus, LineStyle, PresenceVector, StatusStyle, StyleColor};

/// One input to the diff: a source label and its graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledGraph {
    pub label: String,
    pub graph: CanonicalGraph,
}

impl LabeledGraph {
    pub fn new(label: impl Into<String>, graph: CanonicalGraph) -> Self {
        Self {
            label: label.into(),
            graph,
        }
    }
}

/// The type one source declared for a parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceType {
    pub label: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
}

/// A parameter of the unified graph, keyed by id alone.
///
/// Type, description and source are taken from the first source that
/// declares the parameter. When sources disagree on the type, every source's
/// type is listed in `type_conflicts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffParameter {
    pub id: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub source: ParamSource,
    pub presence: PresenceVector,
    pub status: DiffStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_conflicts: Vec<SourceType>,
}

/// A rule of the unified graph. Two source rules are the same diff rule only
/// when id, input set, output set and logic all match exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffRule {
    /// `<id>@<digest>`; distinguishes same-named rules with different content.
    pub synthetic_id: String,
    pub id: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub logic: String,
    pub presence: PresenceVector,
    pub status: DiffStatus,
}

/// An edge of the unified graph; rule endpoints use synthetic ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEdge {
    pub from: GraphNode,
    pub to: GraphNode,
    pub presence: PresenceVector,
    pub status: DiffStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffGraph {
    /// Source labels in input order.
    pub sources: Vec<String>,
    pub parameters: BTreeMap<String, DiffParameter>,
    /// Keyed by synthetic id.
    pub rules: BTreeMap<String, DiffRule>,
    /// Sorted by `(from, to)`.
    pub edges: Vec<DiffEdge>,
}

impl DiffGraph {
    /// Diff rules sharing a raw rule id, i.e. the divergent versions of one rule.
    pub fn rule_versions(&self, id: &str) -> Vec<&DiffRule> {
        self.rules.values().filter(|r| r.id == id).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    pub graph: DiffGraph,
    pub metrics: AgreementMetrics,
}

impl DiffResult {
    /// True when every entity is present in every source.
    pub fn is_unanimous(&self) -> bool {
        self.metrics.parameters.common == self.metrics.parameters.total
            && self.metrics.rules.common == self.metrics.rules.total
            && self.metrics.edges.common == self.metrics.edges.total
    }
}

fn check_sources(sources: &[LabeledGraph]) -> GraphResult<()> {
    let mut errors = Vec::new();
    if sources.len() < 2 {
        errors.push(GraphError::new(
            ErrorType::ValidationError,
            format!("diff needs at least 2 sources, got {}", sources.len()),
        ));
    }
    let mut seen = BTreeSet::new();
    for source in sources {
        if source.label.trim().is_empty() {
            errors.push(GraphError::new(ErrorType::ValidationError, "diff source label is empty"));
        } else if !seen.insert(source.label.as_str()) {
            errors.push(GraphError::new(
                ErrorType::ValidationError,
                format!("diff source label `{}` is used more than once", source.label),
            ));
        }
    }
    finish((), errors)
}
