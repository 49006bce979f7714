//! Canonical graph: typed parameters + rules, keyed by normalized id.
//!
//! Serialized shape:
//!
//! ```text
//! { "parameters": { id: { "type", "description"?, "source" } },
//!   "rules":      { id: { "inputs": [id], "outputs": [id], "logic" } } }
//! ```
//!
//! Maps are ordered (`BTreeMap`) so serialization is byte-for-byte stable.
//! The structural invariants (bipartite, acyclic, resolved references,
//! single writer) are checked by the validator, not enforced here.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Number,
    Boolean,
    String,
}

impl ParamType {
    /// Accepts the primitive names plus the aliases generators commonly emit.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "number" | "num" | "numeric" | "int" | "integer" | "float" | "double" | "decimal" => {
                Some(Self::Number)
            }
            "boolean" | "bool" => Some(Self::Boolean),
            "string" | "str" | "text" => Some(Self::String),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::String => "string",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Derived` iff some rule in the same graph writes the parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamSource {
    Input,
    Derived,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub id: String,
    pub param_type: ParamType,
    pub description: Option<String>,
    pub source: ParamSource,
}

impl Parameter {
    pub fn new(id: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            id: id.into(),
            param_type,
            description: None,
            source: ParamSource::Input,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.trim().is_empty());
        self
    }

    pub fn derived(mut self) -> Self {
        self.source = ParamSource::Derived;
        self
    }

    pub fn is_derived(&self) -> bool {
        self.source == ParamSource::Derived
    }
}

/// A transformation from input parameters to output parameters.
///
/// `inputs`/`outputs` keep declaration order but carry set semantics:
/// duplicates are dropped at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub id: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub logic: String,
}

impl Rule {
    pub fn new<I, O>(id: impl Into<String>, inputs: I, outputs: O, logic: impl Into<String>) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        Self {
            id: id.into(),
            inputs: dedup_ordered(inputs),
            outputs: dedup_ordered(outputs),
            logic: logic.into(),
        }
    }
}

fn dedup_ordered<I>(ids: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for id in ids {
        let id: String = id.into();
        if seen.insert(id.clone()) {
            out.push(id);
        }
    }
    out
}

/// A node of the bipartite graph. The tag keeps the parameter and rule id
/// namespaces apart even when the same string is used in both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum GraphNode {
    Parameter(String),
    Rule(String),
}

impl GraphNode {
    pub fn id(&self) -> &str {
        match self {
            GraphNode::Parameter(id) | GraphNode::Rule(id) => id,
        }
    }

    pub fn is_rule(&self) -> bool {
        matches!(self, GraphNode::Rule(_))
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "GraphRepr", into = "GraphRepr")]
pub struct CanonicalGraph {
    pub parameters: BTreeMap<String, Parameter>,
    pub rules: BTreeMap<String, Rule>,
}

impl CanonicalGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts<P, R>(parameters: P, rules: R) -> Self
    where
        P: IntoIterator<Item = Parameter>,
        R: IntoIterator<Item = Rule>,
    {
        Self {
            parameters: parameters.into_iter().map(|p| (p.id.clone(), p)).collect(),
            rules: rules.into_iter().map(|r| (r.id.clone(), r)).collect(),
        }
    }

    /// Rule ids writing each parameter, keyed by parameter id; both in id order.
    pub fn writer_index(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut writers: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for rule in self.rules.values() {
            for output in &rule.outputs {
                writers.entry(output.as_str()).or_default().push(rule.id.as_str());
            }
        }
        writers
    }

    /// The induced bipartite edge set: `Parameter(i) -> Rule(r)` for each input
    /// and `Rule(r) -> Parameter(o)` for each output, in rule-id order.
    pub fn edges(&self) -> Vec<(GraphNode, GraphNode)> {
        let mut out = Vec::new();
        for rule in self.rules.values() {
            for input in &rule.inputs {
                out.push((GraphNode::Parameter(input.clone()), GraphNode::Rule(rule.id.clone())));
            }
            for output in &rule.outputs {
                out.push((GraphNode::Rule(rule.id.clone()), GraphNode::Parameter(output.clone())));
            }
        }
        out
    }

    pub fn derived_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.values().filter(|p| p.is_derived())
    }
}

// ============================================================================
// Serialized form
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ParameterRepr {
    #[serde(rename = "type")]
    param_type: ParamType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    source: ParamSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RuleRepr {
    #[serde(default)]
    inputs: Vec<String>,
    #[serde(default)]
    outputs: Vec<String>,
    #[serde(default)]
    logic: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GraphRepr {
    #[serde(default)]
    parameters: BTreeMap<String, ParameterRepr>,
    #[serde(default)]
    rules: BTreeMap<String, RuleRepr>,
}

impl From<GraphRepr> for CanonicalGraph {
    fn from(repr: GraphRepr) -> Self {
        let parameters = repr
            .parameters
            .into_iter()
            .map(|(id, p)| {
                let param = Parameter {
                    id: id.clone(),
                    param_type: p.param_type,
                    description: p.description,
                    source: p.source,
                };
                (id, param)
            })
            .collect();
        let rules = repr
            .rules
            .into_iter()
            .map(|(id, r)| {
                let rule = Rule {
                    id: id.clone(),
                    inputs: r.inputs,
                    outputs: r.outputs,
                    logic: r.logic,
                };
                (id, rule)
            })
            .collect();
        Self { parameters, rules }
    }
}

impl From<CanonicalGraph> for GraphRepr {
    fn from(graph: CanonicalGraph) -> Self {
        let parameters = graph
            .parameters
            .into_iter()
            .map(|(id, p)| {
                let repr = ParameterRepr {
                    param_type: p.param_type,
                    description: p.description,
                    source: p.source,
                };
                (id, repr)
            })
            .collect();
        let rules = graph
            .rules
            .into_iter()
            .map(|(id, r)| {
                let repr = RuleRepr {
                    inputs: r.inputs,
                    outputs: r.outputs,
                    logic: r.logic,
                };
                (id, repr)
            })
            .collect();
        Self { parameters, rules }
    }
}
