use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use rulegraph_model::digest::{fnv1a64_fields, to_hex};
use rulegraph_model::{ErrorType, GraphError, GraphErrors, GraphNode, GraphResult, Parameter, Rule};

use crate::metrics::{AgreementMetrics, CategoryMetrics};
use crate::presence::PresenceVector;
use crate::{check_sources, DiffEdge, DiffGraph, DiffParameter, DiffResult, DiffRule, LabeledGraph, SourceType};

/// Content identity of a rule across sources.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct RuleKey {
    id: String,
    inputs: Vec<String>,
    outputs: Vec<String>,
    logic: String,
}

impl RuleKey {
    fn of(rule: &Rule) -> Self {
        let mut inputs = rule.inputs.clone();
        inputs.sort();
        inputs.dedup();
        let mut outputs = rule.outputs.clone();
        outputs.sort();
        outputs.dedup();
        Self {
            id: rule.id.clone(),
            inputs,
            outputs,
            logic: rule.logic.clone(),
        }
    }

    fn synthetic_id(&self) -> String {
        let input_count = self.inputs.len().to_string();
        let output_count = self.outputs.len().to_string();
        let mut fields: Vec<&str> = Vec::with_capacity(4 + self.inputs.len() + self.outputs.len());
        fields.push(&self.id);
        fields.push(&input_count);
        fields.extend(self.inputs.iter().map(String::as_str));
        fields.push(&output_count);
        fields.extend(self.outputs.iter().map(String::as_str));
        fields.push(&self.logic);
        format!("{}@{}", self.id, to_hex(fnv1a64_fields(&fields)))
    }
}

/// The diff-graph id of `rule`: `<id>@<16 hex digits>` over its content key.
///
/// Input and output order do not matter; any other difference, including
/// whitespace in the logic text, yields a different id.
pub fn synthetic_rule_id(rule: &Rule) -> String {
    RuleKey::of(rule).synthetic_id()
}

struct ParameterAccum {
    first: Parameter,
    presence: PresenceVector,
    types: Vec<SourceType>,
}

struct RuleAccum {
    synthetic_id: String,
    presence: PresenceVector,
}

/// Unify `sources` into one graph with per-entity presence and metrics.
///
/// Requires at least two sources with distinct, non-empty labels; anything
/// else is a `ValidationError`. The graphs are expected to have passed
/// validation already.
pub fn compute_diff(sources: &[LabeledGraph]) -> GraphResult<DiffResult> {
    check_sources(sources)?;
    let total = sources.len();

    let mut parameters: BTreeMap<String, ParameterAccum> = BTreeMap::new();
    let mut rules: BTreeMap<RuleKey, RuleAccum> = BTreeMap::new();
    let mut edges: BTreeMap<(GraphNode, GraphNode), PresenceVector> = BTreeMap::new();
    let mut claimed: BTreeSet<String> = BTreeSet::new();
    let mut errors = Vec::new();

    for source in sources {
        let label = source.label.as_str();

        for param in source.graph.parameters.values() {
            let accum = parameters.entry(param.id.clone()).or_insert_with(|| ParameterAccum {
                first: param.clone(),
                presence: PresenceVector::new(total),
                types: Vec::new(),
            });
            accum.presence.mark(label);
            accum.types.push(SourceType {
                label: label.to_string(),
                param_type: param.param_type,
            });
        }

        for rule in source.graph.rules.values() {
            let key = RuleKey::of(rule);
            if !rules.contains_key(&key) {
                let synthetic_id = key.synthetic_id();
                if claimed.contains(&synthetic_id) {
                    errors.push(
                        GraphError::new(
                            ErrorType::ValidationError,
                            format!("diff rule id `{synthetic_id}` collides for different rule contents"),
                        )
                        .with_rule(rule.id.clone()),
                    );
                    continue;
                }
                claimed.insert(synthetic_id.clone());
                rules.insert(
                    key.clone(),
                    RuleAccum {
                        synthetic_id,
                        presence: PresenceVector::new(total),
                    },
                );
            }
            let Some(accum) = rules.get_mut(&key) else {
                continue;
            };
            accum.presence.mark(label);

            let node = GraphNode::Rule(accum.synthetic_id.clone());
            for input in &rule.inputs {
                edges
                    .entry((GraphNode::Parameter(input.clone()), node.clone()))
                    .or_insert_with(|| PresenceVector::new(total))
                    .mark(label);
            }
            for output in &rule.outputs {
                edges
                    .entry((node.clone(), GraphNode::Parameter(output.clone())))
                    .or_insert_with(|| PresenceVector::new(total))
                    .mark(label);
            }
        }
        debug!(
            source = label,
            parameters = source.graph.parameters.len(),
            rules = source.graph.rules.len(),
            "accumulated diff source"
        );
    }

    if let Some(errors) = GraphErrors::from_vec(errors) {
        return Err(errors);
    }

    let graph = DiffGraph {
        sources: sources.iter().map(|s| s.label.clone()).collect(),
        parameters: parameters
            .into_iter()
            .map(|(id, accum)| {
                let distinct: BTreeSet<_> = accum.types.iter().map(|t| t.param_type).collect();
                let type_conflicts = if distinct.len() > 1 { accum.types } else { Vec::new() };
                let status = accum.presence.status();
                let param = DiffParameter {
                    id: id.clone(),
                    param_type: accum.first.param_type,
                    description: accum.first.description,
                    source: accum.first.source,
                    presence: accum.presence,
                    status,
                    type_conflicts,
                };
                (id, param)
            })
            .collect(),
        rules: rules
            .into_iter()
            .map(|(key, accum)| {
                let status = accum.presence.status();
                let rule = DiffRule {
                    synthetic_id: accum.synthetic_id.clone(),
                    id: key.id,
                    inputs: key.inputs,
                    outputs: key.outputs,
                    logic: key.logic,
                    presence: accum.presence,
                    status,
                };
                (accum.synthetic_id, rule)
            })
            .collect(),
        edges: edges
            .into_iter()
            .map(|((from, to), presence)| DiffEdge {
                from,
                to,
                status: presence.status(),
                presence,
            })
            .collect(),
    };

    let metrics = AgreementMetrics {
        parameters: CategoryMetrics::from_statuses(graph.parameters.values().map(|p| p.status)),
        rules: CategoryMetrics::from_statuses(graph.rules.values().map(|r| r.status)),
        edges: CategoryMetrics::from_statuses(graph.edges.iter().map(|e| e.status)),
    };
    info!(
        sources = total,
        parameters = metrics.parameters.total,
        rules = metrics.rules.total,
        edges = metrics.edges.total,
        "computed diff"
    );

    Ok(DiffResult { graph, metrics })
}
