//! Structural & logical validation of canonical graphs.
//!
//! Format-agnostic: operates only on `CanonicalGraph`. All checks run and
//! all problems are reported together:
//!
//! - every rule reference resolves to a declared parameter (`UndeclaredParameter`),
//! - no rule references a rule, and no id names both a rule and a parameter
//!   (`BipartiteViolation`),
//! - every rule writes something (`RuleNoOutputs`),
//! - at most one rule writes each parameter (`DuplicateOutput`),
//! - `source` agrees with the writers (`ValidationError`),
//! - the induced bipartite graph is acyclic (`CycleDetected`, with the path).
//!
//! The `source` check is independent of the others. A hand-built graph that
//! leaves every parameter at the default `input` gets one `ValidationError`
//! per written parameter on top of whatever else is wrong with it.
//!
//! On success the input graph is returned untouched; on failure only the
//! error list is returned, never a partially corrected graph.

use std::collections::BTreeMap;

use tracing::info;

use rulegraph_model::error::finish;
use rulegraph_model::{CanonicalGraph, ErrorType, GraphError, GraphErrors, GraphResult, ParamSource};

pub mod cycles;

pub use cycles::{find_cycles, topological_order};

/// Validate a graph, handing it back unchanged when it is well formed.
pub fn validate(graph: CanonicalGraph) -> GraphResult<CanonicalGraph> {
    let errors = check(&graph);
    info!(
        parameters = graph.parameters.len(),
        rules = graph.rules.len(),
        errors = errors.len(),
        "validated graph"
    );
    finish(graph, errors)
}

/// Run every check and collect all findings.
pub fn check(graph: &CanonicalGraph) -> Vec<GraphError> {
    let writers = graph.writer_index();
    let mut errors = Vec::new();
    check_id_aliases(graph, &mut errors);
    check_references(graph, &mut errors);
    check_outputs(graph, &mut errors);
    check_single_writer(&writers, &mut errors);
    check_sources(graph, &writers, &mut errors);
    errors.extend(find_cycles(graph));
    errors
}

fn check_id_aliases(graph: &CanonicalGraph, errors: &mut Vec<GraphError>) {
    for id in graph.rules.keys().filter(|id| graph.parameters.contains_key(*id)) {
        errors.push(
            GraphError::new(
                ErrorType::BipartiteViolation,
                format!("`{id}` names both a rule and a parameter"),
            )
            .with_rule(id.clone())
            .with_parameter(id.clone()),
        );
    }
}

fn check_references(graph: &CanonicalGraph, errors: &mut Vec<GraphError>) {
    for rule in graph.rules.values() {
        let sides = [("input", &rule.inputs), ("output", &rule.outputs)];
        for (side, ids) in sides {
            for id in ids {
                if graph.parameters.contains_key(id) {
                    continue;
                }
                if graph.rules.contains_key(id) {
                    errors.push(
                        GraphError::new(
                            ErrorType::BipartiteViolation,
                            format!("rule `{}` lists rule `{id}` as an {side}", rule.id),
                        )
                        .with_rule(rule.id.clone())
                        .with_parameter(id.clone()),
                    );
                } else {
                    errors.push(
                        GraphError::new(
                            ErrorType::UndeclaredParameter,
                            format!("rule `{}` {side} `{id}` is not a declared parameter", rule.id),
                        )
                        .with_rule(rule.id.clone())
                        .with_parameter(id.clone()),
                    );
                }
            }
        }
    }
}

fn check_outputs(graph: &CanonicalGraph, errors: &mut Vec<GraphError>) {
    for rule in graph.rules.values().filter(|r| r.outputs.is_empty()) {
        errors.push(
            GraphError::new(ErrorType::RuleNoOutputs, format!("rule `{}` has no outputs", rule.id))
                .with_rule(rule.id.clone()),
        );
    }
}

fn check_single_writer(writers: &BTreeMap<&str, Vec<&str>>, errors: &mut Vec<GraphError>) {
    for (&param, rule_ids) in writers {
        if rule_ids.len() < 2 {
            continue;
        }
        let listed = rule_ids
            .iter()
            .map(|r| format!("`{r}`"))
            .collect::<Vec<_>>()
            .join(", ");
        errors.push(
            GraphError::new(
                ErrorType::DuplicateOutput,
                format!("parameter `{param}` is written by {} rules: {listed}", rule_ids.len()),
            )
            .with_rule(rule_ids[1])
            .with_parameter(param),
        );
    }
}

fn check_sources(graph: &CanonicalGraph, writers: &BTreeMap<&str, Vec<&str>>, errors: &mut Vec<GraphError>) {
    for param in graph.parameters.values() {
        let written = writers.contains_key(param.id.as_str());
        let message = match (param.source, written) {
            (ParamSource::Input, true) => format!("parameter `{}` is marked input but written by a rule", param.id),
            (ParamSource::Derived, false) => format!("parameter `{}` is marked derived but no rule writes it", param.id),
            _ => continue,
        };
        errors.push(GraphError::new(ErrorType::ValidationError, message).with_parameter(param.id.clone()));
    }
}

/// Convenience for callers holding a `GraphErrors`: the tags in order.
pub fn error_types(errors: &GraphErrors) -> Vec<ErrorType> {
    errors.iter().map(|e| e.error_type).collect()
}
