//! Format D: per-parameter declarations with `computed_by` entries.
//!
//! ```text
//! { "parameters": {
//!     "weight": { "type": "number" },
//!     "bmi":    { "type": "number",
//!                 "computed_by": [ { "inputs": ["weight", "height"], "logic": "..." } ] } } }
//! ```
//!
//! Every `computed_by` entry of parameter `P` becomes one rule whose only
//! output is `P`. Rule ids are a pure function of `(P, entry index)`:
//! `compute_<P>` for a single entry, `compute_<P>__<n>` (1-based) otherwise.
//! Normalized ids never contain `__`, so ids synthesized for different
//! parameters cannot collide.
//!
//! Several entries for one parameter are accepted here even though they break
//! the single-writer invariant; the validator is the one place that decides.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use rulegraph_model::error::finish;
use rulegraph_model::{
    analyze_logic, normalize_id, CanonicalGraph, ErrorType, GraphError, GraphErrors, GraphResult,
    ParamSource, Parameter, Rule, SourceFormat,
};

use crate::registry::{
    check_declared, id_list, kind_of, logic_text, member, parse_registry, require_object,
    Collector,
};

const FORMAT: SourceFormat = SourceFormat::D;

/// Synthesized id for entry `index` (0-based) of `count` entries on `param`.
pub fn synthesized_rule_id(param: &str, index: usize, count: usize) -> String {
    if count <= 1 {
        format!("compute_{param}")
    } else {
        format!("compute_{param}__{}", index + 1)
    }
}

pub fn normalize(root: &Value) -> GraphResult<CanonicalGraph> {
    let obj = require_object(root, FORMAT)?;
    let Some(params_value) = member(obj, &["parameters", "params"]) else {
        return Err(GraphErrors::single(
            GraphError::new(ErrorType::SchemaMismatch, "format D requires top-level `parameters`")
                .with_format(FORMAT),
        ));
    };

    let mut out = Collector::new(FORMAT);
    let (mut parameters, accepted) = parse_registry(params_value, &mut out);

    // Collect entries first so references can be checked against the full
    // registry. Spellings that merged into one id pool their entries.
    let mut pending: Vec<(String, Vec<&Value>)> = Vec::new();
    for (param_id, decl) in &accepted {
        let entries: Vec<&Value> = decl
            .object()
            .and_then(|o| member(o, &["computed_by", "computedBy"]))
            .map(|v| match v {
                Value::Array(items) => items.iter().collect(),
                single => vec![single],
            })
            .unwrap_or_default();
        if entries.is_empty() {
            continue;
        }
        match pending.iter_mut().find(|(id, _)| id == param_id) {
            Some((_, pooled)) => {
                debug!(parameter = param_id.as_str(), "pooling computed_by entries of merged declaration");
                pooled.extend(entries);
            }
            None => pending.push((param_id.clone(), entries)),
        }
    }

    let mut rules = BTreeMap::new();
    for (param_id, entries) in pending {
        let count = entries.len();
        for (index, entry) in entries.into_iter().enumerate() {
            let id = synthesized_rule_id(&param_id, index, count);
            let Some((inputs, logic)) = entry_dependencies(entry, &id, &param_id, &parameters, &mut out)
            else {
                continue;
            };
            rules.insert(id.clone(), Rule::new(id, inputs, [param_id.clone()], logic));
        }
        if let Some(param) = parameters.get_mut(&param_id) {
            param.source = ParamSource::Derived;
        }
    }

    debug!(
        parameters = parameters.len(),
        rules = rules.len(),
        errors = out.len(),
        "format D normalized"
    );

    finish(
        CanonicalGraph {
            parameters,
            rules,
        },
        out.into_errors(),
    )
}

/// One `computed_by` entry: `{ "inputs": [..], "logic": ".." }` or a bare
/// logic string whose reads are inferred.
fn entry_dependencies(
    entry: &Value,
    id: &str,
    param_id: &str,
    parameters: &BTreeMap<String, Parameter>,
    out: &mut Collector,
) -> Option<(Vec<String>, String)> {
    let (entry_obj, logic): (Option<&Map<String, Value>>, String) = match entry {
        Value::Object(o) => (Some(o), logic_text(member(o, &["logic", "expression", "code"]))),
        Value::String(s) => (None, s.clone()),
        other => {
            out.push(
                out.error(
                    ErrorType::SchemaMismatch,
                    format!("`computed_by` entry of `{param_id}` is {}", kind_of(other)),
                )
                .with_rule(id)
                .with_parameter(param_id),
            );
            return None;
        }
    };

    let inputs = match entry_obj.and_then(|o| member(o, &["inputs", "reads"])) {
        Some(value) => {
            let ids = id_list(Some(value), "inputs", id, out);
            check_declared(parameters, &ids, "reads", id, out);
            ids
        }
        None => analyze_logic(&logic)
            .inputs
            .iter()
            .filter_map(|token| {
                let pid = normalize_id(token);
                if parameters.contains_key(&pid) {
                    Some(pid)
                } else {
                    debug!(rule = id, token = token.as_str(), "dropping inferred read of unregistered name");
                    None
                }
            })
            .collect(),
    };
    Some((inputs, logic))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesized_ids_depend_only_on_parameter_and_index() {
        assert_eq!(synthesized_rule_id("bmi", 0, 1), "compute_bmi");
        assert_eq!(synthesized_rule_id("bmi", 0, 2), "compute_bmi__1");
        assert_eq!(synthesized_rule_id("bmi", 1, 2), "compute_bmi__2");
        assert_ne!(synthesized_rule_id("x_1", 0, 1), synthesized_rule_id("x", 0, 2));
    }
}
