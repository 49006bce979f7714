//! Format A: explicit parameter registry + explicit rule list.
//!
//! ```text
//! { "parameters": { "systolic_pressure": { "type": "number" }, ... },
//!   "rules": [ { "id": "detect_hypertension",
//!                "inputs": ["systolic_pressure", "diastolic_pressure"],
//!                "outputs": ["hypertension"],
//!                "logic": "..." } ] }
//! ```
//!
//! References are validated directly against the registry. The first rule
//! writing a parameter makes it `derived`; later writers are reported as
//! `DuplicateOutput` and never merged.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use rulegraph_model::error::finish;
use rulegraph_model::{
    normalize_id, CanonicalGraph, ErrorType, GraphError, GraphErrors, GraphResult, ParamSource,
    Rule, SourceFormat,
};

use crate::registry::{
    check_declared, id_list, kind_of, logic_text, member, parse_registry, require_object, rule_id,
    Collector, WriterIndex,
};

const FORMAT: SourceFormat = SourceFormat::A;

pub fn normalize(root: &Value) -> GraphResult<CanonicalGraph> {
    let obj = require_object(root, FORMAT)?;
    let (Some(params_value), Some(rules_value)) = (
        member(obj, &["parameters", "params"]),
        member(obj, &["rules"]),
    ) else {
        return Err(GraphErrors::single(
            GraphError::new(
                ErrorType::SchemaMismatch,
                "format A requires top-level `parameters` and `rules`",
            )
            .with_format(FORMAT),
        ));
    };

    let mut out = Collector::new(FORMAT);
    let (mut parameters, _) = parse_registry(params_value, &mut out);

    let entries = rule_entries(rules_value, &mut out);
    let mut rules = BTreeMap::new();
    let mut writers = WriterIndex::default();

    for (position, (key, body)) in entries.into_iter().enumerate() {
        let Some(rule_obj) = body.as_object() else {
            out.push(
                out.error(
                    ErrorType::SchemaMismatch,
                    format!("rule #{} is {}, expected an object", position + 1, kind_of(body)),
                ),
            );
            continue;
        };

        let id = match key.map(|k| normalize_id(&k)).filter(|k| !k.is_empty()) {
            Some(key) => key,
            None => rule_id(Some(rule_obj), &["id", "name"], "rule", position),
        };

        if rules.contains_key(&id) {
            out.push(
                out.error(ErrorType::SchemaMismatch, format!("duplicate rule id `{id}`"))
                    .with_rule(id.clone()),
            );
            continue;
        }

        let inputs = id_list(member(rule_obj, &["inputs", "reads"]), "inputs", &id, &mut out);
        let outputs = id_list(member(rule_obj, &["outputs", "writes"]), "outputs", &id, &mut out);
        check_declared(&parameters, &inputs, "reads", &id, &mut out);
        check_declared(&parameters, &outputs, "writes", &id, &mut out);

        if outputs.is_empty() {
            out.push(
                out.error(ErrorType::RuleNoOutputs, format!("rule `{id}` declares no outputs"))
                    .with_rule(id.clone()),
            );
        }

        for output in &outputs {
            if writers.claim(output, &id, &mut out) {
                if let Some(param) = parameters.get_mut(output) {
                    param.source = ParamSource::Derived;
                }
            }
        }

        let logic = logic_text(member(rule_obj, &["logic", "expression", "code"]));
        rules.insert(id.clone(), Rule::new(id, inputs, outputs, logic));
    }

    debug!(
        parameters = parameters.len(),
        rules = rules.len(),
        derived = parameters.keys().filter(|p| writers.is_written(p)).count(),
        errors = out.len(),
        "format A normalized"
    );

    finish(
        CanonicalGraph {
            parameters,
            rules,
        },
        out.into_errors(),
    )
}

/// Rules as `(explicit key, body)`: an array of rule objects, or an object
/// keyed by rule id.
fn rule_entries<'a>(value: &'a Value, out: &mut Collector) -> Vec<(Option<String>, &'a Value)> {
    match value {
        Value::Array(items) => items.iter().map(|item| (None, item)).collect(),
        Value::Object(map) => map.iter().map(|(k, v)| (Some(k.clone()), v)).collect(),
        other => {
            out.push(out.error(
                ErrorType::SchemaMismatch,
                format!("`rules` must be an array or an object, found {}", kind_of(other)),
            ));
            Vec::new()
        }
    }
}
