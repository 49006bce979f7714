//! Format B: explicit parameter registry + ordered pipeline steps.
//!
//! ```text
//! { "parameters": { ... },
//!   "pipeline": [ { "step": "compute_bmi", "logic": "bmi = weight / (height * height);" } ] }
//! ```
//!
//! Steps do not declare dependencies, so each step's logic goes through the
//! heuristic analyzer. Inferred writes must already be registered parameters
//! (`UndeclaredParameter` otherwise). Inferred reads that are not registered
//! parameters are locals or helper names and are dropped. A step may still
//! declare `inputs`/`outputs` explicitly; declared lists win over inference.
//! Duplicate-writer handling matches format A.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use rulegraph_model::error::finish;
use rulegraph_model::{
    analyze_logic, normalize_id, CanonicalGraph, ErrorType, GraphError, GraphErrors, GraphResult,
    ParamSource, Parameter, Rule, SourceFormat,
};

use crate::registry::{
    check_declared, id_list, kind_of, logic_text, member, parse_registry, require_object, rule_id,
    Collector, WriterIndex,
};

const FORMAT: SourceFormat = SourceFormat::B;

pub fn normalize(root: &Value) -> GraphResult<CanonicalGraph> {
    let obj = require_object(root, FORMAT)?;
    let (Some(params_value), Some(steps_value)) = (
        member(obj, &["parameters", "params"]),
        member(obj, &["pipeline", "steps"]),
    ) else {
        return Err(GraphErrors::single(
            GraphError::new(
                ErrorType::SchemaMismatch,
                "format B requires top-level `parameters` and `pipeline`",
            )
            .with_format(FORMAT),
        ));
    };
    let Some(steps) = steps_value.as_array() else {
        return Err(GraphErrors::single(
            GraphError::new(
                ErrorType::SchemaMismatch,
                format!("`pipeline` must be an array, found {}", kind_of(steps_value)),
            )
            .with_format(FORMAT),
        ));
    };

    let mut out = Collector::new(FORMAT);
    let (mut parameters, _) = parse_registry(params_value, &mut out);

    let mut rules = BTreeMap::new();
    let mut writers = WriterIndex::default();

    for (position, step) in steps.iter().enumerate() {
        let (step_obj, logic) = match step {
            Value::Object(o) => (Some(o), logic_text(member(o, &["logic", "code", "expression"]))),
            Value::String(s) => (None, s.clone()),
            other => {
                out.push(out.error(
                    ErrorType::SchemaMismatch,
                    format!("step #{} is {}, expected an object", position + 1, kind_of(other)),
                ));
                continue;
            }
        };

        let id = rule_id(step_obj, &["id", "name", "step"], "step", position);
        if rules.contains_key(&id) {
            out.push(
                out.error(ErrorType::SchemaMismatch, format!("duplicate step id `{id}`"))
                    .with_rule(id.clone()),
            );
            continue;
        }

        let (inputs, outputs) = step_dependencies(step_obj, &logic, &id, &parameters, &mut out);

        if outputs.is_empty() {
            out.push(
                out.error(
                    ErrorType::RuleNoOutputs,
                    format!("step `{id}` writes no declared parameter"),
                )
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

        rules.insert(id.clone(), Rule::new(id, inputs, outputs, logic));
    }

    debug!(
        parameters = parameters.len(),
        rules = rules.len(),
        errors = out.len(),
        "format B normalized"
    );

    finish(
        CanonicalGraph {
            parameters,
            rules,
        },
        out.into_errors(),
    )
}

/// Declared lists when present, otherwise inferred from the logic text.
fn step_dependencies(
    step_obj: Option<&Map<String, Value>>,
    logic: &str,
    id: &str,
    parameters: &BTreeMap<String, Parameter>,
    out: &mut Collector,
) -> (Vec<String>, Vec<String>) {
    let declared_inputs = step_obj.and_then(|o| member(o, &["inputs", "reads"]));
    let declared_outputs = step_obj.and_then(|o| member(o, &["outputs", "writes"]));
    let analysis = analyze_logic(logic);

    let inputs = match declared_inputs {
        Some(value) => {
            let ids = id_list(Some(value), "inputs", id, out);
            check_declared(parameters, &ids, "reads", id, out);
            ids
        }
        None => analysis
            .inputs
            .iter()
            .filter_map(|token| {
                let pid = normalize_id(token);
                if parameters.contains_key(&pid) {
                    Some(pid)
                } else {
                    debug!(step = id, token = token.as_str(), "dropping inferred read of unregistered name");
                    None
                }
            })
            .collect(),
    };

    let outputs = match declared_outputs {
        Some(value) => id_list(Some(value), "outputs", id, out),
        None => analysis
            .outputs
            .iter()
            .map(|token| normalize_id(token))
            .filter(|pid| !pid.is_empty())
            .collect(),
    };
    check_declared(parameters, &outputs, "writes", id, out);

    (inputs, outputs)
}
