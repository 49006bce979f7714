//! Format C: self-contained blocks, each declaring its typed inputs/outputs.
//!
//! ```text
//! { "blocks": [ { "name": "bmi_block",
//!                 "inputs":  { "weight": "number", "height": "number" },
//!                 "outputs": [ { "name": "bmi", "type": "number" } ],
//!                 "logic": "bmi = weight / (height * height);" } ] }
//! ```
//!
//! There is no registry: parameters are discovered as the union of every
//! block's declarations. A later block redeclaring a known parameter with a
//! different type is a `ConflictingType` error (the first type stands). A
//! parameter becomes `derived` as soon as any block lists it as an output.
//! A bare top-level array is accepted as the block list.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use rulegraph_model::error::finish;
use rulegraph_model::{
    CanonicalGraph, ErrorType, GraphError, GraphErrors, GraphResult, ParamSource, Parameter, Rule,
    SourceFormat,
};

use crate::registry::{
    declarations, declared_parameter, kind_of, logic_text, member, merge_parameter, rule_id,
    Collector,
};

const FORMAT: SourceFormat = SourceFormat::C;

pub fn normalize(root: &Value) -> GraphResult<CanonicalGraph> {
    let blocks = match root {
        Value::Array(items) => items,
        Value::Object(obj) => match member(obj, &["blocks"]) {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(GraphErrors::single(
                    GraphError::new(
                        ErrorType::SchemaMismatch,
                        format!("`blocks` must be an array, found {}", kind_of(other)),
                    )
                    .with_format(FORMAT),
                ))
            }
            None => {
                return Err(GraphErrors::single(
                    GraphError::new(ErrorType::SchemaMismatch, "format C requires top-level `blocks`")
                        .with_format(FORMAT),
                ))
            }
        },
        other => {
            return Err(GraphErrors::single(
                GraphError::new(
                    ErrorType::SchemaMismatch,
                    format!("format C expects an object or an array, found {}", kind_of(other)),
                )
                .with_format(FORMAT),
            ))
        }
    };

    let mut out = Collector::new(FORMAT);
    let mut parameters: BTreeMap<String, Parameter> = BTreeMap::new();
    let mut rules = BTreeMap::new();

    for (position, block) in blocks.iter().enumerate() {
        let Some(block_obj) = block.as_object() else {
            out.push(out.error(
                ErrorType::SchemaMismatch,
                format!("block #{} is {}, expected an object", position + 1, kind_of(block)),
            ));
            continue;
        };

        let id = rule_id(Some(block_obj), &["id", "name", "block"], "block", position);
        if rules.contains_key(&id) {
            out.push(
                out.error(ErrorType::SchemaMismatch, format!("duplicate block id `{id}`"))
                    .with_rule(id.clone()),
            );
            continue;
        }

        let inputs = discover(block_obj.get("inputs"), "inputs", &id, &mut parameters, &mut out);
        let outputs = discover(block_obj.get("outputs"), "outputs", &id, &mut parameters, &mut out);

        if outputs.is_empty() {
            out.push(
                out.error(ErrorType::RuleNoOutputs, format!("block `{id}` declares no outputs"))
                    .with_rule(id.clone()),
            );
        }
        for output in &outputs {
            if let Some(param) = parameters.get_mut(output) {
                param.source = ParamSource::Derived;
            }
        }

        let logic = logic_text(member(block_obj, &["logic", "code", "expression"]));
        rules.insert(id.clone(), Rule::new(id, inputs, outputs, logic));
    }

    debug!(
        parameters = parameters.len(),
        rules = rules.len(),
        errors = out.len(),
        "format C normalized"
    );

    finish(
        CanonicalGraph {
            parameters,
            rules,
        },
        out.into_errors(),
    )
}

/// Register one side of a block's typed declarations; returns the ids that
/// resolved to a usable parameter.
fn discover(
    value: Option<&Value>,
    what: &str,
    block_id: &str,
    parameters: &mut BTreeMap<String, Parameter>,
    out: &mut Collector,
) -> Vec<String> {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return Vec::new();
    };

    let mut ids = Vec::new();
    for decl in declarations(value, what, Some(block_id), out) {
        let Some(param) = declared_parameter(&decl, Some(block_id), out) else {
            continue;
        };
        let id = param.id.clone();
        merge_parameter(parameters, param, Some(block_id), out);
        ids.push(id);
    }
    ids
}
