//! Helpers shared by the format normalizers: error collection, parameter
//! registries, typed declarations, and id lists.
//!
//! Generators are untrusted, so every reader here tolerates the usual shape
//! variations (object-or-array registries, `name`/`id` keys, bare type
//! strings) and turns everything else into a structured error.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::warn;

use rulegraph_model::{normalize_id, ErrorType, GraphError, ParamType, Parameter, SourceFormat};

/// Accumulates errors for one normalization run, tagging each with the format.
#[derive(Debug)]
pub(crate) struct Collector {
    format: SourceFormat,
    errors: Vec<GraphError>,
}

impl Collector {
    pub(crate) fn new(format: SourceFormat) -> Self {
        Self {
            format,
            errors: Vec::new(),
        }
    }

    pub(crate) fn error(&self, error_type: ErrorType, message: impl Into<String>) -> GraphError {
        GraphError::new(error_type, message).with_format(self.format)
    }

    pub(crate) fn push(&mut self, error: GraphError) {
        self.errors.push(error);
    }

    pub(crate) fn into_errors(self) -> Vec<GraphError> {
        self.errors
    }

    pub(crate) fn len(&self) -> usize {
        self.errors.len()
    }
}

/// Fetch a required top-level member, or a single terminating schema error.
pub(crate) fn require_object<'a>(
    root: &'a Value,
    format: SourceFormat,
) -> Result<&'a Map<String, Value>, GraphError> {
    root.as_object().ok_or_else(|| {
        GraphError::new(
            ErrorType::SchemaMismatch,
            format!(
                "format {format} expects a JSON object at the top level, found {}",
                kind_of(root)
            ),
        )
        .with_format(format)
    })
}

/// First present member among `keys`.
pub(crate) fn member<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k)).filter(|v| !v.is_null())
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Read a `type` member into a primitive type.
pub(crate) fn parse_type(value: Option<&Value>) -> Result<ParamType, (ErrorType, String)> {
    match value {
        None | Some(Value::Null) => Err((ErrorType::MissingType, "no type declared".to_string())),
        Some(Value::String(s)) if s.trim().is_empty() => {
            Err((ErrorType::MissingType, "empty type declaration".to_string()))
        }
        Some(Value::String(s)) => ParamType::parse(s).ok_or_else(|| {
            (
                ErrorType::SchemaMismatch,
                format!("unsupported type `{s}` (expected number|boolean|string)"),
            )
        }),
        Some(other) => Err((
            ErrorType::SchemaMismatch,
            format!("type must be a string, found {}", kind_of(other)),
        )),
    }
}

fn description_of(obj: &Map<String, Value>) -> Option<String> {
    obj.get("description")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Logic text: a string, or an array of lines joined with `\n`.
pub(crate) fn logic_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(lines)) => lines
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

/// One typed declaration as it appeared in the document.
#[derive(Debug, Clone)]
pub(crate) struct Declaration<'a> {
    pub raw_name: String,
    /// The declaration body (`{"type": ..}`) or bare type string.
    pub body: &'a Value,
}

impl<'a> Declaration<'a> {
    pub(crate) fn type_value(&self) -> Option<&'a Value> {
        match self.body {
            Value::Object(obj) => obj.get("type"),
            other => Some(other),
        }
    }

    pub(crate) fn description(&self) -> Option<String> {
        self.body.as_object().and_then(description_of)
    }

    pub(crate) fn object(&self) -> Option<&'a Map<String, Value>> {
        self.body.as_object()
    }
}

/// Flatten `{name: decl}` or `[{"name"|"id": .., ..}]` into declarations.
///
/// Array items that are plain strings become declarations with a null body
/// (they will be reported as `MissingType` by the caller).
pub(crate) fn declarations<'a>(
    value: &'a Value,
    what: &str,
    rule_id: Option<&str>,
    out: &mut Collector,
) -> Vec<Declaration<'a>> {
    static NULL: Value = Value::Null;
    let mut decls = Vec::new();
    match value {
        Value::Object(map) => {
            for (name, body) in map {
                decls.push(Declaration {
                    raw_name: name.clone(),
                    body,
                });
            }
        }
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                match item {
                    Value::Object(obj) => match member(obj, &["name", "id"]).and_then(Value::as_str) {
                        Some(name) => decls.push(Declaration {
                            raw_name: name.to_string(),
                            body: item,
                        }),
                        None => {
                            let mut err = out.error(
                                ErrorType::SchemaMismatch,
                                format!("{what} entry #{} has no `name`/`id`", idx + 1),
                            );
                            if let Some(rule) = rule_id {
                                err = err.with_rule(rule);
                            }
                            out.push(err);
                        }
                    },
                    Value::String(name) => decls.push(Declaration {
                        raw_name: name.clone(),
                        body: &NULL,
                    }),
                    other => {
                        let mut err = out.error(
                            ErrorType::SchemaMismatch,
                            format!("{what} entry #{} is {}", idx + 1, kind_of(other)),
                        );
                        if let Some(rule) = rule_id {
                            err = err.with_rule(rule);
                        }
                        out.push(err);
                    }
                }
            }
        }
        other => {
            let mut err = out.error(
                ErrorType::SchemaMismatch,
                format!("{what} must be an object or an array, found {}", kind_of(other)),
            );
            if let Some(rule) = rule_id {
                err = err.with_rule(rule);
            }
            out.push(err);
        }
    }
    decls
}

/// Turn a declaration into a parameter, reporting naming/type problems.
pub(crate) fn declared_parameter(
    decl: &Declaration<'_>,
    rule_id: Option<&str>,
    out: &mut Collector,
) -> Option<Parameter> {
    let id = normalize_id(&decl.raw_name);
    if id.is_empty() {
        let mut err = out
            .error(
                ErrorType::EmptyParameterName,
                format!("parameter name `{}` is empty after normalization", decl.raw_name),
            )
            .with_parameter(decl.raw_name.clone());
        if let Some(rule) = rule_id {
            err = err.with_rule(rule);
        }
        out.push(err);
        return None;
    }

    match parse_type(decl.type_value()) {
        Ok(ty) => Some(Parameter::new(id, ty).with_description(decl.description())),
        Err((error_type, message)) => {
            let mut err = out
                .error(error_type, format!("parameter `{id}`: {message}"))
                .with_parameter(id);
            if let Some(rule) = rule_id {
                err = err.with_rule(rule);
            }
            out.push(err);
            None
        }
    }
}

/// Insert into a registry, merging agreeing duplicates and reporting
/// conflicting ones (the first declared type stands). Returns `false` when
/// the declaration was rejected as a conflict.
pub(crate) fn merge_parameter(
    registry: &mut BTreeMap<String, Parameter>,
    param: Parameter,
    rule_id: Option<&str>,
    out: &mut Collector,
) -> bool {
    match registry.get_mut(&param.id) {
        None => {
            registry.insert(param.id.clone(), param);
            true
        }
        Some(existing) if existing.param_type == param.param_type => {
            match (existing.description.as_deref(), param.description) {
                (None, description) => existing.description = description,
                (Some(kept), Some(dropped)) if kept != dropped => {
                    warn!(
                        parameter = param.id.as_str(),
                        kept,
                        dropped = dropped.as_str(),
                        "discarding differing description of merged parameter"
                    );
                }
                _ => {}
            }
            true
        }
        Some(existing) => {
            let mut err = out
                .error(
                    ErrorType::ConflictingType,
                    format!(
                        "parameter `{}` declared as {} and later as {}",
                        param.id, existing.param_type, param.param_type
                    ),
                )
                .with_parameter(param.id.clone());
            if let Some(rule) = rule_id {
                err = err.with_rule(rule);
            }
            out.push(err);
            false
        }
    }
}

/// Parse the shared explicit registry (formats A, B, D).
///
/// Returns the parameters plus every accepted declaration, merged duplicates
/// included, so callers can read format-specific members (format D's
/// `computed_by`) from each spelling of a parameter.
pub(crate) fn parse_registry<'a>(
    value: &'a Value,
    out: &mut Collector,
) -> (BTreeMap<String, Parameter>, Vec<(String, Declaration<'a>)>) {
    let mut registry = BTreeMap::new();
    let mut accepted = Vec::new();
    for decl in declarations(value, "parameter", None, out) {
        if let Some(param) = declared_parameter(&decl, None, out) {
            let id = param.id.clone();
            if merge_parameter(&mut registry, param, None, out) {
                accepted.push((id, decl));
            }
        }
    }
    (registry, accepted)
}

/// Read an id list (`["a", "b"]` or a bare `"a"`), normalizing each entry.
pub(crate) fn id_list(
    value: Option<&Value>,
    what: &str,
    rule_id: &str,
    out: &mut Collector,
) -> Vec<String> {
    let items: Vec<&Value> = match value {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single @ Value::String(_)) => vec![single],
        Some(other) => {
            out.push(
                out.error(
                    ErrorType::SchemaMismatch,
                    format!("rule `{rule_id}`: {what} must be a list of ids, found {}", kind_of(other)),
                )
                .with_rule(rule_id),
            );
            return Vec::new();
        }
    };

    let mut ids = Vec::new();
    for item in items {
        let Some(raw) = item.as_str() else {
            out.push(
                out.error(
                    ErrorType::SchemaMismatch,
                    format!("rule `{rule_id}`: {what} entries must be strings, found {}", kind_of(item)),
                )
                .with_rule(rule_id),
            );
            continue;
        };
        let id = normalize_id(raw);
        if id.is_empty() {
            out.push(
                out.error(
                    ErrorType::EmptyParameterName,
                    format!("rule `{rule_id}`: {what} entry `{raw}` is empty after normalization"),
                )
                .with_rule(rule_id)
                .with_parameter(raw),
            );
            continue;
        }
        ids.push(id);
    }
    ids
}

/// A rule's id from `keys`, or the positional fallback `<prefix>_<n>`.
pub(crate) fn rule_id(obj: Option<&Map<String, Value>>, keys: &[&str], prefix: &str, position: usize) -> String {
    obj.and_then(|o| member(o, keys))
        .and_then(Value::as_str)
        .map(normalize_id)
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| format!("{prefix}_{}", position + 1))
}

/// Tracks which rule first wrote each parameter.
#[derive(Debug, Default)]
pub(crate) struct WriterIndex {
    first_writer: BTreeMap<String, String>,
}

impl WriterIndex {
    /// Record `rule_id` as a writer of `param`; on a second writer, report
    /// `DuplicateOutput` naming both rules and return `false`.
    pub(crate) fn claim(&mut self, param: &str, rule_id: &str, out: &mut Collector) -> bool {
        match self.first_writer.get(param) {
            None => {
                self.first_writer.insert(param.to_string(), rule_id.to_string());
                true
            }
            Some(first) => {
                out.push(
                    out.error(
                        ErrorType::DuplicateOutput,
                        format!("parameter `{param}` is written by both `{first}` and `{rule_id}`"),
                    )
                    .with_rule(rule_id)
                    .with_parameter(param),
                );
                false
            }
        }
    }

    pub(crate) fn is_written(&self, param: &str) -> bool {
        self.first_writer.contains_key(param)
    }
}

/// Report each id in `ids` missing from `registry` as `UndeclaredParameter`.
pub(crate) fn check_declared(
    registry: &BTreeMap<String, Parameter>,
    ids: &[String],
    what: &str,
    rule_id: &str,
    out: &mut Collector,
) {
    for id in ids {
        if !registry.contains_key(id) {
            out.push(
                out.error(
                    ErrorType::UndeclaredParameter,
                    format!("rule `{rule_id}` {what} undeclared parameter `{id}`"),
                )
                .with_rule(rule_id)
                .with_parameter(id.clone()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registry_accepts_object_and_array_shapes() {
        let mut out = Collector::new(SourceFormat::A);
        let (obj, _) = parse_registry(&json!({"Heart Rate": {"type": "number"}, "ok": "bool"}), &mut out);
        let (arr, _) = parse_registry(
            &json!([{"name": "Heart Rate", "type": "int"}, {"id": "ok", "type": "boolean"}]),
            &mut out,
        );
        assert_eq!(out.len(), 0);
        assert_eq!(obj, arr);
        assert_eq!(obj["heart_rate"].param_type, ParamType::Number);
    }

    #[test]
    fn registry_reports_missing_and_unsupported_types() {
        let mut out = Collector::new(SourceFormat::D);
        let (reg, _) = parse_registry(
            &json!({"a": {"description": "no type"}, "b": {"type": "date"}, "c": "string"}),
            &mut out,
        );
        let errors = out.into_errors();
        assert_eq!(reg.len(), 1);
        assert!(errors.iter().any(|e| e.error_type == ErrorType::MissingType));
        assert!(errors.iter().any(|e| e.error_type == ErrorType::SchemaMismatch));
        assert!(errors.iter().all(|e| e.location.format == Some(SourceFormat::D)));
    }

    #[test]
    fn colliding_names_merge_or_conflict() {
        let mut out = Collector::new(SourceFormat::A);
        let input = json!([
            {"name": "Body Mass", "type": "number"},
            {"name": "body-mass", "type": "number", "description": "kg"},
            {"name": "BODY MASS", "type": "string"}
        ]);
        let (reg, accepted) = parse_registry(&input, &mut out);
        assert_eq!(reg["body_mass"].description.as_deref(), Some("kg"));
        let ids: Vec<&str> = accepted.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["body_mass", "body_mass"]);
        let errors = out.into_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_type, ErrorType::ConflictingType);
    }

    #[test]
    fn id_lists_normalize_and_flag_empty_names() {
        let mut out = Collector::new(SourceFormat::A);
        let ids = id_list(Some(&json!(["Systolic Pressure", "!!", 3])), "inputs", "r", &mut out);
        assert_eq!(ids, vec!["systolic_pressure"]);
        let errors = out.into_errors();
        assert_eq!(errors[0].error_type, ErrorType::EmptyParameterName);
        assert_eq!(errors[1].error_type, ErrorType::SchemaMismatch);
    }

    #[test]
    fn missing_rule_ids_fall_back_to_position() {
        let obj = json!({"logic": "x = 1"});
        assert_eq!(rule_id(obj.as_object(), &["id", "name"], "rule", 2), "rule_3");
        let named = json!({"name": "Detect Fever"});
        assert_eq!(rule_id(named.as_object(), &["id", "name"], "rule", 0), "detect_fever");
    }
}
