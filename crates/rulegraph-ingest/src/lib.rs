//! Format normalizers for Rulegraph
//!
//! Reduces generator output in one of four textual JSON formats to a
//! `CanonicalGraph`:
//!
//! | Format | Parameters | Rules |
//! |---|---|---|
//! | A (`rule_list`) | explicit registry | explicit list with inputs/outputs |
//! | B (`pipeline`) | explicit registry | ordered steps, dependencies inferred from logic |
//! | C (`blocks`) | discovered from block declarations | one per block |
//! | D (`computed_by`) | explicit per-parameter declarations | synthesized from `computed_by` entries |
//!
//! Every normalizer is total: it returns the graph or the full list of
//! problems it found. Only an unusable top-level shape stops early, with a
//! single `SchemaMismatch`. Output is deterministic for identical input.
//!
//! **Untrusted boundary**: documents come from independent generators; this
//! crate never executes rule logic, it only mines identifiers from it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use rulegraph_model::{CanonicalGraph, ErrorType, GraphError, GraphErrors, GraphResult, SourceFormat};

pub mod blocks;
pub mod computed_by;
pub mod pipeline;
mod registry;
pub mod rule_list;

/// Options for a normalization run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestOptions {
    /// Explicit format; `None` auto-detects from the document's top-level keys.
    #[serde(default)]
    pub format: Option<SourceFormat>,
}

impl IngestOptions {
    pub fn with_format(format: SourceFormat) -> Self {
        Self {
            format: Some(format),
        }
    }
}

/// Guess the format from the top-level shape.
///
/// `blocks` (or a bare array) → C, `pipeline`/`steps` → B, `rules` → A, a
/// `parameters` registry whose entries carry `computed_by` → D.
pub fn detect_format(root: &Value) -> Result<SourceFormat, GraphError> {
    let obj = match root {
        Value::Array(_) => return Ok(SourceFormat::C),
        Value::Object(obj) => obj,
        _ => {
            return Err(GraphError::new(
                ErrorType::UnknownFormat,
                "cannot detect the format of a document that is neither an object nor an array",
            ))
        }
    };

    if obj.contains_key("blocks") {
        return Ok(SourceFormat::C);
    }
    if obj.contains_key("pipeline") || obj.contains_key("steps") {
        return Ok(SourceFormat::B);
    }
    if obj.contains_key("rules") {
        return Ok(SourceFormat::A);
    }

    let has_computed_by = |decl: &Value| {
        decl.as_object()
            .map(|o| o.contains_key("computed_by") || o.contains_key("computedBy"))
            .unwrap_or(false)
    };
    let params = obj.get("parameters").or_else(|| obj.get("params"));
    let is_param_centric = match params {
        Some(Value::Object(map)) => map.values().any(has_computed_by),
        Some(Value::Array(items)) => items.iter().any(has_computed_by),
        _ => false,
    };
    if is_param_centric {
        return Ok(SourceFormat::D);
    }

    let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
    keys.sort_unstable();
    Err(GraphError::new(
        ErrorType::UnknownFormat,
        format!("no known format matches top-level keys [{}]", keys.join(", ")),
    ))
}

/// Normalize an already-parsed document in the given format.
pub fn normalize_value(root: &Value, format: SourceFormat) -> GraphResult<CanonicalGraph> {
    let result = match format {
        SourceFormat::A => rule_list::normalize(root),
        SourceFormat::B => pipeline::normalize(root),
        SourceFormat::C => blocks::normalize(root),
        SourceFormat::D => computed_by::normalize(root),
    };
    match &result {
        Ok(graph) => info!(
            %format,
            parameters = graph.parameters.len(),
            rules = graph.rules.len(),
            "normalized document"
        ),
        Err(errors) => info!(%format, errors = errors.len(), "normalization rejected document"),
    }
    result
}

/// Parse JSON text and normalize it, detecting the format unless one is given.
pub fn normalize_text(text: &str, options: &IngestOptions) -> GraphResult<CanonicalGraph> {
    let root: Value = serde_json::from_str(text).map_err(|e| {
        GraphErrors::single(GraphError::new(
            ErrorType::InvalidJson,
            format!("document is not valid JSON: {e}"),
        ))
    })?;

    let format = match options.format {
        Some(format) => format,
        None => {
            let detected = detect_format(&root)?;
            debug!(format = %detected, "detected input format");
            detected
        }
    };
    normalize_value(&root, format)
}
