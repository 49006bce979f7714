//! Structured errors shared by every pipeline stage.
//!
//! Failures are values: each stage returns `GraphResult<T>`, where the error
//! side is a non-empty list of [`GraphError`]s. The serialized shape is
//!
//! ```text
//! { "error_type": "CycleDetected",
//!   "message": "...",
//!   "location": { "format": "A", "rule_id": "r1", "parameter": "x" } }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Flat error taxonomy. Serialized by tag name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorType {
    InvalidJson,
    SchemaMismatch,
    UnknownFormat,
    MissingType,
    ConflictingType,
    EmptyParameterName,
    UndeclaredParameter,
    RuleNoOutputs,
    DuplicateOutput,
    CycleDetected,
    BipartiteViolation,
    ValidationError,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::InvalidJson => "InvalidJson",
            ErrorType::SchemaMismatch => "SchemaMismatch",
            ErrorType::UnknownFormat => "UnknownFormat",
            ErrorType::MissingType => "MissingType",
            ErrorType::ConflictingType => "ConflictingType",
            ErrorType::EmptyParameterName => "EmptyParameterName",
            ErrorType::UndeclaredParameter => "UndeclaredParameter",
            ErrorType::RuleNoOutputs => "RuleNoOutputs",
            ErrorType::DuplicateOutput => "DuplicateOutput",
            ErrorType::CycleDetected => "CycleDetected",
            ErrorType::BipartiteViolation => "BipartiteViolation",
            ErrorType::ValidationError => "ValidationError",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four accepted input formats.
///
/// - `A`: explicit parameter registry + explicit rule list
/// - `B`: explicit parameter registry + ordered pipeline steps (dependencies inferred)
/// - `C`: self-contained blocks with typed input/output declarations
/// - `D`: per-parameter declarations with `computed_by` entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceFormat {
    A,
    B,
    C,
    D,
}

impl SourceFormat {
    /// Parse a user-supplied format name (letter or descriptive alias).
    pub fn parse(s: &str) -> Result<Self, GraphError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" | "rules" => Ok(Self::A),
            "b" | "pipeline" | "steps" => Ok(Self::B),
            "c" | "blocks" => Ok(Self::C),
            "d" | "computed_by" | "parameter" | "parameters" => Ok(Self::D),
            other => Err(GraphError::new(
                ErrorType::UnknownFormat,
                format!("unknown input format `{other}` (expected A|B|C|D)"),
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::A => "A",
            SourceFormat::B => "B",
            SourceFormat::C => "C",
            SourceFormat::D => "D",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where in the input (or canonical graph) a problem was detected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<SourceFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

impl ErrorLocation {
    pub fn is_empty(&self) -> bool {
        self.format.is_none() && self.rule_id.is_none() && self.parameter.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphError {
    pub error_type: ErrorType,
    pub message: String,
    #[serde(default)]
    pub location: ErrorLocation,
}

impl GraphError {
    pub fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            message: message.into(),
            location: ErrorLocation::default(),
        }
    }

    pub fn with_format(mut self, format: SourceFormat) -> Self {
        self.location.format = Some(format);
        self
    }

    pub fn with_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.location.rule_id = Some(rule_id.into());
        self
    }

    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.location.parameter = Some(parameter.into());
        self
    }
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.error_type, self.message)?;
        let loc = &self.location;
        if !loc.is_empty() {
            let mut parts = Vec::new();
            if let Some(format) = loc.format {
                parts.push(format!("format={format}"));
            }
            if let Some(rule) = &loc.rule_id {
                parts.push(format!("rule={rule}"));
            }
            if let Some(param) = &loc.parameter {
                parts.push(format!("parameter={param}"));
            }
            write!(f, " ({})", parts.join(", "))?;
        }
        Ok(())
    }
}

/// A non-empty list of structured errors.
///
/// Constructed only through [`GraphErrors::single`] or [`GraphErrors::from_vec`],
/// which refuses an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(transparent)]
#[error("{}", summarize(.0))]
pub struct GraphErrors(Vec<GraphError>);

impl GraphErrors {
    pub fn single(error: GraphError) -> Self {
        Self(vec![error])
    }

    /// `None` when `errors` is empty.
    pub fn from_vec(errors: Vec<GraphError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self(errors))
        }
    }

    pub fn errors(&self) -> &[GraphError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GraphError> {
        self.0.iter()
    }

    pub fn count_of(&self, error_type: ErrorType) -> usize {
        self.0.iter().filter(|e| e.error_type == error_type).count()
    }

    pub fn contains(&self, error_type: ErrorType) -> bool {
        self.count_of(error_type) > 0
    }
}

impl From<GraphError> for GraphErrors {
    fn from(error: GraphError) -> Self {
        Self::single(error)
    }
}

impl<'a> IntoIterator for &'a GraphErrors {
    type Item = &'a GraphError;
    type IntoIter = std::slice::Iter<'a, GraphError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn summarize(errors: &[GraphError]) -> String {
    match errors {
        [] => "no errors".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (+{} more)", rest.len()),
    }
}

pub type GraphResult<T> = Result<T, GraphErrors>;

/// Turn an accumulated error list into a result for `value`.
pub fn finish<T>(value: T, errors: Vec<GraphError>) -> GraphResult<T> {
    match GraphErrors::from_vec(errors) {
        Some(errors) => Err(errors),
        None => Ok(value),
    }
}
