//! Integration tests for the complete Rulegraph pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - text → format normalizer → canonical graph
//! - canonical graph → validator
//! - several validated sources → diff → metrics
//! - diff → visual projection → renderer
//!
//! Run with: cargo test --test integration_tests

use async_trait::async_trait;

use rulegraph_diff::{compute_diff, DiffStatus, LabeledGraph};
use rulegraph_ingest::{normalize_text, IngestOptions};
use rulegraph_model::{CanonicalGraph, ErrorType, GraphResult, ParamSource, SourceFormat};
use rulegraph_validate::{topological_order, validate};
use rulegraph_viz::render::render_checked;
use rulegraph_viz::{from_diff, RenderError, RenderedSvg, Renderer, VisualGraph, VizOptions};

// The same BMI knowledge, as four different generators would emit it.

const RULE_LIST: &str = r#"{
    "parameters": {
        "Weight": {"type": "number", "description": "kg"},
        "Height": {"type": "number", "description": "m"},
        "BMI": {"type": "number"},
        "Obese": {"type": "boolean"}
    },
    "rules": [
        {"id": "compute_bmi", "inputs": ["weight", "height"], "outputs": ["bmi"], "logic": "bmi = weight / (height * height);"},
        {"id": "classify", "inputs": ["bmi"], "outputs": ["obese"], "logic": "obese = bmi >= 30;"}
    ]
}"#;

const PIPELINE: &str = r#"{
    "parameters": {"weight": "number", "height": "number", "bmi": "number", "obese": "boolean"},
    "pipeline": [
        {"id": "compute_bmi", "logic": "bmi = weight / (height * height);"},
        {"id": "classify", "logic": "obese = bmi >= 30;"}
    ]
}"#;

const BLOCKS: &str = r#"{"blocks": [
    {
        "id": "compute_bmi",
        "inputs": {"weight": "number", "height": "number"},
        "outputs": {"bmi": "number"},
        "logic": "bmi = weight / (height * height);"
    },
    {
        "id": "classify",
        "inputs": {"bmi": "number"},
        "outputs": {"obese": "boolean"},
        "logic": "obese = bmi > 30;"
    }
]}"#;

const COMPUTED_BY: &str = r#"{
    "parameters": {
        "weight": {"type": "number"},
        "height": {"type": "number"},
        "bmi": {"type": "number", "computed_by": {"inputs": ["weight", "height"], "logic": "bmi = weight / (height * height);"}},
        "obese": {"type": "boolean", "computed_by": "obese = bmi >= 30;"},
        "age": {"type": "number"}
    }
}"#;

fn validate_text(text: &str, options: &IngestOptions) -> GraphResult<CanonicalGraph> {
    validate(normalize_text(text, options)?)
}

fn load(label: &str, text: &str) -> LabeledGraph {
    let graph = validate_text(text, &IngestOptions::default())
        .unwrap_or_else(|errors| panic!("{label} should validate: {errors}"));
    LabeledGraph::new(label, graph)
}

// ============================================================================
// Normalization → validation
// ============================================================================

#[test]
fn every_format_reduces_to_a_valid_graph() {
    for (label, text) in [("A", RULE_LIST), ("B", PIPELINE), ("C", BLOCKS), ("D", COMPUTED_BY)] {
        let source = load(label, text);
        let graph = &source.graph;
        assert_eq!(graph.parameters["bmi"].source, ParamSource::Derived, "{label}");
        assert_eq!(graph.parameters["weight"].source, ParamSource::Input, "{label}");
        assert_eq!(topological_order(graph).unwrap().len(), 2, "{label}");
    }
}

#[test]
fn detection_picks_each_format() {
    let detected: Vec<SourceFormat> = [RULE_LIST, PIPELINE, BLOCKS, COMPUTED_BY]
        .iter()
        .map(|text| {
            let root: serde_json::Value = serde_json::from_str(text).unwrap();
            rulegraph_ingest::detect_format(&root).unwrap()
        })
        .collect();
    assert_eq!(
        detected,
        vec![SourceFormat::A, SourceFormat::B, SourceFormat::C, SourceFormat::D]
    );
}

#[test]
fn canonical_json_round_trips_through_the_validator() {
    let graph = normalize_text(RULE_LIST, &IngestOptions::default()).unwrap();
    let json = serde_json::to_string(&graph).unwrap();
    let back: CanonicalGraph = serde_json::from_str(&json).unwrap();
    assert_eq!(validate(back).unwrap(), graph);

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["parameters"]["weight"]["description"], "kg");
    assert_eq!(value["rules"]["classify"]["outputs"][0], "obese");
}

#[test]
fn errors_serialize_with_location() {
    let text = r#"{"parameters": {"a": "number"}, "rules": [{"id": "r", "inputs": ["a"], "outputs": ["ghost"]}]}"#;
    let errors = normalize_text(text, &IngestOptions::with_format(SourceFormat::A)).unwrap_err();
    let value = serde_json::to_value(&errors).unwrap();
    assert_eq!(value[0]["error_type"], "UndeclaredParameter");
    assert_eq!(value[0]["location"]["format"], "A");
    assert_eq!(value[0]["location"]["rule_id"], "r");
    assert_eq!(value[0]["location"]["parameter"], "ghost");
}

#[test]
fn cycle_survives_normalization_and_fails_validation() {
    let text = r#"{"blocks": [
        {"id": "r1", "inputs": {"a": "number"}, "outputs": {"b": "number"}},
        {"id": "r2", "inputs": {"b": "number"}, "outputs": {"a": "number"}}
    ]}"#;
    assert!(normalize_text(text, &IngestOptions::default()).is_ok());
    let errors = validate_text(text, &IngestOptions::default()).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.errors()[0].error_type, ErrorType::CycleDetected);
}

// ============================================================================
// Diff across formats
// ============================================================================

#[test]
fn four_generators_diff_into_presence_classes() {
    let sources = vec![
        load("gpt", RULE_LIST),
        load("claude", PIPELINE),
        load("gemini", BLOCKS),
        load("llama", COMPUTED_BY),
    ];
    let result = compute_diff(&sources).unwrap();
    let params = &result.graph.parameters;

    assert_eq!(params["bmi"].status, DiffStatus::Common);
    assert_eq!(params["age"].status, DiffStatus::Unique);
    assert_eq!(params["age"].presence.present_in, vec!["llama"]);

    // Every generator agrees on `compute_bmi`, D included.
    let compute = result.graph.rule_versions("compute_bmi");
    assert_eq!(compute.len(), 1);
    assert_eq!(compute[0].status, DiffStatus::Common);

    // C's classify differs from A/B in logic only; D names its rule differently.
    let classify = result.graph.rule_versions("classify");
    assert_eq!(classify.len(), 2);
    let shared = classify.iter().find(|r| r.status == DiffStatus::Partial).unwrap();
    assert_eq!(shared.presence.present_in, vec!["gpt", "claude"]);
    assert!(classify.iter().any(|r| r.status == DiffStatus::Unique && r.presence.contains("gemini")));
    assert_eq!(result.graph.rule_versions("compute_obese")[0].status, DiffStatus::Unique);

    let m = result.metrics;
    for c in [m.parameters, m.rules, m.edges] {
        assert_eq!(c.total, c.common + c.partial + c.unique);
    }
    assert_eq!(m.parameters.total, 5);
    assert_eq!((m.parameters.common, m.parameters.unique), (4, 1));
}

// ============================================================================
// Projection → renderer
// ============================================================================

struct EchoRenderer;

#[async_trait]
impl Renderer for EchoRenderer {
    async fn render(&self, graph: &VisualGraph) -> Result<RenderedSvg, RenderError> {
        Ok(RenderedSvg {
            svg: format!("<svg data-nodes=\"{}\"></svg>", graph.nodes.len()),
            width: 640.0,
            height: 480.0,
        })
    }

    fn name(&self) -> &str {
        "echo"
    }
}

#[tokio::test]
async fn diff_projection_renders_through_collaborator() {
    let sources = vec![load("a", RULE_LIST), load("b", BLOCKS)];
    let diff = compute_diff(&sources).unwrap();
    let visual = from_diff(&diff, &VizOptions::default());
    assert_eq!(visual.nodes.len(), diff.graph.parameters.len() + diff.graph.rules.len());

    let rendered = render_checked(&EchoRenderer, &visual).await.unwrap();
    assert!(rendered.svg.contains(&format!("data-nodes=\"{}\"", visual.nodes.len())));
}
