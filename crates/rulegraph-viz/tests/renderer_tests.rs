use async_trait::async_trait;

use rulegraph_model::{CanonicalGraph, ParamType, Parameter, Rule};
use rulegraph_viz::render::render_checked;
use rulegraph_viz::{from_canonical, RenderError, RenderedSvg, Renderer, VisualGraph, VizOptions};

/// Emits one `<g>` per node, sized by node count.
struct CountingRenderer;

#[async_trait]
impl Renderer for CountingRenderer {
    async fn render(&self, graph: &VisualGraph) -> Result<RenderedSvg, RenderError> {
        tokio::task::yield_now().await;
        let body: String = graph.nodes.iter().map(|n| format!("<g id=\"{}\"/>", n.key)).collect();
        Ok(RenderedSvg {
            svg: format!("<svg>{body}</svg>"),
            width: 100.0 * graph.nodes.len() as f64,
            height: 80.0,
        })
    }

    fn name(&self) -> &str {
        "counting"
    }
}

struct BrokenRenderer;

#[async_trait]
impl Renderer for BrokenRenderer {
    async fn render(&self, _graph: &VisualGraph) -> Result<RenderedSvg, RenderError> {
        Ok(RenderedSvg {
            svg: "digraph {}".to_string(),
            width: 0.0,
            height: 0.0,
        })
    }

    fn name(&self) -> &str {
        "broken"
    }
}

struct OfflineRenderer;

#[async_trait]
impl Renderer for OfflineRenderer {
    async fn render(&self, _graph: &VisualGraph) -> Result<RenderedSvg, RenderError> {
        Err(RenderError::Unavailable("wasm module not loaded".to_string()))
    }

    fn name(&self) -> &str {
        "offline"
    }
}

fn sample() -> VisualGraph {
    let graph = CanonicalGraph::from_parts(
        [
            Parameter::new("a", ParamType::Number),
            Parameter::new("b", ParamType::Boolean).derived(),
        ],
        [Rule::new("check", ["a"], ["b"], "b = a > 1")],
    );
    from_canonical(&graph, &VizOptions::default())
}

#[tokio::test]
async fn renderer_receives_the_projection() {
    let rendered = render_checked(&CountingRenderer, &sample()).await.unwrap();
    assert!(rendered.svg.contains("rule:check"));
    assert_eq!(rendered.width, 300.0);
}

#[tokio::test]
async fn trait_objects_are_supported() {
    let renderers: Vec<Box<dyn Renderer>> = vec![Box::new(CountingRenderer), Box::new(OfflineRenderer)];
    let graph = sample();
    let mut ok = 0;
    for renderer in &renderers {
        if render_checked(renderer.as_ref(), &graph).await.is_ok() {
            ok += 1;
        }
    }
    assert_eq!(ok, 1);
}

#[tokio::test]
async fn malformed_output_is_rejected() {
    let err = render_checked(&BrokenRenderer, &sample()).await.unwrap_err();
    assert!(matches!(err, RenderError::InvalidOutput(_)));
    assert!(err.to_string().contains("broken"));
}

#[tokio::test]
async fn renderer_failures_propagate() {
    let err = render_checked(&OfflineRenderer, &sample()).await.unwrap_err();
    assert!(matches!(err, RenderError::Unavailable(_)));
}
