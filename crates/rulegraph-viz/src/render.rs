//! Renderer collaborator boundary.
//!
//! A renderer turns a `VisualGraph` into SVG asynchronously (a Graphviz WASM
//! module, a subprocess, a remote service). Callers assume nothing about its
//! latency beyond "it returns a result or fails".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::VisualGraph;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedSvg {
    pub svg: String,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("renderer unavailable: {0}")]
    Unavailable(String),
    #[error("layout failed: {0}")]
    Layout(String),
    #[error("invalid renderer output: {0}")]
    InvalidOutput(String),
}

#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, graph: &VisualGraph) -> Result<RenderedSvg, RenderError>;

    fn name(&self) -> &str;
}

/// Render with `renderer`, rejecting output without an `<svg` root or with
/// non-positive dimensions.
pub async fn render_checked<R>(renderer: &R, graph: &VisualGraph) -> Result<RenderedSvg, RenderError>
where
    R: Renderer + ?Sized,
{
    let rendered = renderer.render(graph).await?;
    if !rendered.svg.contains("<svg") {
        return Err(RenderError::InvalidOutput(format!(
            "{} returned no <svg> element",
            renderer.name()
        )));
    }
    if !(rendered.width > 0.0 && rendered.height > 0.0) {
        return Err(RenderError::InvalidOutput(format!(
            "{} returned a {}x{} drawing",
            renderer.name(),
            rendered.width,
            rendered.height
        )));
    }
    tracing::debug!(
        renderer = renderer.name(),
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "rendered graph"
    );
    Ok(rendered)
}
