//! Graphviz DOT emitter for visual projections.
//!
//! Text only; turning DOT into SVG is left to whatever `Renderer` the caller
//! plugs in (or `dot -Tsvg`).

use rulegraph_viz::{NodeShape, VisualEdge, VisualGraph, VisualNode};

fn dot_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn node_line(n: &VisualNode) -> String {
    let label = match &n.presence {
        Some(presence) => format!("{}\n({presence})", n.label),
        None => n.label.clone(),
    };
    let mut attrs = vec![format!("label=\"{}\"", dot_escape(&label))];
    match n.shape {
        NodeShape::Ellipse => attrs.push("shape=ellipse".to_string()),
        NodeShape::DoubleEllipse => {
            attrs.push("shape=ellipse".to_string());
            attrs.push("peripheries=2".to_string());
        }
        NodeShape::Box => attrs.push("shape=box".to_string()),
    }
    if let Some(style) = n.style {
        attrs.push(format!("style={}", style.line.as_str()));
        attrs.push(format!("color={}", style.color.as_str()));
    }
    format!("  \"{}\" [{}];", dot_escape(&n.key), attrs.join(", "))
}

fn edge_line(e: &VisualEdge) -> String {
    let attrs = match e.style {
        Some(style) => format!(" [style={}, color={}]", style.line.as_str(), style.color.as_str()),
        None => String::new(),
    };
    format!("  \"{}\" -> \"{}\"{attrs};", dot_escape(&e.from), dot_escape(&e.to))
}

pub fn render_dot(g: &VisualGraph) -> String {
    let mut out = String::new();
    out.push_str("digraph rulegraph {\n");
    out.push_str(&format!("  rankdir={};\n", g.rankdir.as_str()));
    out.push_str("  node [fontname=\"Helvetica\"];\n");
    out.push_str("  edge [fontname=\"Helvetica\"];\n\n");
    for n in &g.nodes {
        out.push_str(&node_line(n));
        out.push('\n');
    }
    if !g.edges.is_empty() {
        out.push('\n');
    }
    for e in &g.edges {
        out.push_str(&edge_line(e));
        out.push('\n');
    }
    out.push_str("}\n");
    out
}
