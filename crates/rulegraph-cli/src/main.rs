//! Rulegraph CLI
//!
//! Command-line front end for:
//! - normalizing a generator document (Formats A–D) into a canonical graph
//! - validating it (references, bipartite shape, single writer, acyclicity)
//! - diffing several sources with presence tracking and agreement metrics
//! - projecting a graph or a diff for rendering (DOT or JSON)
//!
//! Results go to stdout as JSON; status lines and logs go to stderr.
//! Set `RULEGRAPH_LOG` (e.g. `debug`, `rulegraph_ingest=trace`) for logs.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use rulegraph_diff::{compute_diff, AgreementMetrics, CategoryMetrics, LabeledGraph};
use rulegraph_ingest::{normalize_text, IngestOptions};
use rulegraph_model::{CanonicalGraph, GraphError, GraphErrors, GraphResult, SourceFormat};
use rulegraph_validate::{topological_order, validate};
use rulegraph_viz::{from_canonical, from_diff, RankDir, VisualGraph, VizOptions};

mod dot;

#[derive(Parser)]
#[command(name = "rulegraph")]
#[command(
    author,
    version,
    about = "Rulegraph: normalize, validate and compare generated rule graphs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Default)]
struct FormatArgs {
    /// Input format (A|B|C|D, or rules|pipeline|blocks|computed_by); auto-detected when omitted
    #[arg(short, long)]
    format: Option<String>,
}

impl FormatArgs {
    fn options(&self) -> Result<IngestOptions> {
        match &self.format {
            None => Ok(IngestOptions::default()),
            Some(raw) => {
                let format = SourceFormat::parse(raw).map_err(|e| anyhow!(e.message))?;
                Ok(IngestOptions::with_format(format))
            }
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a document into the canonical graph (no validation).
    Normalize {
        /// Input JSON document (`-` for stdin)
        input: PathBuf,
        #[command(flatten)]
        format: FormatArgs,
        /// Write the canonical graph here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Normalize and validate a document.
    Validate {
        /// Input JSON document (`-` for stdin)
        input: PathBuf,
        #[command(flatten)]
        format: FormatArgs,
        /// Print rule ids in execution order instead of the graph
        #[arg(long)]
        order: bool,
    },

    /// Compare two or more sources (`label=file`, or just `file` to label by file stem).
    Diff {
        #[arg(required = true, num_args = 2..)]
        sources: Vec<String>,
        #[command(flatten)]
        format: FormatArgs,
        /// Print only the agreement metrics
        #[arg(long)]
        metrics_only: bool,
    },

    /// Project a graph (or a diff) for rendering.
    Viz {
        /// Input JSON document (omit when using --diff)
        input: Option<PathBuf>,
        /// Project a diff of these sources instead (`label=file`...)
        #[arg(long, num_args = 2.., conflicts_with = "input")]
        diff: Vec<String>,
        #[command(flatten)]
        format: FormatArgs,
        /// Output format: dot|json
        #[arg(long, default_value = "dot")]
        out_format: String,
        /// Layout direction: LR|TB
        #[arg(long, default_value = "LR")]
        rankdir: String,
        /// Include parameter descriptions in labels
        #[arg(long)]
        descriptions: bool,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("RULEGRAPH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<ExitCode> {
    init_logging();
    let cli = Cli::parse();

    let clean = match cli.command {
        Commands::Normalize { input, format, out } => cmd_normalize(&input, &format, out.as_deref())?,
        Commands::Validate { input, format, order } => cmd_validate(&input, &format, order)?,
        Commands::Diff {
            sources,
            format,
            metrics_only,
        } => cmd_diff(&sources, &format, metrics_only)?,
        Commands::Viz {
            input,
            diff,
            format,
            out_format,
            rankdir,
            descriptions,
        } => {
            let options = VizOptions {
                include_descriptions: descriptions,
                rankdir: RankDir::parse(&rankdir)
                    .ok_or_else(|| anyhow!("unknown rankdir `{rankdir}` (expected LR|TB)"))?,
            };
            cmd_viz(input.as_deref(), &diff, &format, &out_format, &options)?
        }
    };

    Ok(if clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_normalize(input: &Path, format: &FormatArgs, out: Option<&Path>) -> Result<bool> {
    let text = read_input(input)?;
    match normalize_text(&text, &format.options()?) {
        Ok(graph) => {
            let json = serde_json::to_string_pretty(&graph)?;
            match out {
                Some(path) => {
                    fs::write(path, json + "\n").with_context(|| format!("failed to write {}", path.display()))?;
                    eprintln!("{} {}", "wrote".green().bold(), path.display().to_string().bold());
                }
                None => println!("{json}"),
            }
            eprintln!("{} {}", "ok".green().bold(), summary(&graph));
            Ok(true)
        }
        Err(errors) => {
            report_errors(&input.display().to_string(), &errors)?;
            Ok(false)
        }
    }
}

fn cmd_validate(input: &Path, format: &FormatArgs, order: bool) -> Result<bool> {
    let text = read_input(input)?;
    let graph = match validate_text(&text, &format.options()?) {
        Ok(graph) => graph,
        Err(errors) => {
            report_errors(&input.display().to_string(), &errors)?;
            return Ok(false);
        }
    };

    if order {
        match topological_order(&graph) {
            Ok(ids) => println!("{}", serde_json::to_string_pretty(&ids)?),
            Err(errors) => {
                report_errors(&input.display().to_string(), &errors)?;
                return Ok(false);
            }
        }
    } else {
        println!("{}", serde_json::to_string_pretty(&graph)?);
    }
    eprintln!("{} {} is valid ({})", "ok".green().bold(), input.display(), summary(&graph));
    Ok(true)
}

fn cmd_diff(specs: &[String], format: &FormatArgs, metrics_only: bool) -> Result<bool> {
    let Some(sources) = load_sources(specs, format)? else {
        return Ok(false);
    };
    let result = match compute_diff(&sources) {
        Ok(result) => result,
        Err(errors) => {
            report_errors("diff", &errors)?;
            return Ok(false);
        }
    };

    if metrics_only {
        println!("{}", serde_json::to_string_pretty(&result.metrics)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    print_metrics(&result.metrics);
    Ok(true)
}

fn cmd_viz(
    input: Option<&Path>,
    diff: &[String],
    format: &FormatArgs,
    out_format: &str,
    options: &VizOptions,
) -> Result<bool> {
    let visual: VisualGraph = match (input, diff.is_empty()) {
        (Some(path), true) => {
            let text = read_input(path)?;
            match validate_text(&text, &format.options()?) {
                Ok(graph) => from_canonical(&graph, options),
                Err(errors) => {
                    report_errors(&path.display().to_string(), &errors)?;
                    return Ok(false);
                }
            }
        }
        (None, false) => {
            let Some(sources) = load_sources(diff, format)? else {
                return Ok(false);
            };
            match compute_diff(&sources) {
                Ok(result) => from_diff(&result, options),
                Err(errors) => {
                    report_errors("diff", &errors)?;
                    return Ok(false);
                }
            }
        }
        _ => return Err(anyhow!("viz needs either an input file or --diff sources")),
    };

    match out_format.trim().to_ascii_lowercase().as_str() {
        "dot" => print!("{}", dot::render_dot(&visual)),
        "json" => println!("{}", serde_json::to_string_pretty(&visual)?),
        other => return Err(anyhow!("unknown viz format `{other}` (expected dot|json)")),
    }
    Ok(true)
}

// ============================================================================
// Helpers
// ============================================================================

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Normalize a document, then validate the canonical graph.
fn validate_text(text: &str, options: &IngestOptions) -> GraphResult<CanonicalGraph> {
    validate(normalize_text(text, options)?)
}

/// `label=path`, or a bare path labelled by its file stem.
fn parse_source_spec(spec: &str) -> Result<(String, PathBuf)> {
    if let Some((label, path)) = spec.split_once('=') {
        let label = label.trim();
        if label.is_empty() || path.trim().is_empty() {
            return Err(anyhow!("malformed source `{spec}` (expected label=file)"));
        }
        return Ok((label.to_string(), PathBuf::from(path.trim())));
    }
    let path = PathBuf::from(spec);
    let label = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow!("cannot derive a label from `{spec}`; use label=file"))?;
    Ok((label, path))
}

/// Normalize and validate every source; `None` when any of them failed.
fn load_sources(specs: &[String], format: &FormatArgs) -> Result<Option<Vec<LabeledGraph>>> {
    let options = format.options()?;
    let mut sources = Vec::with_capacity(specs.len());
    let mut failed = false;
    for spec in specs {
        let (label, path) = parse_source_spec(spec)?;
        let text = read_input(&path)?;
        match validate_text(&text, &options) {
            Ok(graph) => {
                tracing::debug!(%label, path = %path.display(), "loaded diff source");
                sources.push(LabeledGraph::new(label, graph));
            }
            Err(errors) => {
                report_errors(&label, &errors)?;
                failed = true;
            }
        }
    }
    Ok(if failed { None } else { Some(sources) })
}

#[derive(Serialize)]
struct ErrorReport<'a> {
    source: &'a str,
    errors: &'a [GraphError],
}

fn report_errors(source: &str, errors: &GraphErrors) -> Result<()> {
    for err in errors {
        eprintln!("{} {}: {}", "error".red().bold(), source.bold(), err);
    }
    eprintln!(
        "{} {} error(s) in {}",
        "failed".red().bold(),
        errors.len(),
        source
    );
    let report = ErrorReport {
        source,
        errors: errors.errors(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn summary(graph: &CanonicalGraph) -> String {
    format!(
        "{} parameters ({} derived), {} rules",
        graph.parameters.len(),
        graph.derived_parameters().count(),
        graph.rules.len()
    )
}

fn print_metrics(metrics: &AgreementMetrics) {
    let line = |name: &str, m: &CategoryMetrics| {
        eprintln!(
            "  {} {:<10} total={:<4} {}={:<4} {}={:<4} {}={:<4} agreement={:.0}%",
            "→".yellow(),
            name,
            m.total,
            "common".bold(),
            m.common,
            "partial".yellow(),
            m.partial,
            "unique".red(),
            m.unique,
            m.agreement_ratio() * 100.0
        );
    };
    eprintln!("{}", "Agreement".green().bold());
    line("parameters", &metrics.parameters);
    line("rules", &metrics.rules);
    line("edges", &metrics.edges);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_specs_accept_labels_and_bare_paths() {
        let (label, path) = parse_source_spec("gpt=out/gpt.json").unwrap();
        assert_eq!(label, "gpt");
        assert_eq!(path, PathBuf::from("out/gpt.json"));

        let (label, _) = parse_source_spec("runs/claude.json").unwrap();
        assert_eq!(label, "claude");

        assert!(parse_source_spec("=x.json").is_err());
        assert!(parse_source_spec("label=").is_err());
    }

    #[test]
    fn format_flag_accepts_aliases() {
        let args = FormatArgs {
            format: Some("pipeline".into()),
        };
        assert_eq!(args.options().unwrap().format, Some(SourceFormat::B));
        let bad = FormatArgs {
            format: Some("yaml".into()),
        };
        assert!(bad.options().is_err());
        assert!(FormatArgs::default().options().unwrap().format.is_none());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
