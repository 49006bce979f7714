//! Rulegraph canonical model
//!
//! Every input format produced by an untrusted generator is reduced to one
//! strict representation: a directed, typed, bipartite graph of *parameters*
//! (typed facts) and *rules* (deterministic transformations between facts).
//!
//! This crate holds the pieces every other stage depends on:
//! - the canonical data model (`graph`),
//! - the flat error taxonomy and structured error (`error`),
//! - identifier canonicalization (`ident`),
//! - heuristic read/write extraction from opaque logic text (`logic`),
//! - stable, non-cryptographic digests used for synthesized ids (`digest`).
//!
//! Nothing here executes or interprets rule logic.

pub mod digest;
pub mod error;
pub mod graph;
pub mod ident;
pub mod logic;

pub use error::{ErrorLocation, ErrorType, GraphError, GraphErrors, GraphResult, SourceFormat};
pub use graph::{CanonicalGraph, GraphNode, ParamSource, ParamType, Parameter, Rule};
pub use ident::{is_valid_id, normalize_id};
pub use logic::{analyze_logic, LogicAnalysis};
