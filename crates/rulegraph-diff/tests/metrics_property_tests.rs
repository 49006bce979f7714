use proptest::prelude::*;

use rulegraph_diff::{compute_diff, DiffStatus, LabeledGraph};
use rulegraph_model::{CanonicalGraph, ParamType, Parameter, Rule};

const POOL: [&str; 5] = ["a", "b", "c", "d", "e"];

fn graph_strategy() -> impl Strategy<Value = CanonicalGraph> {
    (
        prop::collection::btree_set(0..POOL.len(), 0..=POOL.len()),
        prop::collection::vec((0..POOL.len(), 0..POOL.len(), 0..2u8), 0..4),
    )
        .prop_map(|(params, rules)| {
            let parameters = params.into_iter().map(|i| Parameter::new(POOL[i], ParamType::Number));
            let rules = rules.into_iter().enumerate().map(|(n, (i, o, variant))| {
                Rule::new(format!("r{n}"), [POOL[i]], [POOL[o]], format!("v{variant}"))
            });
            CanonicalGraph::from_parts(parameters, rules)
        })
}

proptest! {
    #[test]
    fn counts_always_partition_each_category(graphs in prop::collection::vec(graph_strategy(), 2..5)) {
        let sources: Vec<LabeledGraph> = graphs
            .into_iter()
            .enumerate()
            .map(|(i, g)| LabeledGraph::new(format!("s{i}"), g))
            .collect();
        let result = compute_diff(&sources).unwrap();
        let m = result.metrics;
        for c in [m.parameters, m.rules, m.edges] {
            prop_assert_eq!(c.total, c.common + c.partial + c.unique);
        }
        prop_assert_eq!(m.parameters.total, result.graph.parameters.len());
        prop_assert_eq!(m.rules.total, result.graph.rules.len());
        prop_assert_eq!(m.edges.total, result.graph.edges.len());

        for param in result.graph.parameters.values() {
            let n = param.presence.count();
            prop_assert!(n >= 1 && n <= sources.len());
            let expected = if n == sources.len() {
                DiffStatus::Common
            } else if n == 1 {
                DiffStatus::Unique
            } else {
                DiffStatus::Partial
            };
            prop_assert_eq!(param.status, expected);
        }
    }
}
