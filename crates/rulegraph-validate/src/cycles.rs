//! Cycle detection and ordering over the induced bipartite graph.
//!
//! Nodes are tagged `GraphNode`s, so a parameter and a rule sharing an id
//! never merge into one vertex. Only edges whose endpoints are declared take
//! part; dangling references are the reference check's concern.

use std::collections::{BTreeMap, BTreeSet};

use rulegraph_model::{CanonicalGraph, ErrorType, GraphError, GraphErrors, GraphNode, GraphResult};

type Adjacency = BTreeMap<GraphNode, Vec<GraphNode>>;

fn adjacency(graph: &CanonicalGraph) -> Adjacency {
    let mut adj: Adjacency = BTreeMap::new();
    for id in graph.parameters.keys() {
        adj.entry(GraphNode::Parameter(id.clone())).or_default();
    }
    for id in graph.rules.keys() {
        adj.entry(GraphNode::Rule(id.clone())).or_default();
    }
    for (from, to) in graph.edges() {
        if adj.contains_key(&from) && adj.contains_key(&to) {
            adj.entry(from).or_default().push(to);
        }
    }
    for targets in adj.values_mut() {
        targets.sort();
        targets.dedup();
    }
    adj
}

/// Every cycle found by a depth-first walk, one `CycleDetected` per back edge.
///
/// The walk starts from nodes in sorted order and visits successors in sorted
/// order, so the reported paths are stable across runs.
pub fn find_cycles(graph: &CanonicalGraph) -> Vec<GraphError> {
    let adj = adjacency(graph);
    let mut done: BTreeSet<&GraphNode> = BTreeSet::new();
    let mut errors = Vec::new();

    for start in adj.keys() {
        if done.contains(start) {
            continue;
        }
        // (node, index of next successor to visit)
        let mut stack: Vec<(&GraphNode, usize)> = vec![(start, 0)];
        let mut on_path: BTreeSet<&GraphNode> = BTreeSet::from([start]);

        while let Some(top) = stack.last_mut() {
            let (node, next) = *top;
            top.1 += 1;
            let successors = adj.get(node).map(Vec::as_slice).unwrap_or(&[]);
            let Some(succ) = successors.get(next) else {
                on_path.remove(node);
                done.insert(node);
                stack.pop();
                continue;
            };

            if on_path.contains(succ) {
                let begin = stack.iter().position(|(n, _)| *n == succ).unwrap_or(0);
                let mut path: Vec<&GraphNode> = stack[begin..].iter().map(|(n, _)| *n).collect();
                path.push(succ);
                errors.push(cycle_error(&path));
            } else if !done.contains(succ) {
                on_path.insert(succ);
                stack.push((succ, 0));
            }
        }
    }
    errors
}

fn cycle_error(path: &[&GraphNode]) -> GraphError {
    let rendered = path.iter().map(|n| n.id()).collect::<Vec<_>>().join(" -> ");
    let mut err = GraphError::new(ErrorType::CycleDetected, format!("cycle detected: {rendered}"));
    if let Some(rule) = path.iter().find(|n| n.is_rule()) {
        err = err.with_rule(rule.id());
    }
    if let Some(param) = path.iter().find(|n| !n.is_rule()) {
        err = err.with_parameter(param.id());
    }
    err
}

/// Rule ids in execution order: a rule comes after every rule that writes one
/// of its inputs. Ties are broken by id. Fails with the cycles when no such
/// order exists.
pub fn topological_order(graph: &CanonicalGraph) -> GraphResult<Vec<String>> {
    let writers = graph.writer_index();

    let mut dependents: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut in_degree: BTreeMap<&str, usize> = graph.rules.keys().map(|id| (id.as_str(), 0)).collect();
    for rule in graph.rules.values() {
        let upstream: BTreeSet<&str> = rule
            .inputs
            .iter()
            .filter_map(|input| writers.get(input.as_str()))
            .flatten()
            .copied()
            .collect();
        for dep in upstream {
            if dependents.entry(dep).or_default().insert(rule.id.as_str()) {
                *in_degree.entry(rule.id.as_str()).or_default() += 1;
            }
        }
    }

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, &degree)| degree == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut order = Vec::with_capacity(graph.rules.len());
    while let Some(id) = ready.pop_first() {
        order.push(id.to_string());
        for next in dependents.get(id).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(next) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(*next);
                }
            }
        }
    }

    if order.len() == graph.rules.len() {
        return Ok(order);
    }
    let cycles = find_cycles(graph);
    match GraphErrors::from_vec(cycles) {
        Some(errors) => Err(errors),
        None => Err(GraphErrors::single(GraphError::new(
            ErrorType::CycleDetected,
            "rules cannot be ordered",
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulegraph_model::{ParamType, Parameter, Rule};

    fn num(id: &str) -> Parameter {
        Parameter::new(id, ParamType::Number)
    }

    #[test]
    fn two_rule_loop_is_one_cycle() {
        let graph = CanonicalGraph::from_parts(
            [num("a").derived(), num("b").derived()],
            [Rule::new("r1", ["a"], ["b"], ""), Rule::new("r2", ["b"], ["a"], "")],
        );
        let cycles = find_cycles(&graph);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].message, "cycle detected: a -> r1 -> b -> r2 -> a");
        assert_eq!(cycles[0].location.rule_id.as_deref(), Some("r1"));
        assert_eq!(cycles[0].location.parameter.as_deref(), Some("a"));
    }

    #[test]
    fn self_loop_through_one_rule() {
        let graph = CanonicalGraph::from_parts(
            [num("counter").derived()],
            [Rule::new("bump", ["counter"], ["counter"], "counter = counter + 1")],
        );
        let cycles = find_cycles(&graph);
        assert_eq!(cycles.len(), 1);
        assert!(cycles[0].message.contains("counter -> bump -> counter"));
    }

    #[test]
    fn diamond_is_acyclic_and_ordered() {
        let graph = CanonicalGraph::from_parts(
            [num("a"), num("b").derived(), num("c").derived(), num("d").derived()],
            [
                Rule::new("z_join", ["b", "c"], ["d"], ""),
                Rule::new("left", ["a"], ["b"], ""),
                Rule::new("right", ["a"], ["c"], ""),
            ],
        );
        assert!(find_cycles(&graph).is_empty());
        assert_eq!(topological_order(&graph).unwrap(), vec!["left", "right", "z_join"]);
    }

    #[test]
    fn ordering_fails_on_cycles() {
        let graph = CanonicalGraph::from_parts(
            [num("a").derived(), num("b").derived()],
            [Rule::new("r1", ["a"], ["b"], ""), Rule::new("r2", ["b"], ["a"], "")],
        );
        let errors = topological_order(&graph).unwrap_err();
        assert!(errors.contains(ErrorType::CycleDetected));
    }
}
