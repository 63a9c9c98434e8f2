//! Construction ordering
//!
//! Kahn's algorithm over the reference map. Among directives that are ready at
//! the same time, the one discovered first goes first, so identical documents
//! always construct in the same order.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::error::{BuildError, BuildResult};
use super::graph::ReferenceMap;
use super::path::StructuralPath;

/// Order directive paths so every path follows all of its dependencies.
pub fn construction_order(graph: &ReferenceMap) -> BuildResult<Vec<StructuralPath>> {
    let count = graph.len();
    let mut pending = vec![0usize; count];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];

    for (node, (_, deps)) in graph.iter().enumerate() {
        for dep in deps {
            let Some(dep) = graph.ordinal(dep) else {
                continue;
            };
            pending[node] += 1;
            dependents[dep].push(node);
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = pending
        .iter()
        .enumerate()
        .filter(|(_, waiting)| **waiting == 0)
        .map(|(node, _)| Reverse(node))
        .collect();

    let mut order = Vec::with_capacity(count);
    while let Some(Reverse(node)) = ready.pop() {
        order.push(node);
        for &dependent in &dependents[node] {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    if order.len() < count {
        let cycle = find_cycle(graph, &pending);
        let path = cycle.first().cloned().unwrap_or_else(StructuralPath::root);
        return Err(BuildError::CyclicReference { path, cycle });
    }

    Ok(order
        .into_iter()
        .filter_map(|node| graph.path(node).cloned())
        .collect())
}

/// Walk unfinished nodes until one repeats.
///
/// Every unfinished node still waits on at least one unfinished dependency, so
/// following the lowest such dependency must revisit a node.
fn find_cycle(graph: &ReferenceMap, pending: &[usize]) -> Vec<StructuralPath> {
    let Some(start) = pending.iter().position(|waiting| *waiting > 0) else {
        return Vec::new();
    };

    let mut trail: Vec<usize> = Vec::new();
    let mut current = start;
    loop {
        if let Some(pos) = trail.iter().position(|&seen| seen == current) {
            let mut cycle: Vec<StructuralPath> = trail[pos..]
                .iter()
                .filter_map(|&node| graph.path(node).cloned())
                .collect();
            if let Some(first) = cycle.first().cloned() {
                cycle.push(first);
            }
            return cycle;
        }
        trail.push(current);

        let next = graph
            .path(current)
            .and_then(|path| graph.dependencies(path.as_str()))
            .and_then(|deps| {
                deps.iter()
                    .filter_map(|dep| graph.ordinal(dep))
                    .filter(|&dep| pending[dep] > 0)
                    .min()
            });
        match next {
            Some(next) => current = next,
            None => return trail.iter().filter_map(|&n| graph.path(n).cloned()).collect(),
        }
    }
}
