//! Dependency graph construction, critical path, and cycle detection.
//!
//! Edges run from a dependency to the issue that declares it, so a path reads
//! in the order work has to happen.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::core::types::{DependencyGraph, Edge, SubIssue};

/// Build the graph over discovered sub-issues.
///
/// Dependencies pointing outside the discovered set are dropped silently.
pub fn build_graph(sub_issues: &[SubIssue]) -> DependencyGraph {
    let nodes: Vec<u64> = sub_issues.iter().map(|issue| issue.number).collect();
    let known: HashSet<u64> = nodes.iter().copied().collect();

    let mut edges = Vec::new();
    for issue in sub_issues {
        for &dep in &issue.dependencies {
            if known.contains(&dep) {
                edges.push(Edge {
                    from: dep,
                    to: issue.number,
                });
            }
        }
    }

    let open: Vec<u64> = sub_issues
        .iter()
        .filter(|issue| issue.is_open())
        .map(|issue| issue.number)
        .collect();
    let critical_path = critical_path(&open, &edges);
    let cycles = find_cycles(&nodes, &edges);

    DependencyGraph {
        nodes,
        edges,
        critical_path,
        cycles,
    }
}

/// Longest chain through the subgraph induced by `open`.
///
/// Exhaustive DFS from every open node; each recursive branch gets its own
/// copy of the visited set, so sibling branches never cut each other short.
/// Cost grows quickly with graph size, which is fine for tens of nodes.
/// Ties keep the path found first.
pub fn critical_path(open: &[u64], edges: &[Edge]) -> Vec<u64> {
    let open_set: HashSet<u64> = open.iter().copied().collect();
    let mut adjacency: BTreeMap<u64, Vec<u64>> =
        open.iter().map(|&node| (node, Vec::new())).collect();
    for edge in edges {
        if open_set.contains(&edge.from)
            && open_set.contains(&edge.to)
            && let Some(next) = adjacency.get_mut(&edge.from)
        {
            next.push(edge.to);
        }
    }

    let mut longest = Vec::new();
    for &start in open {
        let path = longest_from(start, &adjacency, HashSet::new());
        if path.len() > longest.len() {
            longest = path;
        }
    }
    longest
}

fn longest_from(
    node: u64,
    adjacency: &BTreeMap<u64, Vec<u64>>,
    mut visited: HashSet<u64>,
) -> Vec<u64> {
    if !visited.insert(node) {
        return Vec::new();
    }

    let mut longest = vec![node];
    for &next in adjacency.get(&node).into_iter().flatten() {
        let tail = longest_from(next, adjacency, visited.clone());
        if tail.len() + 1 > longest.len() {
            longest = std::iter::once(node).chain(tail).collect();
        }
    }
    longest
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Find dependency cycles among `nodes`.
///
/// Each cycle is reported once (by node set) as a path that closes back on its
/// first node, e.g. `[3, 5, 3]`.
pub fn find_cycles(nodes: &[u64], edges: &[Edge]) -> Vec<Vec<u64>> {
    let mut adjacency: BTreeMap<u64, Vec<u64>> =
        nodes.iter().map(|&node| (node, Vec::new())).collect();
    for edge in edges {
        if let Some(next) = adjacency.get_mut(&edge.from) {
            next.push(edge.to);
        }
    }

    let mut marks: BTreeMap<u64, Mark> = nodes.iter().map(|&n| (n, Mark::Unvisited)).collect();
    let mut stack = Vec::new();
    let mut seen: BTreeSet<Vec<u64>> = BTreeSet::new();
    let mut cycles = Vec::new();

    for &node in nodes {
        if marks.get(&node) == Some(&Mark::Unvisited) {
            visit(
                node,
                &adjacency,
                &mut marks,
                &mut stack,
                &mut seen,
                &mut cycles,
            );
        }
    }
    cycles
}

fn visit(
    node: u64,
    adjacency: &BTreeMap<u64, Vec<u64>>,
    marks: &mut BTreeMap<u64, Mark>,
    stack: &mut Vec<u64>,
    seen: &mut BTreeSet<Vec<u64>>,
    cycles: &mut Vec<Vec<u64>>,
) {
    marks.insert(node, Mark::InProgress);
    stack.push(node);

    for &next in adjacency.get(&node).into_iter().flatten() {
        match marks.get(&next).copied().unwrap_or(Mark::Done) {
            Mark::Unvisited => visit(next, adjacency, marks, stack, seen, cycles),
            Mark::InProgress => {
                if let Some(start) = stack.iter().position(|&n| n == next) {
                    let mut cycle = stack[start..].to_vec();
                    let mut key = cycle.clone();
                    key.sort_unstable();
                    if seen.insert(key) {
                        cycle.push(next);
                        cycles.push(cycle);
                    }
                }
            }
            Mark::Done => {}
        }
    }

    stack.pop();
    marks.insert(node, Mark::Done);
}
