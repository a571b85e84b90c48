//! Graph engines for dependency analysis
//!
//! Cycle detection and ordering over module import graphs. Callers depend
//! only on the `GraphEngine` trait; the native DFS engine is always
//! available, and the `advanced-graph` feature adds a petgraph-backed
//! engine with SCC-based cycle detection and a modularity metric.

use std::collections::HashMap;

/// Directed graph over module names.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    nodes: Vec<String>,
    index: HashMap<String, usize>,
    edges: Vec<Vec<usize>>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(name.to_string());
        self.index.insert(name.to_string(), idx);
        self.edges.push(Vec::new());
        idx
    }

    pub fn add_edge(&mut self, from: &str, to: &str) {
        let from = self.add_node(from);
        let to = self.add_node(to);
        if !self.edges[from].contains(&to) {
            self.edges[from].push(to);
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    fn name(&self, idx: usize) -> &str {
        &self.nodes[idx]
    }

    pub fn neighbors(&self, idx: usize) -> &[usize] {
        &self.edges[idx]
    }
}

/// Capability interface for graph algorithms.
pub trait GraphEngine {
    fn name(&self) -> &'static str;

    /// All distinct import cycles, each reported once as a node sequence
    /// starting at its smallest-index member.
    fn find_cycles(&self, graph: &ModuleGraph) -> Vec<Vec<String>>;

    /// Topological order, or `None` when the graph is cyclic.
    fn topological_order(&self, graph: &ModuleGraph) -> Option<Vec<String>>;

    /// Modularity of a community partition, when the engine supports it.
    fn modularity(&self, _graph: &ModuleGraph) -> Option<f64> {
        None
    }
}

/// DFS-based engine with no external dependencies.
pub struct NativeGraphEngine;

impl GraphEngine for NativeGraphEngine {
    fn name(&self) -> &'static str {
        "native"
    }

    fn find_cycles(&self, graph: &ModuleGraph) -> Vec<Vec<String>> {
        let n = graph.node_count();
        let mut color = vec![0u8; n]; // 0 white, 1 gray, 2 black
        let mut stack: Vec<usize> = Vec::new();
        let mut cycles: Vec<Vec<usize>> = Vec::new();

        fn visit(
            graph: &ModuleGraph,
            node: usize,
            color: &mut [u8],
            stack: &mut Vec<usize>,
            cycles: &mut Vec<Vec<usize>>,
        ) {
            color[node] = 1;
            stack.push(node);

            for &next in graph.neighbors(node) {
                if color[next] == 0 {
                    visit(graph, next, color, stack, cycles);
                } else if color[next] == 1 {
                    // Back edge closes a cycle: slice the stack from `next`.
                    if let Some(pos) = stack.iter().position(|&s| s == next) {
                        cycles.push(stack[pos..].to_vec());
                    }
                }
            }

            stack.pop();
            color[node] = 2;
        }

        for start in 0..n {
            if color[start] == 0 {
                visit(graph, start, &mut color, &mut stack, &mut cycles);
            }
        }

        dedupe_cycles(graph, cycles)
    }

    fn topological_order(&self, graph: &ModuleGraph) -> Option<Vec<String>> {
        let n = graph.node_count();
        let mut in_degree = vec![0usize; n];
        for node in 0..n {
            for &next in graph.neighbors(node) {
                in_degree[next] += 1;
            }
        }

        let mut queue: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);

        while let Some(node) = queue.pop() {
            order.push(node);
            for &next in graph.neighbors(node) {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push(next);
                }
            }
        }

        if order.len() != n {
            return None;
        }
        Some(order.into_iter().map(|i| graph.name(i).to_string()).collect())
    }
}

/// Canonicalize cycles (rotate to smallest index) and drop duplicates.
fn dedupe_cycles(graph: &ModuleGraph, cycles: Vec<Vec<usize>>) -> Vec<Vec<String>> {
    let mut seen: Vec<Vec<usize>> = Vec::new();

    for cycle in cycles {
        if cycle.is_empty() {
            continue;
        }
        let min_pos = cycle
            .iter()
            .enumerate()
            .min_by_key(|(_, &v)| v)
            .map(|(i, _)| i)
            .unwrap_or(0);
        let mut rotated = Vec::with_capacity(cycle.len());
        rotated.extend_from_slice(&cycle[min_pos..]);
        rotated.extend_from_slice(&cycle[..min_pos]);

        if !seen.contains(&rotated) {
            seen.push(rotated);
        }
    }

    seen.into_iter()
        .map(|cycle| cycle.into_iter().map(|i| graph.name(i).to_string()).collect())
        .collect()
}

#[cfg(feature = "advanced-graph")]
pub use advanced::PetgraphEngine;

#[cfg(feature = "advanced-graph")]
mod advanced {
    use super::{GraphEngine, ModuleGraph};
    use petgraph::algo::{tarjan_scc, toposort};
    use petgraph::graph::{DiGraph, NodeIndex};
    use std::collections::HashMap;

    /// Petgraph-backed engine: SCC-based cycle detection plus a modularity
    /// score over a label-propagation community pass.
    pub struct PetgraphEngine;

    fn build(graph: &ModuleGraph) -> (DiGraph<String, ()>, Vec<NodeIndex>) {
        let mut pg = DiGraph::new();
        let indices: Vec<NodeIndex> = graph
            .nodes()
            .iter()
            .map(|name| pg.add_node(name.clone()))
            .collect();
        for from in 0..graph.node_count() {
            for &to in graph.neighbors(from) {
                pg.add_edge(indices[from], indices[to], ());
            }
        }
        (pg, indices)
    }

    impl GraphEngine for PetgraphEngine {
        fn name(&self) -> &'static str {
            "petgraph"
        }

        fn find_cycles(&self, graph: &ModuleGraph) -> Vec<Vec<String>> {
            let (pg, _) = build(graph);
            tarjan_scc(&pg)
                .into_iter()
                .filter(|scc| {
                    scc.len() > 1
                        || scc
                            .first()
                            .map(|&n| pg.find_edge(n, n).is_some())
                            .unwrap_or(false)
                })
                .map(|scc| {
                    let mut names: Vec<String> =
                        scc.iter().map(|&n| pg[n].clone()).collect();
                    names.sort();
                    names
                })
                .collect()
        }

        fn topological_order(&self, graph: &ModuleGraph) -> Option<Vec<String>> {
            let (pg, _) = build(graph);
            toposort(&pg, None)
                .ok()
                .map(|order| order.into_iter().map(|n| pg[n].clone()).collect())
        }

        fn modularity(&self, graph: &ModuleGraph) -> Option<f64> {
            let m = graph.edge_count() as f64;
            if m == 0.0 {
                return Some(0.0);
            }

            // One label-propagation pass over the undirected view.
            let n = graph.node_count();
            let mut labels: Vec<usize> = (0..n).collect();
            let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); n];
            for from in 0..n {
                for &to in graph.neighbors(from) {
                    neighbors[from].push(to);
                    neighbors[to].push(from);
                }
            }

            for _ in 0..10 {
                let mut changed = false;
                for node in 0..n {
                    let mut counts: HashMap<usize, usize> = HashMap::new();
                    for &nb in &neighbors[node] {
                        *counts.entry(labels[nb]).or_insert(0) += 1;
                    }
                    if let Some((&best, _)) = counts
                        .iter()
                        .max_by_key(|(&label, &count)| (count, std::cmp::Reverse(label)))
                    {
                        if best != labels[node] {
                            labels[node] = best;
                            changed = true;
                        }
                    }
                }
                if !changed {
                    break;
                }
            }

            // Q = (1/m) * sum over edges within a community of
            //     (1 - k_i*k_j / (2m)) using the undirected degree form.
            let degree: Vec<f64> = neighbors.iter().map(|nb| nb.len() as f64).collect();
            let two_m = 2.0 * m;
            let mut q = 0.0;
            for from in 0..n {
                for &to in graph.neighbors(from) {
                    if labels[from] == labels[to] {
                        q += 1.0 - degree[from] * degree[to] / two_m;
                    }
                }
            }
            Some(q / m)
        }
    }
}

/// Engine selected by build configuration.
pub fn default_engine() -> Box<dyn GraphEngine> {
    #[cfg(feature = "advanced-graph")]
    {
        Box::new(PetgraphEngine)
    }
    #[cfg(not(feature = "advanced-graph"))]
    {
        Box::new(NativeGraphEngine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &str)]) -> ModuleGraph {
        let mut g = ModuleGraph::new();
        for &(from, to) in edges {
            g.add_edge(from, to);
        }
        g
    }

    #[test]
    fn test_acyclic_graph_has_no_cycles() {
        let g = graph(&[("a", "b"), ("b", "c"), ("a", "c")]);
        let engine = NativeGraphEngine;
        assert!(engine.find_cycles(&g).is_empty());

        let order = engine.topological_order(&g).expect("acyclic graph has order");
        let pos = |name: &str| order.iter().position(|n| n == name).expect("node in order");
        assert!(pos("a") < pos("b"));
        assert!(pos("b") < pos("c"));
    }

    #[test]
    fn test_two_node_cycle_detected() {
        let g = graph(&[("a", "b"), ("b", "a")]);
        let engine = NativeGraphEngine;

        let cycles = engine.find_cycles(&g);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 2);
        assert!(engine.topological_order(&g).is_none());
    }

    #[test]
    fn test_self_loop_detected() {
        let g = graph(&[("a", "a")]);
        let cycles = NativeGraphEngine.find_cycles(&g);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0], vec!["a".to_string()]);
    }

    #[test]
    fn test_cycle_reported_once() {
        // a -> b -> c -> a reachable from two entry points.
        let g = graph(&[("x", "a"), ("y", "a"), ("a", "b"), ("b", "c"), ("c", "a")]);
        let cycles = NativeGraphEngine.find_cycles(&g);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 3);
    }

    #[test]
    fn test_duplicate_edges_ignored() {
        let mut g = ModuleGraph::new();
        g.add_edge("a", "b");
        g.add_edge("a", "b");
        assert_eq!(g.edge_count(), 1);
    }

    #[cfg(feature = "advanced-graph")]
    #[test]
    fn test_petgraph_engine_agrees_on_cycles() {
        let g = graph(&[("a", "b"), ("b", "a"), ("b", "c")]);
        let native = NativeGraphEngine.find_cycles(&g);
        let advanced = PetgraphEngine.find_cycles(&g);
        assert_eq!(native.len(), advanced.len());
        assert!(PetgraphEngine.modularity(&g).is_some());
    }
}
