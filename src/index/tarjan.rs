//! Tarjan's strongly connected components, iterative.
//!
//! One DFS with discovery index, low-link, and an explicit on-stack
//! component stack. The root loop and successor lists iterate in sorted
//! name order so reporting order is reproducible across runs.

use std::collections::HashMap;

use petgraph::graph::NodeIndex;

use super::graphs::NamedGraph;

/// All cycles in the graph: every SCC of size > 1, plus size-1 SCCs
/// with a self-loop. Members of each cycle are sorted.
pub fn cycles(graph: &NamedGraph) -> Vec<Vec<String>> {
    strongly_connected_components(graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.has_edge(&scc[0], &scc[0]))
        .collect()
}

/// Every strongly connected component, singletons included.
pub fn strongly_connected_components(graph: &NamedGraph) -> Vec<Vec<String>> {
    let g = graph.graph();
    let n = g.node_count();

    let mut roots: Vec<NodeIndex> = g.node_indices().collect();
    roots.sort_by(|a, b| g[*a].cmp(&g[*b]));

    let mut succ: HashMap<NodeIndex, Vec<NodeIndex>> = HashMap::with_capacity(n);
    for &v in &roots {
        let mut out: Vec<NodeIndex> = g.neighbors(v).collect();
        out.sort_by(|a, b| g[*a].cmp(&g[*b]));
        out.dedup();
        succ.insert(v, out);
    }

    let mut index: Vec<Option<u32>> = vec![None; n];
    let mut lowlink: Vec<u32> = vec![0; n];
    let mut on_stack: Vec<bool> = vec![false; n];
    let mut stack: Vec<NodeIndex> = Vec::new();
    let mut next_index: u32 = 0;
    let mut sccs: Vec<Vec<String>> = Vec::new();

    for &root in &roots {
        if index[root.index()].is_some() {
            continue;
        }
        // Explicit work stack of (node, next-successor position) frames.
        let mut work: Vec<(NodeIndex, usize)> = vec![(root, 0)];
        while let Some(&(v, pos)) = work.last() {
            if pos == 0 && index[v.index()].is_none() {
                index[v.index()] = Some(next_index);
                lowlink[v.index()] = next_index;
                next_index += 1;
                stack.push(v);
                on_stack[v.index()] = true;
            }
            let neighbors = &succ[&v];
            if pos < neighbors.len() {
                if let Some(frame) = work.last_mut() {
                    frame.1 += 1;
                }
                let w = neighbors[pos];
                match index[w.index()] {
                    None => work.push((w, 0)),
                    Some(w_index) => {
                        if on_stack[w.index()] {
                            lowlink[v.index()] = lowlink[v.index()].min(w_index);
                        }
                    }
                }
            } else {
                work.pop();
                if let Some(&(parent, _)) = work.last() {
                    lowlink[parent.index()] = lowlink[parent.index()].min(lowlink[v.index()]);
                }
                if Some(lowlink[v.index()]) == index[v.index()] {
                    let mut component = Vec::new();
                    while let Some(w) = stack.pop() {
                        on_stack[w.index()] = false;
                        component.push(g[w].clone());
                        if w == v {
                            break;
                        }
                    }
                    component.sort_unstable();
                    sccs.push(component);
                }
            }
        }
    }
    sccs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_node_cycle() {
        let mut g = NamedGraph::new();
        g.add_edge("a", "b");
        g.add_edge("b", "a");
        let found = cycles(&g);
        assert_eq!(found, vec![vec!["a".to_string(), "b".to_string()]]);
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let mut g = NamedGraph::new();
        g.add_edge("a", "a");
        assert_eq!(cycles(&g), vec![vec!["a".to_string()]]);
    }

    #[test]
    fn test_acyclic_graph_has_no_cycles() {
        let mut g = NamedGraph::new();
        g.add_edge("a", "b");
        g.add_edge("b", "c");
        g.add_edge("a", "c");
        assert!(cycles(&g).is_empty());
        // every node is still its own SCC
        assert_eq!(strongly_connected_components(&g).len(), 3);
    }

    #[test]
    fn test_nested_components() {
        let mut g = NamedGraph::new();
        g.add_edge("a", "b");
        g.add_edge("b", "c");
        g.add_edge("c", "b");
        g.add_edge("c", "d");
        let found = cycles(&g);
        assert_eq!(found, vec![vec!["b".to_string(), "c".to_string()]]);
    }

    #[test]
    fn test_long_chain_does_not_recurse() {
        // deep path, exercises the explicit work stack
        let mut g = NamedGraph::new();
        for i in 0..2000 {
            g.add_edge(&format!("n{i:05}"), &format!("n{:05}", i + 1));
        }
        assert!(cycles(&g).is_empty());
    }
}
