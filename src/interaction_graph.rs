//! The signed influence graph of a Boolean network, and graph algorithms that
//! the succession diagram relies on: strongly connected components, backward
//! closures, source detection and the feedback vertex set heuristic.
//!
//! The graph is derived semantically from the update function BDDs, so
//! syntactic arguments that have no actual influence do not produce edges.

use crate::symbolic::SymbolicFunctions;

use std::collections::{BTreeSet, HashSet};

/// Monotonicity of one influence edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sign {
    Positive,
    Negative,
    /// Non-monotonous influence; counts as both positive and negative.
    Dual,
}

/// A signed directed graph over the network variables.
pub struct InfluenceGraph {
    names: Vec<String>,
    /// `targets[u]` lists `(v, sign)` edges `u -> v`.
    targets: Vec<Vec<(usize, Sign)>>,
    /// `regulators[v]` lists the sources of edges into `v`.
    regulators: Vec<Vec<usize>>,
}

impl InfluenceGraph {
    /// Derive the influence graph from the update function BDDs.
    pub fn new(functions: &SymbolicFunctions) -> InfluenceGraph {
        let n = functions.num_vars();
        let mut targets: Vec<Vec<(usize, Sign)>> = vec![Vec::new(); n];
        let mut regulators: Vec<Vec<usize>> = vec![Vec::new(); n];

        for target in 0..n {
            let function = functions.update(target);
            let mut support: Vec<usize> = function
                .support_set()
                .into_iter()
                .map(|bdd_var| {
                    (0..n)
                        .find(|i| functions.bdd_variable(*i) == bdd_var)
                        .expect("Support variable outside of the network.")
                })
                .collect();
            support.sort();

            for regulator in support {
                let bdd_var = functions.bdd_variable(regulator);
                let on = function.var_restrict(bdd_var, true);
                let off = function.var_restrict(bdd_var, false);
                if on == off {
                    // The regulator is not essential after all.
                    continue;
                }
                let activation = off.imp(&on).is_true();
                let inhibition = on.imp(&off).is_true();
                let sign = match (activation, inhibition) {
                    (true, false) => Sign::Positive,
                    (false, true) => Sign::Negative,
                    _ => Sign::Dual,
                };
                targets[regulator].push((target, sign));
                regulators[target].push(regulator);
            }
        }

        InfluenceGraph {
            names: functions.variable_names().to_vec(),
            targets,
            regulators,
        }
    }

    pub fn num_vars(&self) -> usize {
        self.names.len()
    }

    pub fn name(&self, index: usize) -> &str {
        &self.names[index]
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// The smallest backward-closed variable set containing `seeds`.
    pub fn backward_closure(&self, seeds: &[usize]) -> BTreeSet<usize> {
        let mut closure: BTreeSet<usize> = seeds.iter().copied().collect();
        let mut stack: Vec<usize> = seeds.to_vec();
        while let Some(var) = stack.pop() {
            for regulator in &self.regulators[var] {
                if closure.insert(*regulator) {
                    stack.push(*regulator);
                }
            }
        }
        closure
    }

    /// All strongly connected components (including trivial ones), each sorted,
    /// ordered by their smallest member.
    pub fn strongly_connected_components(&self) -> Vec<Vec<usize>> {
        // Iterative Tarjan.
        let n = self.num_vars();
        let mut index_counter = 0usize;
        let mut indices: Vec<Option<usize>> = vec![None; n];
        let mut low_links: Vec<usize> = vec![0; n];
        let mut on_stack: Vec<bool> = vec![false; n];
        let mut stack: Vec<usize> = Vec::new();
        let mut components: Vec<Vec<usize>> = Vec::new();

        enum Frame {
            Enter(usize),
            Continue(usize, usize),
        }

        for root in 0..n {
            if indices[root].is_some() {
                continue;
            }
            let mut work = vec![Frame::Enter(root)];
            while let Some(frame) = work.pop() {
                match frame {
                    Frame::Enter(v) => {
                        indices[v] = Some(index_counter);
                        low_links[v] = index_counter;
                        index_counter += 1;
                        stack.push(v);
                        on_stack[v] = true;
                        work.push(Frame::Continue(v, 0));
                    }
                    Frame::Continue(v, edge) => {
                        if let Some((w, _)) = self.targets[v].get(edge).copied() {
                            work.push(Frame::Continue(v, edge + 1));
                            match indices[w] {
                                None => work.push(Frame::Enter(w)),
                                Some(w_index) => {
                                    if on_stack[w] {
                                        low_links[v] = low_links[v].min(w_index);
                                    }
                                }
                            }
                        } else {
                            // All edges of `v` processed.
                            if low_links[v] == indices[v].unwrap() {
                                let mut component = Vec::new();
                                while let Some(w) = stack.pop() {
                                    on_stack[w] = false;
                                    component.push(w);
                                    if w == v {
                                        break;
                                    }
                                }
                                component.sort();
                                components.push(component);
                            }
                            // Propagate the low link to the parent, if any.
                            if let Some(Frame::Continue(parent, _)) = work.last() {
                                low_links[*parent] = low_links[*parent].min(low_links[v]);
                            }
                        }
                    }
                }
            }
        }

        components.sort();
        components
    }

    fn has_self_loop(&self, var: usize) -> bool {
        self.targets[var].iter().any(|(w, _)| *w == var)
    }

    /// Non-trivial strongly connected components with no incoming edges from
    /// the outside, as sorted lists of variable names.
    pub fn source_sccs(&self) -> Vec<Vec<String>> {
        let mut result: Vec<Vec<String>> = Vec::new();
        for component in self.strongly_connected_components() {
            if component.len() == 1 && !self.has_self_loop(component[0]) {
                continue;
            }
            let closure = self.backward_closure(&component);
            if closure == component.iter().copied().collect::<BTreeSet<usize>>() {
                result.push(component.iter().map(|v| self.names[*v].clone()).collect());
            }
        }
        result.sort();
        result
    }

    /// Compute an approximately minimal feedback vertex set.
    ///
    /// With `negative_parity`, only cycles with an odd number of negative
    /// edges are considered (dual edges count as both signs). The heuristic
    /// greedily removes the highest-degree vertex that still lies on a
    /// relevant cycle, so the result is deterministic but not necessarily
    /// minimal.
    pub fn feedback_vertex_set(&self, negative_parity: bool) -> Vec<String> {
        let mut removed: HashSet<usize> = HashSet::new();
        let mut result: Vec<usize> = Vec::new();

        loop {
            let candidates = if negative_parity {
                self.odd_cycle_vertices(&removed)
            } else {
                self.cycle_vertices(&removed)
            };
            if candidates.is_empty() {
                break;
            }
            // Remove the candidate with the highest degree; break ties by name.
            let best = candidates
                .into_iter()
                .max_by(|a, b| {
                    self.degree(*a, &removed)
                        .cmp(&self.degree(*b, &removed))
                        .then(self.names[*b].cmp(&self.names[*a]))
                })
                .unwrap();
            removed.insert(best);
            result.push(best);
        }

        let mut names: Vec<String> = result.into_iter().map(|v| self.names[v].clone()).collect();
        names.sort();
        names
    }

    fn degree(&self, var: usize, removed: &HashSet<usize>) -> usize {
        let out = self.targets[var]
            .iter()
            .filter(|(w, _)| !removed.contains(w))
            .count();
        let inc = self.regulators[var]
            .iter()
            .filter(|w| !removed.contains(*w))
            .count();
        out + inc
    }

    /// Vertices that lie on some cycle of the graph without `removed`.
    fn cycle_vertices(&self, removed: &HashSet<usize>) -> Vec<usize> {
        let mut result: Vec<usize> = Vec::new();
        for component in self.restricted_components(removed) {
            if component.len() > 1 {
                result.extend(component);
            } else if self.has_self_loop(component[0]) {
                result.push(component[0]);
            }
        }
        result.sort();
        result
    }

    /// SCCs of the graph without the `removed` vertices.
    fn restricted_components(&self, removed: &HashSet<usize>) -> Vec<Vec<usize>> {
        // Rather than re-implementing Tarjan with a filter, build the reduced
        // graph explicitly; FVS sizes are small, so this is not a bottleneck.
        let alive: Vec<usize> = (0..self.num_vars())
            .filter(|v| !removed.contains(v))
            .collect();
        let position: Vec<Option<usize>> = {
            let mut position = vec![None; self.num_vars()];
            for (i, v) in alive.iter().enumerate() {
                position[*v] = Some(i);
            }
            position
        };
        let mut reduced = InfluenceGraph {
            names: alive.iter().map(|v| self.names[*v].clone()).collect(),
            targets: vec![Vec::new(); alive.len()],
            regulators: vec![Vec::new(); alive.len()],
        };
        for v in &alive {
            for (w, sign) in &self.targets[*v] {
                if let Some(w_pos) = position[*w] {
                    let v_pos = position[*v].unwrap();
                    reduced.targets[v_pos].push((w_pos, *sign));
                    reduced.regulators[w_pos].push(v_pos);
                }
            }
        }
        reduced
            .strongly_connected_components()
            .into_iter()
            .map(|component| component.into_iter().map(|v| alive[v]).collect())
            .collect()
    }

    /// Vertices `v` admitting a closed walk through `v` with an odd number of
    /// negative edges, ignoring the `removed` vertices.
    ///
    /// If any negative cycle survives, all of its vertices qualify, so a graph
    /// where no vertex qualifies has no negative cycle.
    fn odd_cycle_vertices(&self, removed: &HashSet<usize>) -> Vec<usize> {
        let mut result: Vec<usize> = Vec::new();
        for v in 0..self.num_vars() {
            if removed.contains(&v) {
                continue;
            }
            if self.reaches_odd(v, removed) {
                result.push(v);
            }
        }
        result
    }

    /// `true` if `(v, even)` reaches `(v, odd)` in the parity product graph.
    fn reaches_odd(&self, v: usize, removed: &HashSet<usize>) -> bool {
        let n = self.num_vars();
        let mut visited = vec![false; 2 * n];
        let mut stack = vec![2 * v];
        visited[2 * v] = true;
        while let Some(node) = stack.pop() {
            let (u, parity) = (node / 2, node % 2);
            for (w, sign) in &self.targets[u] {
                if removed.contains(w) {
                    continue;
                }
                let next_parities: &[usize] = match sign {
                    Sign::Positive => &[parity],
                    Sign::Negative => &[1 - parity],
                    Sign::Dual => &[parity, 1 - parity],
                };
                for next_parity in next_parities {
                    if *w == v && *next_parity == 1 {
                        return true;
                    }
                    let next = 2 * w + next_parity;
                    if !visited[next] {
                        visited[next] = true;
                        stack.push(next);
                    }
                }
            }
        }
        false
    }
}

/// Variables whose update function is semantically the identity (their value
/// never changes but is not a constant).
pub fn source_nodes(functions: &SymbolicFunctions) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    for index in 0..functions.num_vars() {
        let var_bdd = functions
            .bdd_variable_set()
            .mk_var(functions.bdd_variable(index));
        if functions.update(index) == &var_bdd {
            result.push(functions.name(index).to_string());
        }
    }
    result
}

/// Approximate minimum feedback vertex set of the network influence graph,
/// with an optional negative parity restriction.
pub fn feedback_vertex_set(functions: &SymbolicFunctions, negative_parity: bool) -> Vec<String> {
    InfluenceGraph::new(functions).feedback_vertex_set(negative_parity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use biodivine_lib_param_bn::BooleanNetwork;

    fn mk_functions(model: &str) -> SymbolicFunctions {
        let bn = BooleanNetwork::try_from_bnet(model).unwrap();
        SymbolicFunctions::new(&bn).unwrap()
    }

    #[test]
    fn test_signs() {
        let functions = mk_functions("targets,factors\nA, B\nB, !A\nC, A & !C\n");
        let graph = InfluenceGraph::new(&functions);
        let a = graph.index_of("A").unwrap();
        let b = graph.index_of("B").unwrap();
        let c = graph.index_of("C").unwrap();

        assert_eq!(graph.targets[b], vec![(a, Sign::Positive)]);
        assert!(graph.targets[a].contains(&(b, Sign::Negative)));
        assert!(graph.targets[a].contains(&(c, Sign::Positive)));
        assert!(graph.targets[c].contains(&(c, Sign::Negative)));
    }

    #[test]
    fn test_semantic_edges_only() {
        // `B` appears in the expression but has no actual influence.
        let functions = mk_functions("targets,factors\nA, (B & A) | (!B & A)\nB, B\n");
        let graph = InfluenceGraph::new(&functions);
        let a = graph.index_of("A").unwrap();
        assert_eq!(graph.regulators[a], vec![a]);
    }

    #[test]
    fn test_feedback_vertex_set() {
        // A positive cycle `{A, B}` and a negative cycle `{C, D}`.
        let functions = mk_functions("targets,factors\nA, B\nB, A\nC, D\nD, !C\n");
        let graph = InfluenceGraph::new(&functions);

        let fvs = graph.feedback_vertex_set(false);
        assert_eq!(fvs.len(), 2);

        let nfvs = graph.feedback_vertex_set(true);
        assert_eq!(nfvs.len(), 1);
        assert!(nfvs[0] == "C" || nfvs[0] == "D");

        // Breaking every negative cycle of the flip-flop needs only `C`.
        let functions = mk_functions("targets,factors\nA, B\nB, A\nC, !C\n");
        let graph = InfluenceGraph::new(&functions);
        assert_eq!(graph.feedback_vertex_set(true), vec!["C".to_string()]);
    }

    #[test]
    fn test_source_sccs() {
        let functions = mk_functions(
            "targets,factors\nA, B\nB, A\nC, D & A\nD, C\n",
        );
        let graph = InfluenceGraph::new(&functions);
        // `{A, B}` has no incoming edges; `{C, D}` depends on `A`.
        assert_eq!(graph.source_sccs(), vec![vec!["A".to_string(), "B".to_string()]]);
    }

    #[test]
    fn test_backward_closure() {
        let functions = mk_functions("targets,factors\nA, A\nB, A\nC, B\n");
        let graph = InfluenceGraph::new(&functions);
        let c = graph.index_of("C").unwrap();
        let closure = graph.backward_closure(&[c]);
        assert_eq!(closure.len(), 3);
    }

    #[test]
    fn test_source_nodes() {
        let functions = mk_functions("targets,factors\nS, S\nA, S | A\nB, false\n");
        assert_eq!(source_nodes(&functions), vec!["S".to_string()]);
    }
}
