//! NFA → DFA powerset construction. Determinisation is treated as a
//! separable, optional post-pass over the resolved automaton rather than
//! core pipeline machinery; grounded on the epsilon-closure/subset-
//! construction sketch in `examples/HeroicKatora-automata/src/nfa.rs`
//! (whose own `to_regex`/`to_nfa` are unimplemented stubs).
use std::collections::{BTreeSet, VecDeque};

use ahash::AHashMap;

use crate::automaton::{EdgeLabel, Nfa, StateId};

/// Determinises `nfa` via subset construction over its ε-closures. DFA
/// states are identified by the (sorted, deduplicated) set of NFA states
/// they collapse, so construction is naturally deterministic regardless of
/// input iteration order.
///
/// Non-ε edges are grouped by their rendered label (`EdgeLabel::render()`):
/// since regex-fragment edges are opaque to this construction, two edges
/// collapse into the same DFA transition only when their labels render
/// identically.
pub fn determinize(nfa: &Nfa) -> Nfa {
    let Some(start) = nfa.start_state() else {
        return nfa.clone();
    };

    let mut result = Nfa::default();
    let start_set = epsilon_closure(nfa, &[start]);
    let mut state_of: AHashMap<BTreeSet<StateId>, StateId> = AHashMap::default();
    let start_id = result.new_state();
    state_of.insert(start_set.clone(), start_id);
    result.states_mut()[start_id].is_start = true;
    if start_set.iter().any(|&s| nfa.states()[s].is_accepting) {
        result.states_mut()[start_id].is_accepting = true;
    }

    let mut queue = VecDeque::new();
    queue.push_back(start_set);

    while let Some(subset) = queue.pop_front() {
        let from_id = state_of[&subset];
        let mut by_label: AHashMap<String, (EdgeLabel, Vec<StateId>)> = AHashMap::default();
        for &s in &subset {
            for edge in &nfa.states()[s].outgoing {
                if matches!(edge.label, EdgeLabel::Epsilon) {
                    continue;
                }
                let key = edge.label.render();
                by_label
                    .entry(key)
                    .or_insert_with(|| (edge.label.clone(), Vec::new()))
                    .1
                    .push(edge.next);
            }
        }

        let mut labels: Vec<String> = by_label.keys().cloned().collect();
        labels.sort_unstable();
        for key in labels {
            let (label, targets) = &by_label[&key];
            let next_set = epsilon_closure(nfa, targets);
            let to_id = *state_of.entry(next_set.clone()).or_insert_with(|| {
                let id = result.new_state();
                if next_set.iter().any(|&s| nfa.states()[s].is_accepting) {
                    result.states_mut()[id].is_accepting = true;
                }
                queue.push_back(next_set.clone());
                id
            });
            result.add_edge(from_id, label.clone(), to_id, Default::default());
        }
    }

    result
}

fn epsilon_closure(nfa: &Nfa, states: &[StateId]) -> BTreeSet<StateId> {
    let mut closure: BTreeSet<StateId> = states.iter().copied().collect();
    let mut stack: Vec<StateId> = states.to_vec();
    while let Some(s) = stack.pop() {
        for edge in &nfa.states()[s].outgoing {
            if matches!(edge.label, EdgeLabel::Epsilon) && closure.insert(edge.next) {
                stack.push(edge.next);
            }
        }
    }
    closure
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton;
    use crate::grammar::{Grammar, Production, Terminal};
    use crate::scc::compute_components;

    #[test]
    fn determinized_automaton_keeps_single_start_and_has_an_accept() {
        // A -> a | b
        let mut g = Grammar::new(0);
        g.nonterminal_mut(0)
            .unwrap()
            .add_production(Production::Terminal(Terminal::literal("a")));
        g.nonterminal_mut(0)
            .unwrap()
            .add_production(Production::Terminal(Terminal::literal("b")));
        let components = compute_components(&g);
        let hotspots = Default::default();
        let nfa = automaton::build(&g, components, &hotspots).unwrap();

        let dfa = determinize(&nfa);
        assert_eq!(dfa.states().iter().filter(|s| s.is_start).count(), 1);
        assert!(dfa.states().iter().any(|s| s.is_accepting));
    }
}
