//! State-elimination regex extraction. Supplemented from the pack, same
//! grounding as `determinize` (`examples/HeroicKatora-automata/src/nfa.rs`'s
//! `to_regex` doc comment sketches this algorithm but leaves it
//! `unimplemented!()`): repeatedly eliminate a non-start/non-accept state,
//! folding its self-loop and through-paths into combined regex labels on
//! the remaining edges, until only start/accept states remain.
use ahash::AHashMap;

use crate::automaton::{EdgeLabel, Nfa, StateId};

/// One row of the working adjacency matrix: `from -> to -> regex fragment`.
/// `None` means "no transition yet"; fragments accumulate via alternation
/// as parallel edges collapse.
type Matrix = AHashMap<StateId, AHashMap<StateId, String>>;

/// Extracts a single regex pattern string covering `nfa`'s whole language,
/// in the grammar-text dialect: `\Q…\E` literal quoting,
/// alternation/concatenation/`*`/`?`/grouping/classes, `ε` stripped when
/// pretty-printing.
pub fn to_regex(nfa: &Nfa) -> Option<String> {
    let start = nfa.start_state()?;
    let accept = nfa.accept_state()?;

    if start == accept {
        // The start state is itself accepting: the language always includes
        // ε, folded into an optional wrapper around whatever else loops
        // back to start.
        let mut matrix = build_matrix(nfa);
        let body = eliminate_all_but(&mut matrix, &[start]);
        let self_loop = body.get(&start).and_then(|row| row.get(&start)).cloned();
        return Some(match self_loop {
            Some(frag) if !frag.is_empty() => format!("({frag})?"),
            _ => String::new(),
        });
    }

    let mut matrix = build_matrix(nfa);
    let to_eliminate: Vec<StateId> = (0..nfa.states().len())
        .filter(|&s| s != start && s != accept)
        .collect();
    for s in to_eliminate {
        eliminate_state(&mut matrix, s);
    }
    matrix
        .get(&start)
        .and_then(|row| row.get(&accept))
        .cloned()
        .or_else(|| Some("(?:)".to_string()))
}

fn build_matrix(nfa: &Nfa) -> Matrix {
    let mut matrix: Matrix = AHashMap::default();
    for (from, state) in nfa.states().iter().enumerate() {
        for edge in &state.outgoing {
            let label = match &edge.label {
                EdgeLabel::Epsilon => String::new(),
                other => other.render(),
            };
            let row = matrix.entry(from).or_default();
            let entry = row.entry(edge.next).or_default();
            *entry = alternate(entry, &label);
        }
    }
    matrix
}

/// Eliminates every state not in `keep`, returning the resulting matrix
/// (only used by the `start == accept` special case, which needs the
/// self-loop on `start` specifically).
fn eliminate_all_but(matrix: &mut Matrix, keep: &[StateId]) -> Matrix {
    let all_states: std::collections::BTreeSet<StateId> = matrix
        .iter()
        .flat_map(|(&from, row)| std::iter::once(from).chain(row.keys().copied()))
        .collect();
    for s in all_states {
        if !keep.contains(&s) {
            eliminate_state(matrix, s);
        }
    }
    matrix.clone()
}

fn eliminate_state(matrix: &mut Matrix, s: StateId) {
    let incoming: Vec<(StateId, String)> = matrix
        .iter()
        .filter_map(|(&from, row)| {
            if from == s {
                None
            } else {
                row.get(&s).map(|label| (from, label.clone()))
            }
        })
        .collect();
    let outgoing: Vec<(StateId, String)> = matrix
        .get(&s)
        .map(|row| {
            row.iter()
                .filter(|(&to, _)| to != s)
                .map(|(&to, label)| (to, label.clone()))
                .collect()
        })
        .unwrap_or_default();
    let self_loop = matrix.get(&s).and_then(|row| row.get(&s)).cloned();
    let loop_fragment = match self_loop {
        Some(frag) if !frag.is_empty() => format!("(?:{})*", frag),
        _ => String::new(),
    };

    for (from, in_label) in &incoming {
        for (to, out_label) in &outgoing {
            let combined = concat3(in_label, &loop_fragment, out_label);
            let row = matrix.entry(*from).or_default();
            let entry = row.entry(*to).or_default();
            *entry = alternate(entry, &combined);
        }
    }

    matrix.remove(&s);
    for row in matrix.values_mut() {
        row.remove(&s);
    }
}

fn concat3(a: &str, b: &str, c: &str) -> String {
    [a, b, c]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("")
}

fn alternate(existing: &str, addition: &str) -> String {
    match (existing.is_empty(), addition.is_empty()) {
        (true, true) => String::new(),
        (true, false) => addition.to_string(),
        (false, true) => existing.to_string(),
        (false, false) if existing == addition => existing.to_string(),
        (false, false) => format!("{existing}|{addition}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton;
    use crate::grammar::{Grammar, Production, Terminal};
    use crate::scc::compute_components;

    #[test]
    fn simple_alternation_extracts_to_a_regex() {
        // A -> "a" | "b"
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

        let pattern = to_regex(&nfa).unwrap();
        assert!(pattern.contains("\\Qa\\E"));
        assert!(pattern.contains("\\Qb\\E"));
    }
}
