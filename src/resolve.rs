//! Operation resolver (C8): walks tainted sub-automata in reverse order of
//! introduction (innermost first) and invokes each operation's automaton
//! transformer.
use crate::automaton::{Nfa, OperationTaint, StateId};

/// Resolves every operation taint introduced while building `nfa`, in
/// reverse order of introduction. Matches the original expression's
/// bottom-up evaluation order.
pub fn resolve(nfa: &mut Nfa) {
    let taint_count = nfa.operations.len();
    for idx in (0..taint_count).rev() {
        let taint = OperationTaint(idx);
        let affected = states_tainted_with(nfa, taint);
        if affected.is_empty() {
            continue;
        }
        let span = nfa.span(taint);
        let op = *nfa.operation(taint);
        op.automaton_transform(nfa, &affected, span);
    }
}

fn states_tainted_with(nfa: &Nfa, taint: OperationTaint) -> Vec<StateId> {
    nfa.states()
        .iter()
        .enumerate()
        .filter(|(_, s)| s.taints.contains(&taint))
        .map(|(i, _)| i)
        .collect()
}
