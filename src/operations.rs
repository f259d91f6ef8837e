//! The operation catalogue (C3): string-transforming operations with a
//! charset transformer and an automaton transformer each.
use crate::automaton::{EdgeLabel, Nfa, StateId};
use crate::charset::CharSet;

/// A string-transforming operation. Each variant carries whatever metadata
/// it needs (e.g. `old`/`new` characters) directly as fields; the grammar
/// only ever stores the operation itself plus the single nonterminal it is
/// applied to (`Production::UnaryOp`; see `DESIGN.md`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Reverse,
    Trim,
    ToUpperCase,
    ToLowerCase,
    ReplaceBothKnown { old: char, new: char },
    ReplaceOldKnown { old: char },
    ReplaceNewKnown { new: char },
    ReplaceNoneKnown,
}

impl Operation {
    /// Ranks how eagerly a cyclic operation production should be eliminated
    /// in C5; higher is eliminated first.
    pub fn priority(&self) -> u8 {
        match self {
            Operation::Reverse => 1,
            Operation::Trim => 1,
            Operation::ToUpperCase => 2,
            Operation::ToLowerCase => 2,
            Operation::ReplaceNewKnown { .. } => 2,
            Operation::ReplaceOldKnown { .. } => 3,
            Operation::ReplaceBothKnown { .. } => 4,
            Operation::ReplaceNoneKnown => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Reverse => "reverse",
            Operation::Trim => "trim",
            Operation::ToUpperCase => "toUpperCase",
            Operation::ToLowerCase => "toLowerCase",
            Operation::ReplaceBothKnown { .. } => "replaceBothKnown",
            Operation::ReplaceOldKnown { .. } => "replaceOldKnown",
            Operation::ReplaceNewKnown { .. } => "replaceNewKnown",
            Operation::ReplaceNoneKnown => "replaceNoneKnown",
        }
    }

    /// The charset transformer, total over its operand's charset(s). Every
    /// catalogue operation is unary in practice (see `Production::UnaryOp`),
    /// so this takes a single operand charset.
    pub fn charset_transform(&self, cs: &CharSet) -> CharSet {
        match self {
            Operation::Reverse | Operation::Trim => cs.clone(),
            Operation::ToLowerCase => map_case(cs, char::to_lowercase, ('A', 'Z')),
            Operation::ToUpperCase => map_case(cs, char::to_uppercase, ('a', 'z')),
            Operation::ReplaceBothKnown { old, new } => {
                if cs.contains(*old) {
                    cs.remove(*old).add(*new)
                } else {
                    cs.clone()
                }
            }
            Operation::ReplaceOldKnown { old } => {
                if cs.contains(*old) {
                    CharSet::sigma()
                } else {
                    cs.clone()
                }
            }
            Operation::ReplaceNewKnown { new } => cs.add(*new),
            Operation::ReplaceNoneKnown => CharSet::sigma(),
        }
    }

    /// Mutates the NFA so the sub-automaton spanning `affected_states`
    /// (identified by the taint they all carry) reflects this operation.
    pub fn automaton_transform(
        &self,
        nfa: &mut Nfa,
        affected_states: &[StateId],
        span: (StateId, StateId),
    ) {
        match self {
            Operation::Reverse => reverse_transform(nfa, affected_states, span),
            Operation::Trim => {
                // No-op: the reference engine leaves Trim's sub-automaton
                // untouched and relies on the surrounding widen-by-default
                // behaviour to stay sound. See DESIGN.md.
                log::warn!("Trim automaton transformer is a no-op; widening implicitly");
            }
            Operation::ToLowerCase => case_transform(nfa, affected_states, |s| s.to_lowercase()),
            Operation::ToUpperCase => case_transform(nfa, affected_states, |s| s.to_uppercase()),
            Operation::ReplaceBothKnown { old, new } => {
                replace_both_transform(nfa, affected_states, *old, *new)
            }
            Operation::ReplaceOldKnown { .. }
            | Operation::ReplaceNewKnown { .. }
            | Operation::ReplaceNoneKnown => {
                log::warn!(
                    "{} automaton transformer widens tainted edges to Σ*",
                    self.name()
                );
                widen_to_sigma_star(nfa, affected_states);
            }
        }
    }
}

fn map_case<I: Iterator<Item = char>>(
    cs: &CharSet,
    mapper: impl Fn(char) -> I,
    other_case_range: (char, char),
) -> CharSet {
    match cs {
        CharSet::Finite(set) => {
            let mapped = set.iter().flat_map(|&c| mapper(c)).collect::<Vec<_>>();
            CharSet::from_chars(mapped)
        }
        CharSet::Complement(removed) => {
            let mut removed = removed.clone();
            let (lo, hi) = other_case_range;
            for c in lo..=hi {
                removed.insert(c);
            }
            CharSet::Complement(removed)
        }
    }
}

/// For each tainted literal edge, lowercase/uppercase its text. A tainted
/// edge carrying a non-literal regex fragment cannot be rewritten
/// char-by-char; leaving it as-is would under-approximate (e.g. a fragment
/// matching only `[a-z]` left untouched after `toUpperCase` would reject the
/// real, now-uppercase runtime strings), so it is widened to Σ* instead.
fn case_transform(nfa: &mut Nfa, affected_states: &[StateId], map: impl Fn(&str) -> String) {
    for &s in affected_states {
        for edge in nfa.states_mut()[s].outgoing.iter_mut() {
            match &edge.label {
                EdgeLabel::Literal(text) => {
                    edge.label = EdgeLabel::Literal(map(text));
                }
                EdgeLabel::Regex(_) => {
                    log::warn!("case operation widening non-literal tainted edge to Σ*");
                    edge.label = EdgeLabel::Regex(CharSet::sigma().to_regex_pattern());
                }
                EdgeLabel::Epsilon => {}
            }
        }
    }
}

fn replace_both_transform(nfa: &mut Nfa, affected_states: &[StateId], old: char, new: char) {
    for &s in affected_states {
        for edge in nfa.states_mut()[s].outgoing.iter_mut() {
            match &edge.label {
                EdgeLabel::Literal(text) => {
                    edge.label = EdgeLabel::Literal(text.replace(old, &new.to_string()));
                }
                EdgeLabel::Regex(fragment) => {
                    // Conservative rewrite: substitute a bare occurrence of
                    // `old` and rewrite it inside `[...]` character classes.
                    // Ranges inside classes (e.g. `[a-z]`) are left alone —
                    // known incomplete, see DESIGN.md; `old` inside a range
                    // is handled only by falling through to widening below.
                    if fragment.contains("-]") || contains_range_with(fragment, old) {
                        log::warn!(
                            "replaceBothKnown cannot rewrite a char range containing '{old}'; widening to Σ*"
                        );
                        edge.label = EdgeLabel::Regex(CharSet::sigma().to_regex_pattern());
                    } else {
                        edge.label = EdgeLabel::Regex(fragment.replace(old, &new.to_string()));
                    }
                }
                EdgeLabel::Epsilon => {}
            }
        }
    }
}

fn contains_range_with(fragment: &str, c: char) -> bool {
    let bytes: Vec<char> = fragment.chars().collect();
    for w in bytes.windows(3) {
        if w[1] == '-' && (w[0] == c || w[2] == c) {
            return true;
        }
    }
    false
}

fn widen_to_sigma_star(nfa: &mut Nfa, affected_states: &[StateId]) {
    let sigma_star = CharSet::sigma().to_regex_pattern();
    for &s in affected_states {
        for edge in nfa.states_mut()[s].outgoing.iter_mut() {
            if !matches!(edge.label, EdgeLabel::Epsilon) {
                edge.label = EdgeLabel::Regex(sigma_star.clone());
            }
        }
    }
}

/// Clones the sub-automaton spanning `(entry, exit)`, reverses every
/// internal edge (swapping endpoints, and reversing character order on
/// multi-char literal edges since they denote whole substrings), splices the
/// reversed clone back in place of the original, and garbage-collects the
/// superseded original states.
fn reverse_transform(nfa: &mut Nfa, affected_states: &[StateId], span: (StateId, StateId)) {
    let (entry, exit) = span;
    let affected: std::collections::HashSet<StateId> = affected_states.iter().copied().collect();

    let mut clone_of = ahash::AHashMap::default();
    for &old in affected_states {
        clone_of.insert(old, nfa.new_state());
    }

    for &old in affected_states {
        let edges = nfa.states()[old].outgoing.clone();
        for edge in edges {
            if !affected.contains(&edge.next) {
                continue;
            }
            let label = match &edge.label {
                EdgeLabel::Literal(text) => EdgeLabel::Literal(text.chars().rev().collect()),
                other => other.clone(),
            };
            let from_clone = clone_of[&edge.next];
            let to_clone = clone_of[&old];
            nfa.add_edge(from_clone, label, to_clone, edge.taints.clone());
        }
    }

    let entry_clone = clone_of[&entry];
    let exit_clone = clone_of[&exit];
    nfa.add_edge(entry, EdgeLabel::Epsilon, exit_clone, Default::default());
    nfa.add_edge(entry_clone, EdgeLabel::Epsilon, exit, Default::default());

    nfa.gc_unreachable();
}
