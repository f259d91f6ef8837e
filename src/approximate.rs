//! Character-set approximation (C5): a per-component fix-point over
//! charsets, followed by operation-cycle breaking.
use ahash::AHashMap;

use crate::charset::CharSet;
use crate::grammar::{Grammar, NonterminalId, Production};
use crate::operations::Operation;
use crate::scc::compute_components;

/// Per-nonterminal charset annotations computed by C5.
pub type CharsetAnnotations = AHashMap<NonterminalId, CharSet>;

/// Runs the C5 fix-point and operation-cycle breaker over `grammar`,
/// mutating it in place (cycle breaking rewrites productions) and returning
/// the final per-nonterminal charset table.
///
/// `max_cycle_break_rounds` bounds how many cyclic operation productions
/// `break_operation_cycles` will rewrite before giving up; on empty input
/// (no nonterminals at all), this is simply a no-op.
pub fn approximate(grammar: &mut Grammar, max_cycle_break_rounds: usize) -> CharsetAnnotations {
    if grammar.ids().is_empty() {
        return CharsetAnnotations::default();
    }

    let mut charsets = fix_point(grammar);
    break_operation_cycles(grammar, &mut charsets, max_cycle_break_rounds);
    charsets
}

fn fix_point(grammar: &Grammar) -> CharsetAnnotations {
    let components = compute_components(grammar);
    let predecessors = grammar.all_predecessors();
    let mut charsets: CharsetAnnotations = grammar
        .ids()
        .into_iter()
        .map(|id| (id, CharSet::empty()))
        .collect();

    for component in &components {
        let member_set: std::collections::HashSet<NonterminalId> =
            component.members.iter().copied().collect();
        let mut worklist: std::collections::VecDeque<NonterminalId> =
            component.members.iter().copied().collect();
        let mut queued: std::collections::HashSet<NonterminalId> = member_set.clone();

        while let Some(a) = worklist.pop_front() {
            queued.remove(&a);
            let new_cs = recompute_charset(grammar, a, &charsets);
            if charsets.get(&a) != Some(&new_cs) {
                charsets.insert(a, new_cs);
                if let Some(preds) = predecessors.get(&a) {
                    for &p in preds {
                        if member_set.contains(&p) && queued.insert(p) {
                            worklist.push_back(p);
                        }
                    }
                }
            }
        }
    }
    charsets
}

fn recompute_charset(grammar: &Grammar, a: NonterminalId, charsets: &CharsetAnnotations) -> CharSet {
    let Some(nt) = grammar.nonterminal(a) else {
        return CharSet::empty();
    };
    let mut cs = CharSet::empty();
    for p in nt.productions() {
        let rhs = match p {
            Production::Terminal(t) => t.charset.clone(),
            Production::Unit(b) => charsets.get(b).cloned().unwrap_or_else(CharSet::empty),
            Production::Concat(b, c) => charsets
                .get(b)
                .cloned()
                .unwrap_or_else(CharSet::empty)
                .union(&charsets.get(c).cloned().unwrap_or_else(CharSet::empty)),
            Production::UnaryOp(op, b) => {
                op.charset_transform(&charsets.get(b).cloned().unwrap_or_else(CharSet::empty))
            }
            Production::BinaryOp(op, b, c) => op.charset_transform(
                &charsets
                    .get(b)
                    .cloned()
                    .unwrap_or_else(CharSet::empty)
                    .union(&charsets.get(c).cloned().unwrap_or_else(CharSet::empty)),
            ),
        };
        cs = cs.union(&rhs);
    }
    cs
}

/// Repeatedly finds an operation production that participates in a cycle
/// within its own component and replaces the highest-priority one with a
/// single [`Production::Terminal`] built from its resulting charset, until
/// at most one cycle remains per component or `max_rounds` rewrites have
/// happened. Hitting the cap leaves any remaining cyclic operation
/// productions in place, which C7/C8 then treat as an ordinary grammar; in
/// practice each round strictly shrinks the number of cyclic op-productions,
/// so the cap is never hit outside of pathological input.
fn break_operation_cycles(
    grammar: &mut Grammar,
    charsets: &mut CharsetAnnotations,
    max_rounds: usize,
) {
    for _ in 0..max_rounds {
        let components = compute_components(grammar);
        let Some((owner, prod_index, op, operand_cs)) =
            find_highest_priority_cycle_op(grammar, &components, charsets)
        else {
            return;
        };

        let terminal_cs = op.charset_transform(&operand_cs);
        let terminal = crate::grammar::Terminal::regex_fragment(
            terminal_cs.to_regex_pattern(),
            terminal_cs.clone(),
        );
        let nt = grammar.nonterminal_mut(owner).unwrap();
        nt.productions_mut()[prod_index] = Production::Terminal(terminal);
        charsets.insert(owner, recompute_charset(grammar, owner, charsets));
    }

    if find_highest_priority_cycle_op(grammar, &compute_components(grammar), charsets).is_some() {
        log::warn!(
            "hit the cycle-break round cap ({max_rounds}) with cyclic operation productions \
             still present; leaving them in place"
        );
    }
}

type CycleOp = (NonterminalId, usize, Operation, CharSet);

fn find_highest_priority_cycle_op(
    grammar: &Grammar,
    components: &[crate::scc::Component],
    charsets: &CharsetAnnotations,
) -> Option<CycleOp> {
    let mut best: Option<CycleOp> = None;
    for component in components {
        if component.members.len() <= 1 {
            // A size-1 component can still self-loop; only count it as a
            // cycle if the nonterminal references itself.
            let only = component.members[0];
            if !grammar
                .successors_for(only)
                .iter()
                .any(|s| *s == only)
            {
                continue;
            }
        }
        let member_set: std::collections::HashSet<NonterminalId> =
            component.members.iter().copied().collect();
        for &owner in &component.members {
            let Some(nt) = grammar.nonterminal(owner) else {
                continue;
            };
            for (idx, p) in nt.productions().iter().enumerate() {
                let (op, operand) = match p {
                    Production::UnaryOp(op, a) if member_set.contains(a) => (*op, *a),
                    Production::BinaryOp(op, a, b)
                        if member_set.contains(a) || member_set.contains(b) =>
                    {
                        // Binary op cycle: combine both operand charsets,
                        // consistent with C5's general rhs distribution.
                        let cs = charsets
                            .get(a)
                            .cloned()
                            .unwrap_or_else(CharSet::empty)
                            .union(&charsets.get(b).cloned().unwrap_or_else(CharSet::empty));
                        if best
                            .as_ref()
                            .map(|(_, _, best_op, _)| op.priority() > best_op.priority())
                            .unwrap_or(true)
                        {
                            best = Some((owner, idx, *op, cs));
                        }
                        continue;
                    }
                    _ => continue,
                };
                let operand_cs = charsets.get(&operand).cloned().unwrap_or_else(CharSet::empty);
                if best
                    .as_ref()
                    .map(|(_, _, best_op, _)| op.priority() > best_op.priority())
                    .unwrap_or(true)
                {
                    best = Some((owner, idx, op, operand_cs));
                }
            }
        }
    }
    best
}
