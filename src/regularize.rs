//! Regular approximation (C6) — Mohri–Nederhof: rewrites every BOTH-
//! recursive component into purely right-recursive form using primed
//! nonterminals.
use ahash::AHashMap;

use crate::grammar::{Grammar, HotspotIds, NonterminalId, Production, Terminal};
use crate::scc::{Component, Recursion};

/// Rewrites every BOTH-recursive component of `grammar` in place. Returns
/// the updated component list: BOTH components are replaced by their new
/// RIGHT-recursive shape (primed nonterminals folded into the same
/// component — newly minted nonterminals are not
/// reclassified by a fresh SCC pass); components that were already
/// LEFT/RIGHT/NONE pass through unchanged.
pub fn regularize(
    grammar: &mut Grammar,
    components: Vec<Component>,
    hotspots: &HotspotIds,
) -> Vec<Component> {
    components
        .into_iter()
        .map(|component| {
            if component.recursion != Recursion::Both {
                return component;
            }
            log::debug!(
                "regularizing {}-recursive component of size {}",
                component.recursion,
                component.members.len()
            );
            regularize_component(grammar, component, hotspots)
        })
        .collect()
}

fn regularize_component(
    grammar: &mut Grammar,
    component: Component,
    hotspots: &HotspotIds,
) -> Component {
    let member_set: std::collections::HashSet<NonterminalId> =
        component.members.iter().copied().collect();
    let predecessors = grammar.all_predecessors();

    // Step 1/2: mint A' for every A in the component; seed ε where needed.
    let mut primed: AHashMap<NonterminalId, NonterminalId> = AHashMap::default();
    for &a in &component.members {
        let a_prime = grammar.create_new_nonterminal();
        primed.insert(a, a_prime);
        let needs_epsilon = hotspots.contains(&a)
            || predecessors
                .get(&a)
                .map(|preds| preds.iter().any(|p| !member_set.contains(p)))
                .unwrap_or(false);
        if needs_epsilon {
            grammar
                .nonterminal_mut(a_prime)
                .unwrap()
                .add_production(Production::Terminal(Terminal::epsilon()));
        }
    }

    // Step 3: empty each A's productions, rewrite each old production.
    let mut new_members: Vec<NonterminalId> = component.members.clone();
    new_members.extend(primed.values().copied());

    for &a in &component.members {
        let old_productions = grammar.nonterminal(a).unwrap().productions().to_vec();
        grammar.nonterminal_mut(a).unwrap().productions_mut().clear();
        let a_prime = primed[&a];

        for p in old_productions {
            rewrite_production(grammar, &member_set, &primed, &mut new_members, a, a_prime, p);
        }
    }

    Component {
        members: new_members,
        recursion: Recursion::Right,
    }
}

fn rewrite_production(
    grammar: &mut Grammar,
    member_set: &std::collections::HashSet<NonterminalId>,
    primed: &AHashMap<NonterminalId, NonterminalId>,
    new_members: &mut Vec<NonterminalId>,
    a: NonterminalId,
    a_prime: NonterminalId,
    p: Production,
) {
    let in_comp = |id: &NonterminalId| member_set.contains(id);
    match p {
        Production::Unit(b) if in_comp(&b) => {
            // A -> B; B' -> A'
            push(grammar, a, Production::Unit(b));
            let b_prime = primed[&b];
            push(grammar, b_prime, Production::Unit(a_prime));
        }
        Production::Unit(x) => {
            // A -> X A'
            push(grammar, a, Production::Concat(x, a_prime));
        }
        Production::Concat(b, c) if in_comp(&b) && in_comp(&c) => {
            // A -> B; B' -> C; C' -> A'
            push(grammar, a, Production::Unit(b));
            let b_prime = primed[&b];
            push(grammar, b_prime, Production::Unit(c));
            let c_prime = primed[&c];
            push(grammar, c_prime, Production::Unit(a_prime));
        }
        Production::Concat(b, x) if in_comp(&b) && !in_comp(&x) => {
            // A -> B; B' -> X A'
            push(grammar, a, Production::Unit(b));
            let b_prime = primed[&b];
            push(grammar, b_prime, Production::Concat(x, a_prime));
        }
        Production::Concat(x, b) if !in_comp(&x) && in_comp(&b) => {
            // A -> X B; B' -> A'
            push(grammar, a, Production::Concat(x, b));
            let b_prime = primed[&b];
            push(grammar, b_prime, Production::Unit(a_prime));
        }
        Production::Concat(x, y) => {
            // A -> R A'; R -> X Y
            let r = grammar.create_new_nonterminal();
            new_members.push(r);
            push(grammar, r, Production::Concat(x, y));
            push(grammar, a, Production::Concat(r, a_prime));
        }
        Production::UnaryOp(op, x) => {
            // A -> R A'; R -> op(X)
            let r = grammar.create_new_nonterminal();
            new_members.push(r);
            push(grammar, r, Production::UnaryOp(op, x));
            push(grammar, a, Production::Concat(r, a_prime));
        }
        Production::BinaryOp(op, x, y) => {
            // A -> R A'; R -> op(X, Y)
            let r = grammar.create_new_nonterminal();
            new_members.push(r);
            push(grammar, r, Production::BinaryOp(op, x, y));
            push(grammar, a, Production::Concat(r, a_prime));
        }
        Production::Terminal(t) => {
            // A -> R A'; R -> t
            let r = grammar.create_new_nonterminal();
            new_members.push(r);
            push(grammar, r, Production::Terminal(t));
            push(grammar, a, Production::Concat(r, a_prime));
        }
    }
}

fn push(grammar: &mut Grammar, owner: NonterminalId, p: Production) {
    grammar.nonterminal_mut(owner).unwrap().add_production(p);
}
