//! Grammar → NFA construction (C7), Nederhof-style, and the NFA data model
//! shared with the operation resolver (C8).
use std::collections::VecDeque;

use ahash::AHashMap;
use tinyvec::TinyVec;

use crate::grammar::{Grammar, HotspotIds, NonterminalId, Production, Terminal};
use crate::operations::Operation;
use crate::scc::{Component, Recursion};

pub type StateId = usize;

/// A token identifying one occurrence of an operation application in the
/// grammar. Two taints are equal iff they are the *same occurrence* (i.e.
/// the same arena slot), never merely the same [`Operation`] value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationTaint(pub(crate) usize);

pub(crate) type Taints = TinyVec<[OperationTaint; 4]>;

/// The label carried by one NFA edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeLabel {
    /// ε: consumes no input.
    Epsilon,
    /// A literal substring, already regex-escaped.
    Literal(String),
    /// An opaque regex fragment (a type's pattern, or a synthesised
    /// character-class from [`crate::charset::CharSet::to_regex_pattern`]).
    Regex(String),
}

impl EdgeLabel {
    pub fn render(&self) -> String {
        match self {
            EdgeLabel::Epsilon => "ε".to_string(),
            EdgeLabel::Literal(s) => s.clone(),
            EdgeLabel::Regex(s) => s.clone(),
        }
    }
}

/// One outgoing transition of a [`State`].
#[derive(Debug, Clone)]
pub struct Edge {
    pub label: EdgeLabel,
    /// Scratch slot used by automaton transformers that need to remember an
    /// originating state across a rewrite (e.g. [`Operation::Reverse`]'s
    /// clone-and-splice). Unused by C7 itself.
    pub base: Option<StateId>,
    pub next: StateId,
    pub taints: Taints,
}

/// One state of the NFA.
#[derive(Debug, Clone, Default)]
pub struct State {
    pub is_start: bool,
    pub is_accepting: bool,
    pub outgoing: Vec<Edge>,
    pub taints: Taints,
}

/// An ε-NFA with taint-annotated edges and states.
#[derive(Debug, Clone, Default)]
pub struct Nfa {
    pub(crate) states: Vec<State>,
    /// Arena of operation occurrences, indexed by [`OperationTaint`]. The
    /// arena order is introduction order (depth-first, shallow-to-deep).
    pub(crate) operations: Vec<Operation>,
    /// The (entry, exit) state pair bound to each operation occurrence at
    /// the moment C7 recursed into its tainted operand(s).
    pub(crate) spans: Vec<(StateId, StateId)>,
}

#[derive(Debug, thiserror::Error)]
/// Errors raised while constructing the NFA from a grammar (C7).
pub enum BuildAutomatonError {
    #[error("grammar has no designated start nonterminal")]
    /// The grammar's start nonterminal id does not resolve to a nonterminal.
    MissingStart,
}

impl Nfa {
    pub(crate) fn new_state(&mut self) -> StateId {
        self.states.push(State::default());
        self.states.len() - 1
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn states_mut(&mut self) -> &mut Vec<State> {
        &mut self.states
    }

    pub fn operation(&self, taint: OperationTaint) -> &Operation {
        &self.operations[taint.0]
    }

    pub fn span(&self, taint: OperationTaint) -> (StateId, StateId) {
        self.spans[taint.0]
    }

    pub fn start_state(&self) -> Option<StateId> {
        self.states.iter().position(|s| s.is_start)
    }

    pub fn accept_state(&self) -> Option<StateId> {
        self.states.iter().position(|s| s.is_accepting)
    }

    pub(crate) fn add_edge(&mut self, from: StateId, label: EdgeLabel, next: StateId, taints: Taints) {
        self.states[from].outgoing.push(Edge {
            label,
            base: None,
            next,
            taints,
        });
    }

    fn mark_taint(&mut self, state: StateId, taints: &Taints) {
        for t in taints.iter() {
            if !self.states[state].taints.contains(t) {
                self.states[state].taints.push(*t);
            }
        }
    }

    /// Every state reachable from `start` (inclusive), by any edge.
    pub fn reachable_from(&self, start: StateId) -> Vec<StateId> {
        let mut seen = vec![false; self.states.len()];
        let mut order = Vec::new();
        let mut queue = VecDeque::new();
        seen[start] = true;
        queue.push_back(start);
        while let Some(s) = queue.pop_front() {
            order.push(s);
            for edge in &self.states[s].outgoing {
                if !seen[edge.next] {
                    seen[edge.next] = true;
                    queue.push_back(edge.next);
                }
            }
        }
        order
    }

    /// Drops every state unreachable from the automaton's start state.
    /// Used by operation transformers (e.g. [`Operation::Reverse`]) after a
    /// local rewrite may have orphaned part of the graph. Remaps edge
    /// targets; preserves relative order of surviving states.
    pub fn gc_unreachable(&mut self) {
        let Some(start) = self.start_state() else {
            return;
        };
        let reachable: std::collections::HashSet<StateId> =
            self.reachable_from(start).into_iter().collect();
        let mut remap = AHashMap::default();
        let mut new_states = Vec::new();
        for (old_id, state) in self.states.iter().enumerate() {
            if reachable.contains(&old_id) {
                remap.insert(old_id, new_states.len());
                new_states.push(state.clone());
            }
        }
        for state in new_states.iter_mut() {
            state.outgoing.retain(|e| remap.contains_key(&e.next));
            for edge in state.outgoing.iter_mut() {
                edge.next = remap[&edge.next];
                edge.base = edge.base.and_then(|b| remap.get(&b).copied());
            }
        }
        self.states = new_states;
    }
}

enum Symbol<'g> {
    Terminal(&'g Terminal),
    Nonterminal(NonterminalId),
}

impl<'g> Symbol<'g> {
    fn is_epsilon(&self) -> bool {
        matches!(self, Symbol::Terminal(t) if t.is_epsilon)
    }
}

fn production_symbols(p: &Production) -> Vec<Symbol<'_>> {
    match p {
        Production::Terminal(t) => vec![Symbol::Terminal(t)],
        Production::Unit(a) => vec![Symbol::Nonterminal(*a)],
        Production::Concat(a, b) => vec![Symbol::Nonterminal(*a), Symbol::Nonterminal(*b)],
        Production::UnaryOp(_, a) => vec![Symbol::Nonterminal(*a)],
        Production::BinaryOp(_, a, b) => vec![Symbol::Nonterminal(*a), Symbol::Nonterminal(*b)],
    }
}

fn production_taint(nfa: &mut Nfa, p: &Production, entry: StateId, exit: StateId) -> Option<OperationTaint> {
    let op = match p {
        Production::UnaryOp(op, _) | Production::BinaryOp(op, _, _) => *op,
        _ => return None,
    };
    nfa.operations.push(op);
    nfa.spans.push((entry, exit));
    Some(OperationTaint(nfa.operations.len() - 1))
}

struct BuildCtx<'g> {
    grammar: &'g Grammar,
    component_of: AHashMap<NonterminalId, usize>,
    components: Vec<Component>,
}

impl<'g> BuildCtx<'g> {
    fn component_recursive(&self, a: NonterminalId) -> bool {
        let idx = self.component_of[&a];
        let comp = &self.components[idx];
        comp.members.len() > 1
            || self
                .grammar
                .nonterminal(a)
                .unwrap()
                .productions()
                .iter()
                .any(|p| production_symbols(p).iter().any(|s| matches!(s, Symbol::Nonterminal(b) if *b == a)))
    }

    fn build(
        &self,
        nfa: &mut Nfa,
        q0: StateId,
        alpha: &[Symbol<'g>],
        q1: StateId,
        taints: Taints,
    ) -> Result<(), BuildAutomatonError> {
        if alpha.is_empty() || alpha.iter().all(|s| s.is_epsilon()) {
            nfa.add_edge(q0, EdgeLabel::Epsilon, q1, taints.clone());
            nfa.mark_taint(q0, &taints);
            nfa.mark_taint(q1, &taints);
            return Ok(());
        }
        if alpha.len() == 1 {
            match &alpha[0] {
                Symbol::Terminal(t) => {
                    let label = if t.is_literal {
                        EdgeLabel::Literal(regex_escape_literal(&t.value))
                    } else {
                        EdgeLabel::Regex(t.value.clone())
                    };
                    nfa.add_edge(q0, label, q1, taints.clone());
                    nfa.mark_taint(q0, &taints);
                    nfa.mark_taint(q1, &taints);
                    return Ok(());
                }
                Symbol::Nonterminal(a) => {
                    return self.build_nonterminal(nfa, q0, *a, q1, taints);
                }
            }
        }
        let (head, rest) = alpha.split_first().unwrap();
        let q = match head {
            Symbol::Terminal(t) if t.is_epsilon => q0,
            _ => {
                let q = new_tainted_state(nfa, &taints);
                self.build(nfa, q0, std::slice::from_ref(head), q, taints.clone())?;
                q
            }
        };
        self.build(nfa, q, rest, q1, taints)
    }

    fn build_nonterminal(
        &self,
        nfa: &mut Nfa,
        q0: StateId,
        a: NonterminalId,
        q1: StateId,
        taints: Taints,
    ) -> Result<(), BuildAutomatonError> {
        if !self.component_recursive(a) {
            let nt = self.grammar.nonterminal(a).unwrap();
            for p in nt.productions() {
                let mut sub_taints = taints.clone();
                if let Some(t) = production_taint(nfa, p, q0, q1) {
                    sub_taints.push(t);
                }
                self.build(nfa, q0, &production_symbols(p), q1, sub_taints)?;
            }
            return Ok(());
        }

        let idx = self.component_of[&a];
        let comp = &self.components[idx];
        let recursion = comp.recursion;
        debug_assert!(matches!(recursion, Recursion::Left | Recursion::Right));

        let mut q_of: AHashMap<NonterminalId, StateId> = AHashMap::default();
        for &member in &comp.members {
            q_of.insert(member, new_tainted_state(nfa, &taints));
        }

        for &member in &comp.members {
            let nt = self.grammar.nonterminal(member).unwrap();
            for p in nt.productions() {
                let symbols = production_symbols(p);
                let member_positions: Vec<usize> = symbols
                    .iter()
                    .enumerate()
                    .filter_map(|(i, s)| match s {
                        Symbol::Nonterminal(b) if comp.members.contains(b) => Some(i),
                        _ => None,
                    })
                    .collect();
                let q_member = q_of[&member];

                if member_positions.is_empty() {
                    // Exit production: reaches only outside the component.
                    let (entry, exit) = match recursion {
                        Recursion::Left => (q0, q_member),
                        Recursion::Right => (q_member, q1),
                        _ => unreachable!("C6 guarantees LEFT/RIGHT for component-recursive SCCs"),
                    };
                    let mut sub_taints = taints.clone();
                    if let Some(t) = production_taint(nfa, p, entry, exit) {
                        sub_taints.push(t);
                    }
                    self.build(nfa, entry, &symbols, exit, sub_taints)?;
                } else {
                    debug_assert_eq!(member_positions.len(), 1, "C6 never produces two comp-members in one production");
                    let pos = member_positions[0];
                    let comp_member_id = match &symbols[pos] {
                        Symbol::Nonterminal(b) => *b,
                        _ => unreachable!(),
                    };
                    let q_target = q_of[&comp_member_id];
                    let (entry, rest, exit): (StateId, &[Symbol<'g>], StateId) = match recursion {
                        Recursion::Left => {
                            debug_assert_eq!(pos, 0, "LEFT recursion: comp-member must be leftmost");
                            (q_target, &symbols[1..], q_member)
                        }
                        Recursion::Right => {
                            debug_assert_eq!(pos, symbols.len() - 1, "RIGHT recursion: comp-member must be rightmost");
                            (q_member, &symbols[..pos], q_target)
                        }
                        _ => unreachable!(),
                    };
                    let mut sub_taints = taints.clone();
                    if let Some(t) = production_taint(nfa, p, entry, exit) {
                        sub_taints.push(t);
                    }
                    self.build(nfa, entry, rest, exit, sub_taints)?;
                }
            }
        }

        let qa = q_of[&a];
        match recursion {
            Recursion::Left => nfa.add_edge(qa, EdgeLabel::Epsilon, q1, taints.clone()),
            Recursion::Right => nfa.add_edge(q0, EdgeLabel::Epsilon, qa, taints.clone()),
            _ => unreachable!(),
        }
        Ok(())
    }
}

fn new_tainted_state(nfa: &mut Nfa, taints: &Taints) -> StateId {
    let q = nfa.new_state();
    nfa.mark_taint(q, taints);
    q
}

/// Escapes a literal string for use as a regex fragment, using the `\Q…\E`
/// literal-quotation convention the grammar-text dialect uses.
pub fn regex_escape_literal(s: &str) -> String {
    if s.is_empty() {
        String::new()
    } else {
        format!("\\Q{s}\\E")
    }
}

/// Builds the ε-NFA for `grammar`, Nederhof-style.
///
/// `hotspots` is threaded through only so callers can reuse the same
/// component classification computed for C6; C7 itself does not consult it.
pub fn build(
    grammar: &Grammar,
    components: Vec<Component>,
    _hotspots: &HotspotIds,
) -> Result<Nfa, BuildAutomatonError> {
    let start = grammar.start();
    if grammar.nonterminal(start).is_none() {
        return Err(BuildAutomatonError::MissingStart);
    }
    let mut component_of = AHashMap::default();
    for (idx, comp) in components.iter().enumerate() {
        for &m in &comp.members {
            component_of.insert(m, idx);
        }
    }
    let ctx = BuildCtx {
        grammar,
        component_of,
        components,
    };
    let mut nfa = Nfa::default();
    let q0 = nfa.new_state();
    let q1 = nfa.new_state();
    nfa.states[q0].is_start = true;
    nfa.states[q1].is_accepting = true;
    ctx.build(&mut nfa, q0, &[Symbol::Nonterminal(start)], q1, Taints::default())?;
    Ok(nfa)
}
