//! The grammar model (C2): nonterminals, productions, and the grammar
//! container threaded through C4–C7.
use ahash::{AHashMap, AHashSet};
use string_interner::{DefaultStringInterner, DefaultSymbol};

use crate::charset::CharSet;
use crate::operations::Operation;

/// A stable, nonnegative nonterminal id. Equality and hashing are by id
/// only, never by label.
pub type NonterminalId = u32;

/// The set of nonterminal ids that are hotspots, for C6's "needs ε on its
/// primed counterpart" rule.
pub type HotspotIds = AHashSet<NonterminalId>;

/// A terminal symbol: a literal, an epsilon, or an opaque regex-fragment
/// terminal (e.g. a scalar type's pattern).
#[derive(Debug, Clone, PartialEq)]
pub struct Terminal {
    /// The literal text (if `is_literal`), or the regex fragment source
    /// (otherwise). Unused (empty) when `is_epsilon`.
    pub value: String,
    pub is_literal: bool,
    pub is_epsilon: bool,
    pub charset: CharSet,
}

impl Terminal {
    pub fn epsilon() -> Self {
        Terminal {
            value: String::new(),
            is_literal: false,
            is_epsilon: true,
            charset: CharSet::empty(),
        }
    }

    /// A terminal matching `text` exactly.
    pub fn literal(text: impl Into<String>) -> Self {
        let value = text.into();
        let charset = CharSet::from_chars(value.chars());
        Terminal {
            value,
            is_literal: true,
            is_epsilon: false,
            charset,
        }
    }

    /// A terminal matching an opaque regex fragment, carrying the
    /// [`CharSet`] that over-approximates the characters it can produce.
    pub fn regex_fragment(fragment: impl Into<String>, charset: CharSet) -> Self {
        Terminal {
            value: fragment.into(),
            is_literal: false,
            is_epsilon: false,
            charset,
        }
    }

    /// Looks up the built-in regex fragment for a known scalar type name,
    /// widening to Σ* for anything unrecognised (unknown
    /// inputs widen rather than fail).
    pub fn for_type(name: &str) -> Self {
        match name {
            "int" => Terminal::regex_fragment(
                "0|(-?[1-9][0-9]*)",
                CharSet::from_chars("-0123456789".chars()),
            ),
            "bool" => {
                Terminal::regex_fragment("(true|false)", CharSet::from_chars("truefalse".chars()))
            }
            other => {
                log::warn!("unknown terminal type `{other}`, widening to Σ*");
                Terminal::regex_fragment(CharSet::sigma().to_regex_pattern(), CharSet::sigma())
            }
        }
    }
}

/// A single production `X → …` for some (implicit, stored by the owning
/// [`Nonterminal`]) left-hand side `X`.
#[derive(Debug, Clone, PartialEq)]
pub enum Production {
    Terminal(Terminal),
    /// `X → A`
    Unit(NonterminalId),
    /// `X → A B`
    Concat(NonterminalId, NonterminalId),
    /// `X → op(A)`
    UnaryOp(Operation, NonterminalId),
    /// `X → op(A, B)`. Structurally supported, but the grammar-text parser
    /// never emits one: every operation in the catalogue takes exactly one
    /// nonterminal operand, with any "old"/"new" metadata carried as fields
    /// on [`Operation`] itself. See `DESIGN.md` for this decision's
    /// rationale.
    BinaryOp(Operation, NonterminalId, NonterminalId),
}

impl Production {
    /// The nonterminals this production's right-hand side mentions,
    /// terminals dropped — used to build the grammar graph for C4.
    pub fn successor_nonterminals(&self) -> Vec<NonterminalId> {
        match self {
            Production::Terminal(_) => Vec::new(),
            Production::Unit(a) | Production::UnaryOp(_, a) => vec![*a],
            Production::Concat(a, b) | Production::BinaryOp(_, a, b) => vec![*a, *b],
        }
    }
}

/// A nonterminal: a stable id, an optional display label, and its
/// productions.
#[derive(Debug, Clone)]
pub struct Nonterminal {
    id: NonterminalId,
    label: Option<DefaultSymbol>,
    productions: Vec<Production>,
}

impl Nonterminal {
    pub fn new(id: NonterminalId) -> Self {
        Nonterminal {
            id,
            label: None,
            productions: Vec::new(),
        }
    }

    pub fn id(&self) -> NonterminalId {
        self.id
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn productions_mut(&mut self) -> &mut Vec<Production> {
        &mut self.productions
    }

    pub fn add_production(&mut self, p: Production) {
        self.productions.push(p);
    }
}

impl PartialEq for Nonterminal {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Nonterminal {}
impl std::hash::Hash for Nonterminal {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// The grammar: an id-addressed collection of nonterminals plus a
/// designated start symbol.
#[derive(Debug, Clone)]
pub struct Grammar {
    nonterminals: AHashMap<NonterminalId, Nonterminal>,
    start: NonterminalId,
    max_id: NonterminalId,
    interner: DefaultStringInterner,
}

impl Grammar {
    pub fn new(start: NonterminalId) -> Self {
        let mut g = Grammar {
            nonterminals: AHashMap::default(),
            start,
            max_id: start,
            interner: DefaultStringInterner::new(),
        };
        g.get_or_create_nonterminal(start);
        g
    }

    pub fn start(&self) -> NonterminalId {
        self.start
    }

    pub fn nonterminal(&self, id: NonterminalId) -> Option<&Nonterminal> {
        self.nonterminals.get(&id)
    }

    pub fn nonterminal_mut(&mut self, id: NonterminalId) -> Option<&mut Nonterminal> {
        self.nonterminals.get_mut(&id)
    }

    pub fn add_nonterminal(&mut self, nt: Nonterminal) {
        self.max_id = self.max_id.max(nt.id);
        self.nonterminals.insert(nt.id, nt);
    }

    /// Returns the nonterminal for `id`, creating an empty one if absent.
    pub fn get_or_create_nonterminal(&mut self, id: NonterminalId) -> &mut Nonterminal {
        self.max_id = self.max_id.max(id);
        self.nonterminals
            .entry(id)
            .or_insert_with(|| Nonterminal::new(id))
    }

    /// Mints a nonterminal whose id is strictly greater than any id seen so
    /// far, adds it to the grammar, and returns its id.
    pub fn create_new_nonterminal(&mut self) -> NonterminalId {
        self.max_id += 1;
        let id = self.max_id;
        self.nonterminals.insert(id, Nonterminal::new(id));
        id
    }

    pub fn set_label(&mut self, id: NonterminalId, label: &str) {
        let sym = self.interner.get_or_intern(label);
        if let Some(nt) = self.nonterminals.get_mut(&id) {
            nt.label = Some(sym);
        }
    }

    pub fn label(&self, id: NonterminalId) -> Option<&str> {
        self.nonterminals
            .get(&id)
            .and_then(|nt| nt.label)
            .and_then(|sym| self.interner.resolve(sym))
    }

    /// Nonterminal ids in ascending order. Every pass over the grammar uses
    /// this rather than the backing map's own order, so fix-point and SCC
    /// passes stay deterministic.
    pub fn ids(&self) -> Vec<NonterminalId> {
        crate::utils::sorted_keys(&self.nonterminals)
    }

    /// Flattens every production's right-hand side for `id`, dropping
    /// terminals.
    pub fn successors_for(&self, id: NonterminalId) -> Vec<NonterminalId> {
        match self.nonterminal(id) {
            None => Vec::new(),
            Some(nt) => nt
                .productions()
                .iter()
                .flat_map(Production::successor_nonterminals)
                .collect(),
        }
    }

    /// One pass over every production in the grammar, id -> predecessors.
    pub fn all_predecessors(&self) -> AHashMap<NonterminalId, AHashSet<NonterminalId>> {
        let mut preds: AHashMap<NonterminalId, AHashSet<NonterminalId>> = AHashMap::default();
        for id in self.ids() {
            for succ in self.successors_for(id) {
                preds.entry(succ).or_default().insert(id);
            }
        }
        preds
    }

    pub fn print_grammar(&self) -> String {
        let mut out = String::new();
        for id in self.ids() {
            let nt = self.nonterminal(id).unwrap();
            let lhs = match self.label(id) {
                Some(label) => format!("{label}[{id}]"),
                None => format!("N{id}"),
            };
            let rhs: Vec<String> = nt
                .productions()
                .iter()
                .map(|p| self.production_to_display(p))
                .collect();
            out.push_str(&format!("{lhs} ::= {};\n", rhs.join(" | ")));
        }
        out
    }

    fn production_to_display(&self, p: &Production) -> String {
        let nt_label = |id: NonterminalId| -> String {
            match self.label(id) {
                Some(l) => format!("{l}[{id}]"),
                None => format!("N{id}"),
            }
        };
        match p {
            Production::Terminal(t) if t.is_epsilon => "ε".to_string(),
            Production::Terminal(t) if t.is_literal => format!("\"{}\"", t.value),
            Production::Terminal(t) => format!("#\"{}\"", t.value),
            Production::Unit(a) => nt_label(*a),
            Production::Concat(a, b) => format!("{} {}", nt_label(*a), nt_label(*b)),
            Production::UnaryOp(op, a) => format!("{}({})", op.name(), nt_label(*a)),
            Production::BinaryOp(op, a, b) => {
                format!("{}({}, {})", op.name(), nt_label(*a), nt_label(*b))
            }
        }
    }

    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph grammar {\n");
        for id in self.ids() {
            for succ in self.successors_for(id) {
                out.push_str(&format!("  N{id} -> N{succ};\n"));
            }
        }
        out.push_str("}\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successors_drop_terminals() {
        let mut g = Grammar::new(0);
        g.nonterminal_mut(0)
            .unwrap()
            .add_production(Production::Terminal(Terminal::literal("a")));
        g.get_or_create_nonterminal(1);
        g.nonterminal_mut(0)
            .unwrap()
            .add_production(Production::Unit(1));
        assert_eq!(g.successors_for(0), vec![1]);
    }

    #[test]
    fn predecessors_are_one_pass() {
        let mut g = Grammar::new(0);
        g.get_or_create_nonterminal(1);
        g.nonterminal_mut(0)
            .unwrap()
            .add_production(Production::Unit(1));
        let preds = g.all_predecessors();
        assert_eq!(preds[&1], AHashSet::from_iter([0]));
    }

    #[test]
    fn create_new_nonterminal_is_fresh() {
        let mut g = Grammar::new(5);
        let a = g.create_new_nonterminal();
        let b = g.create_new_nonterminal();
        assert!(a > 5);
        assert!(b > a);
    }
}
