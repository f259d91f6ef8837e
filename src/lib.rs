/*!
# strval-approx

This crate computes a **regular over-approximation** of the set of string
values a program expression may produce at a selected "hotspot" (e.g. a
value passed to `println` or to an SQL execution call). It implements the
Christensen/Møller/Schwartzbach context-free-grammar-to-regular-language
reduction, with Nederhof's regular approximation of non-regular grammars for
the cases where the hotspot's value flows through recursive string
operations.

Given a grammar describing how a hotspot's value is built out of literals,
scalar-typed terminals and string operations (concatenation, `reverse`,
`trim`, case conversion, character replacement), [`Engine::approximate`]
returns a single regex pattern string that is guaranteed to match every
string the expression can actually produce at runtime — and, in general,
some strings it cannot, since an over-approximation trades precision for
termination on grammars that are not themselves regular.

```
use strval_approx::{Engine, HotspotIds};

let grammar = "A -> a | B\nB -> Ab\n";
let hotspots = HotspotIds::from_iter([0]);
let engine = Engine::new();
let pattern = engine.approximate(grammar, &hotspots).unwrap();
assert!(pattern.contains("\\Qa\\E"));
```

# Pipeline

The engine runs eight components in sequence over one grammar:

1. **C1** character-set algebra ([`charset`]) — the `CharSet` type every
   other component reasons about.
2. **C2** grammar model ([`grammar`]) — nonterminals, productions, the
   `Grammar` container.
3. **C3** operation catalogue ([`operations`]) — `reverse`, `trim`,
   case conversion, character replacement, each with a charset transform
   and an automaton transform.
4. **C4** SCC and recursion classifier ([`scc`]) — Tarjan's algorithm plus
   a LEFT/RIGHT/BOTH/NONE label per component.
5. **C5** character-set fix-point and operation-cycle breaking
   ([`approximate`]).
6. **C6** Mohri–Nederhof regular approximation ([`regularize`]) — rewrites
   BOTH-recursive components into purely right-recursive form.
7. **C7** automaton construction ([`automaton`]) — builds the ε-NFA,
   propagating operation taints onto the states/edges they govern.
8. **C8** operation resolver ([`resolve`]) — rewrites tainted sub-automata
   in reverse introduction order.

Two further stages turn the resolved NFA into the pattern string the crate
returns: an optional determinisation pass ([`determinize`]) and
state-elimination regex extraction ([`regexgen`]). The grammar-text dialect
accepted by [`Engine::approximate`] is parsed by [`parser`].

# Non-goals

This crate does not discover hotspots, build code property graphs, or
evaluate data-flow — it consumes an already-reduced grammar. It does not
parse any host programming language. It is not a general-purpose regular
expression engine; [`regexgen::to_regex`] only ever produces the dialect
`Engine::approximate` needs.
*/
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod approximate;
pub mod automaton;
pub mod charset;
pub mod config;
pub mod determinize;
pub mod engine;
pub mod grammar;
pub mod operations;
pub mod parser;
pub mod regexgen;
pub mod regularize;
pub mod resolve;
pub mod scc;
mod utils;

pub use config::Config;
pub use engine::{ApproximateError, Engine};
pub use grammar::{Grammar, HotspotIds};
