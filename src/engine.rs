//! The main module that contains the [`Engine`] struct, which wires the
//! parser and C5–C8 components into the single-shot pipeline this crate
//! implements: grammar text in, a regular expression pattern out.
use crate::approximate;
use crate::automaton::{self, BuildAutomatonError};
use crate::config::{Config, InternalConfig};
use crate::determinize;
use crate::grammar::{Grammar, HotspotIds};
use crate::parser::{self, ParseGrammarError};
use crate::regexgen;
use crate::regularize;
use crate::resolve;
use crate::scc::compute_components;

#[derive(Debug, thiserror::Error)]
/// Represents the error type for [`Engine::approximate`].
pub enum ApproximateError {
    #[error("{0}")]
    /// A wrapper for the [`ParseGrammarError`](crate::parser::ParseGrammarError) error type.
    ParseError(#[from] ParseGrammarError),
    #[error("{0}")]
    /// A wrapper for the [`BuildAutomatonError`](crate::automaton::BuildAutomatonError) error type.
    BuildAutomatonError(#[from] BuildAutomatonError),
    #[error("the resolved automaton has no reachable accepting path from its start state")]
    /// The NFA survived construction but the regex extractor could not find
    /// any start-to-accept path (e.g. the grammar derives no string at all).
    EmptyLanguage,
}

/// The single entry point of the crate: turns grammar-rule text plus a
/// hotspot identifier set into the regular-expression pattern string
/// over-approximating that hotspot's runtime values.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: Config,
}

impl Engine {
    /// Creates an [`Engine`] with the default [`Config`].
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates an [`Engine`] with a custom [`Config`].
    pub fn with_config(config: Config) -> Self {
        Engine { config }
    }

    /// Runs the full pipeline over `grammar_text`, treating `hotspots` as
    /// the externally supplied hotspot identifier set.
    ///
    /// # Errors
    ///
    /// Returns an [`ApproximateError`] if `grammar_text` fails to parse, if
    /// the grammar has no start nonterminal, or if the resulting automaton
    /// derives no string at all.
    pub fn approximate(
        &self,
        grammar_text: &str,
        hotspots: &HotspotIds,
    ) -> Result<String, ApproximateError> {
        let mut grammar = parser::parse_grammar(grammar_text)?;
        self.approximate_grammar(&mut grammar, hotspots)
    }

    /// Materialises this engine's [`InternalConfig`], resolving the
    /// knobs every pipeline stage actually consults.
    fn internal_config(&self) -> InternalConfig {
        self.config.clone().internal_config()
    }

    /// Same as [`Engine::approximate`], but takes an already-constructed
    /// [`Grammar`] rather than parsing one from text. Useful for callers
    /// that build their grammar programmatically instead of through the
    /// text dialect [`crate::parser`] accepts.
    pub fn approximate_grammar(
        &self,
        grammar: &mut Grammar,
        hotspots: &HotspotIds,
    ) -> Result<String, ApproximateError> {
        let internal_config = self.internal_config();

        log::debug!("running C5 fix-point and operation-cycle breaking");
        approximate::approximate(grammar, internal_config.max_cycle_break_rounds);

        log::debug!("computing strongly connected components for C6");
        let components = compute_components(grammar);
        let components = regularize::regularize(grammar, components, hotspots);

        log::debug!("building the Nederhof automaton (C7)");
        let mut nfa = automaton::build(grammar, components, hotspots)?;

        log::debug!("resolving operation taints in reverse introduction order (C8)");
        resolve::resolve(&mut nfa);

        let nfa = if internal_config.determinize {
            log::debug!("determinising the resolved automaton");
            determinize::determinize(&nfa)
        } else {
            nfa
        };

        regexgen::to_regex(&nfa).ok_or(ApproximateError::EmptyLanguage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_recursive_scenario_produces_a_pattern() {
        // Left-recursive: A -> a | B; B -> Ab
        let engine = Engine::new();
        let hotspots = HotspotIds::from_iter([0]);
        let pattern = engine.approximate("A -> a | B\nB -> Ab\n", &hotspots).unwrap();
        assert!(pattern.contains("\\Qa\\E"));
    }

    #[test]
    fn empty_language_grammar_is_reported() {
        // A production that can never reach the accept state without any
        // terminal symbol at all has no productions, so the automaton has
        // no path from start to accept.
        let engine = Engine::new();
        let mut grammar = Grammar::new(0);
        let hotspots = HotspotIds::default();
        let err = engine.approximate_grammar(&mut grammar, &hotspots);
        assert!(err.is_err());
    }
}
