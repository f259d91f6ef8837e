//! Configuration for the approximation engine.
use serde::{Deserialize, Serialize};

/// The configuration of the [`Engine`](crate::engine::Engine) struct. This
/// should suffice most scenarios.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Config {
    /// Whether C7's output is determinised before regex extraction.
    /// Determinising only shrinks the result; it is never required for
    /// soundness. The default is `false`.
    pub determinize: bool,
    /// The maximum number of operation-cycle-breaking rounds C5 will run
    /// before giving up and leaving any remaining cyclic operation
    /// productions in place (which C7/C8 then treat as an ordinary,
    /// possibly-unsound-if-truly-cyclic grammar — in practice C5's loop
    /// always terminates well under this, since it strictly shrinks the
    /// number of cyclic op-productions each round). The default is `64`.
    pub max_cycle_break_rounds: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            determinize: false,
            max_cycle_break_rounds: 64,
        }
    }
}

impl Config {
    /// Converts the configuration to the internal configuration used by
    /// [`crate::engine::Engine`].
    pub fn internal_config(self) -> InternalConfig {
        InternalConfig {
            determinize: self.determinize,
            max_cycle_break_rounds: self.max_cycle_break_rounds,
        }
    }
}

/// The internal configuration of the engine. This is intended for advanced
/// usage; most callers should configure via [`Config`].
#[derive(Debug, Clone)]
pub struct InternalConfig {
    pub determinize: bool,
    pub max_cycle_break_rounds: usize,
}
