//! Grammar-text parser, turning the ASCII grammar-rule dialect into a
//! [`Grammar`] with `nom`.
use ahash::AHashMap;
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alphanumeric1, anychar, char, multispace0},
    combinator::{map, opt, recognize, verify},
    multi::{many0, many0_count, separated_list1},
    sequence::{delimited, pair},
    IResult,
};

use crate::grammar::{Grammar, Nonterminal, NonterminalId, Production, Terminal};
use crate::operations::Operation;

#[derive(Debug, thiserror::Error)]
/// Errors raised while parsing a grammar-text input.
pub enum ParseGrammarError {
    #[error("could not parse production: `{0}`")]
    InvalidProduction(String),
    #[error("unknown operation `{0}`")]
    UnknownOperation(String),
    #[error("replace[...] requires exactly two single-character arguments, got `{0}`")]
    InvalidReplaceArity(String),
}

enum Symbol {
    Nonterminal(String),
    TerminalChar(char),
}

enum Rhs {
    Sequence(Vec<Symbol>),
    Call {
        op: String,
        bracket_args: Vec<char>,
        arg: String,
    },
}

/// Parses the grammar-text dialect into a [`Grammar`]. The
/// first nonterminal mentioned (on the left-hand side of the first rule)
/// becomes the start nonterminal; terminal characters are wrapped in
/// synthetic `T<c>` nonterminals, one per distinct character, reused across
/// occurrences.
pub fn parse_grammar(input: &str) -> Result<Grammar, ParseGrammarError> {
    let mut ids: AHashMap<String, NonterminalId> = AHashMap::default();
    let mut terminal_ids: AHashMap<char, NonterminalId> = AHashMap::default();
    let mut grammar = Grammar::new(0);
    let mut next_id: NonterminalId = 0;
    let mut start_set = false;

    for raw_line in input.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (_, (lhs, alternatives)) =
            parse_rule(line).map_err(|_| ParseGrammarError::InvalidProduction(line.to_string()))?;

        let lhs_id = intern_nonterminal(&lhs, &mut grammar, &mut ids, &mut next_id);
        if !start_set {
            grammar = rebase_start(grammar, lhs_id);
            start_set = true;
        }

        for rhs in alternatives {
            let production =
                rhs_to_production(rhs, &mut grammar, &mut ids, &mut terminal_ids, &mut next_id)?;
            grammar
                .nonterminal_mut(lhs_id)
                .unwrap()
                .add_production(production);
        }
    }

    Ok(grammar)
}

fn intern_nonterminal(
    name: &str,
    grammar: &mut Grammar,
    ids: &mut AHashMap<String, NonterminalId>,
    next_id: &mut NonterminalId,
) -> NonterminalId {
    if let Some(&id) = ids.get(name) {
        return id;
    }
    let id = *next_id;
    *next_id += 1;
    grammar.get_or_create_nonterminal(id);
    grammar.set_label(id, name);
    ids.insert(name.to_string(), id);
    id
}

fn intern_terminal(
    c: char,
    grammar: &mut Grammar,
    terminal_ids: &mut AHashMap<char, NonterminalId>,
    next_id: &mut NonterminalId,
) -> NonterminalId {
    if let Some(&id) = terminal_ids.get(&c) {
        return id;
    }
    let id = *next_id;
    *next_id += 1;
    grammar.get_or_create_nonterminal(id);
    grammar.set_label(id, &format!("T<{c}>"));
    grammar
        .nonterminal_mut(id)
        .unwrap()
        .add_production(Production::Terminal(Terminal::literal(c.to_string())));
    terminal_ids.insert(c, id);
    id
}

/// `Grammar::new` always seeds id 0 as the start nonterminal; if the first
/// LHS we meet isn't 0, rebuild with the right start id. Ids are assigned in
/// first-seen order regardless, so this runs at most once, on the very
/// first rule.
fn rebase_start(mut grammar: Grammar, start: NonterminalId) -> Grammar {
    if grammar.start() == start {
        return grammar;
    }
    let mut rebuilt = Grammar::new(start);
    for id in grammar.ids() {
        let nt = grammar.nonterminal_mut(id).unwrap();
        let mut fresh = Nonterminal::new(id);
        for p in nt.productions().iter().cloned() {
            fresh.add_production(p);
        }
        rebuilt.add_nonterminal(fresh);
    }
    rebuilt
}

fn rhs_to_production(
    rhs: Rhs,
    grammar: &mut Grammar,
    ids: &mut AHashMap<String, NonterminalId>,
    terminal_ids: &mut AHashMap<char, NonterminalId>,
    next_id: &mut NonterminalId,
) -> Result<Production, ParseGrammarError> {
    match rhs {
        Rhs::Sequence(symbols) => match symbols.as_slice() {
            [] => Ok(Production::Terminal(Terminal::epsilon())),
            [only] => {
                let id = resolve_symbol(only, grammar, ids, terminal_ids, next_id);
                Ok(Production::Unit(id))
            }
            [a, b] => {
                let a_id = resolve_symbol(a, grammar, ids, terminal_ids, next_id);
                let b_id = resolve_symbol(b, grammar, ids, terminal_ids, next_id);
                Ok(Production::Concat(a_id, b_id))
            }
            _ => Err(ParseGrammarError::InvalidProduction(
                "concatenations longer than 2 symbols must be flattened upstream".to_string(),
            )),
        },
        Rhs::Call {
            op,
            bracket_args,
            arg,
        } => {
            let operand = intern_nonterminal(&arg, grammar, ids, next_id);
            let operation = match op.as_str() {
                "reverse" => Operation::Reverse,
                "trim" => Operation::Trim,
                "toUpperCase" => Operation::ToUpperCase,
                "toLowerCase" => Operation::ToLowerCase,
                "replace" => {
                    if bracket_args.len() != 2 {
                        return Err(ParseGrammarError::InvalidReplaceArity(
                            bracket_args.iter().collect(),
                        ));
                    }
                    Operation::ReplaceBothKnown {
                        old: bracket_args[0],
                        new: bracket_args[1],
                    }
                }
                other => return Err(ParseGrammarError::UnknownOperation(other.to_string())),
            };
            Ok(Production::UnaryOp(operation, operand))
        }
    }
}

fn resolve_symbol(
    s: &Symbol,
    grammar: &mut Grammar,
    ids: &mut AHashMap<String, NonterminalId>,
    terminal_ids: &mut AHashMap<char, NonterminalId>,
    next_id: &mut NonterminalId,
) -> NonterminalId {
    match s {
        Symbol::Nonterminal(name) => intern_nonterminal(name, grammar, ids, next_id),
        Symbol::TerminalChar(c) => intern_terminal(*c, grammar, terminal_ids, next_id),
    }
}

fn parse_rule(line: &str) -> IResult<&str, (String, Vec<Rhs>)> {
    let (input, lhs) = nonterminal_name(line)?;
    let (input, _) = delimited(multispace0, tag("->"), multispace0)(input)?;
    let (input, alternatives) =
        separated_list1(delimited(multispace0, char('|'), multispace0), alternative)(input)?;
    Ok((input, (lhs.to_string(), alternatives)))
}

/// A single uppercase ASCII letter denotes a nonterminal. Sequences are
/// written with no separator between symbols (e.g. `Ab`, `TS`), so a
/// nonterminal token cannot swallow more than one letter without making such
/// sequences ambiguous with longer multi-letter identifiers; every grammar
/// this parser is meant to accept sticks to single-letter nonterminals, so
/// that is the reading it commits to.
fn nonterminal_name(input: &str) -> IResult<&str, &str> {
    recognize(verify(anychar, |c: &char| c.is_ascii_uppercase()))(input)
}

/// An operation's call name: a run of letters starting lowercase, directly
/// followed by `(` or `[` — distinguishing it from a lowercase terminal
/// character, which is never followed by a parenthesis in this dialect.
fn call_name(input: &str) -> IResult<&str, &str> {
    let (rest, name) = recognize(pair(
        verify(anychar, |c: &char| c.is_ascii_lowercase()),
        many0_count(alphanumeric1),
    ))(input)?;
    if rest.starts_with('(') || rest.starts_with('[') {
        Ok((rest, name))
    } else {
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )))
    }
}

fn alternative(input: &str) -> IResult<&str, Rhs> {
    alt((call_form, sequence_form))(input)
}

fn call_form(input: &str) -> IResult<&str, Rhs> {
    let (input, op) = call_name(input)?;
    let (input, bracket_args) = opt(delimited(
        char('['),
        separated_list1(char(','), anychar),
        char(']'),
    ))(input)?;
    let (input, arg) = delimited(char('('), nonterminal_name, char(')'))(input)?;
    Ok((
        input,
        Rhs::Call {
            op: op.to_string(),
            bracket_args: bracket_args.unwrap_or_default(),
            arg: arg.to_string(),
        },
    ))
}

fn sequence_form(input: &str) -> IResult<&str, Rhs> {
    map(many0(symbol), Rhs::Sequence)(input)
}

fn symbol(input: &str) -> IResult<&str, Symbol> {
    alt((
        map(nonterminal_name, |name| {
            Symbol::Nonterminal(name.to_string())
        }),
        map(
            verify(anychar, |c: &char| {
                !c.is_whitespace() && *c != '|' && *c != '(' && *c != ')'
            }),
            Symbol::TerminalChar,
        ),
    ))(input)
}
