//! Character-set algebra (C1): finite sets and Σ-complement sets over `char`.
//!
//! A [`CharSet`] is either a finite set of characters or "Σ minus a finite
//! removed set". The two representations are never normalised into each
//! other: `Σ ∖ ∅` and "the finite set containing every character we've ever
//! seen" are different values, by design.

use ahash::AHashSet;

/// A set of characters, represented either directly or as a complement of Σ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharSet {
    /// An explicit, finite set of characters.
    Finite(AHashSet<char>),
    /// Σ ∖ `R`, i.e. every character except the finite set `R`.
    Complement(AHashSet<char>),
}

impl CharSet {
    /// The empty language ∅.
    pub fn empty() -> Self {
        CharSet::Finite(AHashSet::default())
    }

    /// The full alphabet Σ.
    pub fn sigma() -> Self {
        CharSet::Complement(AHashSet::default())
    }

    /// The singleton set `{c}`.
    pub fn single(c: char) -> Self {
        let mut set = AHashSet::default();
        set.insert(c);
        CharSet::Finite(set)
    }

    /// A finite set built from an iterator of characters.
    pub fn from_chars(chars: impl IntoIterator<Item = char>) -> Self {
        CharSet::Finite(chars.into_iter().collect())
    }

    pub fn contains(&self, c: char) -> bool {
        match self {
            CharSet::Finite(set) => set.contains(&c),
            CharSet::Complement(removed) => !removed.contains(&c),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CharSet::Finite(set) if set.is_empty())
    }

    /// Set union.
    pub fn union(&self, other: &CharSet) -> CharSet {
        match (self, other) {
            (CharSet::Finite(a), CharSet::Finite(b)) => {
                CharSet::Finite(a.union(b).copied().collect())
            }
            (CharSet::Finite(finite), CharSet::Complement(r))
            | (CharSet::Complement(r), CharSet::Finite(finite)) => {
                CharSet::Complement(r.difference(finite).copied().collect())
            }
            (CharSet::Complement(r1), CharSet::Complement(r2)) => {
                CharSet::Complement(r1.intersection(r2).copied().collect())
            }
        }
    }

    /// Set intersection.
    pub fn intersect(&self, other: &CharSet) -> CharSet {
        match (self, other) {
            (CharSet::Finite(a), CharSet::Finite(b)) => {
                CharSet::Finite(a.intersection(b).copied().collect())
            }
            (CharSet::Finite(finite), CharSet::Complement(r))
            | (CharSet::Complement(r), CharSet::Finite(finite)) => {
                CharSet::Finite(finite.difference(r).copied().collect())
            }
            (CharSet::Complement(r1), CharSet::Complement(r2)) => {
                CharSet::Complement(r1.union(r2).copied().collect())
            }
        }
    }

    /// Returns the set with `c` added.
    pub fn add(&self, c: char) -> CharSet {
        match self {
            CharSet::Finite(set) => {
                let mut set = set.clone();
                set.insert(c);
                CharSet::Finite(set)
            }
            CharSet::Complement(removed) => {
                let mut removed = removed.clone();
                removed.remove(&c);
                CharSet::Complement(removed)
            }
        }
    }

    /// Returns the set with `c` removed.
    pub fn remove(&self, c: char) -> CharSet {
        match self {
            CharSet::Finite(set) => {
                let mut set = set.clone();
                set.remove(&c);
                CharSet::Finite(set)
            }
            CharSet::Complement(removed) => {
                let mut removed = removed.clone();
                removed.insert(c);
                CharSet::Complement(removed)
            }
        }
    }

    /// Renders the set as a starred character-class regex fragment, e.g.
    /// `(\d|a|b)*` or `[^xy]*`. Digits get the `\d` shorthand when the set
    /// contains all of `0..=9`.
    pub fn to_regex_pattern(&self) -> String {
        match self {
            CharSet::Complement(removed) => {
                let mut chars: Vec<char> = removed.iter().copied().collect();
                chars.sort_unstable();
                let body: String = chars.iter().map(|c| escape_in_class(*c)).collect();
                format!("[^{body}]*")
            }
            CharSet::Finite(set) => {
                let digit_shorthand = ('0'..='9').all(|d| set.contains(&d));
                let mut chars: Vec<char> = set
                    .iter()
                    .copied()
                    .filter(|c| !(digit_shorthand && c.is_ascii_digit()))
                    .collect();
                chars.sort_unstable();
                let mut alternatives = Vec::with_capacity(chars.len() + 1);
                if digit_shorthand {
                    alternatives.push("\\d".to_string());
                }
                alternatives.extend(chars.iter().map(|c| escape_in_alternative(*c)));
                if alternatives.is_empty() {
                    // The empty language; emitted so callers never see an unparsable "()*"
                    "(?:)".to_string()
                } else {
                    format!("({})*", alternatives.join("|"))
                }
            }
        }
    }
}

fn escape_in_class(c: char) -> String {
    match c {
        ']' | '^' | '\\' | '-' => format!("\\{c}"),
        _ => c.to_string(),
    }
}

fn escape_in_alternative(c: char) -> String {
    match c {
        '|' | '(' | ')' | '\\' | '*' | '?' | '.' | '[' | ']' => format!("\\{c}"),
        _ => c.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters() -> CharSet {
        CharSet::from_chars('a'..='z')
    }

    fn digits() -> CharSet {
        CharSet::from_chars('0'..='9')
    }

    #[test]
    fn union_of_finite_sets() {
        let both = letters().union(&digits());
        assert!(both.contains('a'));
        assert!(both.contains('5'));
        assert!(!both.contains('!'));
    }

    #[test]
    fn s6_charset_sanity() {
        // (letters ∪ digits) ∩ digits = digits
        let union = letters().union(&digits());
        assert_eq!(union.intersect(&digits()), digits());

        // Σ ∖ {a random member of letters} is not equal to Σ
        let sigma = CharSet::sigma();
        let missing_one = sigma.remove('q');
        assert_ne!(missing_one, sigma);

        // letters ∩ digits = ∅
        assert_eq!(letters().intersect(&digits()), CharSet::empty());
    }

    #[test]
    fn algebraic_laws() {
        let a = letters();
        let b = digits();
        // (A ∪ B) ∩ B = B
        assert_eq!(a.union(&b).intersect(&b), b);
        // A ∩ ∅ = ∅
        assert_eq!(a.intersect(&CharSet::empty()), CharSet::empty());
        // A ∪ ∅ = A
        assert_eq!(a.union(&CharSet::empty()), a);
        // Σ ∪ A = Σ
        assert_eq!(CharSet::sigma().union(&a), CharSet::sigma());
    }

    #[test]
    fn sigma_complement_empty_is_not_normalised_to_equal_finite_all() {
        // Representation equality only: Σ∖∅ is never considered equal to any
        // Finite set, even one that happens to contain "every character".
        let sigma = CharSet::sigma();
        let finite_all = CharSet::from_chars(['a', 'b']);
        assert_ne!(sigma, finite_all);
    }

    #[test]
    fn regex_pattern_uses_digit_shorthand() {
        let pattern = digits().to_regex_pattern();
        assert_eq!(pattern, "(\\d)*");
    }

    #[test]
    fn regex_pattern_for_complement() {
        let pattern = CharSet::sigma().remove('a').to_regex_pattern();
        assert_eq!(pattern, "[^a]*");
    }
}
