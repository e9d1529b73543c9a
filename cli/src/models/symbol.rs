use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_SYMBOL_LEN: usize = 15;

/// Normalized ticker symbol (trimmed, upper-cased).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Parse and normalize a ticker. Index tickers (`^GSPC`), share classes
    /// (`BRK.B`), pairs (`BTC-USD`) and futures (`ES=F`) are accepted.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input.trim().to_ascii_uppercase();
        let invalid = |reason: String| ValidationError::InvalidSymbol {
            token: input.trim().to_string(),
            reason,
        };

        let first = normalized
            .chars()
            .next()
            .ok_or_else(|| invalid("empty symbol".to_string()))?;

        let len = normalized.chars().count();
        if len > MAX_SYMBOL_LEN {
            return Err(invalid(format!(
                "{} characters, at most {} allowed",
                len, MAX_SYMBOL_LEN
            )));
        }

        if !(first.is_ascii_alphabetic() || first == '^') {
            return Err(invalid(format!("must start with a letter, found '{}'", first)));
        }

        if let Some(ch) = normalized
            .chars()
            .find(|ch| !(ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '^' | '=')))
        {
            return Err(invalid(format!("unexpected character '{}'", ch)));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

/// Insertion-ordered set of symbols. Duplicates are collapsed silently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolSet(Vec<Symbol>);

impl SymbolSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Returns false when the symbol was already present.
    pub fn insert(&mut self, symbol: Symbol) -> bool {
        if self.0.contains(&symbol) {
            return false;
        }
        self.0.push(symbol);
        true
    }

    pub fn remove(&mut self, symbol: &Symbol) -> bool {
        let before = self.0.len();
        self.0.retain(|s| s != symbol);
        before != self.0.len()
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.0.contains(symbol)
    }

    pub fn first(&self) -> Option<&Symbol> {
        self.0.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Symbol> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn to_vec(&self) -> Vec<Symbol> {
        self.0.clone()
    }

    pub fn joined(&self, separator: &str) -> String {
        self.0
            .iter()
            .map(Symbol::as_str)
            .collect::<Vec<_>>()
            .join(separator)
    }
}

impl FromIterator<Symbol> for SymbolSet {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        let mut set = SymbolSet::new();
        for symbol in iter {
            set.insert(symbol);
        }
        set
    }
}

impl<'a> IntoIterator for &'a SymbolSet {
    type Item = &'a Symbol;
    type IntoIter = std::slice::Iter<'a, Symbol>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_symbol() {
        assert_eq!(Symbol::parse(" aapl ").unwrap().as_str(), "AAPL");
        assert_eq!(Symbol::parse("brk.b").unwrap().as_str(), "BRK.B");
        assert_eq!(Symbol::parse("^gspc").unwrap().as_str(), "^GSPC");
    }

    #[test]
    fn rejects_bad_symbols() {
        assert!(Symbol::parse("").is_err());
        assert!(Symbol::parse("1AAPL").is_err());
        assert!(Symbol::parse("AA$PL").is_err());
        assert!(Symbol::parse("ABCDEFGHIJKLMNOP").is_err());
    }

    #[test]
    fn set_collapses_duplicates_in_order() {
        let set: SymbolSet = ["msft", "AAPL", "msft"]
            .iter()
            .map(|s| Symbol::parse(s).unwrap())
            .collect();
        assert_eq!(set.joined(","), "MSFT,AAPL");
    }
}
