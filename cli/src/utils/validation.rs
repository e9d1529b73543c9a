use crate::{
    error::ValidationError,
    models::{Symbol, SymbolSet},
};
use regex::Regex;
use std::sync::OnceLock;

fn separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"[,\s]+").expect("separator pattern is valid"))
}

/// Split a comma-or-space separated list into upper-cased tokens.
pub fn tokenize_symbols(input: &str) -> Result<Vec<String>, ValidationError> {
    let tokens: Vec<String> = separator()
        .split(input.trim())
        .map(|t| t.trim().to_ascii_uppercase())
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.is_empty() {
        return Err(ValidationError::EmptySymbolList);
    }
    Ok(tokens)
}

/// Well-formedness check of a symbol list. Duplicates collapse silently.
#[derive(Debug, Default)]
pub struct ParsedSymbols {
    pub symbols: SymbolSet,
    pub rejected: Vec<ValidationError>,
}

pub fn parse_symbol_list(input: &str) -> Result<ParsedSymbols, ValidationError> {
    let mut parsed = ParsedSymbols::default();
    for token in tokenize_symbols(input)? {
        match Symbol::parse(&token) {
            Ok(symbol) => {
                parsed.symbols.insert(symbol);
            }
            Err(e) => parsed.rejected.push(e),
        }
    }
    Ok(parsed)
}

/// Parse a numeric menu choice within `0..=max`.
pub fn parse_menu_choice(input: &str, max: u8) -> Result<u8, ValidationError> {
    input
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|n| *n <= max)
        .ok_or_else(|| ValidationError::InvalidMenuSelection {
            input: input.trim().to_string(),
        })
}

/// Yes/no answer; empty input takes `default`.
pub fn parse_yes_no(input: &str, default: bool) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "" => Some(default),
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Parse portfolio weights; empty input means equal weights. Result is
/// normalized to sum to 1.
pub fn parse_weights(input: &str, count: usize) -> Result<Vec<f64>, ValidationError> {
    if count == 0 {
        return Err(ValidationError::InvalidWeights {
            reason: "no symbols loaded".to_string(),
        });
    }
    if input.trim().is_empty() {
        return Ok(vec![1.0 / count as f64; count]);
    }

    let weights = separator()
        .split(input.trim())
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.trim_end_matches('%')
                .parse::<f64>()
                .map_err(|_| ValidationError::InvalidWeights {
                    reason: format!("'{}' is not a number", t),
                })
        })
        .collect::<Result<Vec<f64>, _>>()?;

    if weights.len() != count {
        return Err(ValidationError::InvalidWeights {
            reason: format!("expected {} weights, got {}", count, weights.len()),
        });
    }
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(ValidationError::InvalidWeights {
            reason: "weights must be non-negative".to_string(),
        });
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(ValidationError::InvalidWeights {
            reason: "weights must not all be zero".to_string(),
        });
    }
    Ok(weights.into_iter().map(|w| w / total).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_commas_and_spaces() {
        let tokens = tokenize_symbols("aapl, googl , msft").unwrap();
        assert_eq!(tokens, vec!["AAPL", "GOOGL", "MSFT"]);
        assert_eq!(tokenize_symbols("tsla  nvda").unwrap(), vec!["TSLA", "NVDA"]);
    }

    #[test]
    fn empty_list_is_rejected() {
        assert_eq!(tokenize_symbols("  , ,").unwrap_err(), ValidationError::EmptySymbolList);
        assert_eq!(tokenize_symbols("").unwrap_err(), ValidationError::EmptySymbolList);
    }

    #[test]
    fn symbol_list_dedups_and_reports_malformed() {
        let parsed = parse_symbol_list("aapl AAPL 9bad msft").unwrap();
        assert_eq!(parsed.symbols.joined(","), "AAPL,MSFT");
        assert_eq!(parsed.rejected.len(), 1);
    }

    #[test]
    fn menu_choice_bounds() {
        assert_eq!(parse_menu_choice(" 0 ", 9).unwrap(), 0);
        assert!(parse_menu_choice("10", 9).is_err());
        assert!(parse_menu_choice("x", 9).is_err());
    }

    #[test]
    fn weights_normalize() {
        let weights = parse_weights("2, 1, 1", 3).unwrap();
        assert!((weights[0] - 0.5).abs() < 1e-12);
        assert_eq!(parse_weights("", 4).unwrap(), vec![0.25; 4]);
        assert!(parse_weights("1,2", 3).is_err());
        assert!(parse_weights("1,-1", 2).is_err());
        assert!(parse_weights("0,0", 2).is_err());
    }
}
