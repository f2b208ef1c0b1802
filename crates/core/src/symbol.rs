//! Coin ticker symbols.

use crate::CoreError;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum length of a user-entered ticker.
pub const MIN_SYMBOL_LEN: usize = 2;

/// Upper-cased coin ticker (e.g., "BTC", "DOGE").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(CompactString);

impl Symbol {
    /// Normalize a ticker without validating it.
    /// Used for values that were already validated before being stored.
    pub fn new(raw: &str) -> Self {
        Self(CompactString::new(raw.trim().to_uppercase()))
    }

    /// Parse a ticker typed by a user.
    ///
    /// Accepts ASCII letters only, at least two of them, surrounding
    /// whitespace and case ignored.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let symbol = Self::new(raw);
        let valid = symbol.0.len() >= MIN_SYMBOL_LEN
            && symbol.0.chars().all(|c| c.is_ascii_alphabetic());
        if valid {
            Ok(symbol)
        } else {
            Err(CoreError::InvalidSymbol(raw.to_string()))
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_normalizes_case_and_whitespace() {
        assert_eq!(Symbol::new("  btc ").as_str(), "BTC");
        assert_eq!(Symbol::new("Doge"), Symbol::new("DOGE"));
    }

    #[test]
    fn test_parse_accepts_letters() {
        assert_eq!(Symbol::parse("eth").unwrap().as_str(), "ETH");
        assert_eq!(Symbol::parse(" sol\n").unwrap().as_str(), "SOL");
    }

    #[test]
    fn test_parse_rejects_short_or_non_alpha() {
        assert!(Symbol::parse("b").is_err());
        assert!(Symbol::parse("").is_err());
        assert!(Symbol::parse("BTC1").is_err());
        assert!(Symbol::parse("BTC-USD").is_err());
        assert_eq!(
            Symbol::parse("x"),
            Err(CoreError::InvalidSymbol("x".to_string()))
        );
    }

    #[test]
    fn test_serde_is_transparent() {
        let json = serde_json::to_string(&Symbol::new("btc")).unwrap();
        assert_eq!(json, "\"BTC\"");
    }
}
