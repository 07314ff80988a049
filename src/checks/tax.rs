// src/checks/tax.rs

use super::{TaxFinding, TaxIdFinding};
use crate::config::ConfigError;
use regex::Regex;
use std::sync::LazyLock;

// 1-2 digits then '%', starting on a word boundary. The trailing side is
// checked by hand: '%' is not a word character, so `\b` cannot express it.
static RATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{1,2}%").expect("rate pattern is valid"));

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Every whole percentage token in `text` that is not in `valid_rates`.
pub fn find_unusual_tax_rates(text: &str, valid_rates: &[String]) -> TaxFinding {
    let unusual_rates = RATE_RE
        .find_iter(text)
        .filter(|m| !text[m.end()..].chars().next().is_some_and(is_word_char))
        .map(|m| m.as_str())
        .filter(|rate| !valid_rates.iter().any(|v| v == rate))
        .map(str::to_string)
        .collect();

    TaxFinding { unusual_rates }
}

/// Compiled tax-identifier pattern. Shape only, no checksum.
#[derive(Debug, Clone)]
pub struct TaxIdMatcher {
    re: Regex,
}

impl TaxIdMatcher {
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let re = Regex::new(pattern).map_err(|e| ConfigError::TaxIdPattern(e.to_string()))?;
        Ok(Self { re })
    }

    pub fn find(&self, text: &str) -> TaxIdFinding {
        TaxIdFinding::new(
            self.re
                .find_iter(text)
                .map(|m| m.as_str().to_string())
                .collect(),
        )
    }
}
