// src/checks/mod.rs

mod tax;

pub use tax::{TaxIdMatcher, find_unusual_tax_rates};

use serde::Serialize;

/// Shown instead of an empty tax-ID list. Never a match itself.
pub const TAX_ID_NOT_FOUND: &str = "No valid GSTIN found or possibly fake format.";

/// Percentage tokens that are not on the valid-rate allow-list, in text
/// order with duplicates kept. Empty means "all rates valid", which also
/// covers "no rates at all".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaxFinding {
    pub unusual_rates: Vec<String>,
}

impl TaxFinding {
    pub fn is_clean(&self) -> bool {
        self.unusual_rates.is_empty()
    }
}

/// Substrings shaped like a tax identifier, in text order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaxIdFinding {
    matches: Vec<String>,
}

impl TaxIdFinding {
    pub fn new(matches: Vec<String>) -> Self {
        Self { matches }
    }

    /// Real matches only; empty when nothing matched.
    pub fn matches(&self) -> &[String] {
        &self.matches
    }

    /// What to display: the matches, or the single not-found sentinel.
    pub fn lines(&self) -> Vec<&str> {
        if self.matches.is_empty() {
            vec![TAX_ID_NOT_FOUND]
        } else {
            self.matches.iter().map(String::as_str).collect()
        }
    }
}
