use serde::{Deserialize, Serialize};
use std::fmt;

/// 最短/最长代码长度
pub const MIN_SYMBOL_LEN: usize = 2;
pub const MAX_SYMBOL_LEN: usize = 20;

/// NSE 指数名以 NIFTY 开头或结尾（NIFTY PHARMA, BANKNIFTY）
const INDEX_FAMILY: &str = "NIFTY";

/// Benchmark and index labels outside the NIFTY family.
const INDEX_LABELS: &[&str] = &[
    "SENSEX",
    "BANKEX",
    "INDIAVIX",
    "INDEX",
];

/// Exchange a quote is requested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Venue {
    Nse,
    Bse,
}

impl Venue {
    /// Suffix appended to the ticker for the quote API.
    pub fn suffix(&self) -> &'static str {
        match self {
            Venue::Nse => ".NS",
            Venue::Bse => ".BO",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Venue::Nse => "NSE",
            Venue::Bse => "BSE",
        }
    }

    pub fn from_code(code: &str) -> Option<Venue> {
        match code.trim().to_ascii_uppercase().as_str() {
            "NSE" | "NS" => Some(Venue::Nse),
            "BSE" | "BO" => Some(Venue::Bse),
            _ => None,
        }
    }

    fn strip_suffix(raw: &str) -> (&str, Option<Venue>) {
        for venue in [Venue::Nse, Venue::Bse] {
            if let Some(core) = raw.strip_suffix(venue.suffix()) {
                return (core, Some(venue));
            }
        }
        (raw, None)
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A validated ticker-style identifier.
///
/// Only [`Symbol::parse`] creates symbols, so every value carries the
/// invariant: uppercase, `[A-Z_-]` only, starts with a letter, 2 to 20 chars,
/// and not an index label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol {
    code: String,
    venue: Option<Venue>,
}

impl Symbol {
    /// Normalize and validate a raw candidate.
    pub fn parse(raw: &str) -> Option<Symbol> {
        let upper = raw.trim().to_uppercase();
        let (core, venue) = Venue::strip_suffix(&upper);

        let code: String = core
            .chars()
            .filter(|c| c.is_ascii_alphabetic() || *c == '-' || *c == '_')
            .collect();

        if code.len() < MIN_SYMBOL_LEN || code.len() > MAX_SYMBOL_LEN {
            return None;
        }
        if !code.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return None;
        }
        if is_index_label(&code) {
            return None;
        }

        Some(Symbol { code, venue })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn venue(&self) -> Option<Venue> {
        self.venue
    }

    /// Ticker as the quote API expects it, e.g. `RELIANCE.NS`.
    pub fn ticker(&self, venue: Venue) -> String {
        format!("{}{}", self.code, venue.suffix())
    }

    /// Venues to try, the symbol's own venue first.
    pub fn venue_order(&self, configured: &[Venue]) -> Vec<Venue> {
        let mut order = Vec::with_capacity(configured.len() + 1);
        if let Some(own) = self.venue {
            order.push(own);
        }
        for venue in configured {
            if !order.contains(venue) {
                order.push(*venue);
            }
        }
        order
    }
}

fn is_index_label(code: &str) -> bool {
    code.starts_with(INDEX_FAMILY) || code.ends_with(INDEX_FAMILY) || INDEX_LABELS.contains(&code)
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.venue {
            Some(venue) => write!(f, "{}{}", self.code, venue.suffix()),
            None => f.write_str(&self.code),
        }
    }
}
