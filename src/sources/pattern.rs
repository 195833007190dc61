use crate::sources::SymbolSource;
use async_trait::async_trait;
use std::collections::BTreeSet;

const DEFAULT_PREFIXES: &[&str] = &[
    "ADANI", "TATA", "BAJAJ", "HDFC", "ICICI", "JSW", "GODREJ", "MAHINDRA", "BIRLA", "JINDAL", "ESCORTS", "KIRLOSKAR",
];

const DEFAULT_DOMAINS: &[&str] = &[
    "", "POWER", "STEEL", "MOTORS", "BANK", "FIN", "PORTS", "CHEM", "PHARMA", "INFRA", "ENT", "GREEN", "CONSUM",
    "LIFE", "ENERGY", "CEMENT",
];

const DEFAULT_SUFFIXES: &[&str] = &["", "LTD", "IND"];

/// 通过前缀、行业词、后缀组合生成候选代码
///
/// Most generated candidates do not exist; the fetcher's "no data" outcome
/// filters them out. Output is deterministic for fixed vocabularies and is
/// capped at `max_candidates`.
pub struct PatternSource {
    prefixes: Vec<String>,
    domains: Vec<String>,
    suffixes: Vec<String>,
    max_candidates: usize,
}

impl PatternSource {
    pub fn new(prefixes: Vec<String>, domains: Vec<String>, suffixes: Vec<String>, max_candidates: usize) -> Self {
        Self { prefixes, domains, suffixes, max_candidates }
    }

    pub fn with_defaults(max_candidates: usize) -> Self {
        Self::new(owned(DEFAULT_PREFIXES), owned(DEFAULT_DOMAINS), owned(DEFAULT_SUFFIXES), max_candidates)
    }

    /// Generate candidates in prefix → domain → suffix order.
    pub fn generate(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut candidates = Vec::new();

        'outer: for prefix in &self.prefixes {
            for domain in &self.domains {
                for suffix in &self.suffixes {
                    if candidates.len() >= self.max_candidates {
                        break 'outer;
                    }
                    let candidate = format!("{}{}{}", prefix, domain, suffix).to_uppercase();
                    if seen.insert(candidate.clone()) {
                        candidates.push(candidate);
                    }
                }
            }
        }

        candidates
    }
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

#[async_trait]
impl SymbolSource for PatternSource {
    fn name(&self) -> &'static str {
        "pattern"
    }

    async fn discover(&self) -> Vec<String> {
        self.generate()
    }
}
