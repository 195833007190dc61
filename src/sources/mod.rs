//! Symbol discovery.
//!
//! Every source yields raw candidate strings. [`discover_all`] runs the
//! sources concurrently, validates each candidate through [`Symbol::parse`]
//! and returns the union. A source that fails simply contributes nothing.

pub mod index_api;
pub mod listing_page;
pub mod pattern;
pub mod settlement;
pub mod static_list;

use crate::models::symbol::Symbol;
use async_trait::async_trait;
use futures::future::join_all;
use log::{info, warn};
use std::collections::BTreeSet;
use std::sync::Arc;

#[async_trait]
pub trait SymbolSource {
    /// Name used in log lines
    fn name(&self) -> &'static str;

    /// Raw candidates. Never fails; an unreachable source returns nothing.
    async fn discover(&self) -> Vec<String>;
}

/// Validated union of all sources.
pub async fn discover_all(sources: &[Arc<dyn SymbolSource + Send + Sync>]) -> BTreeSet<Symbol> {
    let results = join_all(sources.iter().map(|source| source.discover())).await;

    let mut symbols = BTreeSet::new();
    for (source, candidates) in sources.iter().zip(results) {
        if candidates.is_empty() {
            warn!("Symbol source {} returned nothing", source.name());
            continue;
        }

        let before = symbols.len();
        let mut rejected = 0;
        for raw in &candidates {
            match Symbol::parse(raw) {
                Some(symbol) => {
                    symbols.insert(symbol);
                }
                None => rejected += 1,
            }
        }
        info!("Source {}: {} candidates, {} new symbols, {} rejected",
              source.name(), candidates.len(), symbols.len() - before, rejected);
    }

    info!("Discovered {} unique symbols from {} sources", symbols.len(), sources.len());
    symbols
}
