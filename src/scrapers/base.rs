use crate::models::quote::Quote;
use crate::models::symbol::Symbol;
use async_trait::async_trait;

/// Per-symbol quote source.
///
/// Implementations swallow every failure: a symbol either resolves to a
/// [`Quote`] or to `None` once all endpoints are exhausted.
#[async_trait]
pub trait QuoteFetcher {
    /// Name used in log lines
    fn source_name(&self) -> &'static str;

    /// Fetch one normalized quote
    async fn fetch(&self, symbol: &Symbol) -> Option<Quote>;
}
