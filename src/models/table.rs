use crate::models::quote::Quote;

/// Quotes collected during a run, in completion order.
///
/// May hold several quotes per symbol until
/// [`finalize`](crate::services::aggregator::finalize) dedups it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    quotes: Vec<Quote>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, quote: Quote) {
        self.quotes.push(quote);
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn into_quotes(self) -> Vec<Quote> {
        self.quotes
    }
}

impl FromIterator<Quote> for ResultTable {
    fn from_iter<I: IntoIterator<Item = Quote>>(iter: I) -> Self {
        Self { quotes: iter.into_iter().collect() }
    }
}
