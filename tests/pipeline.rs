use async_trait::async_trait;
use chrono::Utc;
use india_quote_scraper::config::{Config, DispatchConfig};
use india_quote_scraper::models::quote::Quote;
use india_quote_scraper::models::symbol::Symbol;
use india_quote_scraper::scrapers::base::QuoteFetcher;
use india_quote_scraper::services::aggregator::finalize;
use india_quote_scraper::services::dispatcher::Dispatcher;
use india_quote_scraper::services::pipeline::{RunStatus, ScrapeService};
use india_quote_scraper::sources::static_list::StaticSource;
use india_quote_scraper::sources::{discover_all, SymbolSource};
use india_quote_scraper::QuoteProvider;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Fixed (price, previous close) per symbol; everything else has no data.
struct TableFetcher {
    prices: HashMap<&'static str, (f64, f64)>,
    calls: Mutex<Vec<String>>,
}

impl TableFetcher {
    fn new(prices: &[(&'static str, f64, f64)]) -> Self {
        Self {
            prices: prices.iter().map(|(s, p, c)| (*s, (*p, *c))).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuoteFetcher for TableFetcher {
    fn source_name(&self) -> &'static str {
        "table"
    }

    async fn fetch(&self, symbol: &Symbol) -> Option<Quote> {
        self.calls.lock().unwrap().push(symbol.code().to_string());
        let (price, prev) = self.prices.get(symbol.code())?;
        Quote::priced(symbol, *price, Some(*prev), Utc::now())
    }
}

struct SlowFetcher {
    started: AtomicUsize,
}

#[async_trait]
impl QuoteFetcher for SlowFetcher {
    fn source_name(&self) -> &'static str {
        "slow"
    }

    async fn fetch(&self, symbol: &Symbol) -> Option<Quote> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(60)).await;
        Quote::priced(symbol, 1.0, None, Utc::now())
    }
}

struct UnreachableSource;

#[async_trait]
impl SymbolSource for UnreachableSource {
    fn name(&self) -> &'static str {
        "unreachable"
    }

    async fn discover(&self) -> Vec<String> {
        Vec::new()
    }
}

fn source(codes: &[&str]) -> Arc<dyn SymbolSource + Send + Sync> {
    Arc::new(StaticSource::new(codes.iter().map(|c| c.to_string()).collect()))
}

fn config(dir: &Path) -> Config {
    Config::new()
        .with_output_dir(dir.to_str().unwrap())
        .with_dispatch(
            DispatchConfig::new()
                .with_worker_limit(4)
                .with_batch_size(2)
                .with_batch_pause(Duration::from_millis(5)),
        )
}

#[tokio::test]
async fn one_priced_symbol_out_of_two() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(TableFetcher::new(&[("AAA", 100.0, 90.0)]));
    let service = ScrapeService::new(config(dir.path()), vec![source(&["AAA", "BBB"])], fetcher.clone());

    let report = service.run().await.unwrap();
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.symbols_discovered, 2);
    assert_eq!(report.records_written, 1);

    let outputs = report.outputs.unwrap();
    let provider = QuoteProvider::load_from_file(&outputs.arrow).unwrap();
    let quote = provider.get_quote_by_symbol("AAA").unwrap();
    assert_eq!(quote.change, Some(10.0));
    assert_eq!(quote.change_percent, Some(11.11));
    assert!(provider.get_quote_by_symbol("BBB").is_none());

    let mut calls = fetcher.calls();
    calls.sort();
    assert_eq!(calls, vec!["AAA", "BBB"]);
}

#[tokio::test]
async fn duplicate_symbol_across_sources_is_fetched_once() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(TableFetcher::new(&[("AAA", 50.0, 50.0)]));
    let sources = vec![source(&["AAA"]), source(&["aaa", " AAA "])];
    let service = ScrapeService::new(config(dir.path()), sources, fetcher.clone());

    let report = service.run().await.unwrap();
    assert_eq!(report.records_written, 1);
    assert_eq!(fetcher.calls(), vec!["AAA"]);
}

#[tokio::test]
async fn failing_source_does_not_block_the_rest() {
    let sources: Vec<Arc<dyn SymbolSource + Send + Sync>> =
        vec![Arc::new(UnreachableSource), source(&["INFY", "TCS"]), Arc::new(UnreachableSource)];

    let symbols: Vec<String> = discover_all(&sources).await.iter().map(|s| s.code().to_string()).collect();
    assert_eq!(symbols, vec!["INFY", "TCS"]);
}

#[tokio::test]
async fn only_failing_sources_reports_no_symbols() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(TableFetcher::new(&[]));
    let service = ScrapeService::new(config(dir.path()), vec![Arc::new(UnreachableSource)], fetcher.clone());

    let report = service.run().await.unwrap();
    assert_eq!(report.status, RunStatus::NoSymbols);
    assert!(fetcher.calls().is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn timing_out_fetcher_yields_no_data_within_the_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(SlowFetcher { started: AtomicUsize::new(0) });
    let batch_timeout = Duration::from_millis(200);
    let dispatch = DispatchConfig::new()
        .with_worker_limit(8)
        .with_batch_size(0)
        .with_batch_timeout(batch_timeout);
    let service = ScrapeService::new(
        config(dir.path()).with_dispatch(dispatch),
        vec![source(&["AAA", "BBB", "CCC"])],
        fetcher.clone(),
    );

    let started = Instant::now();
    let report = service.run().await.unwrap();
    assert_eq!(report.status, RunStatus::NoData);
    assert_eq!(report.quotes_fetched, 0);
    assert_eq!(fetcher.started.load(Ordering::SeqCst), 3);
    let elapsed = started.elapsed();
    assert!(elapsed >= batch_timeout);
    assert!(elapsed < batch_timeout + Duration::from_millis(500), "took {:?}", elapsed);
}

#[tokio::test]
async fn dispatch_then_finalize_is_stable() {
    let fetcher = Arc::new(TableFetcher::new(&[("AAA", 10.0, 8.0), ("BBB", 20.0, 25.0), ("CCC", 5.0, 5.0)]));
    let symbols: Vec<Symbol> = ["AAA", "BBB", "CCC", "DDD", "AAA.NS"]
        .iter()
        .filter_map(|s| Symbol::parse(s))
        .collect();

    let dispatcher = Dispatcher::new(fetcher, DispatchConfig::new().with_worker_limit(1).with_batch_pause(Duration::ZERO));
    let table = dispatcher.run(symbols).await;
    assert_eq!(table.len(), 4);

    let (clean, summary) = finalize(&table);
    assert_eq!(clean.len(), 3);
    assert_eq!(summary.gainers, 1);
    assert_eq!(summary.losers, 1);

    let (again, again_summary) = finalize(&clean);
    assert_eq!(again, clean);
    assert_eq!(again_summary, summary);
}
