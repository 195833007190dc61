use crate::config::DispatchConfig;
use crate::models::quote::Quote;
use crate::models::symbol::Symbol;
use crate::models::table::ResultTable;
use crate::scrapers::base::QuoteFetcher;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

/// Outcome counters for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub fetched: usize,
    pub absent: usize,
    pub failed: usize,
    pub timed_out: usize,
}

/// 批量并发抓取
///
/// Splits the symbol set into batches of `batch_size`. Inside a batch at
/// most `worker_limit` fetch tasks run at once; the rest wait for a free
/// slot. A batch ends when every task has reported or `batch_timeout`
/// expires, in which case the stragglers are aborted and dropped.
pub struct Dispatcher {
    fetcher: Arc<dyn QuoteFetcher + Send + Sync>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(fetcher: Arc<dyn QuoteFetcher + Send + Sync>, config: DispatchConfig) -> Self {
        Self { fetcher, config }
    }

    pub async fn run(&self, symbols: Vec<Symbol>) -> ResultTable {
        let mut table = ResultTable::new();
        if symbols.is_empty() {
            return table;
        }

        let batch_size = if self.config.batch_size == 0 { symbols.len() } else { self.config.batch_size };
        let batch_count = (symbols.len() + batch_size - 1) / batch_size;
        info!("Dispatching {} symbols in {} batches ({} workers, source {})",
              symbols.len(), batch_count, self.config.worker_limit.max(1), self.fetcher.source_name());

        for (index, batch) in symbols.chunks(batch_size).enumerate() {
            if index > 0 && !self.config.batch_pause.is_zero() {
                tokio::time::sleep(self.config.batch_pause).await;
            }

            let started = Instant::now();
            let stats = self.run_batch(batch, &mut table).await;
            info!("Batch {}/{}: {} quotes, {} absent, {} failed, {} timed out in {:?} (total {})",
                  index + 1, batch_count, stats.fetched, stats.absent, stats.failed,
                  stats.timed_out, started.elapsed(), table.len());
        }

        table
    }

    async fn run_batch(&self, batch: &[Symbol], table: &mut ResultTable) -> BatchStats {
        let deadline = tokio::time::Instant::now() + self.config.batch_timeout;
        let workers = self.config.worker_limit.max(1);
        let mut stats = BatchStats::default();
        let mut pending = batch.iter().cloned();
        let mut tasks: JoinSet<(Symbol, Option<Quote>)> = JoinSet::new();

        for symbol in pending.by_ref().take(workers) {
            self.spawn_fetch(&mut tasks, symbol);
        }

        loop {
            let joined = match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(joined)) => joined,
                Ok(None) => break,
                Err(_) => {
                    let unfinished = tasks.len() + pending.len();
                    warn!("Batch timed out after {:?}; dropping {} unfinished symbols",
                          self.config.batch_timeout, unfinished);
                    tasks.abort_all();
                    stats.timed_out = unfinished;
                    break;
                }
            };

            match joined {
                Ok((_, Some(quote))) => {
                    stats.fetched += 1;
                    table.push(quote);
                }
                Ok((symbol, None)) => {
                    debug!("No data for {}", symbol);
                    stats.absent += 1;
                }
                Err(e) => {
                    warn!("Fetch task failed: {}", e);
                    stats.failed += 1;
                }
            }

            if let Some(symbol) = pending.next() {
                self.spawn_fetch(&mut tasks, symbol);
            }
        }

        stats
    }

    fn spawn_fetch(&self, tasks: &mut JoinSet<(Symbol, Option<Quote>)>, symbol: Symbol) {
        let fetcher = Arc::clone(&self.fetcher);
        tasks.spawn(async move {
            let quote = fetcher.fetch(&symbol).await;
            (symbol, quote)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Returns fixed prices and tracks the peak number of concurrent calls.
    struct StubFetcher {
        prices: HashMap<String, f64>,
        delay: Duration,
        active: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn new(codes: &[&str], delay: Duration) -> Self {
            Self {
                prices: codes.iter().map(|c| (c.to_string(), 10.0)).collect(),
                delay,
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl QuoteFetcher for StubFetcher {
        fn source_name(&self) -> &'static str {
            "stub"
        }

        async fn fetch(&self, symbol: &Symbol) -> Option<Quote> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            if symbol.code() == "BOOM" {
                panic!("fetcher blew up");
            }
            let price = *self.prices.get(symbol.code())?;
            Quote::priced(symbol, price, None, Utc::now())
        }
    }

    fn symbols(n: usize) -> Vec<Symbol> {
        (0..n)
            .map(|i| {
                let code: String = format!("S{}", i)
                    .chars()
                    .map(|c| if c.is_ascii_digit() { (b'A' + c as u8 - b'0') as char } else { c })
                    .collect();
                Symbol::parse(&code).unwrap()
            })
            .collect()
    }

    fn config(workers: usize, batch: usize) -> DispatchConfig {
        DispatchConfig::new()
            .with_worker_limit(workers)
            .with_batch_size(batch)
            .with_batch_timeout(Duration::from_secs(10))
            .with_batch_pause(Duration::ZERO)
    }

    fn all_codes(list: &[Symbol]) -> Vec<String> {
        list.iter().map(|s| s.code().to_string()).collect()
    }

    #[tokio::test]
    async fn single_worker_completes_every_symbol() {
        let list = symbols(7);
        let codes = all_codes(&list);
        let refs: Vec<&str> = codes.iter().map(|s| s.as_str()).collect();
        let fetcher = Arc::new(StubFetcher::new(&refs, Duration::from_millis(1)));

        let table = Dispatcher::new(fetcher.clone(), config(1, 3)).run(list).await;
        assert_eq!(table.len(), 7);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 7);
        assert_eq!(fetcher.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn worker_limit_bounds_concurrency() {
        let list = symbols(12);
        let codes = all_codes(&list);
        let refs: Vec<&str> = codes.iter().map(|s| s.as_str()).collect();
        let fetcher = Arc::new(StubFetcher::new(&refs, Duration::from_millis(20)));

        let table = Dispatcher::new(fetcher.clone(), config(3, 100)).run(list).await;
        assert_eq!(table.len(), 12);
        assert!(fetcher.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn more_workers_than_symbols() {
        let list = symbols(4);
        let codes = all_codes(&list);
        let refs: Vec<&str> = codes.iter().map(|s| s.as_str()).collect();
        let fetcher = Arc::new(StubFetcher::new(&refs, Duration::from_millis(1)));

        let table = Dispatcher::new(fetcher.clone(), config(50, 0)).run(list).await;
        assert_eq!(table.len(), 4);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn absent_and_panicking_fetches_are_isolated() {
        let list = vec![
            Symbol::parse("AAA").unwrap(),
            Symbol::parse("BOOM").unwrap(),
            Symbol::parse("ZZZ").unwrap(),
        ];
        let fetcher = Arc::new(StubFetcher::new(&["AAA"], Duration::from_millis(1)));

        let table = Dispatcher::new(fetcher.clone(), config(2, 10)).run(list).await;
        assert_eq!(table.len(), 1);
        assert_eq!(table.quotes()[0].symbol, "AAA");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_input_returns_empty_table() {
        let fetcher = Arc::new(StubFetcher::new(&[], Duration::ZERO));
        let table = Dispatcher::new(fetcher.clone(), config(4, 10)).run(Vec::new()).await;
        assert!(table.is_empty());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn batch_timeout_drops_stragglers() {
        let list = symbols(5);
        let codes = all_codes(&list);
        let refs: Vec<&str> = codes.iter().map(|s| s.as_str()).collect();
        let fetcher = Arc::new(StubFetcher::new(&refs, Duration::from_secs(30)));
        let batch_timeout = Duration::from_millis(150);
        let config = config(2, 10).with_batch_timeout(batch_timeout);

        let started = Instant::now();
        let table = Dispatcher::new(fetcher, config).run(list).await;
        assert!(table.is_empty());
        let elapsed = started.elapsed();
        assert!(elapsed >= batch_timeout);
        assert!(elapsed < batch_timeout + Duration::from_millis(500), "took {:?}", elapsed);
    }
}
