use crate::config::Config;
use crate::errors::Result;
use crate::models::symbol::Symbol;
use crate::scrapers::base::QuoteFetcher;
use crate::services::aggregator::{finalize, Summary};
use crate::services::dispatcher::Dispatcher;
use crate::sinks::{OutputFiles, OutputWriter};
use crate::sources::{discover_all, SymbolSource};
use chrono::Utc;
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    Completed,
    /// Every source came back empty.
    NoSymbols,
    /// Symbols were found but no quote survived finalization.
    NoData,
}

/// 一次运行的结果
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub symbols_discovered: usize,
    pub quotes_fetched: usize,
    pub records_written: usize,
    pub summary: Summary,
    pub outputs: Option<OutputFiles>,
}

impl RunReport {
    fn empty(status: RunStatus, symbols_discovered: usize, quotes_fetched: usize) -> Self {
        Self {
            status,
            symbols_discovered,
            quotes_fetched,
            records_written: 0,
            summary: Summary::default(),
            outputs: None,
        }
    }
}

/// 抓取服务，串联代码发现、并发抓取、汇总与输出
pub struct ScrapeService {
    config: Config,
    sources: Vec<Arc<dyn SymbolSource + Send + Sync>>,
    fetcher: Arc<dyn QuoteFetcher + Send + Sync>,
}

impl ScrapeService {
    pub fn new(
        config: Config,
        sources: Vec<Arc<dyn SymbolSource + Send + Sync>>,
        fetcher: Arc<dyn QuoteFetcher + Send + Sync>,
    ) -> Self {
        Self { config, sources, fetcher }
    }

    /// Union of all sources in sorted order, truncated in debug mode.
    pub async fn discover(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = discover_all(&self.sources).await.into_iter().collect();

        // 调试模式：只处理前N个代码
        if self.config.debug_mode {
            let original_count = symbols.len();
            symbols.truncate(self.config.debug_symbol_limit);
            info!("DEBUG MODE: Processing only {} out of {} symbols", symbols.len(), original_count);
        }

        symbols
    }

    pub async fn run(&self) -> Result<RunReport> {
        let started = Utc::now();
        let symbols = self.discover().await;
        if symbols.is_empty() {
            warn!("No symbols discovered; nothing to fetch");
            return Ok(RunReport::empty(RunStatus::NoSymbols, 0, 0));
        }
        let discovered = symbols.len();

        let dispatcher = Dispatcher::new(Arc::clone(&self.fetcher), self.config.dispatch);
        let table = dispatcher.run(symbols).await;
        let fetched = table.len();

        let (clean, summary) = finalize(&table);
        if clean.is_empty() {
            warn!("No quotes fetched for {} symbols", discovered);
            return Ok(RunReport::empty(RunStatus::NoData, discovered, fetched));
        }

        let writer = OutputWriter::new(self.config.output_dir.clone(), self.config.write_xlsx);
        let outputs = writer.write_all(&clean, &summary, started)?;

        info!("Run complete: {} symbols, {} quotes, {} records in {}s",
              discovered, fetched, clean.len(), (Utc::now() - started).num_seconds());

        Ok(RunReport {
            status: RunStatus::Completed,
            symbols_discovered: discovered,
            quotes_fetched: fetched,
            records_written: clean.len(),
            summary,
            outputs: Some(outputs),
        })
    }
}
