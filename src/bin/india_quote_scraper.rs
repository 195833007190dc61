use india_quote_scraper::config::{ClientConfig, Config, DispatchConfig};
use india_quote_scraper::data_provider::QuoteProvider;
use india_quote_scraper::scrapers::http::HttpClient;
use india_quote_scraper::scrapers::yahoo::ChartScraper;
use india_quote_scraper::services::pipeline::{RunStatus, ScrapeService};
use india_quote_scraper::sources::index_api::IndexApiSource;
use india_quote_scraper::sources::listing_page::ListingPageSource;
use india_quote_scraper::sources::pattern::PatternSource;
use india_quote_scraper::sources::settlement::SettlementFileSource;
use india_quote_scraper::sources::static_list::{StaticSource, SymbolDataset};
use india_quote_scraper::sources::SymbolSource;

use clap::{App, Arg, ArgMatches, SubCommand};
use log::{error, info};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_SOURCES: &str = "static,index,listing";

fn parse_or<T: std::str::FromStr>(matches: &ArgMatches, name: &str, default: T) -> T {
    matches.value_of(name).and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// 根据 --sources 构建代码来源
fn build_sources(
    matches: &ArgMatches,
    http: &HttpClient,
) -> Result<Vec<Arc<dyn SymbolSource + Send + Sync>>, Box<dyn Error>> {
    let names = matches.value_of("sources").unwrap_or(DEFAULT_SOURCES);
    let mut sources: Vec<Arc<dyn SymbolSource + Send + Sync>> = Vec::new();

    for name in names.split(',').map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty()) {
        match name.as_str() {
            "static" => {
                let dataset = match matches.value_of("symbols-file") {
                    Some(path) => SymbolDataset::load(Path::new(path))?,
                    None => SymbolDataset::embedded(),
                };
                info!("Using symbol dataset version {}", dataset.version);
                sources.push(Arc::new(StaticSource::from_dataset(dataset)));
            }
            "index" => sources.push(Arc::new(IndexApiSource::new(http.clone()))),
            "listing" => sources.push(Arc::new(ListingPageSource::new(http.clone()))),
            "pattern" => {
                let max = parse_or(matches, "pattern-max", 500usize);
                sources.push(Arc::new(PatternSource::with_defaults(max)));
            }
            "settlement" => match matches.value_of("settlement-file") {
                Some(path) => sources.push(Arc::new(SettlementFileSource::new(path))),
                None => return Err("--sources settlement requires --settlement-file".into()),
            },
            other => {
                error!("Unknown symbol source: {}", other);
                return Err(format!("Unknown symbol source: {}", other).into());
            }
        }
    }

    Ok(sources)
}

async fn scrape(matches: &ArgMatches, debug_mode: bool, debug_symbol_limit: usize) -> Result<RunStatus, Box<dyn Error>> {
    let client_config = ClientConfig::new()
        .with_timeout(Duration::from_secs(parse_or(matches, "timeout", 15u64)))
        .with_enrich(!matches.is_present("no-enrich"));
    let http = HttpClient::new(&client_config)?;

    let dispatch = DispatchConfig::new()
        .with_worker_limit(parse_or(matches, "workers", 20usize))
        .with_batch_size(parse_or(matches, "batch-size", 100usize))
        .with_batch_timeout(Duration::from_secs(parse_or(matches, "batch-timeout", 300u64)));

    let config = Config::new()
        .with_debug_mode(debug_mode)
        .with_debug_symbol_limit(debug_symbol_limit)
        .with_output_dir(matches.value_of("output-dir").unwrap_or("data"))
        .with_write_xlsx(!matches.is_present("no-xlsx"))
        .with_dispatch(dispatch);

    info!("Workers: {}, batch size: {}, batch timeout: {:?}",
          dispatch.worker_limit, dispatch.batch_size, dispatch.batch_timeout);

    let sources = build_sources(matches, &http)?;
    let fetcher = Arc::new(ChartScraper::with_client(http, client_config));

    let report = ScrapeService::new(config, sources, fetcher).run().await?;
    if let Some(outputs) = &report.outputs {
        info!("CSV: {}", outputs.csv.display());
        info!("JSON: {}", outputs.json.display());
        if let Some(xlsx) = &outputs.xlsx {
            info!("XLSX: {}", xlsx.display());
        }
        info!("Arrow: {}", outputs.arrow.display());
        info!("Summary: {}", outputs.summary.display());
    }
    info!("{}", serde_json::to_string_pretty(&report.summary)?);

    Ok(report.status)
}

fn explore(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let path = match matches.value_of("file") {
        Some(file) => PathBuf::from(file),
        None => {
            let dir = matches.value_of("output-dir").unwrap_or("data");
            QuoteProvider::latest_snapshot(Path::new(dir))?
                .ok_or_else(|| format!("No snapshot found in {}", dir))?
        }
    };
    let limit = parse_or(matches, "limit", 10usize);

    let provider = QuoteProvider::load_from_file(&path)?;
    info!("Found {} quotes in {}", provider.get_all_quotes().len(), path.display());

    let filtered = provider.search(matches.value_of("symbol"), matches.value_of("sector"));
    info!("Filtered to {} quotes", filtered.len());

    info!("{:-<96}", "");
    info!("{:<14} {:>10} {:>10} {:>9} {:>14}  {:<24} {}",
          "Symbol", "Price", "Change", "Change%", "Volume", "Sector", "Name");
    info!("{:-<96}", "");

    let cell = |v: Option<f64>| v.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string());
    for quote in filtered.iter().take(limit) {
        info!("{:<14} {:>10} {:>10} {:>9} {:>14}  {:<24} {}",
              quote.symbol,
              cell(quote.price),
              cell(quote.change),
              cell(quote.change_percent),
              quote.volume.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
              quote.sector.as_deref().unwrap_or("-"),
              quote.name.as_deref().unwrap_or(""));
    }

    if filtered.len() > limit {
        info!("... and {} more quotes", filtered.len() - limit);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // RUST_LOG 未设置时默认 info
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 创建基本的命令行应用
    let app = App::new("india-quote-scraper")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Scrape Indian equity quotes into CSV, JSON, XLSX and Arrow files");

    // 在开发模式下添加调试参数
    #[cfg(debug_assertions)]
    let app = app.arg(
        Arg::with_name("debug")
            .long("debug")
            .help("Enable debug mode")
            .takes_value(false),
    )
    .arg(
        Arg::with_name("debug-limit")
            .long("debug-limit")
            .help("Limit the number of symbols to fetch in debug mode")
            .takes_value(true)
            .default_value("10"),
    );

    let app = app.subcommand(
        SubCommand::with_name("scrape")
            .about("Discover symbols, fetch quotes and write output files")
            .arg(
                Arg::with_name("sources")
                    .short('s')
                    .long("sources")
                    .value_name("SOURCES")
                    .help("Comma separated symbol sources (static, index, listing, pattern, settlement)")
                    .takes_value(true)
                    .default_value(DEFAULT_SOURCES),
            )
            .arg(
                Arg::with_name("symbols-file")
                    .long("symbols-file")
                    .value_name("FILE")
                    .help("Symbol dataset JSON replacing the built-in list")
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("settlement-file")
                    .long("settlement-file")
                    .value_name("FILE")
                    .help("Bhavcopy CSV or XLSX for the settlement source")
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("pattern-max")
                    .long("pattern-max")
                    .value_name("COUNT")
                    .help("Maximum number of generated candidates for the pattern source")
                    .takes_value(true)
                    .default_value("500"),
            )
            .arg(
                Arg::with_name("workers")
                    .short('w')
                    .long("workers")
                    .value_name("WORKERS")
                    .help("Concurrent fetches per batch")
                    .takes_value(true)
                    .default_value("20"),
            )
            .arg(
                Arg::with_name("batch-size")
                    .short('b')
                    .long("batch-size")
                    .value_name("SIZE")
                    .help("Symbols per batch (0 for a single batch)")
                    .takes_value(true)
                    .default_value("100"),
            )
            .arg(
                Arg::with_name("batch-timeout")
                    .long("batch-timeout")
                    .value_name("SECONDS")
                    .help("Seconds before an unfinished batch is abandoned")
                    .takes_value(true)
                    .default_value("300"),
            )
            .arg(
                Arg::with_name("timeout")
                    .long("timeout")
                    .value_name("SECONDS")
                    .help("Per-request HTTP timeout")
                    .takes_value(true)
                    .default_value("15"),
            )
            .arg(
                Arg::with_name("output-dir")
                    .short('o')
                    .long("output-dir")
                    .value_name("DIR")
                    .help("Directory for output files")
                    .takes_value(true)
                    .default_value("data"),
            )
            .arg(
                Arg::with_name("no-enrich")
                    .long("no-enrich")
                    .help("Skip the profile lookup (name, sector, market cap)")
                    .takes_value(false),
            )
            .arg(
                Arg::with_name("no-xlsx")
                    .long("no-xlsx")
                    .help("Do not write the spreadsheet")
                    .takes_value(false),
            ),
    ).subcommand(
        SubCommand::with_name("explore")
            .about("Explore a saved Arrow snapshot")
            .arg(
                Arg::with_name("file")
                    .short('f')
                    .long("file")
                    .value_name("FILE")
                    .help("Snapshot to read (defaults to the newest in the output directory)")
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("output-dir")
                    .short('o')
                    .long("output-dir")
                    .value_name("DIR")
                    .takes_value(true)
                    .default_value("data"),
            )
            .arg(
                Arg::with_name("symbol")
                    .short('s')
                    .long("symbol")
                    .value_name("SYMBOL")
                    .help("Symbol substring to match")
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("sector")
                    .long("sector")
                    .value_name("SECTOR")
                    .help("Sector to filter by")
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("limit")
                    .short('l')
                    .long("limit")
                    .value_name("LIMIT")
                    .help("Limit the number of rows to display")
                    .takes_value(true)
                    .default_value("10"),
            )
    );

    let matches = app.get_matches();

    // 获取调试模式设置
    #[cfg(debug_assertions)]
    let debug_mode = matches.is_present("debug");
    #[cfg(not(debug_assertions))]
    let debug_mode = false;

    #[cfg(debug_assertions)]
    let debug_symbol_limit = parse_or(&matches, "debug-limit", 10usize);
    #[cfg(not(debug_assertions))]
    let debug_symbol_limit = usize::MAX;

    if let Some(matches) = matches.subcommand_matches("scrape") {
        match scrape(matches, debug_mode, debug_symbol_limit).await? {
            RunStatus::Completed => {}
            RunStatus::NoSymbols => {
                error!("No symbols discovered from any source");
                std::process::exit(1);
            }
            RunStatus::NoData => {
                error!("No quotes could be fetched");
                std::process::exit(1);
            }
        }
    } else if let Some(matches) = matches.subcommand_matches("explore") {
        explore(matches)?;
    } else {
        info!("No command specified. Use --help for usage information.");
    }

    Ok(())
}
