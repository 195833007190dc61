// 公开导出的模块，供外部使用
pub mod models;
pub mod data_provider;
pub mod errors;
pub mod config;
pub mod sources;
pub mod sinks;

// 抓取与调度的内部实现，主程序和集成测试也会用到
#[doc(hidden)]
pub mod scrapers;
#[doc(hidden)]
pub mod services;
#[doc(hidden)]
pub mod util;

// 重新导出常用类型，方便使用
pub use config::{ClientConfig, Config, DispatchConfig, RetryPolicy};
pub use data_provider::QuoteProvider;
pub use errors::{Result, ScraperError};
pub use models::quote::Quote;
pub use models::symbol::{Symbol, Venue};
pub use models::table::ResultTable;
pub use scrapers::base::QuoteFetcher;
pub use services::pipeline::{RunReport, RunStatus, ScrapeService};
pub use sources::SymbolSource;
