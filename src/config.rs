use crate::models::symbol::Venue;
use std::path::PathBuf;
use std::time::Duration;

/// 浏览器风格的默认请求头
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const DEFAULT_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.9,*/*;q=0.8";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

pub const DEFAULT_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
pub const DEFAULT_PROFILE_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
pub const DEFAULT_INDEX_API_URL: &str = "https://www.nseindia.com/api/equity-stockIndices";
pub const DEFAULT_LISTING_URL: &str = "https://www.5paisa.com/stocks/all";

/// Retry behaviour for a single endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), base_delay }
    }

    /// Delay before the next attempt, doubling after every failure.
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        let exp = failed_attempts.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exp)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// HTTP 客户端配置，构造后只读，在所有并发抓取之间共享
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub venues: Vec<Venue>,
    pub chart_url: String,
    pub profile_url: String,
    pub enrich: bool,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            timeout: Duration::from_secs(15),
            retry: RetryPolicy::default(),
            venues: vec![Venue::Nse, Venue::Bse],
            chart_url: DEFAULT_CHART_URL.to_string(),
            profile_url: DEFAULT_PROFILE_URL.to_string(),
            enrich: true,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_venues(mut self, venues: Vec<Venue>) -> Self {
        self.venues = venues;
        self
    }

    pub fn with_enrich(mut self, enrich: bool) -> Self {
        self.enrich = enrich;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Worker pool sizing for the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchConfig {
    pub worker_limit: usize,
    pub batch_size: usize,
    pub batch_timeout: Duration,
    pub batch_pause: Duration,
}

impl DispatchConfig {
    pub fn new() -> Self {
        Self {
            worker_limit: 20,
            batch_size: 100,
            batch_timeout: Duration::from_secs(300),
            batch_pause: Duration::from_secs(2),
        }
    }

    pub fn with_worker_limit(mut self, workers: usize) -> Self {
        self.worker_limit = workers;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = timeout;
        self
    }

    pub fn with_batch_pause(mut self, pause: Duration) -> Self {
        self.batch_pause = pause;
        self
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub debug_mode: bool,
    pub debug_symbol_limit: usize,
    pub output_dir: PathBuf,
    pub write_xlsx: bool,
    pub dispatch: DispatchConfig,
}

impl Config {
    pub fn new() -> Self {
        Self {
            debug_mode: false,
            debug_symbol_limit: 10,
            output_dir: PathBuf::from("data"),
            write_xlsx: true,
            dispatch: DispatchConfig::new(),
        }
    }

    pub fn with_debug_mode(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    pub fn with_debug_symbol_limit(mut self, limit: usize) -> Self {
        self.debug_symbol_limit = limit;
        self
    }

    pub fn with_output_dir(mut self, dir: &str) -> Self {
        self.output_dir = PathBuf::from(dir);
        self
    }

    pub fn with_write_xlsx(mut self, write_xlsx: bool) -> Self {
        self.write_xlsx = write_xlsx;
        self
    }

    pub fn with_dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = dispatch;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
