use crate::config::ClientConfig;
use crate::errors::{Result, ScraperError};
use crate::models::quote::{Profile, Quote};
use crate::models::symbol::{Symbol, Venue};
use crate::scrapers::base::QuoteFetcher;
use crate::scrapers::fields::{lookup_f64, lookup_str, value_as_f64, Field};
use crate::scrapers::http::HttpClient;
use crate::util::first_success;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use serde_json::{Map, Value};

const CHART_QUERY: &[(&str, &str)] = &[("interval", "1d"), ("range", "1d")];
const PROFILE_QUERY: &[(&str, &str)] = &[("modules", "price,summaryProfile,summaryDetail")];

/// 行情抓取器：chart 接口取价格，quoteSummary 接口补充基本面
pub struct ChartScraper {
    http: HttpClient,
    config: ClientConfig,
}

/// Price fields read from one chart response.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSnapshot {
    pub price: f64,
    pub previous_close: Option<f64>,
    pub volume: Option<i64>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub name: Option<String>,
}

impl ChartSnapshot {
    pub fn into_quote(self, symbol: &Symbol, venue: Venue, fetched_at: DateTime<Utc>) -> Option<Quote> {
        let mut quote = Quote::priced(symbol, self.price, self.previous_close, fetched_at)?
            .with_venue(venue)
            .with_volume(self.volume)
            .with_day_range(self.open, self.high, self.low);
        quote.name = self.name;
        Some(quote)
    }
}

impl ChartScraper {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = HttpClient::new(&config)?;
        Ok(Self::with_client(http, config))
    }

    pub fn with_client(http: HttpClient, config: ClientConfig) -> Self {
        Self { http, config }
    }

    async fn fetch_from_venue(&self, symbol: &Symbol, venue: Venue) -> Option<(Venue, ChartSnapshot)> {
        let ticker = symbol.ticker(venue);
        let url = format!("{}/{}", self.config.chart_url.trim_end_matches('/'), ticker);

        let payload = match self.http.get_json(&url, CHART_QUERY).await {
            Ok(payload) => payload,
            Err(e) => {
                debug!("{}: chart request failed: {}", ticker, e);
                return None;
            }
        };

        match parse_chart(&payload) {
            Ok(snapshot) => Some((venue, snapshot)),
            Err(e) => {
                debug!("{}: unusable chart payload: {}", ticker, e);
                None
            }
        }
    }

    async fn fetch_profile(&self, ticker: &str) -> Option<Profile> {
        let url = format!("{}/{}", self.config.profile_url.trim_end_matches('/'), ticker);
        match self.http.get_json(&url, PROFILE_QUERY).await {
            Ok(payload) => parse_profile(&payload),
            Err(e) => {
                debug!("{}: profile enrichment skipped: {}", ticker, e);
                None
            }
        }
    }
}

#[async_trait]
impl QuoteFetcher for ChartScraper {
    fn source_name(&self) -> &'static str {
        "yahoo-chart"
    }

    async fn fetch(&self, symbol: &Symbol) -> Option<Quote> {
        let venues = symbol.venue_order(&self.config.venues);
        let hit = first_success(venues, move |venue| self.fetch_from_venue(symbol, venue)).await;

        let (venue, snapshot) = match hit {
            Some(hit) => hit,
            None => {
                debug!("{}: no data on any venue", symbol);
                return None;
            }
        };

        let mut quote = snapshot.into_quote(symbol, venue, Utc::now())?;
        if self.config.enrich {
            if let Some(profile) = self.fetch_profile(&symbol.ticker(venue)).await {
                quote.apply_profile(profile);
            }
        }
        Some(quote)
    }
}

/// Extract price fields from a chart payload (`chart.result[0].meta`).
///
/// Missing structure is a payload error; a missing or non-positive price
/// rejects the whole attempt.
pub fn parse_chart(payload: &Value) -> Result<ChartSnapshot> {
    let chart = payload
        .get("chart")
        .ok_or_else(|| ScraperError::PayloadError("missing chart".to_string()))?;

    if let Some(err) = chart.get("error").filter(|e| !e.is_null()) {
        return Err(ScraperError::PayloadError(format!("chart error: {}", err)));
    }

    let result = chart
        .get("result")
        .and_then(Value::as_array)
        .and_then(|r| r.first())
        .ok_or_else(|| ScraperError::PayloadError("empty chart result".to_string()))?;

    let meta = result
        .get("meta")
        .and_then(Value::as_object)
        .ok_or_else(|| ScraperError::PayloadError("missing meta".to_string()))?;

    let price = lookup_f64(meta, Field::Price)
        .ok_or_else(|| ScraperError::PayloadError("missing price".to_string()))?;
    if price <= 0.0 {
        return Err(ScraperError::DataError(format!("non-positive price {}", price)));
    }

    let last_bar = |key: &str| {
        result
            .pointer(&format!("/indicators/quote/0/{}", key))
            .and_then(Value::as_array)
            .and_then(|values| values.iter().rev().find_map(value_as_f64))
    };

    Ok(ChartSnapshot {
        price,
        previous_close: lookup_f64(meta, Field::PreviousClose),
        volume: lookup_f64(meta, Field::Volume)
            .or_else(|| last_bar("volume"))
            .map(|v| v.round() as i64),
        open: lookup_f64(meta, Field::Open).or_else(|| last_bar("open")),
        high: lookup_f64(meta, Field::High).or_else(|| last_bar("high")),
        low: lookup_f64(meta, Field::Low).or_else(|| last_bar("low")),
        name: lookup_str(meta, Field::Name),
    })
}

/// Fundamentals from a `quoteSummary` payload; `None` when nothing useful.
pub fn parse_profile(payload: &Value) -> Option<Profile> {
    let result = payload.pointer("/quoteSummary/result/0")?.as_object()?;
    let modules: Vec<&Map<String, Value>> = result.values().filter_map(Value::as_object).collect();

    let find_f64 = |field| modules.iter().find_map(|m| lookup_f64(m, field));
    let find_str = |field| modules.iter().find_map(|m| lookup_str(m, field));

    let profile = Profile {
        name: find_str(Field::Name),
        sector: find_str(Field::Sector),
        industry: find_str(Field::Industry),
        market_cap: find_f64(Field::MarketCap),
        week52_high: find_f64(Field::Week52High),
        week52_low: find_f64(Field::Week52Low),
        pe_ratio: find_f64(Field::PeRatio),
    };

    if profile == Profile::default() {
        None
    } else {
        Some(profile)
    }
}
