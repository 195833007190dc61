use crate::models::symbol::{Symbol, Venue};
use crate::util::round2;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 单只股票的一次行情快照
///
/// Only `symbol` is guaranteed. `price`, when present, is positive and the
/// change fields are derived from it and `previous_close`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub name: Option<String>,
    pub price: Option<f64>,
    pub previous_close: Option<f64>,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub volume: Option<i64>,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
    pub day_open: Option<f64>,
    pub market_cap: Option<f64>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub week52_high: Option<f64>,
    pub week52_low: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub venue: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

/// Column order shared by the tabular sinks.
pub const QUOTE_COLUMNS: &[&str] = &[
    "symbol",
    "name",
    "price",
    "previous_close",
    "change",
    "change_percent",
    "volume",
    "day_high",
    "day_low",
    "day_open",
    "market_cap",
    "sector",
    "industry",
    "week52_high",
    "week52_low",
    "pe_ratio",
    "venue",
    "fetched_at",
];

/// Fundamentals from the slower profile endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    pub name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap: Option<f64>,
    pub week52_high: Option<f64>,
    pub week52_low: Option<f64>,
    pub pe_ratio: Option<f64>,
}

impl Quote {
    /// Build a quote from a positive price.
    ///
    /// A missing or non-positive previous close falls back to the price
    /// itself, which yields a change of zero.
    pub fn priced(symbol: &Symbol, price: f64, previous_close: Option<f64>, fetched_at: DateTime<Utc>) -> Option<Quote> {
        if !price.is_finite() || price <= 0.0 {
            return None;
        }

        let previous_close = previous_close
            .filter(|p| p.is_finite() && *p > 0.0)
            .unwrap_or(price);
        let change = price - previous_close;
        let change_percent = if previous_close != 0.0 {
            change / previous_close * 100.0
        } else {
            0.0
        };

        Some(Quote {
            symbol: symbol.code().to_string(),
            name: None,
            price: Some(round2(price)),
            previous_close: Some(round2(previous_close)),
            change: Some(round2(change)),
            change_percent: Some(round2(change_percent)),
            volume: None,
            day_high: None,
            day_low: None,
            day_open: None,
            market_cap: None,
            sector: None,
            industry: None,
            week52_high: None,
            week52_low: None,
            pe_ratio: None,
            venue: None,
            fetched_at,
        })
    }

    pub fn with_venue(mut self, venue: Venue) -> Self {
        self.venue = Some(venue.code().to_string());
        self
    }

    pub fn with_volume(mut self, volume: Option<i64>) -> Self {
        self.volume = volume.filter(|v| *v >= 0);
        self
    }

    pub fn with_day_range(mut self, open: Option<f64>, high: Option<f64>, low: Option<f64>) -> Self {
        self.day_open = open.map(round2);
        self.day_high = high.map(round2);
        self.day_low = low.map(round2);
        self
    }

    /// Merge fundamentals; fields already set are kept.
    pub fn apply_profile(&mut self, profile: Profile) {
        if self.name.is_none() {
            self.name = profile.name;
        }
        self.sector = self.sector.take().or(profile.sector);
        self.industry = self.industry.take().or(profile.industry);
        self.market_cap = self.market_cap.or(profile.market_cap.map(round2));
        self.week52_high = self.week52_high.or(profile.week52_high.map(round2));
        self.week52_low = self.week52_low.or(profile.week52_low.map(round2));
        self.pe_ratio = self.pe_ratio.or(profile.pe_ratio.map(round2));
    }

    /// Price if it is usable (finite and positive).
    pub fn usable_price(&self) -> Option<f64> {
        self.price.filter(|p| p.is_finite() && *p > 0.0)
    }
}
