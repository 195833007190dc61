//! Declarative field aliasing.
//!
//! Listing pages, index APIs, settlement files and the quote API all spell
//! the same logical field differently. Each canonical [`Field`] maps to an
//! ordered list of accepted source keys; lookups walk the list and take the
//! first key present.

use crate::util::parse_number;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Symbol,
    Name,
    Series,
    Price,
    PreviousClose,
    Change,
    ChangePercent,
    Volume,
    High,
    Low,
    Open,
    MarketCap,
    PeRatio,
    Sector,
    Industry,
    Week52High,
    Week52Low,
}

pub const FIELD_ALIASES: &[(Field, &[&str])] = &[
    (Field::Symbol, &["symbol", "Symbol", "SYMBOL", "TckrSymb", "stock_symbol", "stockSymbol",
                      "scrip_cd", "ticker", "Ticker", "code"]),
    (Field::Name, &["longName", "shortName", "name", "Name", "NAME", "company_name", "companyName",
                    "title", "long_name", "fullName", "FinInstrmNm"]),
    (Field::Series, &["series", "SERIES", "Series", "SctySrs"]),
    (Field::Price, &["regularMarketPrice", "price", "Price", "PRICE", "ltp", "LTP", "lastPrice",
                     "last_price", "LAST", "LastPric", "close", "Close", "CLOSE", "ClsPric"]),
    (Field::PreviousClose, &["previousClose", "chartPreviousClose", "regularMarketPreviousClose",
                             "prev_close", "PREVCLOSE", "PrvsClsgPric"]),
    (Field::Change, &["change", "Change", "CHANGE", "price_change", "priceChange", "net_change", "netChange"]),
    (Field::ChangePercent, &["change_percent", "changePercent", "pChange", "CHANGE_PER", "change_per",
                             "changePer", "pct_change"]),
    (Field::Volume, &["regularMarketVolume", "volume", "Volume", "VOLUME", "totalTradedVolume",
                      "traded_volume", "tradedVolume", "TOTTRDQTY", "TtlTradgVol", "vol"]),
    (Field::High, &["regularMarketDayHigh", "dayHigh", "high", "High", "HIGH", "day_high", "high_price", "HghPric"]),
    (Field::Low, &["regularMarketDayLow", "dayLow", "low", "Low", "LOW", "day_low", "low_price", "LwPric"]),
    (Field::Open, &["regularMarketOpen", "open", "Open", "OPEN", "day_open", "dayOpen", "open_price", "OpnPric"]),
    (Field::MarketCap, &["marketCap", "market_cap", "MARKET_CAP", "mcap"]),
    (Field::PeRatio, &["trailingPE", "pe_ratio", "peRatio", "PE_RATIO", "pe", "PE"]),
    (Field::Sector, &["sector", "Sector", "SECTOR"]),
    (Field::Industry, &["industry", "Industry", "INDUSTRY"]),
    (Field::Week52High, &["fiftyTwoWeekHigh", "yearHigh", "week52_high", "52WeekHigh"]),
    (Field::Week52Low, &["fiftyTwoWeekLow", "yearLow", "week52_low", "52WeekLow"]),
];

/// Accepted keys for `field`, in priority order.
pub fn aliases(field: Field) -> &'static [&'static str] {
    FIELD_ALIASES
        .iter()
        .find(|(f, _)| *f == field)
        .map(|(_, keys)| *keys)
        .unwrap_or(&[])
}

/// First non-null value stored under any alias of `field`.
pub fn lookup<'a>(row: &'a Map<String, Value>, field: Field) -> Option<&'a Value> {
    aliases(field)
        .iter()
        .filter_map(|key| row.get(*key))
        .find(|v| !v.is_null())
}

pub fn lookup_str(row: &Map<String, Value>, field: Field) -> Option<String> {
    value_as_string(lookup(row, field)?)
}

pub fn lookup_f64(row: &Map<String, Value>, field: Field) -> Option<f64> {
    value_as_f64(lookup(row, field)?)
}

/// Numbers, numeric strings, or `{ "raw": n, "fmt": "..." }` wrappers.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_number(s),
        Value::Object(obj) => obj.get("raw").and_then(value_as_f64),
        _ => None,
    }
}

pub fn value_as_string(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Object(obj) => return obj.get("fmt").and_then(value_as_string),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Column index of `field` in a header row (tables, CSV, spreadsheets).
///
/// Header cells are compared trimmed and case-insensitively.
pub fn header_index(headers: &[String], field: Field) -> Option<usize> {
    aliases(field).iter().find_map(|alias| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(alias))
    })
}

/// Rows of a listing payload: a bare array, an object carrying a `data`
/// array, or the first array-valued member of an object.
pub fn listing_rows(payload: &Value) -> Vec<&Map<String, Value>> {
    let array = match payload {
        Value::Array(items) => Some(items),
        Value::Object(obj) => obj
            .get("data")
            .and_then(Value::as_array)
            .or_else(|| obj.values().find_map(|v| v.as_array().filter(|a| !a.is_empty()))),
        _ => None,
    };

    array
        .map(|items| items.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}
