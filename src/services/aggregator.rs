use crate::models::quote::Quote;
use crate::models::table::ResultTable;
use crate::util::round2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// 单个涨跌幅极值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mover {
    pub symbol: String,
    pub change_percent: f64,
}

/// 汇总统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub with_price: usize,
    pub with_volume: usize,
    pub with_sector: usize,
    pub mean_price: Option<f64>,
    pub median_price: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub mean_change_percent: Option<f64>,
    pub gainers: usize,
    pub losers: usize,
    pub top_gainer: Option<Mover>,
    pub top_loser: Option<Mover>,
}

/// Per-sector rollup used by the spreadsheet sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorStats {
    pub sector: String,
    pub count: usize,
    pub mean_change_percent: Option<f64>,
    pub total_market_cap: f64,
}

/// Drop quotes without a usable price and keep the first quote per symbol.
///
/// Running it again on its own output returns the same table.
pub fn finalize(table: &ResultTable) -> (ResultTable, Summary) {
    let mut seen = HashSet::new();
    let clean: ResultTable = table
        .quotes()
        .iter()
        .filter(|q| q.usable_price().is_some())
        .filter(|q| seen.insert(q.symbol.clone()))
        .cloned()
        .collect();

    let summary = summarize(clean.quotes());
    (clean, summary)
}

pub fn summarize(quotes: &[Quote]) -> Summary {
    let mut prices: Vec<f64> = quotes.iter().filter_map(|q| q.usable_price()).collect();
    prices.sort_by(|a, b| a.total_cmp(b));

    let changes: Vec<(&str, f64)> = quotes
        .iter()
        .filter_map(|q| q.change_percent.filter(|c| c.is_finite()).map(|c| (q.symbol.as_str(), c)))
        .collect();

    let top_gainer = changes
        .iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(symbol, pct)| Mover { symbol: symbol.to_string(), change_percent: *pct });
    let top_loser = changes
        .iter()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(symbol, pct)| Mover { symbol: symbol.to_string(), change_percent: *pct });

    Summary {
        total: quotes.len(),
        with_price: prices.len(),
        with_volume: quotes.iter().filter(|q| q.volume.is_some()).count(),
        with_sector: quotes.iter().filter(|q| has_sector(q)).count(),
        mean_price: mean(&prices),
        median_price: median(&prices),
        min_price: prices.first().copied(),
        max_price: prices.last().copied(),
        mean_change_percent: mean(&changes.iter().map(|(_, c)| *c).collect::<Vec<_>>()),
        gainers: changes.iter().filter(|(_, c)| *c > 0.0).count(),
        losers: changes.iter().filter(|(_, c)| *c < 0.0).count(),
        top_gainer,
        top_loser,
    }
}

/// Best performers first; quotes without a change are skipped.
pub fn top_gainers(quotes: &[Quote], n: usize) -> Vec<Quote> {
    let mut ranked = with_change(quotes);
    ranked.sort_by(|a, b| change_of(b).total_cmp(&change_of(a)));
    ranked.into_iter().take(n).cloned().collect()
}

pub fn top_losers(quotes: &[Quote], n: usize) -> Vec<Quote> {
    let mut ranked = with_change(quotes);
    ranked.sort_by(|a, b| change_of(a).total_cmp(&change_of(b)));
    ranked.into_iter().take(n).cloned().collect()
}

/// 按行业分组，按股票数量降序
pub fn sector_breakdown(quotes: &[Quote]) -> Vec<SectorStats> {
    let mut groups: BTreeMap<&str, Vec<&Quote>> = BTreeMap::new();
    for quote in quotes.iter().filter(|q| has_sector(q)) {
        if let Some(sector) = quote.sector.as_deref() {
            groups.entry(sector.trim()).or_default().push(quote);
        }
    }

    let mut stats: Vec<SectorStats> = groups
        .into_iter()
        .map(|(sector, members)| {
            let changes: Vec<f64> = members.iter().filter_map(|q| q.change_percent).collect();
            SectorStats {
                sector: sector.to_string(),
                count: members.len(),
                mean_change_percent: mean(&changes),
                total_market_cap: round2(members.iter().filter_map(|q| q.market_cap).sum()),
            }
        })
        .collect();

    stats.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.sector.cmp(&b.sector)));
    stats
}

fn has_sector(quote: &Quote) -> bool {
    quote.sector.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false)
}

fn with_change(quotes: &[Quote]) -> Vec<&Quote> {
    quotes.iter().filter(|q| q.change_percent.map(|c| c.is_finite()).unwrap_or(false)).collect()
}

fn change_of(quote: &Quote) -> f64 {
    quote.change_percent.unwrap_or(0.0)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(round2(values.iter().sum::<f64>() / values.len() as f64))
}

// 输入须已排序
fn median(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let mid = n / 2;
    let value = if n % 2 == 0 { (sorted[mid - 1] + sorted[mid]) / 2.0 } else { sorted[mid] };
    Some(round2(value))
}
