use crate::config::DEFAULT_INDEX_API_URL;
use crate::errors::Result;
use crate::scrapers::fields::{listing_rows, lookup_str, value_as_f64, Field};
use crate::scrapers::http::{HttpClient, RequestPacer};
use crate::sources::SymbolSource;
use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::Value;
use std::time::Duration;

/// 默认轮询的指数
pub const DEFAULT_INDICES: &[&str] = &[
    "NIFTY 50",
    "NIFTY NEXT 50",
    "NIFTY MIDCAP 100",
    "NIFTY SMALLCAP 100",
    "NIFTY BANK",
    "NIFTY IT",
    "NIFTY PHARMA",
    "NIFTY AUTO",
    "NIFTY FMCG",
    "NIFTY METAL",
];

/// NSE 指数成分股接口
///
/// One request per index name; each index that fails or returns an
/// unexpected payload contributes nothing.
pub struct IndexApiSource {
    http: HttpClient,
    url: String,
    indices: Vec<String>,
    pacer: RequestPacer,
}

impl IndexApiSource {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            url: DEFAULT_INDEX_API_URL.to_string(),
            indices: DEFAULT_INDICES.iter().map(|s| s.to_string()).collect(),
            pacer: RequestPacer::new(Duration::from_millis(500)),
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub fn with_indices(mut self, indices: Vec<String>) -> Self {
        self.indices = indices;
        self
    }

    async fn fetch_index(&self, index: &str) -> Result<Vec<String>> {
        self.pacer.wait().await;
        let payload = self.http.get_json(&self.url, &[("index", index)]).await?;
        let symbols = extract_index_symbols(&payload);
        debug!("Index {} returned {} constituents", index, symbols.len());
        Ok(symbols)
    }
}

/// Symbol column of every constituent row in an index payload.
///
/// 指数本身也作为一行返回（priority 非零，symbol 等于 name），需跳过
pub fn extract_index_symbols(payload: &Value) -> Vec<String> {
    let index_name = payload
        .get("name")
        .and_then(Value::as_str)
        .map(|n| n.trim().to_uppercase());

    listing_rows(payload)
        .into_iter()
        .filter(|row| {
            row.get("priority")
                .and_then(value_as_f64)
                .map(|p| p == 0.0)
                .unwrap_or(true)
        })
        .filter_map(|row| lookup_str(row, Field::Symbol))
        .filter(|symbol| index_name.as_deref() != Some(symbol.trim().to_uppercase().as_str()))
        .collect()
}

#[async_trait]
impl SymbolSource for IndexApiSource {
    fn name(&self) -> &'static str {
        "nse-index"
    }

    async fn discover(&self) -> Vec<String> {
        let mut symbols = Vec::new();

        for index in &self.indices {
            match self.fetch_index(index).await {
                Ok(found) => symbols.extend(found),
                Err(e) => warn!("Failed to fetch index {}: {}", index, e),
            }
        }

        info!("成功获取 {} 个指数成分股代码", symbols.len());
        symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientConfig, RetryPolicy};
    use crate::models::symbol::Symbol;
    use serde_json::json;

    #[test]
    fn extracts_constituents_without_index_row() {
        let payload = json!({
            "name": "NIFTY 50",
            "data": [
                { "priority": 1, "symbol": "NIFTY 50", "lastPrice": 22500.1 },
                { "priority": 0, "symbol": "RELIANCE", "lastPrice": 2931.4 },
                { "priority": 0, "symbol": "TCS", "lastPrice": 3850.0 },
                { "priority": 0, "lastPrice": 10.0 }
            ]
        });
        assert_eq!(extract_index_symbols(&payload), vec!["RELIANCE", "TCS"]);
    }

    #[test]
    fn index_row_never_becomes_a_symbol() {
        // 无 priority 字段时按 name 识别指数行
        let payload = json!({
            "name": "NIFTY PHARMA",
            "data": [
                { "symbol": "NIFTY PHARMA", "lastPrice": 21000.0 },
                { "priority": 1, "symbol": "NIFTY METAL", "lastPrice": 9000.0 }
            ]
        });
        let symbols = extract_index_symbols(&payload);
        assert!(symbols.is_empty());

        let unfiltered = ["NIFTY PHARMA", "NIFTY AUTO", "NIFTY FMCG", "NIFTY METAL"];
        assert!(unfiltered.iter().filter_map(|s| Symbol::parse(s)).next().is_none());
    }

    #[test]
    fn unexpected_payload_yields_nothing() {
        assert!(extract_index_symbols(&json!({ "message": "Resource not found" })).is_empty());
    }

    #[tokio::test]
    async fn unreachable_api_returns_empty() {
        let config = ClientConfig::new()
            .with_timeout(Duration::from_secs(2))
            .with_retry(RetryPolicy::new(1, Duration::from_millis(1)));
        let source = IndexApiSource::new(HttpClient::new(&config).unwrap())
            .with_url("http://127.0.0.1:9/api/equity-stockIndices")
            .with_indices(vec!["NIFTY 50".to_string()]);
        assert!(source.discover().await.is_empty());
    }
}
