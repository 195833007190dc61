use crate::errors::Result;
use crate::sources::SymbolSource;
use async_trait::async_trait;
use log::{info, warn};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// 编译时内嵌的默认股票代码数据集
const EMBEDDED_DATASET: &str = include_str!("../../data/symbols.json");

/// Versioned, hand-maintained symbol list.
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolDataset {
    pub version: String,
    #[serde(default)]
    pub exchange: Option<String>,
    pub symbols: Vec<String>,
}

impl SymbolDataset {
    /// Load a dataset file such as `data/symbols.json`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let dataset: SymbolDataset = serde_json::from_str(&text)?;
        info!("Loaded symbol dataset {} (version {}, {} symbols)",
              path.display(), dataset.version, dataset.symbols.len());
        Ok(dataset)
    }

    /// The dataset shipped with the crate.
    pub fn embedded() -> Self {
        match serde_json::from_str::<SymbolDataset>(EMBEDDED_DATASET) {
            Ok(dataset) => dataset,
            Err(e) => {
                warn!("Embedded symbol dataset is unreadable: {}", e);
                SymbolDataset {
                    version: "unknown".to_string(),
                    exchange: None,
                    symbols: Vec::new(),
                }
            }
        }
    }
}

/// Fixed list of symbols; no I/O at discovery time.
pub struct StaticSource {
    symbols: Vec<String>,
}

impl StaticSource {
    pub fn new(symbols: Vec<String>) -> Self {
        Self { symbols }
    }

    pub fn from_dataset(dataset: SymbolDataset) -> Self {
        Self::new(dataset.symbols)
    }
}

#[async_trait]
impl SymbolSource for StaticSource {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn discover(&self) -> Vec<String> {
        self.symbols.clone()
    }
}
