use crate::errors::Result;
use crate::models::quote::Quote;
use crate::sinks::snapshot;
use log::info;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// 行情快照提供者，用于浏览已保存的Arrow快照
pub struct QuoteProvider {
    data: Vec<Quote>,
    // 索引用于快速查找
    symbol_index: HashMap<String, usize>,
    sector_index: HashMap<String, Vec<usize>>,
}

impl QuoteProvider {
    pub fn new_with_data(data: Vec<Quote>) -> Self {
        let mut provider = Self {
            data,
            symbol_index: HashMap::new(),
            sector_index: HashMap::new(),
        };
        provider.rebuild_indices();
        provider
    }

    /// 从文件加载数据
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = snapshot::read_snapshot(path)?;
        info!("Loaded {} quotes from {}", data.len(), path.display());
        Ok(Self::new_with_data(data))
    }

    /// Most recent `india_stocks_*.arrow` in a directory, by file name.
    pub fn latest_snapshot(dir: &Path) -> Result<Option<PathBuf>> {
        if !dir.exists() {
            return Ok(None);
        }

        let mut latest: Option<PathBuf> = None;
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_snapshot = path.extension().map(|e| e == "arrow").unwrap_or(false)
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(crate::sinks::OUTPUT_PREFIX))
                    .unwrap_or(false);
            if is_snapshot && latest.as_ref().map(|l| path > *l).unwrap_or(true) {
                latest = Some(path);
            }
        }
        Ok(latest)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        snapshot::write_snapshot(path, &self.data)
    }

    pub fn get_all_quotes(&self) -> &[Quote] {
        &self.data
    }

    pub fn get_quote_by_symbol(&self, symbol: &str) -> Option<&Quote> {
        self.symbol_index.get(&symbol.to_uppercase()).map(|&idx| &self.data[idx])
    }

    /// 行业名称不区分大小写
    pub fn get_quotes_by_sector(&self, sector: &str) -> Vec<&Quote> {
        self.sector_index
            .get(&sector.trim().to_lowercase())
            .map(|indices| indices.iter().map(|&idx| &self.data[idx]).collect())
            .unwrap_or_default()
    }

    /// Quotes whose symbol contains `symbol` and whose sector matches, in snapshot order.
    pub fn search(&self, symbol: Option<&str>, sector: Option<&str>) -> Vec<&Quote> {
        let symbol = symbol.map(|s| s.to_uppercase());
        let sector = sector.map(|s| s.trim().to_lowercase());

        self.data
            .iter()
            .filter(|q| symbol.as_deref().map(|s| q.symbol.contains(s)).unwrap_or(true))
            .filter(|q| match sector.as_deref() {
                Some(wanted) => q.sector.as_deref().map(|s| s.trim().to_lowercase() == wanted).unwrap_or(false),
                None => true,
            })
            .collect()
    }

    /// 重建索引
    fn rebuild_indices(&mut self) {
        self.symbol_index.clear();
        self.sector_index.clear();

        for (i, quote) in self.data.iter().enumerate() {
            self.symbol_index.entry(quote.symbol.clone()).or_insert(i);

            if let Some(sector) = quote.sector.as_deref().filter(|s| !s.trim().is_empty()) {
                self.sector_index
                    .entry(sector.trim().to_lowercase())
                    .or_insert_with(Vec::new)
                    .push(i);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::symbol::Symbol;
    use chrono::{TimeZone, Utc};

    // 快照只保存到毫秒
    fn quote(code: &str, sector: Option<&str>) -> Quote {
        let at = Utc.with_ymd_and_hms(2024, 6, 3, 4, 0, 5).unwrap();
        let mut q = Quote::priced(&Symbol::parse(code).unwrap(), 10.0, None, at).unwrap();
        q.sector = sector.map(|s| s.to_string());
        q
    }

    fn provider() -> QuoteProvider {
        QuoteProvider::new_with_data(vec![
            quote("TATASTEEL", Some("Basic Materials")),
            quote("TATAMOTORS", Some("Consumer Cyclical")),
            quote("JSWSTEEL", Some("basic materials")),
            quote("INFY", None),
        ])
    }

    #[test]
    fn lookups_use_indices() {
        let p = provider();
        assert_eq!(p.get_quote_by_symbol("infy").map(|q| q.symbol.as_str()), Some("INFY"));
        assert!(p.get_quote_by_symbol("WIPRO").is_none());
        assert_eq!(p.get_quotes_by_sector("Basic Materials").len(), 2);
    }

    #[test]
    fn search_combines_filters() {
        let p = provider();
        let steel: Vec<&str> = p.search(Some("steel"), None).iter().map(|q| q.symbol.as_str()).collect();
        assert_eq!(steel, vec!["TATASTEEL", "JSWSTEEL"]);

        let tata_materials = p.search(Some("TATA"), Some("basic materials"));
        assert_eq!(tata_materials.len(), 1);
        assert_eq!(p.search(None, None).len(), 4);
    }

    #[test]
    fn save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("india_stocks_20240603_093005.arrow");
        let p = provider();
        p.save_to_file(&path).unwrap();

        let loaded = QuoteProvider::load_from_file(&path).unwrap();
        assert_eq!(loaded.get_all_quotes(), p.get_all_quotes());
        assert_eq!(QuoteProvider::latest_snapshot(&dir.path().join("nested")).unwrap(), Some(path));
    }

    #[test]
    fn latest_snapshot_picks_newest_stamp() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["india_stocks_20240601_100000.arrow", "india_stocks_20240603_093005.arrow", "other.arrow", "india_stocks_20240609_000000.csv"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let latest = QuoteProvider::latest_snapshot(dir.path()).unwrap().unwrap();
        assert!(latest.ends_with("india_stocks_20240603_093005.arrow"));
        assert!(QuoteProvider::latest_snapshot(&dir.path().join("missing")).unwrap().is_none());
    }
}
