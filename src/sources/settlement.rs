use crate::errors::{Result, ScraperError};
use crate::scrapers::fields::{header_index, Field};
use crate::sources::SymbolSource;
use async_trait::async_trait;
use calamine::{open_workbook_auto, Reader};
use log::{info, warn};
use std::path::{Path, PathBuf};

/// 只保留股票类交易品种
const EQUITY_SERIES: &[&str] = &["EQ", "BE"];

/// 历史结算文件（bhavcopy）解析
///
/// Accepts the exchange's CSV or a spreadsheet export. The symbol column is
/// found by header alias; when a series column exists, only equity series
/// rows are kept.
pub struct SettlementFileSource {
    path: PathBuf,
}

impl SettlementFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read header plus data rows from the file as strings.
    fn read_rows(path: &Path) -> Result<Vec<Vec<String>>> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "xlsx" | "xls" | "xlsm" | "ods" => Self::read_workbook(path),
            _ => Self::read_csv(path),
        }
    }

    fn read_csv(path: &Path) -> Result<Vec<Vec<String>>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(|s| s.to_string()).collect());
        }
        Ok(rows)
    }

    fn read_workbook(path: &Path) -> Result<Vec<Vec<String>>> {
        let mut workbook = open_workbook_auto(path)?;

        // 取第一个工作表
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ScraperError::DataError("workbook has no sheets".to_string()))??;

        Ok(range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string().trim().to_string()).collect())
            .collect())
    }

    /// Equity symbols from parsed rows; the first row is the header.
    pub fn symbols_from_rows(rows: &[Vec<String>]) -> Result<Vec<String>> {
        let (headers, data) = rows
            .split_first()
            .ok_or_else(|| ScraperError::DataError("settlement file is empty".to_string()))?;

        let symbol_col = header_index(headers, Field::Symbol)
            .ok_or_else(|| ScraperError::DataError(format!("no symbol column in {:?}", headers)))?;
        let series_col = header_index(headers, Field::Series);

        let symbols = data
            .iter()
            .filter(|row| match series_col {
                Some(col) => row
                    .get(col)
                    .map(|series| EQUITY_SERIES.contains(&series.to_ascii_uppercase().as_str()))
                    .unwrap_or(false),
                None => true,
            })
            .filter_map(|row| row.get(symbol_col))
            .filter(|symbol| !symbol.is_empty())
            .cloned()
            .collect();

        Ok(symbols)
    }
}

#[async_trait]
impl SymbolSource for SettlementFileSource {
    fn name(&self) -> &'static str {
        "settlement-file"
    }

    async fn discover(&self) -> Vec<String> {
        let path = self.path.clone();
        let parsed = tokio::task::spawn_blocking(move || {
            let rows = Self::read_rows(&path)?;
            Self::symbols_from_rows(&rows)
        })
        .await;

        match parsed {
            Ok(Ok(symbols)) => {
                info!("成功解析结算文件 {}: {} 个代码", self.path.display(), symbols.len());
                symbols
            }
            Ok(Err(e)) => {
                warn!("Failed to read settlement file {}: {}", self.path.display(), e);
                Vec::new()
            }
            Err(e) => {
                warn!("Settlement file task failed: {}", e);
                Vec::new()
            }
        }
    }
}
